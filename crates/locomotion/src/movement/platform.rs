//! Moving platform riding.
//!
//! A rider is not parented to the platform directly: a connector sits in
//! between whose local transform is the inverse of the platform's rotation
//! and scale at the time the connector was made. The rider's world
//! transform is `platform · connector · local`, so it inherits translation
//! and rotation changes of the platform but never its scale.
//!
//! One connector exists per platform and is shared by every rider on it.
//! It is destroyed when its last rider leaves.

use std::collections::BTreeMap;

use glam::{Affine3A, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::terrain::{BodyId, BodyPose};

/// Ticks without platform contact before the rider detaches.
pub const DETACH_GRACE_TICKS: u32 = 5;

/// Scale-correcting transform between a platform and its riders.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Connector {
    /// Inverse of the platform's scale and rotation at creation.
    pub local: Affine3A,
    pub riders: u32,
}

impl Connector {
    fn new(pose: &BodyPose) -> Self {
        let base = Affine3A::from_scale_rotation_translation(pose.scale, pose.rotation, Vec3::ZERO);
        Self {
            local: base.inverse(),
            riders: 0,
        }
    }
}

/// A body's link to the platform it stands on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlatformAttachment {
    pub platform: BodyId,
    /// Position relative to the connector.
    pub local_position: Vec3,
    /// Rotation relative to the connector.
    pub local_rotation: Quat,
    /// Consecutive ticks without touching the platform.
    pub grace_ticks: u32,
}

/// What happened to the rider this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RideEvent {
    Attached(BodyId),
    Detached(BodyId),
}

/// All connectors, keyed by platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformRegistry {
    connectors: BTreeMap<BodyId, Connector>,
}

impl PlatformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connector(&self, platform: BodyId) -> Option<&Connector> {
        self.connectors.get(&platform)
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }

    /// Attach a body at `position`/`rotation` to `platform`, creating the
    /// platform's connector if this is its first rider.
    pub fn attach(&mut self, platform: BodyId, pose: &BodyPose, position: Vec3, rotation: Quat) -> PlatformAttachment {
        let connector = self
            .connectors
            .entry(platform)
            .or_insert_with(|| Connector::new(pose));
        connector.riders += 1;

        let mut attachment = PlatformAttachment {
            platform,
            local_position: Vec3::ZERO,
            local_rotation: Quat::IDENTITY,
            grace_ticks: 0,
        };
        self.rebase(&mut attachment, pose, position, rotation);
        log::debug!("attached to platform {platform:?}");
        attachment
    }

    /// Release one rider. The connector goes away with its last rider.
    pub fn detach(&mut self, attachment: &PlatformAttachment) {
        let platform = attachment.platform;
        if let Some(connector) = self.connectors.get_mut(&platform) {
            connector.riders = connector.riders.saturating_sub(1);
            if connector.riders == 0 {
                self.connectors.remove(&platform);
            }
        }
        log::debug!("detached from platform {platform:?}");
    }

    /// World position and rotation of a rider under the platform's current pose.
    pub fn carry(&self, attachment: &PlatformAttachment, pose: &BodyPose) -> Option<(Vec3, Quat)> {
        let world = self.connector_world(attachment.platform, pose)?;
        let (_, rotation, _) = world.to_scale_rotation_translation();
        Some((
            world.transform_point3(attachment.local_position),
            (rotation * attachment.local_rotation).normalize(),
        ))
    }

    /// Store the rider's world transform relative to the connector.
    pub fn rebase(&self, attachment: &mut PlatformAttachment, pose: &BodyPose, position: Vec3, rotation: Quat) {
        let Some(world) = self.connector_world(attachment.platform, pose) else {
            return;
        };
        let (_, connector_rotation, _) = world.to_scale_rotation_translation();
        attachment.local_position = world.inverse().transform_point3(position);
        attachment.local_rotation = (connector_rotation.inverse() * rotation).normalize();
    }

    /// Per-tick contact bookkeeping for one rider.
    ///
    /// `contact` is the platform touched this tick, if any, and `pose` its
    /// current pose. Touching a new platform moves the rider over; going
    /// [`DETACH_GRACE_TICKS`] ticks without contact lets go.
    pub fn update_rider(
        &mut self,
        slot: &mut Option<PlatformAttachment>,
        contact: Option<(BodyId, BodyPose)>,
        position: Vec3,
        rotation: Quat,
    ) -> Option<RideEvent> {
        let current = slot.as_ref().map(|a| a.platform);
        match contact {
            Some((platform, _)) if current == Some(platform) => {
                if let Some(attachment) = slot.as_mut() {
                    attachment.grace_ticks = 0;
                }
                None
            }
            Some((platform, pose)) => {
                self.leave(slot);
                *slot = Some(self.attach(platform, &pose, position, rotation));
                Some(RideEvent::Attached(platform))
            }
            None => {
                let attachment = slot.as_mut()?;
                attachment.grace_ticks += 1;
                if attachment.grace_ticks < DETACH_GRACE_TICKS {
                    return None;
                }
                let platform = attachment.platform;
                self.leave(slot);
                Some(RideEvent::Detached(platform))
            }
        }
    }

    /// Detach whatever `slot` holds.
    pub fn leave(&mut self, slot: &mut Option<PlatformAttachment>) {
        if let Some(attachment) = slot.take() {
            self.detach(&attachment);
        }
    }

    fn connector_world(&self, platform: BodyId, pose: &BodyPose) -> Option<Affine3A> {
        let connector = self.connectors.get(&platform)?;
        Some(pose.to_affine() * connector.local)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    use super::*;

    const PLATFORM: BodyId = BodyId(7);

    fn scaled_pose() -> BodyPose {
        BodyPose {
            translation: Vec3::new(0.0, 1.0, 0.0),
            rotation: Quat::from_rotation_y(FRAC_PI_4),
            scale: Vec3::splat(2.0),
        }
    }

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-3
    }

    /// World scale a unit-scale rider ends up with under `pose`.
    fn rider_scale(registry: &PlatformRegistry, attachment: &PlatformAttachment, pose: &BodyPose) -> Vec3 {
        let world = registry
            .connector_world(attachment.platform, pose)
            .expect("connector");
        world.to_scale_rotation_translation().0
    }

    #[test]
    fn test_scaled_platform_keeps_rider_scale() {
        let mut registry = PlatformRegistry::new();
        let pose = scaled_pose();
        let attachment = registry.attach(PLATFORM, &pose, Vec3::new(1.0, 2.0, 0.0), Quat::IDENTITY);

        let scale = rider_scale(&registry, &attachment, &pose);
        assert!(approx(scale, Vec3::ONE), "scale = {scale:?}");

        let (position, rotation) = registry.carry(&attachment, &pose).expect("connector");
        assert!(approx(position, Vec3::new(1.0, 2.0, 0.0)));
        assert!(rotation.angle_between(Quat::IDENTITY) < 1e-3);
    }

    #[test]
    fn test_rider_follows_translation_and_rotation() {
        let mut registry = PlatformRegistry::new();
        let pose = scaled_pose();
        let attachment = registry.attach(PLATFORM, &pose, Vec3::new(2.0, 2.0, 0.0), Quat::IDENTITY);

        let moved = BodyPose {
            translation: pose.translation + Vec3::new(0.0, 0.0, 3.0),
            rotation: Quat::from_rotation_y(FRAC_PI_2) * pose.rotation,
            ..pose
        };
        let (position, rotation) = registry.carry(&attachment, &moved).expect("connector");

        // Offset (2, 1, 0) from the platform center turns 90° about Y
        let expected = moved.translation + Quat::from_rotation_y(FRAC_PI_2) * Vec3::new(2.0, 1.0, 0.0);
        assert!(approx(position, expected), "position = {position:?}");
        assert!(rotation.angle_between(Quat::from_rotation_y(FRAC_PI_2)) < 1e-3);
        assert!(approx(rider_scale(&registry, &attachment, &moved), Vec3::ONE));
    }

    #[test]
    fn test_rebase_keeps_local_offset() {
        let mut registry = PlatformRegistry::new();
        let pose = scaled_pose();
        let mut attachment = registry.attach(PLATFORM, &pose, Vec3::new(0.0, 2.0, 0.0), Quat::IDENTITY);

        registry.rebase(&mut attachment, &pose, Vec3::new(0.5, 2.0, 0.0), Quat::IDENTITY);
        let (position, _) = registry.carry(&attachment, &pose).expect("connector");
        assert!(approx(position, Vec3::new(0.5, 2.0, 0.0)));
    }

    #[test]
    fn test_connector_shared_and_destroyed_with_last_rider() {
        let mut registry = PlatformRegistry::new();
        let pose = scaled_pose();
        let a = registry.attach(PLATFORM, &pose, Vec3::ZERO, Quat::IDENTITY);
        let b = registry.attach(PLATFORM, &pose, Vec3::X, Quat::IDENTITY);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.connector(PLATFORM).map(|c| c.riders), Some(2));

        registry.detach(&a);
        assert_eq!(registry.len(), 1);
        registry.detach(&b);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_detach_after_grace_ticks() {
        let mut registry = PlatformRegistry::new();
        let pose = scaled_pose();
        let mut slot = None;

        let event = registry.update_rider(&mut slot, Some((PLATFORM, pose)), Vec3::ZERO, Quat::IDENTITY);
        assert_eq!(event, Some(RideEvent::Attached(PLATFORM)));

        for _ in 0..DETACH_GRACE_TICKS - 1 {
            assert_eq!(registry.update_rider(&mut slot, None, Vec3::ZERO, Quat::IDENTITY), None);
        }
        // Contact again resets the counter
        registry.update_rider(&mut slot, Some((PLATFORM, pose)), Vec3::ZERO, Quat::IDENTITY);
        assert_eq!(slot.map(|a| a.grace_ticks), Some(0));

        let mut detached = None;
        for _ in 0..DETACH_GRACE_TICKS {
            detached = registry.update_rider(&mut slot, None, Vec3::ZERO, Quat::IDENTITY);
        }
        assert_eq!(detached, Some(RideEvent::Detached(PLATFORM)));
        assert!(slot.is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_switching_platforms() {
        let mut registry = PlatformRegistry::new();
        let mut slot = None;
        registry.update_rider(&mut slot, Some((PLATFORM, BodyPose::IDENTITY)), Vec3::ZERO, Quat::IDENTITY);
        let event = registry.update_rider(&mut slot, Some((BodyId(8), BodyPose::IDENTITY)), Vec3::ZERO, Quat::IDENTITY);

        assert_eq!(event, Some(RideEvent::Attached(BodyId(8))));
        assert!(registry.connector(PLATFORM).is_none());
        assert_eq!(registry.len(), 1);
    }
}
