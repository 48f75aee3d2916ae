//! Crouch toggling.
//!
//! The crouch button toggles a request. The request turns into an actual
//! crouch once the body is on the ground; standing back up needs a clear
//! line from the feet to the top of the standing collider.

use glam::Vec3;

use crate::terrain::{QueryFilter, TerrainQuery};

use super::config::MovementConfig;
use super::ground::PROBE_LIFT;
use super::state::MovementFlags;

/// What the crouch logic sees this frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrouchInput {
    /// Crouch went down this frame.
    pub pressed: bool,
    pub grounded: bool,
    pub on_wall: bool,
    /// Nothing blocks the standing collider.
    pub headroom: bool,
}

/// Whether the standing collider fits at `feet`.
pub fn has_headroom<T: TerrainQuery + ?Sized>(
    terrain: &T,
    config: &MovementConfig,
    feet: Vec3,
    filter: &QueryFilter,
) -> bool {
    let from = feet + Vec3::Y * PROBE_LIFT;
    let to = feet + Vec3::Y * config.collider.height();
    terrain.probe(from, to, filter).is_none()
}

/// Apply one frame of crouch input. Returns true if the crouch state changed.
pub fn update_crouch(config: &MovementConfig, flags: &mut MovementFlags, input: &CrouchInput) -> bool {
    let was_crouching = flags.crouching();

    if !config.crouching.allow_crouching {
        flags.set(MovementFlags::CROUCHING, false);
        flags.set(MovementFlags::CROUCH_QUEUED, false);
    } else {
        let queued = flags.has(MovementFlags::CROUCH_QUEUED);
        if input.pressed && !queued {
            flags.set(MovementFlags::CROUCH_QUEUED, true);
        } else if input.pressed && input.headroom {
            flags.set(MovementFlags::CROUCHING, false);
            flags.set(MovementFlags::CROUCH_QUEUED, false);
        }

        if input.grounded
            && !input.on_wall
            && flags.has(MovementFlags::CROUCH_QUEUED)
            && !flags.crouching()
        {
            flags.set(MovementFlags::CROUCHING, true);
        }

        if flags.crouching() && input.on_wall && input.headroom {
            flags.set(MovementFlags::CROUCHING, false);
            flags.set(MovementFlags::CROUCH_QUEUED, false);
        }
    }

    flags.set(
        MovementFlags::CAN_CROUCH_TO_ACTION,
        !flags.crouching() || input.headroom,
    );

    let changed = was_crouching != flags.crouching();
    if changed {
        log::debug!("crouch -> {}", flags.crouching());
    }
    changed
}

// ============================================================================
// Tests
// ============================================================================
