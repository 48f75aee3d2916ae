//! Movement state: everything that persists between ticks for one body.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::climb::ClimbContext;
use crate::error::SnapshotError;
use crate::terrain::{BodyId, ColliderShape, TerrainHit};

use super::attack::AttackState;
use super::capability::ContextToggles;
use super::ground::GroundReport;
use super::input::InputButtons;
use super::jump::JumpState;
use super::platform::PlatformAttachment;

/// Primary locomotion mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocomotionMode {
    #[default]
    Grounded,
    Airborne,
    Sliding,
    WallClimbing,
    /// Turning around at a ledge to grab the climbable surface below it.
    TurningBack,
    /// Climbing over the top of a climbable surface.
    PullingUp,
}

impl LocomotionMode {
    /// Any mode in which the body hangs on a wall instead of obeying gravity.
    #[inline]
    pub fn is_on_wall(self) -> bool {
        matches!(self, Self::WallClimbing | Self::TurningBack | Self::PullingUp)
    }

    /// Modes in which crouching is allowed.
    #[inline]
    pub fn allows_crouch(self) -> bool {
        matches!(self, Self::Grounded | Self::Sliding | Self::Airborne)
    }
}

/// Flags orthogonal to the primary mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementFlags(pub u16);

impl MovementFlags {
    pub const CROUCHING: u16 = 1 << 0;

    /// Crouch requested; applies as soon as the body is grounded.
    pub const CROUCH_QUEUED: u16 = 1 << 1;

    /// A jump left the ground this tick and ground contact should be ignored.
    pub const JUMP_PERFORMED: u16 = 1 << 2;

    /// Airborne because of a jump rather than a fall.
    pub const MID_AIR_FROM_JUMP: u16 = 1 << 3;

    pub const DOUBLE_JUMP_READY: u16 = 1 << 4;

    /// The slope policy allows jumping from the current surface.
    pub const JUMP_POSSIBLE: u16 = 1 << 5;

    pub const IN_WATER: u16 = 1 << 6;

    pub const FIRST_PERSON: u16 = 1 << 7;

    /// Something is directly above the head.
    pub const HEAD_HIT: u16 = 1 << 8;

    /// The last move touched something above the lower half meter of the collider.
    pub const COLLIDING_WITH_WALL: u16 = 1 << 9;

    /// Enough headroom to stand up for a jump or attack.
    pub const CAN_CROUCH_TO_ACTION: u16 = 1 << 10;

    /// Ticks are ignored until re-enabled.
    pub const DISABLED: u16 = 1 << 11;

    /// Flags a freshly spawned body starts with.
    pub const SPAWN: Self = Self(Self::JUMP_POSSIBLE | Self::DOUBLE_JUMP_READY | Self::CAN_CROUCH_TO_ACTION);

    #[inline]
    pub fn has(self, flag: u16) -> bool {
        (self.0 & flag) != 0
    }

    #[inline]
    pub fn set(&mut self, flag: u16, value: bool) {
        if value {
            self.0 |= flag;
        } else {
            self.0 &= !flag;
        }
    }

    #[inline]
    pub fn crouching(self) -> bool {
        self.has(Self::CROUCHING)
    }

    #[inline]
    pub fn disabled(self) -> bool {
        self.has(Self::DISABLED)
    }
}

/// A surface touched by the last move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub point: Vec3,
    pub normal: Vec3,
    /// Degrees from horizontal.
    pub slope_angle: f32,
    pub body: BodyId,
    pub tag: Option<String>,
}

impl Contact {
    pub fn from_hit(hit: &TerrainHit) -> Self {
        Self {
            point: hit.point,
            normal: hit.normal,
            slope_angle: hit.slope_angle(),
            body: hit.body,
            tag: hit.tag.as_ref().map(|t| t.as_str().to_string()),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tag.as_deref() == Some(tag)
    }
}

/// Speed blending carried between ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeedState {
    /// Weight of side speed in the blend.
    pub horizontal_blend: f32,
    /// Weight of forward/back speed in the blend.
    pub vertical_blend: f32,
    /// Target ground speed this tick.
    pub move_speed: f32,
    /// Ground speed after friction smoothing.
    pub applied_speed: f32,
    pub air_speed: f32,
    /// Ramps 0 → 1 while there is input.
    pub acceleration_rate: f32,
    /// Grows every tick, reset while there is input.
    pub deceleration_rate: f32,
}

/// Slope sliding state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SlideState {
    pub sliding: bool,
    /// Grows while the slide continues.
    pub speed: f32,
    /// Current slide direction, eased toward the downhill vector.
    pub movement: Vec3,
    /// Normal of the steep surface last touched.
    pub surface_normal: Vec3,
}

/// Momentum applied for a short time after letting go of a wall.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PushOff {
    /// Remaining push displacement.
    pub vector: Vec3,
    pub elapsed_ms: u32,
    pub active: bool,
}

impl PushOff {
    /// How long a push lasts, and how long re-attaching is blocked.
    pub const DURATION_MS: u32 = 300;

    pub fn start(vector: Vec3) -> Self {
        Self {
            vector,
            elapsed_ms: 0,
            active: true,
        }
    }
}

/// Complete locomotion state for one body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementState {
    /// Bottom-center of the collider.
    pub position: Vec3,
    pub rotation: Quat,
    /// Yaw (radians) the body is turning toward.
    pub target_yaw: f32,
    /// Intended velocity for this tick (meters/second).
    pub move_direction: Vec3,
    /// Velocity actually achieved by the last move.
    pub velocity: Vec3,

    mode: LocomotionMode,
    pub flags: MovementFlags,

    /// Current collider (crouch-compressed while crouching).
    pub collider: ColliderShape,

    pub speed: SpeedState,
    pub ground: GroundReport,
    pub slide: SlideState,

    /// Ticks since the last collision contact.
    pub no_collision_ticks: u32,
    pub last_contact: Option<Contact>,

    pub jump: JumpState,
    pub attack: AttackState,

    pub climb: Option<ClimbContext>,
    pub push_off: PushOff,

    pub platform: Option<PlatformAttachment>,
    pub toggles: ContextToggles,

    pub prev_buttons: InputButtons,
}

impl MovementState {
    /// A standing body at `position` with `total_jumps` jump stages.
    pub fn new(position: Vec3, collider: ColliderShape, total_jumps: usize, attack: AttackState) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            target_yaw: 0.0,
            move_direction: Vec3::ZERO,
            velocity: Vec3::ZERO,
            mode: LocomotionMode::Airborne,
            flags: MovementFlags::SPAWN,
            collider,
            speed: SpeedState::default(),
            ground: GroundReport::default(),
            slide: SlideState::default(),
            no_collision_ticks: 0,
            last_contact: None,
            jump: JumpState::new(total_jumps),
            attack,
            climb: None,
            push_off: PushOff::default(),
            platform: None,
            toggles: ContextToggles::default(),
            prev_buttons: InputButtons::default(),
        }
    }

    pub fn mode(&self) -> LocomotionMode {
        self.mode
    }

    /// Switch mode, enforcing the flags each mode allows.
    ///
    /// Returns the previous mode.
    pub fn set_mode(&mut self, mode: LocomotionMode) -> LocomotionMode {
        let previous = self.mode;
        if mode == previous {
            return previous;
        }
        if !mode.allows_crouch() {
            self.flags.set(MovementFlags::CROUCHING, false);
            self.flags.set(MovementFlags::CROUCH_QUEUED, false);
        }
        if mode.is_on_wall() {
            self.flags.set(MovementFlags::JUMP_PERFORMED, false);
            self.flags.set(MovementFlags::MID_AIR_FROM_JUMP, false);
            self.slide.sliding = false;
        }
        if mode == LocomotionMode::Sliding {
            self.slide.sliding = true;
        }
        log::debug!("locomotion mode {previous:?} -> {mode:?}");
        self.mode = mode;
        previous
    }

    #[inline]
    pub fn is_grounded(&self) -> bool {
        self.ground.grounded
    }

    #[inline]
    pub fn is_on_wall(&self) -> bool {
        self.mode.is_on_wall()
    }

    #[inline]
    pub fn is_crouching(&self) -> bool {
        self.flags.crouching()
    }

    #[inline]
    pub fn in_water(&self) -> bool {
        self.flags.has(MovementFlags::IN_WATER)
    }

    /// Horizontal unit vector the body faces.
    pub fn forward(&self) -> Vec3 {
        super::ground::flat(self.rotation * Vec3::Z, Vec3::Z)
    }

    pub fn right(&self) -> Vec3 {
        Vec3::Y.cross(self.forward())
    }

    /// Current facing as a yaw angle (radians).
    pub fn yaw(&self) -> f32 {
        let forward = self.forward();
        forward.x.atan2(forward.z)
    }

    pub fn horizontal_speed(&self) -> f32 {
        Vec3::new(self.velocity.x, 0.0, self.velocity.z).length()
    }

    /// Current jump stage (0 before the first jump of a combo).
    pub fn current_jump(&self) -> usize {
        self.jump.current()
    }

    /// Encode the full state for rewind or save games.
    pub fn to_snapshot(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(bincode::serde::encode_to_vec(self, bincode::config::standard())?)
    }

    pub fn from_snapshot(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let (state, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())?;
        Ok(state)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::config::MovementConfig;

    fn create_test_state() -> MovementState {
        let config = MovementConfig::default();
        MovementState::new(
            Vec3::new(1.0, 2.0, 3.0),
            config.collider,
            config.total_jumps(),
            AttackState::new(&config.attacking),
        )
    }

    #[test]
    fn test_movement_flags() {
        let mut flags = MovementFlags::default();
        assert!(!flags.crouching());

        flags.set(MovementFlags::CROUCHING, true);
        assert!(flags.crouching());
        flags.set(MovementFlags::CROUCHING, false);
        assert!(!flags.crouching());
    }

    #[test]
    fn test_new_state_flags() {
        let state = create_test_state();
        assert!(state.flags.has(MovementFlags::JUMP_POSSIBLE));
        assert!(state.flags.has(MovementFlags::DOUBLE_JUMP_READY));
        assert!(!state.flags.disabled());
        assert_eq!(state.current_jump(), 3);
    }

    #[test]
    fn test_entering_wall_mode_clears_crouch() {
        let mut state = create_test_state();
        state.flags.set(MovementFlags::CROUCHING, true);
        state.flags.set(MovementFlags::CROUCH_QUEUED, true);

        let previous = state.set_mode(LocomotionMode::WallClimbing);
        assert_eq!(previous, LocomotionMode::Airborne);
        assert!(!state.is_crouching());
        assert!(!state.flags.has(MovementFlags::CROUCH_QUEUED));
        assert!(state.is_on_wall());
    }

    #[test]
    fn test_facing_vectors() {
        let mut state = create_test_state();
        assert!((state.forward() - Vec3::Z).length() < 1e-5);
        assert!((state.right() - Vec3::X).length() < 1e-5);

        state.rotation = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        assert!((state.forward() - Vec3::X).length() < 1e-5);
        assert!((state.yaw() - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn test_snapshot_restores_state() {
        let mut state = create_test_state();
        state.move_direction = Vec3::new(0.5, -1.0, 2.0);
        state.flags.set(MovementFlags::MID_AIR_FROM_JUMP, true);
        state.last_contact = Some(Contact {
            point: Vec3::ONE,
            normal: Vec3::Y,
            slope_angle: 0.0,
            body: BodyId(4),
            tag: Some("Ladder".to_string()),
        });

        let bytes = state.to_snapshot().expect("encode");
        let restored = MovementState::from_snapshot(&bytes).expect("decode");
        assert_eq!(restored, state);
    }

    #[test]
    fn test_corrupt_snapshot_is_an_error() {
        assert!(MovementState::from_snapshot(&[0xff, 0xff, 0xff]).is_err());
    }
}
