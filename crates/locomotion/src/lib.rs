//! Clamber Locomotion
//!
//! An engine-agnostic kinematic character controller for platformers:
//! walking, slope sliding, multi-stage jumps, crouching, attack combos,
//! wall and ladder climbing, and riding moving platforms. The host owns
//! rendering, input devices and animation; this crate only turns input
//! and terrain into motion and animation signals.
//!
//! # Architecture
//!
//! The crate is split into three systems:
//!
//! - **Terrain**: Ray probes, collider sweeps and overlap tests against
//!   tagged, layered static and moving geometry
//! - **Movement**: The controller that reads input each tick and moves a
//!   body through the terrain, plus its jump, attack and platform state
//! - **Climb**: Wall detection, attachment and every climbing phase
//!
//! # Design Principles
//!
//! 1. **Determinism**: Integer-millisecond timers and plain-data state, so
//!    a recorded input stream always replays the same way
//! 2. **Host agnostic**: Terrain is a trait; animation is a signal sink
//! 3. **Snapshots**: Any [`MovementState`] can be encoded and restored
//! 4. **Config as data**: Every tuning value lives in a serde-loadable
//!    [`MovementConfig`]

pub mod climb;
pub mod error;
pub mod movement;
pub mod terrain;

// Re-export commonly used types
pub use climb::{ClimbContext, ClimbEngine, ClimbOutcome, ClimbPhase};
pub use error::{ConfigError, SnapshotError, TerrainError};
pub use movement::{
    AnimationSink, CapabilityId, CapabilityRegistry, Effect, InputButtons, LocomotionCommand, LocomotionContext,
    LocomotionController, LocomotionMode, MovementConfig, MovementFlags, MovementState, NullSink, PlatformRegistry,
    Signal, SignalFrame, StepReport,
};
pub use terrain::{BodyId, BodyPose, ColliderShape, LayerMask, QueryFilter, TerrainHit, TerrainQuery, TerrainWorld};
