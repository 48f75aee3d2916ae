//! Clamber Game Host
//!
//! This crate hosts the locomotion core the way a game would:
//!
//! - Player bodies with their capability objects and signal recorders
//! - A test course with ladders, slopes, water and a moving platform
//! - Input mapping from keys and sticks to locomotion commands
//! - A fixed-step simulation with snapshot and rewind
//!
//! # Architecture
//!
//! The simulation advances the level's moving geometry, then every player's
//! locomotion, once per fixed tick. All state updates are driven by player
//! input and the tick counter, so a recorded input stream replays exactly.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Simulation                            │
//! │  ┌─────────┐    ┌────────────┐    ┌──────────────────────┐  │
//! │  │ Player  │───►│ Locomotion │───►│ Players              │  │
//! │  │ Input   │    │ (terrain,  │    │ (state, signals,     │  │
//! │  └─────────┘    │  climbing) │    │  capabilities)       │  │
//! │                 └────────────┘    └──────────────────────┘  │
//! │                       ▲                                      │
//! │                 ┌─────┴──────┐                               │
//! │                 │ Level      │ moving platforms advance      │
//! │                 └────────────┘ before players each tick      │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod capabilities;
pub mod input;
pub mod level;
pub mod player;
pub mod recorder;
pub mod simulation;

// Re-export main types
pub use capabilities::{HostCapabilities, HostToggle};
pub use input::PlayerInput;
pub use level::{Level, MovingPlatform, SpawnPoint};
pub use player::{Player, PlayerStats};
pub use recorder::{EffectRecord, SignalRecorder};
pub use simulation::{Simulation, SimulationConfig, SimulationSnapshot};

// Re-export locomotion types for convenience
pub use clamber_locomotion::{
    LocomotionCommand, LocomotionController, LocomotionMode, MovementConfig, MovementState, Signal, StepReport,
    TerrainWorld,
};
