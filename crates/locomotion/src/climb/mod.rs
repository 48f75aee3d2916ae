//! Wall and ladder climbing.
//!
//! A body grabs onto any surface carrying the climbable tag when the stick
//! points into it. From then on the [`ClimbEngine`] owns its movement:
//! gravity and the regular move are skipped, the body slides over the
//! wall face, turns to follow it around corners, and leaves by jumping
//! off, dropping at the floor or bottom, or pulling up over the top.
//!
//! # Design
//!
//! Every wall query is a [`ProbeFan`]: a column of forward segments at
//! fixed height fractions. Detection, rotation and the edge checks differ
//! only in fractions, lateral offset, length and tag filter.
//!
//! All per-attachment data lives in [`ClimbContext`], which exists only
//! while the body is on a wall, so detaching is dropping it.

mod context;
mod detect;
mod engine;
mod probe_fan;
mod pull_up;
mod rotation;
mod stuck;
mod turn_back;

pub use context::{BurstState, ClimbContext, ClimbPhase, EdgeFlags, SnapState};
pub use detect::{probe_edges, scan_wall, WallScan};
pub use engine::{ClimbEngine, ClimbInput, ClimbOutcome};
pub use probe_fan::{ProbeFan, FAN_FRACTIONS, ROTATION_ORDER};
pub use pull_up::{find_ledge, PullUpPhase, PullUpState};
pub use rotation::{look_rotation, upright, NormalSource, RotationProgress};
pub use stuck::{StuckInput, StuckMonitor};
pub use turn_back::TurnBackState;
