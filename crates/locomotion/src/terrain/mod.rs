//! Terrain query adapter.
//!
//! The locomotion core never touches a collision backend directly. It asks
//! a [`TerrainQuery`] for rays, segments, collider sweeps and overlaps, and
//! reads back [`TerrainHit`]s carrying the hit point, surface normal and
//! surface tag.
//!
//! # Key Types
//!
//! - [`TerrainQuery`]: the contract hosts implement
//! - [`TerrainWorld`]: parry3d-backed implementation used by the game crate and tests
//! - [`QueryFilter`]: layer mask plus self exclusion
//! - [`ColliderShape`]: capsule, sphere or box, positioned by its feet

mod flags;
mod hit;
mod query;
mod shape;
mod world;

pub use flags::{BodyId, LayerMask};
pub use hit::{slope_angle, QueryFilter, SurfaceTag, Sweep, TerrainHit};
pub use query::TerrainQuery;
pub use shape::{BodyPose, ColliderShape};
pub use world::{TerrainBody, TerrainWorld};
