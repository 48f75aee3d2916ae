//! Error types for the locomotion crate.
//!
//! The per-tick simulation itself never fails: probe misses are `None` and
//! bad indices are clamped. Errors only surface at the edges, when loading
//! configuration, building terrain or (de)serializing snapshots.

use thiserror::Error;

use crate::terrain::BodyId;

/// Failure to load or validate a [`MovementConfig`](crate::MovementConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config value `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Failure to build or edit terrain geometry.
#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("triangle mesh is invalid: {0}")]
    InvalidMesh(String),

    #[error("convex hull could not be computed from {0} points")]
    InvalidHull(usize),

    #[error("unknown terrain body {0:?}")]
    UnknownBody(BodyId),
}

/// Failure to encode or decode a movement state snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("snapshot decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}
