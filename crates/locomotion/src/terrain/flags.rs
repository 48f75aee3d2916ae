//! Layer masks and body identities for terrain filtering.

use serde::{Deserialize, Serialize};

/// Stable identity of a body in the terrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub u32);

/// Layers a terrain body lives on.
///
/// Queries carry a mask of layers to test against, so ground probes can
/// ignore water volumes while the in-water check looks only at them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LayerMask(pub u32);

impl LayerMask {
    /// Nothing.
    pub const NONE: Self = Self(0);

    /// Solid world geometry: floors, walls, ladders, platforms.
    pub const SOLID: Self = Self(1 << 0);

    /// Liquid volumes. Ground probes never hit these.
    pub const LIQUID: Self = Self(1 << 1);

    /// Non-blocking trigger volumes.
    pub const TRIGGER: Self = Self(1 << 2);

    /// Other characters.
    pub const CHARACTER: Self = Self(1 << 3);

    /// Every layer.
    pub const ALL: Self = Self(u32::MAX);

    /// Layers that count as something to stand on or collide with.
    pub const GROUND: Self = Self(Self::SOLID.0 | Self::CHARACTER.0);

    #[inline]
    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    #[inline]
    pub fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    #[inline]
    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[inline]
    pub fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl std::ops::BitOr for LayerMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

// ============================================================================
// Tests
// ============================================================================
