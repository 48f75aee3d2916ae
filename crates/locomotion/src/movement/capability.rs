//! Capability toggles for wall and water contexts.
//!
//! The host registers its auxiliary behaviors (a ledge-grab helper, a swim
//! controller, ...) under stable [`CapabilityId`]s. The configuration lists
//! which of them switch on and off while the body is on a wall or in water.
//! An id the host never registered is reported once and otherwise skipped.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of a host capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CapabilityId(pub u32);

impl CapabilityId {
    /// Grabbing and shimmying along plain ledges.
    pub const LEDGE_CLIMB: Self = Self(1);
    /// Swimming locomotion.
    pub const SWIM: Self = Self(2);
}

/// Capabilities to switch on and off while a context is active.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToggleLists {
    pub enable: Vec<CapabilityId>,
    pub disable: Vec<CapabilityId>,
}

/// When a set of toggles applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToggleContext {
    /// Climbing, turning back onto a wall, or pulling up.
    OnWall,
    InWater,
}

/// A host-owned behavior that can be switched on and off.
pub trait Capability {
    fn set_enabled(&mut self, enabled: bool);
    fn is_enabled(&self) -> bool;
}

/// Reported when a configured capability was never registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityWarning {
    pub id: CapabilityId,
    pub context: ToggleContext,
}

/// Host-populated lookup of capabilities.
#[derive(Default)]
pub struct CapabilityRegistry {
    entries: HashMap<CapabilityId, Box<dyn Capability>>,
    warned: HashSet<CapabilityId>,
    warnings: Vec<CapabilityWarning>,
}

impl fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.entries.keys().collect();
        ids.sort();
        f.debug_struct("CapabilityRegistry")
            .field("ids", &ids)
            .field("warnings", &self.warnings)
            .finish()
    }
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: CapabilityId, capability: Box<dyn Capability>) {
        self.entries.insert(id, capability);
        self.warned.remove(&id);
    }

    pub fn is_enabled(&self, id: CapabilityId) -> Option<bool> {
        self.entries.get(&id).map(|c| c.is_enabled())
    }

    /// Every unresolved id reported so far, oldest first.
    pub fn warnings(&self) -> &[CapabilityWarning] {
        &self.warnings
    }

    /// Apply `lists` for entering (`active == true`) or leaving a context.
    pub fn apply(&mut self, context: ToggleContext, lists: &ToggleLists, active: bool) {
        for &id in &lists.disable {
            self.set(context, id, !active);
        }
        for &id in &lists.enable {
            self.set(context, id, active);
        }
    }

    fn set(&mut self, context: ToggleContext, id: CapabilityId, enabled: bool) {
        match self.entries.get_mut(&id) {
            Some(capability) => capability.set_enabled(enabled),
            None => {
                if self.warned.insert(id) {
                    log::warn!("capability {id:?} is not registered; {context:?} toggle skipped");
                    self.warnings.push(CapabilityWarning { id, context });
                }
            }
        }
    }
}

/// Tracks which contexts are active so toggles fire once per entry and exit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextToggles {
    on_wall: bool,
    in_water: bool,
}

impl ContextToggles {
    /// Fire toggles for any context whose activity changed.
    pub fn update(
        &mut self,
        registry: &mut CapabilityRegistry,
        lists: &super::config::CapabilityConfig,
        on_wall: bool,
        in_water: bool,
    ) {
        if on_wall != self.on_wall {
            log::debug!("capability context OnWall -> {on_wall}");
            registry.apply(ToggleContext::OnWall, &lists.on_wall, on_wall);
            self.on_wall = on_wall;
        }
        if in_water != self.in_water {
            log::debug!("capability context InWater -> {in_water}");
            registry.apply(ToggleContext::InWater, &lists.in_water, in_water);
            self.in_water = in_water;
        }
    }

    pub fn on_wall(&self) -> bool {
        self.on_wall
    }

    pub fn in_water(&self) -> bool {
        self.in_water
    }
}

// ============================================================================
// Tests
// ============================================================================
