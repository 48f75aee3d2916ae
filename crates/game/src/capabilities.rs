//! Host-side capability objects.
//!
//! The locomotion core switches these on and off when a body grabs a wall
//! or enters water. Each toggle shares its flag with the host through an
//! `Rc<Cell<bool>>`, so the game can read it without going through the
//! registry.

use std::cell::Cell;
use std::rc::Rc;

use clamber_locomotion::movement::{Capability, CapabilityId, CapabilityRegistry};

/// A named on/off behavior owned by the host.
#[derive(Debug, Clone)]
pub struct HostToggle {
    name: &'static str,
    enabled: Rc<Cell<bool>>,
}

impl HostToggle {
    pub fn new(name: &'static str, enabled: bool) -> Self {
        Self {
            name,
            enabled: Rc::new(Cell::new(enabled)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Shared handle to the flag.
    pub fn handle(&self) -> Rc<Cell<bool>> {
        Rc::clone(&self.enabled)
    }
}

impl Capability for HostToggle {
    fn set_enabled(&mut self, enabled: bool) {
        if self.enabled.get() != enabled {
            log::info!("{} {}", self.name, if enabled { "enabled" } else { "disabled" });
        }
        self.enabled.set(enabled);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.get()
    }
}

/// The capabilities every player registers, with handles to their flags.
#[derive(Debug, Clone)]
pub struct HostCapabilities {
    pub ledge_climb: Rc<Cell<bool>>,
    pub swim: Rc<Cell<bool>>,
}

impl HostCapabilities {
    /// Register the standard toggles in `registry`.
    ///
    /// Ledge climbing starts on; swimming starts off until the body is in water.
    pub fn install(registry: &mut CapabilityRegistry) -> Self {
        let ledge_climb = HostToggle::new("ledge climb", true);
        let swim = HostToggle::new("swim", false);
        let handles = Self {
            ledge_climb: ledge_climb.handle(),
            swim: swim.handle(),
        };
        registry.register(CapabilityId::LEDGE_CLIMB, Box::new(ledge_climb));
        registry.register(CapabilityId::SWIM, Box::new(swim));
        handles
    }
}
