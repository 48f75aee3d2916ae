//! Player entity and state.

use clamber_locomotion::movement::{CapabilityRegistry, PlatformRegistry};
use clamber_locomotion::{LocomotionController, LocomotionMode, MovementState, StepReport, TerrainQuery};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::capabilities::HostCapabilities;
use crate::level::SpawnPoint;
use crate::recorder::SignalRecorder;

/// Unique identifier for entities.
pub type EntityId = u32;

/// Running totals of what a player has done.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub jumps: u32,
    pub double_jumps: u32,
    pub landings: u32,
    pub attacks: u32,
    /// Completed climb transitions (grabs, pull-ups, drops).
    pub climbs: u32,
}

/// A player in the game.
#[derive(Debug)]
pub struct Player {
    /// Unique player ID.
    pub id: EntityId,

    /// Player name/handle.
    pub name: String,

    /// Locomotion state.
    pub movement: MovementState,

    /// Capability objects the locomotion core may toggle.
    pub capabilities: CapabilityRegistry,

    /// Shared flags of the registered capabilities.
    pub host: HostCapabilities,

    /// Animation signals and effect history.
    pub signals: SignalRecorder,

    /// Report of the most recent update.
    pub last_report: StepReport,

    pub stats: PlayerStats,
}

impl Player {
    /// Create a new player at `spawn`, not yet placed on the ground.
    pub fn new(id: EntityId, name: String, controller: &LocomotionController, spawn: &SpawnPoint) -> Self {
        let mut movement = controller.new_state(spawn.position);
        movement.rotation = spawn.rotation();
        movement.target_yaw = spawn.facing;

        let mut capabilities = CapabilityRegistry::new();
        let host = HostCapabilities::install(&mut capabilities);

        Self {
            id,
            name,
            movement,
            capabilities,
            host,
            signals: SignalRecorder::new(),
            last_report: StepReport::default(),
            stats: PlayerStats::default(),
        }
    }

    /// Get the player's current position.
    #[inline]
    pub fn position(&self) -> Vec3 {
        self.movement.position
    }

    /// Check if the player is on the ground.
    #[inline]
    pub fn is_grounded(&self) -> bool {
        self.movement.is_grounded()
    }

    #[inline]
    pub fn mode(&self) -> LocomotionMode {
        self.movement.mode()
    }

    /// Fold an update's report into the stats.
    pub fn record(&mut self, report: StepReport) {
        if report.jumped.is_some() {
            self.stats.jumps += 1;
        }
        if report.double_jumped {
            self.stats.double_jumps += 1;
        }
        if report.landed {
            self.stats.landings += 1;
        }
        if report.attack.is_some() {
            self.stats.attacks += 1;
        }
        if report.climb.is_some() {
            self.stats.climbs += 1;
        }
        self.last_report = report;
    }

    /// Put the player back at `spawn` with fresh locomotion state.
    pub fn respawn<T: TerrainQuery + ?Sized>(
        &mut self,
        controller: &LocomotionController,
        spawn: &SpawnPoint,
        terrain: &T,
        platforms: &mut PlatformRegistry,
    ) {
        platforms.leave(&mut self.movement.platform);
        self.movement = controller.new_state(spawn.position);
        self.movement.rotation = spawn.rotation();
        self.movement.target_yaw = spawn.facing;
        controller.spawn_at(&mut self.movement, spawn.position, terrain);
        log::info!("player {} respawned at {:?}", self.id, self.movement.position);
    }
}

// ============================================================================
// Tests
// ============================================================================
