//! Game simulation - the fixed-step loop.
//!
//! Every tick first moves the level's platforms to where the clock says
//! they are, then updates each player's locomotion from its input. Nothing
//! reads wall-clock time, so the same inputs always give the same result.

use clamber_locomotion::movement::{CapabilityId, LocomotionContext, PlatformRegistry, ToggleLists};
use clamber_locomotion::{LocomotionController, MovementConfig, MovementState, SnapshotError};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::input::PlayerInput;
use crate::level::{Level, SpawnPoint};
use crate::player::{EntityId, Player};

/// Game simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Simulation tick rate (ticks per second).
    pub tick_rate: u32,

    /// Locomotion configuration shared by every player.
    pub movement: MovementConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let mut movement = MovementConfig::default();
        movement.capabilities.in_water = ToggleLists {
            enable: vec![CapabilityId::SWIM],
            disable: Vec::new(),
        };
        Self {
            tick_rate: 50,
            movement,
        }
    }
}

impl SimulationConfig {
    /// Get the time step per tick in seconds.
    pub fn delta_time(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    /// Get the time step per tick in whole milliseconds.
    pub fn delta_ms(&self) -> u32 {
        1000 / self.tick_rate.max(1)
    }
}

/// Saved simulation state that [`Simulation::restore`] can rewind to.
///
/// Host capability flags and signal histories are not part of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    pub frame: u64,
    pub players: Vec<(EntityId, Vec<u8>)>,
    pub platforms: PlatformRegistry,
}

/// The main game simulation.
#[derive(Debug)]
pub struct Simulation {
    /// Current frame/tick number.
    pub frame: u64,

    /// Simulation configuration.
    pub config: SimulationConfig,

    /// Current level.
    pub level: Level,

    /// All players in the game.
    pub players: Vec<Player>,

    controller: LocomotionController,

    /// Connectors between moving platforms and their riders.
    platforms: PlatformRegistry,

    /// Next entity ID to assign.
    next_entity_id: EntityId,
}

impl Simulation {
    /// Create a new simulation with the given configuration and level.
    pub fn new(config: SimulationConfig, mut level: Level) -> Self {
        let controller = LocomotionController::new(config.movement.clone());
        level.advance(0);

        Self {
            frame: 0,
            config,
            level,
            players: Vec::new(),
            controller,
            platforms: PlatformRegistry::new(),
            next_entity_id: 1,
        }
    }

    /// Create a simulation with default configuration and the test course.
    pub fn test() -> Self {
        Self::new(SimulationConfig::default(), Level::test_course())
    }

    pub fn controller(&self) -> &LocomotionController {
        &self.controller
    }

    pub fn platforms(&self) -> &PlatformRegistry {
        &self.platforms
    }

    /// Add a player at the next spawn point.
    ///
    /// Returns the player's ID.
    pub fn add_player(&mut self, name: &str) -> EntityId {
        let spawn_index = self.players.len() % self.level.player_spawn_count().max(1);
        let spawn = self
            .level
            .get_player_spawn(spawn_index)
            .copied()
            .unwrap_or(SpawnPoint {
                position: Vec3::ZERO,
                facing: 0.0,
            });
        self.spawn_player(name, spawn)
    }

    /// Add a player at an arbitrary position, facing +Z.
    pub fn add_player_at(&mut self, name: &str, position: Vec3) -> EntityId {
        self.spawn_player(name, SpawnPoint { position, facing: 0.0 })
    }

    /// Remove a player from the simulation.
    pub fn remove_player(&mut self, player_id: EntityId) {
        let platforms = &mut self.platforms;
        self.players.retain_mut(|p| {
            if p.id != player_id {
                return true;
            }
            platforms.leave(&mut p.movement.platform);
            false
        });
    }

    /// Get a player by ID.
    pub fn get_player(&self, player_id: EntityId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    /// Get a mutable reference to a player by ID.
    pub fn get_player_mut(&mut self, player_id: EntityId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == player_id)
    }

    /// Advance the simulation by one tick.
    ///
    /// # Arguments
    ///
    /// * `inputs` - Player inputs indexed by player position in the `players` array
    pub fn tick(&mut self, inputs: &[PlayerInput]) {
        let delta_ms = self.config.delta_ms();
        self.level.advance(self.frame * u64::from(delta_ms));

        for (i, player) in self.players.iter_mut().enumerate() {
            let input = inputs.get(i).copied().unwrap_or_default();
            let command = input.to_command();

            player.signals.begin_tick(self.frame);
            let mut ctx = LocomotionContext::new(
                &self.level.terrain,
                &mut self.platforms,
                &mut player.capabilities,
                &mut player.signals,
            );
            let report = self
                .controller
                .update(&mut player.movement, &command, &mut ctx, delta_ms);
            player.record(report);
        }

        self.frame += 1;
    }

    /// Get the delta time for this simulation.
    pub fn delta_time(&self) -> f32 {
        self.config.delta_time()
    }

    /// Save the frame counter, every player's locomotion state and the
    /// platform connectors.
    pub fn snapshot(&self) -> Result<SimulationSnapshot, SnapshotError> {
        let players = self
            .players
            .iter()
            .map(|p| Ok((p.id, p.movement.to_snapshot()?)))
            .collect::<Result<Vec<_>, SnapshotError>>()?;
        Ok(SimulationSnapshot {
            frame: self.frame,
            players,
            platforms: self.platforms.clone(),
        })
    }

    /// Rewind to `snapshot`. Players missing from it keep their state.
    pub fn restore(&mut self, snapshot: &SimulationSnapshot) -> Result<(), SnapshotError> {
        for (id, bytes) in &snapshot.players {
            let movement = MovementState::from_snapshot(bytes)?;
            if let Some(player) = self.get_player_mut(*id) {
                player.movement = movement;
            }
        }
        self.frame = snapshot.frame;
        self.platforms = snapshot.platforms.clone();
        self.level.advance(self.frame * u64::from(self.config.delta_ms()));
        log::debug!("rewound to frame {}", self.frame);
        Ok(())
    }

    fn spawn_player(&mut self, name: &str, spawn: SpawnPoint) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id += 1;

        let mut player = Player::new(id, name.to_string(), &self.controller, &spawn);
        self.controller
            .spawn_at(&mut player.movement, spawn.position, &self.level.terrain);
        log::info!("player {id} ({name}) joined at {:?}", player.position());

        self.players.push(player);
        id
    }
}

// ============================================================================
// Tests
// ============================================================================
