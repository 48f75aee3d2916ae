//! Clamber - Headless Runner
//!
//! Drops a player into the test course and plays a short scripted route:
//! walk to the ladder, climb it, idle, then jump around. Pass a JSON
//! movement config, or one of the presets `side-scroller` and
//! `first-person`, as the first argument to try other tuning.

use std::error::Error;

use clamber_game::{Level, PlayerInput, Simulation, SimulationConfig};
use clamber_locomotion::{ConfigError, MovementConfig};
use glam::Vec3;

/// A stretch of the route: one input held for a number of ticks.
struct Segment {
    label: &'static str,
    input: PlayerInput,
    ticks: u32,
}

fn route() -> Vec<Segment> {
    let mut jump_forward = PlayerInput::forward().with_jump();
    jump_forward.actions.run = true;

    vec![
        Segment {
            label: "settle",
            input: PlayerInput::default(),
            ticks: 10,
        },
        Segment {
            label: "walk to ladder",
            input: PlayerInput::forward(),
            ticks: 150,
        },
        Segment {
            label: "climb",
            input: PlayerInput::forward(),
            ticks: 150,
        },
        Segment {
            label: "idle",
            input: PlayerInput::default(),
            ticks: 50,
        },
        Segment {
            label: "jump",
            input: jump_forward,
            ticks: 100,
        },
    ]
}

/// Resolve a preset name or a path to a JSON config.
fn movement_config(arg: &str) -> Result<MovementConfig, ConfigError> {
    match arg {
        "side-scroller" => Ok(MovementConfig::side_scroller(0.0)),
        "first-person" => Ok(MovementConfig::first_person()),
        path => MovementConfig::from_json_file(path),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let mut config = SimulationConfig::default();
    if let Some(arg) = std::env::args().nth(1) {
        config.movement = movement_config(&arg)?;
        log::info!("movement config: {arg}");
    }

    let mut sim = Simulation::new(config, Level::test_course());
    let id = sim.add_player("Runner");
    log::info!("{} ticks per second", sim.config.tick_rate);

    for segment in route() {
        let start = sim.get_player(id).map_or(Vec3::ZERO, |p| p.position());
        for _ in 0..segment.ticks {
            sim.tick(&[segment.input]);
        }

        let Some(player) = sim.get_player(id) else {
            break;
        };
        log::info!(
            "{:<16} frame {:>4}  pos {:>6.2?}  moved {:>5.2}  mode {:?}",
            segment.label,
            sim.frame,
            player.position().to_array(),
            (player.position() - start).length(),
            player.mode(),
        );
    }

    if let Some(player) = sim.get_player(id) {
        log::info!("stats: {:?}", player.stats);
        log::info!("effects: {}", player.signals.history().len());
    }
    Ok(())
}
