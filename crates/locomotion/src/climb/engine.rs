//! The climb engine.
//!
//! Runs once per frame for one body. While unattached it looks for a wall
//! to grab or a ledge to turn back at; while attached it moves the body
//! over the wall, keeps it facing the surface, and hands over to the
//! pull-up or the let-go when the surface runs out.

use glam::{Quat, Vec3};

use crate::movement::{
    slide_move, AnimationSink, Effect, LocomotionCommand, LocomotionMode, MovementConfig, MovementFlags,
    MovementState, PushOff, AXIS_DEADZONE,
};
use crate::terrain::{QueryFilter, TerrainQuery};

use super::context::{ClimbContext, ClimbPhase, SnapState};
use super::detect::{probe_edges, scan_wall};
use super::probe_fan::ProbeFan;
use super::pull_up::{find_ledge, PullUpState};
use super::rotation::{apply_rotation, look_rotation, select_wall_normal, upright, RotationProgress};
use super::stuck::StuckInput;
use super::turn_back::{find_grab_back, ground_missing_ahead};

/// Ticks without a wall before letting go.
const LOST_WALL_TICKS: u32 = 5;

/// Rate at which the climb direction dies out without input.
const DIRECTION_DECAY: f32 = 15.0;

/// Rate at which the push-off vector is spent.
const PUSH_OFF_RATE: f32 = 8.0;

/// What the climb engine reads from this frame's input.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClimbInput {
    pub horizontal: f32,
    pub vertical: f32,
    /// Stick direction in world space.
    pub direction: Vec3,
    /// Jump went down this frame.
    pub jump_pressed: bool,
}

impl ClimbInput {
    pub fn from_command(command: &LocomotionCommand, jump_pressed: bool) -> Self {
        Self {
            horizontal: deadzone(command.horizontal),
            vertical: deadzone(command.vertical),
            direction: command.world_direction(),
            jump_pressed,
        }
    }
}

/// What the climb engine did this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClimbOutcome {
    /// Not attached and nothing to grab.
    Idle,
    Attached,
    Climbing,
    TurningBack,
    TurnedBack,
    PullingUp,
    PulledUp,
    JumpedOff,
    LetGo,
}

/// One frame of climbing for one body.
pub struct ClimbEngine<'a, T: TerrainQuery + ?Sized> {
    terrain: &'a T,
    config: &'a MovementConfig,
    filter: QueryFilter,
    dt: f32,
    delta_ms: u32,
}

impl<'a, T: TerrainQuery + ?Sized> ClimbEngine<'a, T> {
    pub fn new(terrain: &'a T, config: &'a MovementConfig, filter: QueryFilter, delta_ms: u32) -> Self {
        Self {
            terrain,
            config,
            filter,
            dt: delta_ms as f32 / 1000.0,
            delta_ms,
        }
    }

    /// Advance whatever climb phase the body is in.
    pub fn update(&self, state: &mut MovementState, input: &ClimbInput, sink: &mut dyn AnimationSink) -> ClimbOutcome {
        self.tick_push_off(state);

        match state.climb.as_ref().map(|c| c.phase) {
            None => {
                if self.try_turn_back(state, input) {
                    ClimbOutcome::TurningBack
                } else if self.try_attach(state, input) {
                    ClimbOutcome::Attached
                } else {
                    ClimbOutcome::Idle
                }
            }
            Some(ClimbPhase::Climbing) if input.jump_pressed => {
                self.jump_off(state, sink);
                ClimbOutcome::JumpedOff
            }
            Some(ClimbPhase::Climbing) => self.climb(state, input, sink),
            Some(ClimbPhase::TurningBack) => self.turn_back(state),
            Some(ClimbPhase::PullingUp) => self.pull_up(state),
        }
    }

    /// Drop off the wall, pushed away from it.
    pub fn let_go(&self, state: &mut MovementState, sink: &mut dyn AnimationSink) {
        let push = -state.forward() * self.config.climbing.distance_to_push_off_after_letting_go;
        state.climb = None;
        state.push_off = PushOff::start(push);
        state.move_direction = Vec3::ZERO;
        state.velocity = Vec3::ZERO;
        state.jump.restart_combo(self.config.total_jumps());
        state.speed.move_speed = 0.0;
        state.speed.applied_speed = 0.0;
        state.flags.set(MovementFlags::MID_AIR_FROM_JUMP, false);
        state.rotation = upright(state.rotation);
        state.set_mode(LocomotionMode::Airborne);
        sink.trigger(Effect::LetGo);
        log::debug!("climb: let go at {:?}", state.position);
    }

    /// Undo a sudden drop while climbing.
    pub fn avoid_fall(&self, state: &mut MovementState) {
        let threshold = 0.2 * (self.config.climbing.climb_movement_speed / 4.0);
        let Some(context) = state.climb.as_mut() else {
            return;
        };
        if context.phase != ClimbPhase::Climbing {
            context.last_height = None;
            return;
        }
        if let Some(last) = context.last_height {
            if last - state.position.y >= threshold {
                log::debug!("climb: fall of {:.2} undone", last - state.position.y);
                state.position.y = last;
            }
        }
        context.last_height = Some(state.position.y);
    }

    // ========================================================================
    // Unattached
    // ========================================================================

    fn tick_push_off(&self, state: &mut MovementState) {
        if !state.push_off.active {
            return;
        }
        let step = state.push_off.vector * (PUSH_OFF_RATE * self.dt).min(1.0);
        state.push_off.vector -= step;
        let result = slide_move(self.terrain, &state.collider, &mut state.position, step, &self.filter);
        if result.blocked() {
            state.no_collision_ticks = 0;
        }

        state.push_off.elapsed_ms = state.push_off.elapsed_ms.saturating_add(self.delta_ms);
        if state.push_off.elapsed_ms >= PushOff::DURATION_MS {
            state.push_off = PushOff::default();
        }
    }

    fn try_attach(&self, state: &mut MovementState, input: &ClimbInput) -> bool {
        let config = &self.config.climbing;
        if state.push_off.active || input.direction == Vec3::ZERO {
            return false;
        }

        let fan = self.fan(state.position, state.rotation);
        let Some(scan) = scan_wall(&fan, self.terrain, &config.climbable_tag, state.position) else {
            return false;
        };
        if input.direction.dot(-scan.hit.normal) <= 0.0 {
            return false;
        }
        let edges = probe_edges(&fan, config, &config.climbable_tag);
        if edges.top || (config.stop_at_sides && edges.left && edges.right) {
            return false;
        }

        let snap = if config.snap_to_center_of_object {
            SnapState::from_ground()
        } else {
            SnapState::default()
        };
        log::debug!("climb: attached to {:?} at {:?}", scan.hit.body, scan.hit.point);
        let context = ClimbContext::attach(&scan, &config.climbable_tag, edges, snap);
        state.set_mode(context.phase.mode());
        state.climb = Some(context);
        self.stop(state);
        true
    }

    fn try_turn_back(&self, state: &mut MovementState, input: &ClimbInput) -> bool {
        let config = &self.config.climbing;
        if !config.walking_off_ledge.allow_grabbing_on_after_walking_off_ledge
            || !state.is_grounded()
            || input.vertical <= 0.0
            || state.push_off.active
        {
            return false;
        }

        let radius = state.collider.radius();
        if !ground_missing_ahead(self.terrain, &self.filter, config, state.position, state.rotation, radius) {
            return false;
        }
        let Some(turn) = find_grab_back(self.terrain, &self.filter, config, state.position, state.rotation, radius) else {
            return false;
        };

        let context = ClimbContext::turning_back(turn, &config.climbable_tag);
        state.set_mode(context.phase.mode());
        state.climb = Some(context);
        self.stop(state);
        true
    }

    // ========================================================================
    // Attached
    // ========================================================================

    fn jump_off(&self, state: &mut MovementState, sink: &mut dyn AnimationSink) {
        self.let_go(state, sink);
        let jumping = &self.config.jumping;
        state.jump.restart_combo(self.config.total_jumps());
        let stage = state.jump.jump(jumping, &mut state.flags, false, &mut state.move_direction);
        state.flags.set(
            MovementFlags::DOUBLE_JUMP_READY,
            jumping.double_jump_performable_out_of_wall_jump,
        );
        sink.trigger(Effect::Jump);
        log::debug!("climb: jumped off the wall, stage {stage}");
    }

    fn climb(&self, state: &mut MovementState, input: &ClimbInput, sink: &mut dyn AnimationSink) -> ClimbOutcome {
        let Some(mut context) = state.climb.take() else {
            return ClimbOutcome::Idle;
        };
        let config = &self.config.climbing;
        let grounded = state.is_grounded();
        let (h, v) = (input.horizontal, input.vertical);

        // Floor
        if v >= 0.0 || !grounded {
            context.down_enabled = true;
        }
        if v > 0.0 || !grounded {
            context.climbed_up = true;
        }
        if grounded && v < 0.0 && context.down_enabled {
            if config.drop_off_at_floor {
                self.let_go(state, sink);
                return ClimbOutcome::LetGo;
            }
            context.down_enabled = false;
            context.edges.bottom = true;
        }
        if !grounded && v < 0.0 && context.edges.bottom && config.drop_off_at_bottom {
            self.let_go(state, sink);
            return ClimbOutcome::LetGo;
        }

        // Face the wall
        let fan = self.fan(state.position, state.rotation);
        match select_wall_normal(&fan, &context.tag, h) {
            Some((hit, source)) => {
                context.rotation.target = look_rotation(-hit.normal);
                context.rotation.source = source;
                context.wall_normal = hit.normal;
            }
            None => {
                let wall = scan_wall(&fan, self.terrain, &context.tag, state.position);
                if state.no_collision_ticks >= LOST_WALL_TICKS && !wall.is_some_and(|w| w.wall_in_front) {
                    self.let_go(state, sink);
                    return ClimbOutcome::LetGo;
                }
            }
        }
        state.rotation = apply_rotation(
            state.rotation,
            &mut context.rotation,
            config.rotation_to_climbable_object_speed,
            config.climb_rotation_speed,
            config.stay_upright,
            self.dt,
        );

        // Climb direction
        let speed = context.burst.update(config, self.dt);
        let edges = context.edges;
        let h_ok = config.climb_horizontally
            && !(config.stop_at_sides && ((h > 0.0 && edges.right) || (h < 0.0 && edges.left)));
        let v_ok = config.climb_vertically
            && !((v > 0.0 && edges.top) || (v < 0.0 && (edges.bottom || !context.down_enabled)));
        let right = state.rotation * Vec3::X;
        let up = state.rotation * Vec3::Y;

        if h == 0.0 && v == 0.0 {
            context.direction = context.direction.lerp(Vec3::ZERO, (DIRECTION_DECAY * self.dt).min(1.0));
        } else {
            let lateral = if h_ok { right * h } else { Vec3::ZERO };
            let vertical = if v_ok { up * v } else { Vec3::ZERO };
            context.direction = (lateral + vertical) * speed;
        }

        if edges.top && v > 0.0 && config.pull_up_at_top {
            if let Some(ledge) = find_ledge(self.terrain, &self.filter, config, state.position, state.rotation) {
                log::debug!("climb: pulling up onto {ledge:?}");
                context.phase = ClimbPhase::PullingUp;
                context.pull_up = Some(PullUpState::new(ledge));
                context.direction = Vec3::ZERO;
                state.set_mode(context.phase.mode());
                state.climb = Some(context);
                sink.trigger(Effect::PullUp);
                return ClimbOutcome::PullingUp;
            }
        }

        // Move
        let before = state.position;
        let moved = slide_move(
            self.terrain,
            &state.collider,
            &mut state.position,
            context.direction * self.dt,
            &self.filter,
        );
        let snapped = slide_move(
            self.terrain,
            &state.collider,
            &mut state.position,
            context.snap.step(context.center_offset, self.dt, self.delta_ms),
            &self.filter,
        );
        if moved.blocked() || snapped.blocked() {
            state.no_collision_ticks = 0;
        }
        if (state.position - before).length_squared() > 1e-10 {
            context.has_moved = true;
        }
        if self.dt > 0.0 {
            state.velocity = (state.position - before) / self.dt;
        }

        if config.push_against_wall_if_player_is_stuck {
            let stuck = StuckInput {
                climbing: true,
                pulling_up: false,
                moving: speed > 0.0,
                horizontal: h,
                vertical: v,
                lateral_allowed: config.climb_horizontally,
                has_moved: context.has_moved,
                climbed_up: context.climbed_up,
                no_collision_ticks: state.no_collision_ticks,
            };
            context.stuck.update(self.terrain, &self.filter, &mut state.position, state.rotation, &stuck);
        }

        self.refresh(&mut context, state.position, state.rotation);
        state.climb = Some(context);
        ClimbOutcome::Climbing
    }

    fn turn_back(&self, state: &mut MovementState) -> ClimbOutcome {
        let Some(mut context) = state.climb.take() else {
            return ClimbOutcome::Idle;
        };
        let Some(mut turn) = context.turn_back.take() else {
            context.phase = ClimbPhase::Climbing;
            state.set_mode(context.phase.mode());
            state.climb = Some(context);
            return ClimbOutcome::Climbing;
        };

        if !turn.step(&mut state.position, &mut state.rotation, self.dt, self.delta_ms) {
            context.turn_back = Some(turn);
            state.climb = Some(context);
            return ClimbOutcome::TurningBack;
        }

        context.phase = ClimbPhase::Climbing;
        context.rotation = RotationProgress {
            target: turn.target_rotation,
            finished: true,
            ..RotationProgress::facing(turn.normal)
        };
        if self.config.climbing.snap_to_center_of_object {
            context.snap = SnapState::from_turn_back();
        }
        self.refresh(&mut context, state.position, state.rotation);
        state.set_mode(context.phase.mode());
        state.climb = Some(context);
        log::debug!("climb: turned back onto the wall at {:?}", state.position);
        ClimbOutcome::TurnedBack
    }

    fn pull_up(&self, state: &mut MovementState) -> ClimbOutcome {
        let Some(mut context) = state.climb.take() else {
            return ClimbOutcome::Idle;
        };
        let Some(mut pull_up) = context.pull_up.take() else {
            state.set_mode(LocomotionMode::Airborne);
            return ClimbOutcome::PulledUp;
        };
        let config = &self.config.climbing;

        let done = pull_up.step(config, &mut state.position, &mut state.rotation, self.dt, self.delta_ms);
        if config.push_against_wall_if_player_is_stuck && !done {
            let stuck = StuckInput {
                climbing: true,
                pulling_up: true,
                moving: true,
                vertical: 1.0,
                has_moved: true,
                climbed_up: true,
                no_collision_ticks: state.no_collision_ticks,
                ..StuckInput::default()
            };
            context.stuck.update(self.terrain, &self.filter, &mut state.position, state.rotation, &stuck);
        }

        if done {
            self.stop(state);
            state.set_mode(LocomotionMode::Airborne);
            log::debug!("climb: pulled up to {:?}", state.position);
            return ClimbOutcome::PulledUp;
        }
        context.pull_up = Some(pull_up);
        state.climb = Some(context);
        ClimbOutcome::PullingUp
    }

    // ========================================================================
    // Private helpers
    // ========================================================================

    fn fan(&self, position: Vec3, rotation: Quat) -> ProbeFan<'a, T> {
        ProbeFan::new(self.terrain, &self.config.climbing, self.filter, position, rotation)
    }

    /// Re-read the wall around the new pose.
    fn refresh(&self, context: &mut ClimbContext, position: Vec3, rotation: Quat) {
        let fan = self.fan(position, rotation);
        if let Some(scan) = scan_wall(&fan, self.terrain, &context.tag, position) {
            context.body = Some(scan.hit.body);
            context.center_offset = scan.center_offset;
        }
        context.edges = probe_edges(&fan, &self.config.climbing, &context.tag);
        if !context.down_enabled {
            context.edges.bottom = true;
        }
    }

    fn stop(&self, state: &mut MovementState) {
        state.velocity = Vec3::ZERO;
        state.move_direction = Vec3::ZERO;
        state.speed.move_speed = 0.0;
        state.speed.applied_speed = 0.0;
    }
}

fn deadzone(value: f32) -> f32 {
    if value.abs() > AXIS_DEADZONE {
        value
    } else {
        0.0
    }
}

// ============================================================================
// Tests
// ============================================================================
