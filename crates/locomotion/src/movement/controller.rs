//! Locomotion controller.
//!
//! This is the main entry point for character movement. Each update runs
//! the per-frame concerns (crouch toggling, climbing, jumps, water) and then
//! one fixed tick of movement against the terrain.

use std::f32::consts::{FRAC_PI_2, PI};

use glam::{Quat, Vec3};

use crate::climb::{upright, ClimbEngine, ClimbInput, ClimbOutcome};
use crate::terrain::{BodyId, QueryFilter, TerrainQuery};

use super::attack::{AttackEvent, AttackInput, AttackState};
use super::capability::CapabilityRegistry;
use super::config::{MovementConfig, SideScrollConfig};
use super::crouch::{has_headroom, update_crouch, CrouchInput};
use super::ground::{flat, GroundProbe, PROBE_LIFT};
use super::input::{ButtonEdges, InputButtons, LocomotionCommand, AXIS_DEADZONE};
use super::jump::{slope_allows_jump, JumpInput, DOUBLE_JUMP_GROUND_CLEARANCE};
use super::platform::{PlatformRegistry, RideEvent};
use super::signals::{AnimationSink, Effect, Signal};
use super::slide_move::slide_move;
use super::state::{Contact, LocomotionMode, MovementFlags, MovementState, PushOff, SlideState, SpeedState};

/// Ticks without a collision after which the body counts as having lost contact.
const LOST_CONTACT_TICKS: u32 = 5;

/// Rate at which speed blends and move speed approach their targets.
const SPEED_BLEND_RATE: f32 = 8.0;

/// Growth of the deceleration rate per second without input.
const DECELERATION_GROWTH: f32 = 5.0;

/// Friction smoothing is `FRICTION_RATE / friction` per second.
const FRICTION_RATE: f32 = 24.0;

/// Rate at which the slide direction turns toward the downhill vector.
const SLIDE_TURN_RATE: f32 = 6.0;

/// Extra downward push on the first ticks of a slide.
const SLIDE_DOWN_PUSH: f32 = 8.0;

/// Contacts this far above the feet are walls.
const WALL_CONTACT_HEIGHT: f32 = 0.5;

/// Side-scroll facing is nudged off ±90° so reversing turns a fixed way round.
const INWARD_BIAS: f32 = 0.001 * PI / 180.0;

/// Everything the controller borrows from the host for one update.
pub struct LocomotionContext<'a, T: TerrainQuery + ?Sized> {
    pub terrain: &'a T,
    pub platforms: &'a mut PlatformRegistry,
    pub capabilities: &'a mut CapabilityRegistry,
    pub sink: &'a mut dyn AnimationSink,
    /// The body's own collider, when it is part of the terrain.
    pub body: Option<BodyId>,
}

impl<'a, T: TerrainQuery + ?Sized> LocomotionContext<'a, T> {
    pub fn new(
        terrain: &'a T,
        platforms: &'a mut PlatformRegistry,
        capabilities: &'a mut CapabilityRegistry,
        sink: &'a mut dyn AnimationSink,
    ) -> Self {
        Self {
            terrain,
            platforms,
            capabilities,
            sink,
            body: None,
        }
    }

    pub fn with_body(mut self, body: BodyId) -> Self {
        self.body = Some(body);
        self
    }

    fn ground_filter(&self) -> QueryFilter {
        QueryFilter::ground(self.body)
    }
}

/// What happened during one update.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepReport {
    /// Stage of a jump started this update, including jumps off a wall.
    pub jumped: Option<usize>,
    pub double_jumped: bool,
    /// Came down from a jump.
    pub landed: bool,
    pub climb: Option<ClimbOutcome>,
    pub attack: Option<AttackEvent>,
    pub ride: Option<RideEvent>,
}

impl StepReport {
    fn absorb(&mut self, other: StepReport) {
        self.jumped = self.jumped.or(other.jumped);
        self.double_jumped |= other.double_jumped;
        self.landed |= other.landed;
        self.climb = self.climb.or(other.climb);
        self.attack = self.attack.or(other.attack);
        self.ride = self.ride.or(other.ride);
    }
}

/// Stick input for one tick.
#[derive(Debug, Clone, Copy, Default)]
struct Steering {
    horizontal: f32,
    vertical: f32,
    /// Squared stick length, capped at 1. Zero without input.
    strength: f32,
    /// Camera-relative world direction.
    direction: Vec3,
}

impl Steering {
    fn from_command(command: &LocomotionCommand) -> Self {
        if !command.has_movement_input() {
            return Self::default();
        }
        let magnitude = command.magnitude();
        Self {
            horizontal: deadzone(command.horizontal),
            vertical: deadzone(command.vertical),
            strength: magnitude * magnitude,
            direction: command.world_direction(),
        }
    }

    fn active(&self) -> bool {
        self.strength > 0.0
    }
}

/// Character locomotion controller.
///
/// Handles all character movement including:
/// - Ground movement with acceleration, friction and slope sliding
/// - Multi-stage jumps, double jumps and landings
/// - Crouching and attack combos
/// - Wall and ladder climbing
/// - Riding moving platforms
/// - Side-scrolling axis locks and first-person facing
///
/// # Example
///
/// ```ignore
/// let controller = LocomotionController::new(MovementConfig::default());
/// let mut state = controller.new_state(spawn_position);
/// controller.spawn_at(&mut state, spawn_position, &terrain);
///
/// // Each tick:
/// let mut ctx = LocomotionContext::new(&terrain, &mut platforms, &mut capabilities, &mut sink);
/// let report = controller.update(&mut state, &command, &mut ctx, 20);
/// ```
#[derive(Debug, Clone)]
pub struct LocomotionController {
    /// Movement configuration.
    pub config: MovementConfig,
}

impl LocomotionController {
    pub fn new(config: MovementConfig) -> Self {
        Self { config }
    }

    pub fn with_default_config() -> Self {
        Self::new(MovementConfig::default())
    }

    /// A fresh body at `position` configured for this controller.
    pub fn new_state(&self, position: Vec3) -> MovementState {
        let mut state = MovementState::new(
            position,
            self.config.collider,
            self.config.total_jumps(),
            AttackState::new(&self.config.attacking),
        );
        let first_person = &self.config.first_person;
        state.flags.set(
            MovementFlags::FIRST_PERSON,
            first_person.always_use_first_person
                || (first_person.switch_to_first_person_if_input_button_pressed
                    && first_person.start_off_in_first_person_mode_for_switching),
        );
        state
    }

    /// Place a body on the ground below `position`.
    ///
    /// Sweeps the collider down from just above the spawn point. Without
    /// ground in reach the body stays where it was put.
    pub fn spawn_at<T: TerrainQuery + ?Sized>(&self, state: &mut MovementState, position: Vec3, terrain: &T) {
        let start = position + Vec3::Y;
        let end = position - Vec3::Y * 2.0;
        let sweep = terrain.sweep(&state.collider, start, end, &QueryFilter::ground(None));

        match sweep.hit.as_ref().filter(|_| sweep.blocked()) {
            Some(hit) => {
                state.position = sweep.end_position;
                state.ground.grounded = true;
                state.ground.ground_normal = hit.normal;
                state.ground.slope_angle = hit.slope_angle();
                state.set_mode(LocomotionMode::Grounded);
            }
            None => state.position = position,
        }
        log::debug!("spawned at {:?}", state.position);
    }

    /// Run one frame and one fixed tick.
    pub fn update<T: TerrainQuery + ?Sized>(
        &self,
        state: &mut MovementState,
        command: &LocomotionCommand,
        ctx: &mut LocomotionContext<'_, T>,
        delta_ms: u32,
    ) -> StepReport {
        let mut report = self.frame(state, command, ctx, delta_ms);
        report.absorb(self.fixed_tick(state, command, ctx, delta_ms));
        report
    }

    /// Stop the body and reset every transient state.
    pub fn disable<T: TerrainQuery + ?Sized>(&self, state: &mut MovementState, ctx: &mut LocomotionContext<'_, T>) {
        ctx.platforms.leave(&mut state.platform);
        state
            .toggles
            .update(ctx.capabilities, &self.config.capabilities, false, false);

        state.jump.reset(self.config.total_jumps());
        state.attack.reset(&self.config.attacking);
        state.climb = None;
        state.push_off = PushOff::default();
        state.slide = SlideState::default();
        state.speed = SpeedState::default();
        state.move_direction = Vec3::ZERO;
        state.velocity = Vec3::ZERO;
        state.no_collision_ticks = 0;
        state.last_contact = None;
        state.collider = self.config.collider;
        state.rotation = upright(state.rotation);
        state.set_mode(LocomotionMode::Airborne);

        let first_person = state.flags.has(MovementFlags::FIRST_PERSON);
        state.flags = MovementFlags(MovementFlags::DISABLED | MovementFlags::DOUBLE_JUMP_READY);
        state.flags.set(MovementFlags::FIRST_PERSON, first_person);
        state.prev_buttons = InputButtons::default();
        log::debug!("locomotion disabled at {:?}", state.position);
    }

    pub fn enable(&self, state: &mut MovementState) {
        if state.flags.disabled() {
            state.flags.set(MovementFlags::DISABLED, false);
            state.flags.set(MovementFlags::JUMP_POSSIBLE, true);
            state.flags.set(MovementFlags::CAN_CROUCH_TO_ACTION, true);
            log::debug!("locomotion enabled at {:?}", state.position);
        }
    }

    // ========================================================================
    // Frame
    // ========================================================================

    /// Per-frame concerns: crouch, climbing, jumps and water.
    pub fn frame<T: TerrainQuery + ?Sized>(
        &self,
        state: &mut MovementState,
        command: &LocomotionCommand,
        ctx: &mut LocomotionContext<'_, T>,
        delta_ms: u32,
    ) -> StepReport {
        let mut report = StepReport::default();
        if state.flags.disabled() {
            return report;
        }

        let edges = ButtonEdges::between(command.buttons, state.prev_buttons);
        let filter = ctx.ground_filter();
        let jump_pressed = edges.pressed(InputButtons::JUMP);

        let headroom = has_headroom(ctx.terrain, &self.config, state.position, &filter);
        let crouch = CrouchInput {
            pressed: edges.pressed(InputButtons::CROUCH),
            grounded: state.is_grounded(),
            on_wall: state.is_on_wall(),
            headroom,
        };
        if update_crouch(&self.config, &mut state.flags, &crouch) {
            log::debug!("crouching: {}", state.is_crouching());
        }

        if !state.in_water() {
            let was_on_wall = state.toggles.on_wall();

            let engine = ClimbEngine::new(ctx.terrain, &self.config, filter, delta_ms);
            let outcome = engine.update(state, &ClimbInput::from_command(command, jump_pressed), &mut *ctx.sink);
            let jumped_off = outcome == ClimbOutcome::JumpedOff;
            if jumped_off {
                report.jumped = Some(state.current_jump());
            }
            report.climb = Some(outcome);

            let probe = GroundProbe::new(ctx.terrain, &self.config, filter, state.position, state.rotation);
            let input = JumpInput {
                pressed: jump_pressed && !jumped_off,
                grounded: state.is_grounded(),
                sliding: state.slide.sliding,
                on_wall: state.is_on_wall(),
                on_wall_last_update: was_on_wall,
                ground_close_below: probe.ground_below(DOUBLE_JUMP_GROUND_CLEARANCE).is_some(),
                head_hit: state.flags.has(MovementFlags::HEAD_HIT),
                delta_ms,
            };
            let result = state
                .jump
                .update(&self.config, &input, &mut state.flags, &mut state.move_direction);

            if let Some(stage) = result.jumped {
                state.set_mode(LocomotionMode::Airborne);
                ctx.sink.trigger(Effect::Jump);
                report.jumped = Some(stage);
            }
            if result.double_jumped {
                report.double_jumped = true;
                if self.config.jumping.double_jump_effect {
                    ctx.sink.trigger(Effect::DoubleJump);
                }
            }
            if result.landed {
                report.landed = true;
                if self.config.jumping.landing_effect {
                    ctx.sink.trigger(Effect::Landing);
                }
            }
        }

        let in_water = ctx
            .terrain
            .overlaps(&state.collider, state.position, &QueryFilter::liquid(ctx.body));
        if in_water != state.in_water() {
            log::debug!("in water: {in_water}");
        }
        state.flags.set(MovementFlags::IN_WATER, in_water);
        let on_wall = state.is_on_wall();
        state
            .toggles
            .update(ctx.capabilities, &self.config.capabilities, on_wall, in_water);

        report
    }

    // ========================================================================
    // Fixed tick
    // ========================================================================

    /// One fixed step of movement.
    ///
    /// While in water only the axis lock and first-person switching run;
    /// the host's swimming takes over the rest.
    pub fn fixed_tick<T: TerrainQuery + ?Sized>(
        &self,
        state: &mut MovementState,
        command: &LocomotionCommand,
        ctx: &mut LocomotionContext<'_, T>,
        delta_ms: u32,
    ) -> StepReport {
        let mut report = StepReport::default();
        if state.flags.disabled() {
            return report;
        }

        let dt = delta_ms as f32 / 1000.0;
        let filter = ctx.ground_filter();
        let edges = ButtonEdges::between(command.buttons, state.prev_buttons);
        let steering = Steering::from_command(command);
        let in_water = state.in_water();
        let on_wall = state.is_on_wall();
        let platforms_enabled = self.config.moving_platforms.allow_moving_platform_support;

        if !in_water {
            self.resize_collider(state);
        }
        state.no_collision_ticks = state.no_collision_ticks.saturating_add(1);

        if !in_water {
            if platforms_enabled {
                self.carry_on_platform(state, ctx);
            }

            report.attack = self.attack(state, command, edges, delta_ms);
            if report.attack.is_some() {
                ctx.sink.trigger(Effect::Attack);
            }

            if !on_wall {
                self.rotation_direction(state, command, &steering);
                self.rotate(state, &steering, dt);
                self.speed(state, command, &steering, dt);
            }

            // Ground
            let probe = GroundProbe::new(ctx.terrain, &self.config, filter, state.position, state.rotation);
            probe.determine_grounded(&mut state.ground);
            probe.slope_angles(
                &mut state.ground,
                state.last_contact.as_ref(),
                state.flags.has(MovementFlags::MID_AIR_FROM_JUMP),
            );

            if !on_wall {
                let ground_close = probe.ground_below(self.config.grounded.max_grounded_distance).is_some();
                self.movement_direction(state, &steering, ground_close);
            }
        }

        self.lock_axis(state);

        if !in_water {
            if !on_wall {
                self.slope_slide(state, dt);
                self.resolve_mode(state);
                self.prevent_bouncing(state, dt);
                self.gravity(state, dt);
            }

            let platform_contact = if on_wall {
                None
            } else {
                self.move_body(state, ctx, dt)
            };
            if platforms_enabled {
                report.ride = self.ride_platform(state, ctx, platform_contact);
            }

            ClimbEngine::new(ctx.terrain, &self.config, filter, delta_ms).avoid_fall(state);

            let crouch_attack = state
                .attack
                .crouch_attack(&self.config.attacking, state.is_crouching(), delta_ms);
            if crouch_attack.is_some() {
                ctx.sink.trigger(Effect::Attack);
                report.attack = report.attack.or(crouch_attack);
            }
        }

        self.switch_first_person(state, edges);

        state.prev_buttons = command.buttons;
        self.publish_signals(state, &mut *ctx.sink);

        log::trace!(
            "tick: {:?} pos={:?} vel={:?} grounded={}",
            state.mode(),
            state.position,
            state.velocity,
            state.is_grounded()
        );
        report
    }

    // ========================================================================
    // Stages
    // ========================================================================

    fn resize_collider(&self, state: &mut MovementState) {
        let wanted = self.config.collider_for(state.is_crouching());
        if state.collider != wanted {
            state.collider = wanted;
        }
    }

    fn carry_on_platform<T: TerrainQuery + ?Sized>(&self, state: &mut MovementState, ctx: &mut LocomotionContext<'_, T>) {
        let Some(attachment) = state.platform else {
            return;
        };
        let Some(pose) = ctx.terrain.body_pose(attachment.platform) else {
            log::debug!("platform {:?} is gone", attachment.platform);
            ctx.platforms.leave(&mut state.platform);
            return;
        };
        let Some((position, rotation)) = ctx.platforms.carry(&attachment, &pose) else {
            return;
        };

        let yaw_before = state.yaw();
        state.position = position;
        state.rotation = if state.is_on_wall() { rotation } else { upright(rotation) };
        state.target_yaw += state.yaw() - yaw_before;
    }

    fn attack(
        &self,
        state: &mut MovementState,
        command: &LocomotionCommand,
        edges: ButtonEdges,
        delta_ms: u32,
    ) -> Option<AttackEvent> {
        let input = AttackInput {
            pressed: edges.pressed(InputButtons::ATTACK),
            crouch_held: command.buttons.pressed(InputButtons::CROUCH),
            grounded: state.is_grounded(),
            on_wall: state.is_on_wall(),
            crouching: state.is_crouching(),
            can_act: state.flags.has(MovementFlags::CAN_CROUCH_TO_ACTION),
            animation_playing: command.attack_animation_playing,
            delta_ms,
        };
        state.attack.update(&self.config.attacking, &input)
    }

    /// Pick the yaw the body turns toward.
    fn rotation_direction(&self, state: &mut MovementState, command: &LocomotionCommand, steering: &Steering) {
        let side = &self.config.side_scrolling;
        if side.axis_locked() {
            if let Some(yaw) = side_scroll_yaw(side, steering.horizontal) {
                state.target_yaw = yaw;
            }
            return;
        }
        if self.camera_only(state) || self.walking_backwards(state, steering) {
            state.target_yaw = command.camera_yaw;
            return;
        }
        if steering.active() {
            state.target_yaw = command.camera_yaw + steering.horizontal.atan2(steering.vertical);
        }
    }

    fn rotate(&self, state: &mut MovementState, steering: &Steering, dt: f32) {
        let camera_only = self.camera_only(state);
        if !(steering.active() || self.config.side_scrolling.axis_locked() || camera_only) {
            return;
        }

        let target = Quat::from_rotation_y(state.target_yaw);
        if camera_only {
            state.rotation = target;
            return;
        }

        let movement = &self.config.movement;
        let mut rate = movement.rotation_speed;
        if !state.is_grounded() {
            rate *= movement.mid_air_rotation_speed_multiple;
        }
        state.rotation = state.rotation.slerp(target, (rate * dt).min(1.0)).normalize();
    }

    fn speed(&self, state: &mut MovementState, command: &LocomotionCommand, steering: &Steering, dt: f32) {
        let movement = &self.config.movement;
        let side = &self.config.side_scrolling;
        let h = steering.horizontal.abs();
        let v = steering.vertical.abs();
        let blend = (SPEED_BLEND_RATE * dt).min(1.0);

        let crouch = if state.is_crouching() {
            self.config.crouching.crouch_movement_speed_multiple
        } else {
            1.0
        };
        let run = if self.config.running.use_running_button && command.wants_run() {
            self.config.running.run_speed_multiple
        } else {
            1.0
        };
        let grounded = state.is_grounded();

        let speed = &mut state.speed;
        speed.horizontal_blend = lerp(speed.horizontal_blend, (h - v + 1.0) / 2.0, blend);
        speed.vertical_blend = lerp(speed.vertical_blend, (v - h + 1.0) / 2.0, blend);

        if steering.active() {
            speed.acceleration_rate = (speed.acceleration_rate + 0.5 * movement.acceleration * dt).min(1.0);
            speed.deceleration_rate = 0.0;

            let base = if side.axis_locked() {
                h * side.movement_speed_if_axis_locked
            } else {
                let straight = if steering.vertical < 0.0 {
                    movement.back_speed
                } else {
                    movement.forward_speed
                };
                speed.horizontal_blend * movement.side_speed + speed.vertical_blend * straight
            };
            let target = base * crouch * run * steering.strength * speed.acceleration_rate;
            speed.move_speed = lerp(speed.move_speed, target, blend);
        } else {
            speed.acceleration_rate = 0.0;
            speed.deceleration_rate += DECELERATION_GROWTH * dt;
            speed.move_speed = if grounded {
                (speed.move_speed - speed.deceleration_rate * speed.move_speed).max(0.0)
            } else {
                0.0
            };
        }

        speed.air_speed = speed.move_speed * movement.mid_air_movement_speed_multiple;
        speed.applied_speed = if movement.movement_friction > 0.0 {
            let rate = (FRICTION_RATE / movement.movement_friction * dt).min(1.0);
            lerp(speed.applied_speed, speed.move_speed, rate)
        } else {
            speed.move_speed
        };
    }

    fn movement_direction(&self, state: &mut MovementState, steering: &Steering, ground_close: bool) {
        let grounded_move =
            state.is_grounded() && (state.no_collision_ticks < LOST_CONTACT_TICKS || ground_close);

        let y = if grounded_move && !state.flags.has(MovementFlags::JUMP_PERFORMED) {
            0.0
        } else {
            state.move_direction.y
        };

        let heading = if self.camera_only(state) || self.walking_backwards(state, steering) {
            steering.direction
        } else if grounded_move {
            yaw_direction(state.target_yaw)
        } else if steering.active() {
            state.forward()
        } else {
            Vec3::ZERO
        };
        let heading = flat(heading, Vec3::ZERO);

        let horizontal = if grounded_move {
            state.speed.applied_speed
        } else {
            state.speed.air_speed
        };
        state.move_direction = heading * horizontal + Vec3::Y * y;
    }

    fn lock_axis(&self, state: &mut MovementState) {
        let side = &self.config.side_scrolling;
        let free = !state.is_on_wall();
        if side.lock_movement_on_x_axis {
            state.move_direction.x = 0.0;
            if free {
                state.position.x = side.x_value;
            }
        }
        if side.lock_movement_on_z_axis {
            state.move_direction.z = 0.0;
            if free {
                state.position.z = side.z_value;
            }
        }

        let lost_contact = state.no_collision_ticks >= LOST_CONTACT_TICKS;
        if (lost_contact && !state.is_grounded())
            || state.flags.has(MovementFlags::MID_AIR_FROM_JUMP)
            || state.flags.has(MovementFlags::JUMP_PERFORMED)
            || !state.slide.sliding
        {
            state.slide.surface_normal = Vec3::ZERO;
        }

        let gravity = self.config.gravity;
        if !state.ground.angle_hit
            && !lost_contact
            && state.slide.surface_normal != Vec3::ZERO
            && state.move_direction.y <= -gravity
        {
            state.move_direction.y = -gravity;
        }
    }

    fn slope_slide(&self, state: &mut MovementState, dt: f32) {
        let gravity = self.config.gravity;
        let friction = self.config.movement.slide_friction;
        let mid_air = state.flags.has(MovementFlags::MID_AIR_FROM_JUMP);
        let jumping = state.flags.has(MovementFlags::JUMP_PERFORMED);
        let contact_angle = state.last_contact.as_ref().map_or(0.0, |c| c.slope_angle);

        let steep = state.ground.slope_angle > self.config.slope_limit
            && contact_angle < 89.0
            && !jumping
            && !mid_air
            && state.ground.slide_possible
            && !state.ground.between_slidable_surfaces;

        let jump_possible = !steep || slope_allows_jump(&self.config, &state.ground);
        state.flags.set(MovementFlags::JUMP_POSSIBLE, jump_possible);

        if steep && (state.no_collision_ticks < LOST_CONTACT_TICKS || state.is_grounded()) {
            if !state.slide.sliding {
                state.slide.speed = 1.0;
                if self.config.jumping.do_not_increase_jump_number_when_sliding {
                    state.jump.restart_combo(self.config.total_jumps());
                }
                log::debug!("sliding down {:.1}° slope", state.ground.slope_angle);
            }
            state.slide.sliding = true;

            let normal = state.ground.ground_normal;
            let downhill = Vec3::new(normal.x, -normal.y, normal.z);
            state.slide.movement = state.slide.movement.lerp(downhill, (SLIDE_TURN_RATE * dt).min(1.0));

            let push = state.slide.movement * state.slide.speed * self.config.movement.slope_slide_speed;
            state.move_direction.x += push.x;
            state.move_direction.z += push.z;
            if state.no_collision_ticks < 2 || !jump_possible {
                state.move_direction.y += push.y - SLIDE_DOWN_PUSH;
            }
            state.slide.speed = (state.slide.speed - state.slide.movement.y * dt * gravity)
                .min(self.config.movement.terminal_slide_speed);

            let falling = (state.no_collision_ticks > 2 && !state.is_grounded()) || state.move_direction.y <= -gravity;
            if falling && !mid_air {
                state.move_direction.y = -gravity;
            }
            return;
        }

        if state.slide.sliding {
            state.slide.sliding = false;
            if !jumping {
                state.move_direction.y = -gravity;
            }
        }

        // Momentum left over from a slide decays with friction
        if friction > 0.0 {
            if state.slide.movement != Vec3::ZERO {
                let friction = if mid_air { friction * 1.5 } else { friction };
                let rate = (FRICTION_RATE / friction * dt).min(1.0);
                state.slide.movement = state.slide.movement.lerp(Vec3::ZERO, rate);
                let push = state.slide.movement * state.slide.speed * self.config.movement.slope_slide_speed;
                state.move_direction.x += push.x;
                state.move_direction.z += push.z;
                if state.slide.movement.length_squared() < 1e-6 {
                    state.slide.movement = Vec3::ZERO;
                    state.slide.speed = 1.0;
                }
            }
        } else {
            state.slide.speed = 1.0;
            state.slide.movement = Vec3::ZERO;
        }
    }

    fn resolve_mode(&self, state: &mut MovementState) {
        if state.is_on_wall() {
            return;
        }
        let mode = if state.slide.sliding {
            LocomotionMode::Sliding
        } else if state.is_grounded() && !state.flags.has(MovementFlags::JUMP_PERFORMED) {
            LocomotionMode::Grounded
        } else {
            LocomotionMode::Airborne
        };
        if mode != state.mode() {
            state.set_mode(mode);
        }
    }

    /// Keep the feet on the ground when walking down a walkable slope.
    fn prevent_bouncing(&self, state: &mut MovementState, dt: f32) {
        let mid_air = state.flags.has(MovementFlags::MID_AIR_FROM_JUMP);
        if (state.is_grounded() || state.ground.angle_hit)
            && state.no_collision_ticks < LOST_CONTACT_TICKS
            && !mid_air
        {
            state.flags.set(MovementFlags::JUMP_PERFORMED, false);
        }

        if !state.is_grounded() || state.flags.has(MovementFlags::JUMP_PERFORMED) || state.slide.sliding {
            return;
        }
        let angle = state.ground.slope_angle;
        if angle <= 1.0 || angle > self.config.slope_limit {
            return;
        }

        let downhill = flat(state.ground.ground_normal, Vec3::ZERO);
        let horizontal = Vec3::new(state.move_direction.x, 0.0, state.move_direction.z);
        let along = horizontal.dot(downhill);
        if along > 0.0 {
            // Drop as fast as the slope falls away, plus this tick's gravity
            state.move_direction.y -= along * angle.to_radians().tan() + self.config.gravity * dt;
        }
    }

    fn gravity(&self, state: &mut MovementState, dt: f32) {
        let jumping = &self.config.jumping;
        if !(state.jump.is_buffered() && state.is_grounded()) {
            state.move_direction.y -= self.config.gravity * dt;
        }
        state.move_direction.y = state.move_direction.y.max(-jumping.max_falling_speed);
        if state.flags.has(MovementFlags::HEAD_HIT) {
            state.move_direction.y = state.move_direction.y.min(0.0);
        }
    }

    /// Slide the collider and record what it touched. Returns a touched platform.
    fn move_body<T: TerrainQuery + ?Sized>(
        &self,
        state: &mut MovementState,
        ctx: &LocomotionContext<'_, T>,
        dt: f32,
    ) -> Option<BodyId> {
        let filter = ctx.ground_filter();
        let before = state.position;
        let result = slide_move(
            ctx.terrain,
            &state.collider,
            &mut state.position,
            state.move_direction * dt,
            &filter,
        );
        if result.started_in_solid {
            log::debug!("move started inside terrain at {before:?}");
        }

        let rising = state.move_direction.y > 0.0;
        let mut head_hit = false;
        let mut platform = None;
        for hit in &result.contacts {
            let contact = Contact::from_hit(hit);
            state.flags.set(
                MovementFlags::COLLIDING_WITH_WALL,
                contact.point.y > state.position.y + WALL_CONTACT_HEIGHT,
            );
            if rising && contact.normal.y < -0.5 {
                head_hit = true;
            }
            state.slide.surface_normal = if contact.slope_angle >= self.config.slope_limit && contact.normal.y != 0.0 {
                contact.normal
            } else {
                Vec3::ZERO
            };
            if contact
                .tag
                .as_deref()
                .is_some_and(|tag| self.config.is_platform(tag))
            {
                platform = Some(hit.body);
            }
            state.last_contact = Some(contact);
        }
        if result.blocked() {
            state.no_collision_ticks = 0;
        }
        state.flags.set(MovementFlags::HEAD_HIT, head_hit);
        if head_hit {
            state.move_direction.y = state.move_direction.y.min(0.0);
        }

        if self.config.movement.hard_stick_to_ground
            && state.is_grounded()
            && !state.flags.has(MovementFlags::JUMP_PERFORMED)
            && !state.flags.has(MovementFlags::MID_AIR_FROM_JUMP)
        {
            let from = state.position + Vec3::Y * PROBE_LIFT;
            let to = state.position - Vec3::Y * 0.1;
            if let Some(hit) = ctx.terrain.probe(from, to, &filter) {
                state.position.y = hit.point.y;
            }
        }

        state.velocity = if dt > 0.0 {
            (state.position - before) / dt
        } else {
            Vec3::ZERO
        };
        platform
    }

    fn ride_platform<T: TerrainQuery + ?Sized>(
        &self,
        state: &mut MovementState,
        ctx: &mut LocomotionContext<'_, T>,
        contact: Option<BodyId>,
    ) -> Option<RideEvent> {
        let contact = contact.and_then(|id| ctx.terrain.body_pose(id).map(|pose| (id, pose)));
        let event = ctx
            .platforms
            .update_rider(&mut state.platform, contact, state.position, state.rotation);

        if event.is_none() {
            if let Some(mut attachment) = state.platform {
                if let Some(pose) = ctx.terrain.body_pose(attachment.platform) {
                    ctx.platforms
                        .rebase(&mut attachment, &pose, state.position, state.rotation);
                    state.platform = Some(attachment);
                }
            }
        }
        event
    }

    fn switch_first_person(&self, state: &mut MovementState, edges: ButtonEdges) {
        let config = &self.config.first_person;
        let current = state.flags.has(MovementFlags::FIRST_PERSON);
        let active = if config.always_use_first_person {
            true
        } else if config.switch_to_first_person_if_input_button_pressed {
            current ^ edges.pressed(InputButtons::FIRST_PERSON)
        } else {
            false
        };
        if active != current {
            log::debug!("first person: {active}");
            state.flags.set(MovementFlags::FIRST_PERSON, active);
        }
    }

    fn publish_signals(&self, state: &MovementState, sink: &mut dyn AnimationSink) {
        let right = state.rotation * Vec3::X;
        let up = state.rotation * Vec3::Y;
        let (climb_state, climb_h, climb_v) = match &state.climb {
            Some(context) => (
                context.climb_state(right, self.config.climbing.climb_movement_speed),
                context.direction.dot(right),
                context.direction.dot(up),
            ),
            None => (0.0, 0.0, 0.0),
        };

        sink.set_float(Signal::ClimbState, climb_state);
        sink.set_float(Signal::ClimbSpeedHorizontal, climb_h);
        sink.set_float(Signal::ClimbSpeedVertical, climb_v);
        sink.set_float(Signal::AttackState, state.attack.context().signal_value());
        sink.set_float(Signal::AttackNumber, state.attack.current_number() as f32);
        sink.set_float(Signal::JumpNumber, state.current_jump() as f32);
        sink.set_float(Signal::Speed, state.speed.move_speed);
        sink.set_bool(Signal::Crouch, state.is_crouching());
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// First person with facing locked to the camera.
    fn camera_only(&self, state: &MovementState) -> bool {
        state.flags.has(MovementFlags::FIRST_PERSON) && self.config.first_person.only_rotate_with_camera
    }

    fn walking_backwards(&self, state: &MovementState, steering: &Steering) -> bool {
        state.flags.has(MovementFlags::FIRST_PERSON)
            && self.config.first_person.walk_backwards_when_down_key_is_pressed
            && steering.vertical < 0.0
            && steering.horizontal == 0.0
    }
}

/// Facing for side-scrolling input, `None` without horizontal input.
fn side_scroll_yaw(config: &SideScrollConfig, horizontal: f32) -> Option<f32> {
    if horizontal == 0.0 {
        return None;
    }
    let bias = if config.rotate_inwards { INWARD_BIAS } else { -INWARD_BIAS };
    let positive = horizontal > 0.0;
    let mut yaw = if config.lock_movement_on_z_axis {
        // Moving along X
        if positive {
            FRAC_PI_2 + bias
        } else {
            -(FRAC_PI_2 + bias)
        }
    } else if positive {
        -bias
    } else {
        PI + bias
    };
    if config.flip_axis_rotation {
        yaw += PI;
    }
    Some(yaw)
}

fn yaw_direction(yaw: f32) -> Vec3 {
    Vec3::new(yaw.sin(), 0.0, yaw.cos())
}

fn deadzone(value: f32) -> f32 {
    if value.abs() < AXIS_DEADZONE {
        0.0
    } else {
        value
    }
}

#[inline]
fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::movement::capability::{Capability, CapabilityId};
    use crate::movement::signals::SignalFrame;
    use crate::terrain::{BodyPose, LayerMask, TerrainWorld};

    const FRAME_MS: u32 = 20;
    const DT: f32 = 0.02;

    fn create_test_world() -> TerrainWorld {
        let mut world = TerrainWorld::new();
        world.add_box(Vec3::new(0.0, -0.5, 0.0), Vec3::new(20.0, 0.5, 20.0));
        world
    }

    /// A climbable face at z = 0.7 rising to y = 6.
    fn create_ladder_world() -> TerrainWorld {
        let mut world = create_test_world();
        world.add_tagged_box(Vec3::new(0.0, 3.0, 1.2), Vec3::new(1.0, 3.0, 0.5), "Ladder");
        world
    }

    /// A slab under the origin tilted about X by `degrees`, rising toward -Z.
    fn create_slope_world(degrees: f32) -> TerrainWorld {
        let mut world = TerrainWorld::new();
        let pose = BodyPose {
            translation: Vec3::new(0.0, -0.5, 0.0),
            rotation: Quat::from_rotation_x(degrees.to_radians()),
            scale: Vec3::ONE,
        };
        world.add_oriented_box(Vec3::new(10.0, 0.5, 40.0), pose, LayerMask::SOLID, None);
        world
    }

    struct Host {
        world: TerrainWorld,
        platforms: PlatformRegistry,
        capabilities: CapabilityRegistry,
        signals: SignalFrame,
    }

    impl Host {
        fn new(world: TerrainWorld) -> Self {
            Self {
                world,
                platforms: PlatformRegistry::new(),
                capabilities: CapabilityRegistry::new(),
                signals: SignalFrame::new(),
            }
        }

        fn step(
            &mut self,
            controller: &LocomotionController,
            state: &mut MovementState,
            command: &LocomotionCommand,
        ) -> StepReport {
            let mut ctx = LocomotionContext::new(
                &self.world,
                &mut self.platforms,
                &mut self.capabilities,
                &mut self.signals,
            );
            controller.update(state, command, &mut ctx, FRAME_MS)
        }

        fn run(&mut self, controller: &LocomotionController, state: &mut MovementState, command: &LocomotionCommand, ticks: u32) {
            for _ in 0..ticks {
                self.step(controller, state, command);
            }
        }

        /// Idle until the body is back on the ground after a jump.
        fn land(&mut self, controller: &LocomotionController, state: &mut MovementState) {
            for _ in 0..300 {
                self.step(controller, state, &idle());
                if state.is_grounded() && !state.flags.has(MovementFlags::MID_AIR_FROM_JUMP) {
                    return;
                }
            }
            panic!("never landed: {:?}", state.position);
        }

        fn disable(&mut self, controller: &LocomotionController, state: &mut MovementState) {
            let mut ctx = LocomotionContext::new(
                &self.world,
                &mut self.platforms,
                &mut self.capabilities,
                &mut self.signals,
            );
            controller.disable(state, &mut ctx);
        }
    }

    fn idle() -> LocomotionCommand {
        LocomotionCommand::default()
    }

    fn press(button: u16) -> LocomotionCommand {
        LocomotionCommand::default().with_button(button)
    }

    fn spawned(controller: &LocomotionController, world: &TerrainWorld, position: Vec3) -> MovementState {
        let mut state = controller.new_state(position);
        controller.spawn_at(&mut state, position, world);
        state
    }

    /// Shared flag standing in for a host capability.
    struct Switch(Rc<Cell<bool>>);

    impl Capability for Switch {
        fn set_enabled(&mut self, enabled: bool) {
            self.0.set(enabled);
        }

        fn is_enabled(&self) -> bool {
            self.0.get()
        }
    }

    #[test]
    fn test_spawn_at_finds_ground() {
        let controller = LocomotionController::with_default_config();
        let world = create_test_world();
        let state = spawned(&controller, &world, Vec3::new(0.0, 0.5, 0.0));

        assert!(state.position.y.abs() < 0.05, "y = {}", state.position.y);
        assert!(state.is_grounded());
        assert_eq!(state.mode(), LocomotionMode::Grounded);
    }

    #[test]
    fn test_spawn_at_no_ground() {
        let controller = LocomotionController::with_default_config();
        let world = create_test_world();
        let state = spawned(&controller, &world, Vec3::new(0.0, 10.0, 0.0));

        assert_eq!(state.position, Vec3::new(0.0, 10.0, 0.0));
        assert_eq!(state.mode(), LocomotionMode::Airborne);
    }

    #[test]
    fn test_gravity() {
        let controller = LocomotionController::with_default_config();
        let mut host = Host::new(create_test_world());
        let mut state = controller.new_state(Vec3::new(0.0, 3.0, 0.0));

        host.run(&controller, &mut state, &idle(), 10);
        assert!(state.position.y < 3.0);
        assert!(state.velocity.y < 0.0);
        assert_eq!(state.mode(), LocomotionMode::Airborne);

        host.run(&controller, &mut state, &idle(), 100);
        assert!(state.is_grounded());
        assert!(state.position.y.abs() < 0.05, "y = {}", state.position.y);
    }

    #[test]
    fn test_forward_movement() {
        let controller = LocomotionController::with_default_config();
        let mut host = Host::new(create_test_world());
        let mut state = spawned(&controller, &host.world, Vec3::ZERO);

        host.run(&controller, &mut state, &LocomotionCommand::stick(0.0, 1.0), 50);

        assert!(state.position.z > 3.0, "z = {}", state.position.z);
        assert!(state.position.x.abs() < 0.05);
        assert!(state.is_grounded());
        assert!((state.speed.move_speed - 6.0).abs() < 0.1, "speed = {}", state.speed.move_speed);
        assert!((host.signals.float(Signal::Speed) - state.speed.move_speed).abs() < 1e-6);
    }

    #[test]
    fn test_turns_toward_input() {
        let controller = LocomotionController::with_default_config();
        let mut host = Host::new(create_test_world());
        let mut state = spawned(&controller, &host.world, Vec3::ZERO);

        host.run(&controller, &mut state, &LocomotionCommand::stick(1.0, 0.0), 60);

        assert!((state.target_yaw - FRAC_PI_2).abs() < 1e-4);
        assert!((state.forward() - Vec3::X).length() < 0.05, "forward = {:?}", state.forward());
        assert!(state.position.x > 1.0);
    }

    #[test]
    fn test_decelerates_without_input() {
        let controller = LocomotionController::with_default_config();
        let mut host = Host::new(create_test_world());
        let mut state = spawned(&controller, &host.world, Vec3::ZERO);

        host.run(&controller, &mut state, &LocomotionCommand::stick(0.0, 1.0), 30);
        host.run(&controller, &mut state, &idle(), 20);

        assert_eq!(state.speed.move_speed, 0.0);
        let z = state.position.z;
        host.run(&controller, &mut state, &idle(), 5);
        assert!((state.position.z - z).abs() < 1e-3);
    }

    #[test]
    fn test_jump_heights_cycle_and_wrap() {
        let mut config = MovementConfig::default();
        config.jumping.jump_heights = vec![6.0, 8.0, 12.0];
        let controller = LocomotionController::new(config);
        let mut host = Host::new(create_test_world());
        let mut state = spawned(&controller, &host.world, Vec3::ZERO);
        host.run(&controller, &mut state, &idle(), 2);

        let mut stages = Vec::new();
        for _ in 0..4 {
            let report = host.step(&controller, &mut state, &press(InputButtons::JUMP));
            let stage = report.jumped.expect("jumped");
            stages.push(stage);

            let height = controller.config.jumping.jump_heights[stage - 1];
            let expected = height - controller.config.gravity * DT;
            assert!(
                (state.move_direction.y - expected).abs() < 1e-3,
                "stage {stage}: y = {}",
                state.move_direction.y
            );
            host.land(&controller, &mut state);
        }
        assert_eq!(stages, vec![1, 2, 3, 1]);
    }

    #[test]
    fn test_landing_effect_once_per_jump() {
        let controller = LocomotionController::with_default_config();
        let mut host = Host::new(create_test_world());
        let mut state = spawned(&controller, &host.world, Vec3::ZERO);
        host.run(&controller, &mut state, &idle(), 2);

        host.step(&controller, &mut state, &press(InputButtons::JUMP));
        host.land(&controller, &mut state);
        host.run(&controller, &mut state, &idle(), 10);

        let effects = host.signals.take_effects();
        assert_eq!(effects.iter().filter(|e| **e == Effect::Jump).count(), 1);
        assert_eq!(effects.iter().filter(|e| **e == Effect::Landing).count(), 1);
    }

    #[test]
    fn test_double_jump_once_per_excursion() {
        let controller = LocomotionController::with_default_config();
        let mut host = Host::new(create_test_world());
        let mut state = spawned(&controller, &host.world, Vec3::ZERO);
        host.run(&controller, &mut state, &idle(), 2);

        host.step(&controller, &mut state, &press(InputButtons::JUMP));
        host.run(&controller, &mut state, &idle(), 4);

        let second = host.step(&controller, &mut state, &press(InputButtons::JUMP));
        assert!(second.double_jumped);
        assert!(!state.flags.has(MovementFlags::DOUBLE_JUMP_READY));

        host.step(&controller, &mut state, &idle());
        let third = host.step(&controller, &mut state, &press(InputButtons::JUMP));
        assert!(!third.double_jumped);
        assert!(third.jumped.is_none());

        host.land(&controller, &mut state);
        host.step(&controller, &mut state, &idle());
        assert!(state.flags.has(MovementFlags::DOUBLE_JUMP_READY));
    }

    #[test]
    fn test_gentle_slope_never_slides() {
        let controller = LocomotionController::with_default_config();
        let mut host = Host::new(create_slope_world(20.0));
        let mut state = spawned(&controller, &host.world, Vec3::new(0.0, 1.5, 0.0));

        for _ in 0..100 {
            host.step(&controller, &mut state, &idle());
            assert_ne!(state.mode(), LocomotionMode::Sliding);
            assert!(!state.slide.sliding);
        }
        assert!(state.is_grounded());
    }

    #[test]
    fn test_steep_slope_slide_speeds_up() {
        let controller = LocomotionController::with_default_config();
        let mut host = Host::new(create_slope_world(35.0));
        let mut state = spawned(&controller, &host.world, Vec3::new(0.0, 1.5, 0.0));
        host.run(&controller, &mut state, &idle(), 5);

        assert!(state.slide.sliding);
        assert_eq!(state.mode(), LocomotionMode::Sliding);

        // Downhill is +Z for this slope
        let mut previous_speed = state.slide.speed;
        let mut previous_step = 0.0;
        for tick in 0..30 {
            let before = state.position;
            host.step(&controller, &mut state, &idle());
            let step = state.position.z - before.z;

            assert!(state.slide.sliding, "tick {tick}: stopped sliding");
            assert!(state.slide.speed > previous_speed, "{} !> {previous_speed}", state.slide.speed);
            assert!(step > 0.0, "tick {tick}: stalled at {:?}", state.position);
            assert!(step >= previous_step - 1e-3, "tick {tick}: {step} < {previous_step}");
            assert!(state.velocity.z > 0.0);
            previous_speed = state.slide.speed;
            previous_step = step;
        }
        assert!(previous_step > 0.1, "final step {previous_step}");
    }

    #[test]
    fn test_slide_holds_at_terminal_speed() {
        let mut config = MovementConfig::default();
        config.movement.terminal_slide_speed = 4.0;
        let controller = LocomotionController::new(config);
        let mut host = Host::new(create_slope_world(35.0));
        let mut state = spawned(&controller, &host.world, Vec3::new(0.0, 1.5, 0.0));
        host.run(&controller, &mut state, &idle(), 80);

        assert!(state.slide.sliding);
        assert_eq!(state.slide.speed, 4.0);

        let mut steps = Vec::new();
        for _ in 0..20 {
            let before = state.position;
            host.step(&controller, &mut state, &idle());
            assert_eq!(state.slide.speed, 4.0);
            steps.push(state.position.z - before.z);
        }
        let (low, high) = steps
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &s| (lo.min(s), hi.max(s)));
        assert!(low > 0.0);
        assert!(high - low < 0.01, "steps vary from {low} to {high}");
    }

    #[test]
    fn test_ladder_attach_within_one_tick() {
        let controller = LocomotionController::with_default_config();
        let mut host = Host::new(create_ladder_world());
        let mut state = spawned(&controller, &host.world, Vec3::new(0.0, 0.0, 0.1));

        let report = host.step(&controller, &mut state, &LocomotionCommand::stick(0.0, 1.0));

        assert_eq!(report.climb, Some(ClimbOutcome::Attached));
        assert_eq!(state.mode(), LocomotionMode::WallClimbing);
        assert_eq!(state.velocity, Vec3::ZERO);
        assert_eq!(host.signals.float(Signal::ClimbState), 1.0);
    }

    #[test]
    fn test_walk_into_ladder_stops_dead() {
        let controller = LocomotionController::with_default_config();
        let mut host = Host::new(create_ladder_world());
        let mut state = spawned(&controller, &host.world, Vec3::new(0.0, 0.0, -2.0));

        let forward = LocomotionCommand::stick(0.0, 1.0);
        for _ in 0..100 {
            host.step(&controller, &mut state, &forward);
            if state.is_on_wall() {
                break;
            }
        }
        assert_eq!(state.mode(), LocomotionMode::WallClimbing);
        assert_eq!(state.velocity, Vec3::ZERO);
        assert_eq!(state.move_direction, Vec3::ZERO);
    }

    #[test]
    fn test_jump_off_wall_reports_first_stage() {
        let controller = LocomotionController::with_default_config();
        let mut host = Host::new(create_ladder_world());
        let mut state = spawned(&controller, &host.world, Vec3::new(0.0, 0.0, 0.1));
        host.step(&controller, &mut state, &LocomotionCommand::stick(0.0, 1.0));

        let report = host.step(&controller, &mut state, &press(InputButtons::JUMP));

        assert_eq!(report.climb, Some(ClimbOutcome::JumpedOff));
        assert_eq!(report.jumped, Some(1));
        assert!(!state.is_on_wall());
        assert!(state.move_direction.y > 0.0);
    }

    #[test]
    fn test_missing_capability_warns_once() {
        let controller = LocomotionController::with_default_config();
        let mut host = Host::new(create_ladder_world());
        let mut state = spawned(&controller, &host.world, Vec3::new(0.0, 0.0, 0.1));

        host.step(&controller, &mut state, &LocomotionCommand::stick(0.0, 1.0));
        assert!(state.is_on_wall());

        // Down at the floor drops off the wall
        host.step(&controller, &mut state, &LocomotionCommand::stick(0.0, -1.0));
        assert!(!state.is_on_wall());
        host.run(&controller, &mut state, &idle(), 20);

        let forward = LocomotionCommand::stick(0.0, 1.0);
        for _ in 0..50 {
            host.step(&controller, &mut state, &forward);
            if state.is_on_wall() {
                break;
            }
        }
        assert!(state.is_on_wall());

        let warnings = host.capabilities.warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].id, CapabilityId::LEDGE_CLIMB);
    }

    #[test]
    fn test_registered_capability_toggles_with_wall() {
        let controller = LocomotionController::with_default_config();
        let mut host = Host::new(create_ladder_world());
        let ledge_climb = Rc::new(Cell::new(true));
        host.capabilities
            .register(CapabilityId::LEDGE_CLIMB, Box::new(Switch(Rc::clone(&ledge_climb))));
        let mut state = spawned(&controller, &host.world, Vec3::new(0.0, 0.0, 0.1));

        host.step(&controller, &mut state, &LocomotionCommand::stick(0.0, 1.0));
        assert!(!ledge_climb.get());

        host.step(&controller, &mut state, &LocomotionCommand::stick(0.0, -1.0));
        assert!(ledge_climb.get());
        assert!(host.capabilities.warnings().is_empty());
    }

    #[test]
    fn test_water_toggles_capabilities_and_holds_movement() {
        let mut config = MovementConfig::default();
        config.capabilities.in_water.enable = vec![CapabilityId::SWIM];
        let controller = LocomotionController::new(config);

        let mut world = create_test_world();
        world.add_liquid(Vec3::new(0.0, 1.0, 0.0), Vec3::new(3.0, 1.0, 3.0));
        let mut host = Host::new(world);
        let swim = Rc::new(Cell::new(false));
        host.capabilities
            .register(CapabilityId::SWIM, Box::new(Switch(Rc::clone(&swim))));
        let mut state = spawned(&controller, &host.world, Vec3::ZERO);

        host.step(&controller, &mut state, &idle());
        assert!(state.in_water());
        assert!(swim.get());

        let before = state.position;
        host.run(&controller, &mut state, &LocomotionCommand::stick(0.0, 1.0), 10);
        assert_eq!(state.position, before);
    }

    #[test]
    fn test_crouch_and_stand() {
        let controller = LocomotionController::with_default_config();
        let mut host = Host::new(create_test_world());
        let mut state = spawned(&controller, &host.world, Vec3::ZERO);
        let standing = state.collider.height();

        host.step(&controller, &mut state, &press(InputButtons::CROUCH));
        assert!(state.is_crouching());
        assert!((state.collider.height() - standing * 0.7).abs() < 1e-4);
        assert!(host.signals.flag(Signal::Crouch));

        host.step(&controller, &mut state, &idle());
        host.step(&controller, &mut state, &press(InputButtons::CROUCH));
        assert!(!state.is_crouching());
        assert_eq!(state.collider.height(), standing);
    }

    #[test]
    fn test_uncrouch_refused_under_ceiling() {
        let controller = LocomotionController::with_default_config();
        let mut world = create_test_world();
        // Ceiling underside at y = 1.5, below the standing collider's top
        world.add_box(Vec3::new(0.0, 2.0, 0.0), Vec3::new(2.0, 0.5, 2.0));
        let mut host = Host::new(world);

        let mut state = controller.new_state(Vec3::new(0.0, 0.001, 0.0));
        state.flags.set(MovementFlags::CROUCHING, true);
        state.flags.set(MovementFlags::CROUCH_QUEUED, true);
        state.collider = controller.config.collider_for(true);
        host.step(&controller, &mut state, &idle());

        host.step(&controller, &mut state, &press(InputButtons::CROUCH));
        assert!(state.is_crouching());
        assert!(!state.flags.has(MovementFlags::CAN_CROUCH_TO_ACTION));
        assert_eq!(state.collider, controller.config.collider_for(true));
    }

    #[test]
    fn test_disable_resets_and_freezes() {
        let controller = LocomotionController::with_default_config();
        let mut host = Host::new(create_test_world());
        let mut state = spawned(&controller, &host.world, Vec3::ZERO);
        host.run(&controller, &mut state, &idle(), 2);
        host.step(&controller, &mut state, &press(InputButtons::JUMP));
        host.run(&controller, &mut state, &idle(), 3);

        host.disable(&controller, &mut state);

        assert!(state.flags.disabled());
        assert_eq!(state.velocity, Vec3::ZERO);
        assert_eq!(state.move_direction, Vec3::ZERO);
        assert_eq!(state.current_jump(), controller.config.total_jumps());
        assert!(!state.flags.has(MovementFlags::JUMP_POSSIBLE));
        assert!(state.flags.has(MovementFlags::DOUBLE_JUMP_READY));
        assert!(!state.is_crouching());
        assert!(!state.slide.sliding);
        assert!(state.climb.is_none());

        let frozen = state.position;
        let report = host.step(&controller, &mut state, &LocomotionCommand::stick(0.0, 1.0));
        assert_eq!(report, StepReport::default());
        assert_eq!(state.position, frozen);

        controller.enable(&mut state);
        assert!(!state.flags.disabled());
        host.run(&controller, &mut state, &idle(), 5);
        assert!(state.position.y < frozen.y);
    }

    #[test]
    fn test_first_person_toggle() {
        let mut config = MovementConfig::default();
        config.first_person.switch_to_first_person_if_input_button_pressed = true;
        let controller = LocomotionController::new(config);
        let mut host = Host::new(create_test_world());
        let mut state = spawned(&controller, &host.world, Vec3::ZERO);
        assert!(!state.flags.has(MovementFlags::FIRST_PERSON));

        host.step(&controller, &mut state, &press(InputButtons::FIRST_PERSON));
        assert!(state.flags.has(MovementFlags::FIRST_PERSON));

        // Holding the button does not toggle again
        host.step(&controller, &mut state, &press(InputButtons::FIRST_PERSON));
        assert!(state.flags.has(MovementFlags::FIRST_PERSON));

        host.step(&controller, &mut state, &idle());
        host.step(&controller, &mut state, &press(InputButtons::FIRST_PERSON));
        assert!(!state.flags.has(MovementFlags::FIRST_PERSON));
    }

    #[test]
    fn test_first_person_faces_camera() {
        let controller = LocomotionController::new(MovementConfig::first_person());
        let mut host = Host::new(create_test_world());
        let mut state = spawned(&controller, &host.world, Vec3::ZERO);
        assert!(state.flags.has(MovementFlags::FIRST_PERSON));

        let command = LocomotionCommand {
            camera_yaw: FRAC_PI_2,
            ..LocomotionCommand::stick(0.0, -1.0)
        };
        host.run(&controller, &mut state, &command, 20);

        // Facing +X, walking backwards toward -X
        assert!((state.forward() - Vec3::X).length() < 1e-3);
        assert!(state.position.x < -0.5, "x = {}", state.position.x);
    }

    #[test]
    fn test_side_scroller_locks_axis() {
        let controller = LocomotionController::new(MovementConfig::side_scroller(2.0));
        let mut host = Host::new(create_test_world());
        let mut state = spawned(&controller, &host.world, Vec3::ZERO);

        host.run(&controller, &mut state, &LocomotionCommand::stick(1.0, 0.3), 40);

        assert_eq!(state.position.z, 2.0);
        assert!(state.position.x > 1.0, "x = {}", state.position.x);
        assert!(state.forward().x > 0.95, "forward = {:?}", state.forward());
    }

    #[test]
    fn test_side_scroll_yaw_biased_inwards() {
        let config = SideScrollConfig {
            lock_movement_on_z_axis: true,
            ..SideScrollConfig::default()
        };
        let right = side_scroll_yaw(&config, 1.0).expect("input");
        let left = side_scroll_yaw(&config, -1.0).expect("input");
        assert!(right > FRAC_PI_2);
        assert!(left < -FRAC_PI_2);
        assert!(side_scroll_yaw(&config, 0.0).is_none());

        let flipped = SideScrollConfig {
            flip_axis_rotation: true,
            ..config
        };
        let yaw = side_scroll_yaw(&flipped, 1.0).expect("input");
        assert!((yaw - (right + PI)).abs() < 1e-6);
    }

    #[test]
    fn test_platform_carries_rider() {
        let controller = LocomotionController::with_default_config();
        let mut world = create_test_world();
        let platform = world.add_tagged_box(Vec3::new(0.0, 0.5, 0.0), Vec3::new(3.0, 0.5, 3.0), "Platform");
        let mut host = Host::new(world);
        let mut state = spawned(&controller, &host.world, Vec3::new(0.0, 1.0, 0.0));

        let report = host.step(&controller, &mut state, &idle());
        assert_eq!(report.ride, Some(RideEvent::Attached(platform)));
        let before = state.position;

        host.world
            .set_translation(platform, Vec3::new(1.0, 0.5, 0.0))
            .expect("platform exists");
        host.step(&controller, &mut state, &idle());

        assert!((state.position.x - (before.x + 1.0)).abs() < 0.05, "x = {}", state.position.x);
        assert!(state.platform.is_some());
    }
}
