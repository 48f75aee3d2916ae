//! Ground, air and crouch attack combos.
//!
//! Each context has its own combo tracker. The context follows the body:
//! on the ground or a wall it is `Ground`, in the air `Air`, crouched
//! `Crouch`. Switching context primes the new context's wait so an attack
//! does not fire on the same tick as the switch.

use serde::{Deserialize, Serialize};

use super::combo::{ComboTracker, ComboWindow, PressBuffer};
use super::config::AttackConfig;

/// Which combo an attack belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackContext {
    #[default]
    Ground,
    Air,
    Crouch,
}

impl AttackContext {
    /// Value published on the attack-state signal.
    pub fn signal_value(self) -> f32 {
        match self {
            Self::Ground => 0.0,
            Self::Air => 1.0,
            Self::Crouch => 2.0,
        }
    }
}

/// An attack the host should play.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackEvent {
    pub context: AttackContext,
    /// 1-based combo stage.
    pub stage: usize,
    pub strength: f32,
}

/// What the attack logic sees this tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttackInput {
    /// Attack went down this tick.
    pub pressed: bool,
    /// Crouch is held, which swallows attack presses.
    pub crouch_held: bool,
    pub grounded: bool,
    pub on_wall: bool,
    pub crouching: bool,
    /// Enough headroom to stand up and swing.
    pub can_act: bool,
    pub animation_playing: bool,
    pub delta_ms: u32,
}

/// Attack combos and the shared press buffer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackState {
    ground: ComboTracker,
    air: ComboTracker,
    crouch: ComboTracker,
    buffer: PressBuffer,
    context: AttackContext,
    attacked_in_mid_air: bool,
    last: Option<AttackEvent>,
}

impl AttackState {
    pub fn new(config: &AttackConfig) -> Self {
        Self {
            ground: ComboTracker::new(config.ground.total()),
            air: ComboTracker::new(config.air.window.total()),
            crouch: ComboTracker::new(1),
            buffer: PressBuffer::default(),
            context: AttackContext::Ground,
            attacked_in_mid_air: false,
            last: None,
        }
    }

    pub fn context(&self) -> AttackContext {
        self.context
    }

    /// Stage of the current context's combo.
    pub fn current_number(&self) -> usize {
        match self.context {
            AttackContext::Ground => self.ground.current(),
            AttackContext::Air => self.air.current(),
            AttackContext::Crouch => self.crouch.current(),
        }
    }

    pub fn last(&self) -> Option<AttackEvent> {
        self.last
    }

    /// Drop any buffered press and end every combo.
    pub fn reset(&mut self, config: &AttackConfig) {
        *self = Self::new(config);
    }

    /// Ground and air attacks.
    pub fn update(&mut self, config: &AttackConfig, input: &AttackInput) -> Option<AttackEvent> {
        self.switch_context(config, input);
        if input.grounded {
            self.attacked_in_mid_air = false;
        }

        if !input.crouch_held {
            self.buffer.tick(input.delta_ms);
            if input.pressed {
                self.buffer.press();
            }
        }

        let mut event = None;
        let blocked = input.on_wall || input.crouching || !input.can_act;
        if self.buffer.is_pressed() && !blocked {
            event = match self.context {
                AttackContext::Ground => self.press(AttackContext::Ground, &config.ground, input),
                AttackContext::Air => {
                    if config.air.only_allow_attack_once_in_mid_air && self.attacked_in_mid_air {
                        None
                    } else {
                        self.press(AttackContext::Air, &config.air.window, input)
                    }
                }
                AttackContext::Crouch => None,
            };
        }

        if event.is_none() && !blocked {
            event = self.catch_up(config, input);
        }

        for (tracker, window) in [
            (&mut self.ground, &config.ground),
            (&mut self.air, &config.air.window),
        ] {
            tracker.tick(input.delta_ms, window);
        }

        self.record(event)
    }

    /// Crouch attacks run late in the tick, after the body has moved.
    pub fn crouch_attack(&mut self, config: &AttackConfig, crouching: bool, delta_ms: u32) -> Option<AttackEvent> {
        let window = config.crouch.window();
        self.crouch.tick(delta_ms, &window);
        if !(crouching && config.crouch.allow_crouch_attack && self.buffer.is_pressed()) {
            return None;
        }
        if !self.crouch.wait_elapsed(&window, false) {
            return None;
        }
        self.buffer.consume();
        let event = self.crouch.press(&window, false, true).map(|stage| AttackEvent {
            context: AttackContext::Crouch,
            stage,
            strength: config.crouch.crouch_attack_strength,
        });
        self.record(event)
    }

    // ========================================================================
    // Private helpers
    // ========================================================================

    fn switch_context(&mut self, config: &AttackConfig, input: &AttackInput) {
        let context = if input.crouching {
            AttackContext::Crouch
        } else if input.grounded || input.on_wall {
            AttackContext::Ground
        } else {
            AttackContext::Air
        };
        if context == self.context {
            return;
        }
        match context {
            AttackContext::Ground => self.ground.prime_wait(&config.ground),
            AttackContext::Air => self.air.prime_wait(&config.air.window),
            AttackContext::Crouch => {}
        }
        self.context = context;
    }

    fn tracker(&mut self, context: AttackContext) -> &mut ComboTracker {
        match context {
            AttackContext::Ground => &mut self.ground,
            AttackContext::Air => &mut self.air,
            AttackContext::Crouch => &mut self.crouch,
        }
    }

    fn press(&mut self, context: AttackContext, window: &ComboWindow, input: &AttackInput) -> Option<AttackEvent> {
        let tracker = self.tracker(context);
        if !window.remember_presses && !tracker.wait_elapsed(window, input.animation_playing) {
            // Keep the press buffered until the wait is over
            return None;
        }
        let stage = tracker.press(window, input.animation_playing, false);
        self.buffer.consume();
        if context == AttackContext::Air {
            self.attacked_in_mid_air = true;
        }
        stage.map(|stage| AttackEvent {
            context,
            stage,
            strength: window.strength(stage).unwrap_or(0.0),
        })
    }

    fn catch_up(&mut self, config: &AttackConfig, input: &AttackInput) -> Option<AttackEvent> {
        let (context, window) = match self.context {
            AttackContext::Ground => (AttackContext::Ground, &config.ground),
            AttackContext::Air => (AttackContext::Air, &config.air.window),
            AttackContext::Crouch => return None,
        };
        let stage = self.tracker(context).catch_up(window, input.animation_playing)?;
        Some(AttackEvent {
            context,
            stage,
            strength: window.strength(stage).unwrap_or(0.0),
        })
    }

    fn record(&mut self, event: Option<AttackEvent>) -> Option<AttackEvent> {
        if let Some(event) = event {
            log::debug!(
                "attack {:?} stage {} (strength {})",
                event.context,
                event.stage,
                event.strength
            );
            self.last = Some(event);
        }
        event
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME_MS: u32 = 20;

    fn on_ground() -> AttackInput {
        AttackInput {
            grounded: true,
            can_act: true,
            delta_ms: FRAME_MS,
            ..AttackInput::default()
        }
    }

    fn in_air() -> AttackInput {
        AttackInput {
            grounded: false,
            ..on_ground()
        }
    }

    fn pressed(input: AttackInput) -> AttackInput {
        AttackInput { pressed: true, ..input }
    }

    fn idle(state: &mut AttackState, config: &AttackConfig, input: AttackInput, frames: u32) {
        for _ in 0..frames {
            state.update(config, &input);
        }
    }

    #[test]
    fn test_ground_combo_stages() {
        let config = AttackConfig::default();
        let mut state = AttackState::new(&config);

        let first = state.update(&config, &pressed(on_ground())).expect("first attack");
        assert_eq!((first.context, first.stage), (AttackContext::Ground, 1));

        idle(&mut state, &config, on_ground(), 10);
        let second = state.update(&config, &pressed(on_ground())).expect("second attack");
        assert_eq!(second.stage, 2);

        idle(&mut state, &config, on_ground(), 10);
        let third = state.update(&config, &pressed(on_ground())).expect("third attack");
        assert_eq!(third.stage, 3);
        assert_eq!(third.strength, 2.0);
    }

    #[test]
    fn test_early_press_is_buffered() {
        let config = AttackConfig::default();
        let mut state = AttackState::new(&config);
        state.update(&config, &pressed(on_ground()));

        // Pressed again before the 200 ms wait is over
        idle(&mut state, &config, on_ground(), 2);
        assert!(state.update(&config, &pressed(on_ground())).is_none());

        let mut fired = None;
        for _ in 0..8 {
            fired = fired.or(state.update(&config, &on_ground()));
        }
        assert_eq!(fired.map(|e| e.stage), Some(2));
    }

    #[test]
    fn test_air_attack_once_per_airtime() {
        let config = AttackConfig::default();
        let mut state = AttackState::new(&config);
        idle(&mut state, &config, in_air(), 1);

        let first = state.update(&config, &pressed(in_air())).expect("air attack");
        assert_eq!(first.context, AttackContext::Air);

        idle(&mut state, &config, in_air(), 20);
        assert!(state.update(&config, &pressed(in_air())).is_none());

        // Landing restores the air attack
        idle(&mut state, &config, on_ground(), 1);
        idle(&mut state, &config, in_air(), 20);
        assert!(state.update(&config, &pressed(in_air())).is_some());
    }

    #[test]
    fn test_no_attacks_on_wall() {
        let config = AttackConfig::default();
        let mut state = AttackState::new(&config);
        let input = AttackInput {
            on_wall: true,
            ..pressed(in_air())
        };
        assert!(state.update(&config, &input).is_none());
        assert_eq!(state.context(), AttackContext::Ground);
    }

    #[test]
    fn test_crouch_attack_uses_own_limit() {
        let config = AttackConfig::default();
        let mut state = AttackState::new(&config);
        let crouched = AttackInput {
            crouching: true,
            ..on_ground()
        };

        state.update(&config, &pressed(crouched));
        let first = state.crouch_attack(&config, true, FRAME_MS).expect("crouch attack");
        assert_eq!(first.context, AttackContext::Crouch);
        assert_eq!(state.context(), AttackContext::Crouch);

        // A second press inside the crouch time limit is refused
        state.update(&config, &pressed(crouched));
        assert!(state.crouch_attack(&config, true, FRAME_MS).is_none());

        for _ in 0..25 {
            state.update(&config, &crouched);
            state.crouch_attack(&config, true, FRAME_MS);
        }
        state.update(&config, &pressed(crouched));
        assert!(state.crouch_attack(&config, true, FRAME_MS).is_some());
    }

    #[test]
    fn test_remembered_presses_play_in_order() {
        let mut config = AttackConfig::default();
        config.ground.remember_presses = true;
        let mut state = AttackState::new(&config);

        let first = state.update(&config, &pressed(on_ground()));
        assert_eq!(first.map(|e| e.stage), Some(1));
        state.update(&config, &pressed(on_ground()));
        state.update(&config, &pressed(on_ground()));

        let mut stages = Vec::new();
        for _ in 0..30 {
            if let Some(event) = state.update(&config, &on_ground()) {
                stages.push(event.stage);
            }
        }
        assert_eq!(stages, vec![2, 3]);
    }

    #[test]
    fn test_context_signal_values() {
        assert_eq!(AttackContext::Ground.signal_value(), 0.0);
        assert_eq!(AttackContext::Air.signal_value(), 1.0);
        assert_eq!(AttackContext::Crouch.signal_value(), 2.0);
    }
}
