//! Discrete signals for an externally owned animation layer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Continuous or boolean values published every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Signal {
    /// 0 off the wall, 1 on it, 1..2 while moving sideways.
    ClimbState,
    /// 0 ground, 1 air, 2 crouch.
    AttackState,
    AttackNumber,
    JumpNumber,
    /// Current horizontal move speed.
    Speed,
    Crouch,
    ClimbSpeedHorizontal,
    ClimbSpeedVertical,
}

/// One-shot events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    Jump,
    Landing,
    DoubleJump,
    Attack,
    PullUp,
    LetGo,
}

/// Receives signals from the locomotion core.
pub trait AnimationSink {
    fn set_float(&mut self, signal: Signal, value: f32);
    fn set_bool(&mut self, signal: Signal, value: bool);
    fn trigger(&mut self, effect: Effect);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl AnimationSink for NullSink {
    fn set_float(&mut self, _signal: Signal, _value: f32) {}
    fn set_bool(&mut self, _signal: Signal, _value: bool) {}
    fn trigger(&mut self, _effect: Effect) {}
}

/// Keeps the latest value of every signal plus the effects triggered
/// since the last [`SignalFrame::take_effects`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalFrame {
    floats: BTreeMap<Signal, f32>,
    bools: BTreeMap<Signal, bool>,
    effects: Vec<Effect>,
}

impl SignalFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest float value, 0 if never set.
    pub fn float(&self, signal: Signal) -> f32 {
        self.floats.get(&signal).copied().unwrap_or(0.0)
    }

    pub fn flag(&self, signal: Signal) -> bool {
        self.bools.get(&signal).copied().unwrap_or(false)
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }
}

impl AnimationSink for SignalFrame {
    fn set_float(&mut self, signal: Signal, value: f32) {
        self.floats.insert(signal, value);
    }

    fn set_bool(&mut self, signal: Signal, value: bool) {
        self.bools.insert(signal, value);
    }

    fn trigger(&mut self, effect: Effect) {
        self.effects.push(effect);
    }
}

// ============================================================================
// Tests
// ============================================================================
