//! Signal sink that keeps a history of effects.

use clamber_locomotion::movement::{AnimationSink, Effect, Signal, SignalFrame};
use serde::{Deserialize, Serialize};

/// An effect and the tick it fired on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectRecord {
    pub tick: u64,
    pub effect: Effect,
}

/// Latest signal values plus every effect ever triggered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalRecorder {
    frame: SignalFrame,
    history: Vec<EffectRecord>,
    tick: u64,
}

impl SignalRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp effects triggered from now on with `tick`.
    pub fn begin_tick(&mut self, tick: u64) {
        self.tick = tick;
    }

    pub fn float(&self, signal: Signal) -> f32 {
        self.frame.float(signal)
    }

    pub fn flag(&self, signal: Signal) -> bool {
        self.frame.flag(signal)
    }

    pub fn history(&self) -> &[EffectRecord] {
        &self.history
    }

    pub fn count(&self, effect: Effect) -> usize {
        self.history.iter().filter(|r| r.effect == effect).count()
    }

    /// Effects triggered on `tick`.
    pub fn effects_at(&self, tick: u64) -> impl Iterator<Item = Effect> + '_ {
        self.history
            .iter()
            .filter(move |r| r.tick == tick)
            .map(|r| r.effect)
    }
}

impl AnimationSink for SignalRecorder {
    fn set_float(&mut self, signal: Signal, value: f32) {
        self.frame.set_float(signal, value);
    }

    fn set_bool(&mut self, signal: Signal, value: bool) {
        self.frame.set_bool(signal, value);
    }

    fn trigger(&mut self, effect: Effect) {
        log::debug!("tick {}: {effect:?}", self.tick);
        self.history.push(EffectRecord { tick: self.tick, effect });
    }
}
