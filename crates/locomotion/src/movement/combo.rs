//! Timed combo windows shared by jumps and attacks.
//!
//! A combo is a sequence of stages (jump heights, attack strengths). Each
//! accepted press moves to the next stage as long as it lands inside the
//! combo time limit; after the last stage, or once the window expires, the
//! next press starts over at stage one.
//!
//! With `remember_presses`, presses made while the previous stage is still
//! playing are counted and the combo catches up to them one stage at a time
//! once the wait has elapsed.

use serde::{Deserialize, Serialize};

/// How long a press stays valid while waiting to be consumed (ms).
///
/// Lets a press land slightly early, e.g. just before touching the ground.
pub const PRESS_BUFFER_MS: u32 = 200;

/// Tuning for one combo sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComboWindow {
    /// One entry per stage.
    pub strengths: Vec<f32>,
    /// Time after the last stage before the combo resets. 0 never continues a combo.
    pub time_limit_ms: u32,
    /// Queue presses made during a stage instead of acting on them immediately.
    pub remember_presses: bool,
    /// Minimum time between stages (ms).
    pub wait_ms: u32,
    /// Also wait for the host to report the stage animation finished.
    pub wait_for_animation: bool,
}

impl Default for ComboWindow {
    fn default() -> Self {
        Self {
            strengths: vec![1.0],
            time_limit_ms: 500,
            remember_presses: false,
            wait_ms: 200,
            wait_for_animation: false,
        }
    }
}

impl ComboWindow {
    pub fn total(&self) -> usize {
        self.strengths.len()
    }

    /// Strength of a 1-based stage.
    pub fn strength(&self, stage: usize) -> Option<f32> {
        stage.checked_sub(1).and_then(|i| self.strengths.get(i).copied())
    }
}

/// A button press that stays live for [`PRESS_BUFFER_MS`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PressBuffer {
    pressed: bool,
    age_ms: u32,
}

impl PressBuffer {
    pub fn press(&mut self) {
        self.pressed = true;
        self.age_ms = 0;
    }

    /// Age the press; it expires once older than the buffer window.
    pub fn tick(&mut self, delta_ms: u32) {
        self.age_ms = self.age_ms.saturating_add(delta_ms);
        if self.age_ms > PRESS_BUFFER_MS {
            self.pressed = false;
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    pub fn consume(&mut self) {
        self.pressed = false;
    }
}

/// Position within a combo.
///
/// `current` is the stage last performed (1-based, 0 before the first);
/// it is always kept in `[0, total]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComboTracker {
    current: usize,
    remembered: usize,
    timer_ms: u32,
    wait_ms: u32,
}

impl ComboTracker {
    /// A tracker whose next press starts a fresh combo.
    pub fn new(total: usize) -> Self {
        Self {
            current: total,
            remembered: total,
            timer_ms: 0,
            wait_ms: u32::MAX,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn remembered(&self) -> usize {
        self.remembered
    }

    /// Time since the last stage was performed.
    pub fn timer_ms(&self) -> u32 {
        self.timer_ms
    }

    /// Whether enough time has passed since the last stage to perform another.
    pub fn wait_elapsed(&self, window: &ComboWindow, animation_playing: bool) -> bool {
        self.wait_ms >= window.wait_ms && !(window.wait_for_animation && animation_playing)
    }

    /// Make the next press wait a full `wait_ms` (used when the context switches).
    pub fn prime_wait(&mut self, window: &ComboWindow) {
        self.wait_ms = window.wait_ms;
    }

    /// Accept a press.
    ///
    /// Returns the stage to perform now, or `None` when the press was only
    /// remembered. `restart` forces the combo back to stage one.
    pub fn press(&mut self, window: &ComboWindow, animation_playing: bool, restart: bool) -> Option<usize> {
        let total = window.total();
        self.clamp(total);

        let combo_over = self.current == total || window.time_limit_ms == 0 || restart;
        if combo_over && (!window.remember_presses || self.wait_elapsed(window, animation_playing)) {
            self.current = 0;
            self.remembered = 0;
        }
        if self.remembered < total {
            self.remembered += 1;
        }

        if window.remember_presses {
            None
        } else {
            Some(self.perform(total))
        }
    }

    /// With remembered presses, advance one stage toward them once the wait allows.
    pub fn catch_up(&mut self, window: &ComboWindow, animation_playing: bool) -> Option<usize> {
        if !window.remember_presses
            || self.current == self.remembered
            || !self.wait_elapsed(window, animation_playing)
        {
            return None;
        }
        Some(self.perform(window.total()))
    }

    /// Advance timers and expire the combo once the time limit is exceeded.
    pub fn tick(&mut self, delta_ms: u32, window: &ComboWindow) {
        self.timer_ms = self.timer_ms.saturating_add(delta_ms);
        self.wait_ms = self.wait_ms.saturating_add(delta_ms);
        if window.time_limit_ms > 0 && self.timer_ms > window.time_limit_ms {
            self.expire(window.total());
        }
    }

    /// End the combo: the next press starts from stage one.
    pub fn expire(&mut self, total: usize) {
        self.current = total;
        self.remembered = total;
    }

    fn perform(&mut self, total: usize) -> usize {
        self.current = (self.current + 1).min(total);
        self.timer_ms = 0;
        self.wait_ms = 0;
        self.current
    }

    fn clamp(&mut self, total: usize) {
        self.current = self.current.min(total);
        self.remembered = self.remembered.min(total);
    }
}

// ============================================================================
// Tests
// ============================================================================
