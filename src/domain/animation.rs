//! Rainbow animation
//!
//! Three phase-shifted sinusoids mapped from [-1, 1] to [0, 254]. The ticker
//! holds no state besides its speed, so the same timestamp always yields the
//! same colour.

use crate::domain::models::Command;
use std::time::{SystemTime, UNIX_EPOCH};

/// Default time scale, one full hue cycle every 2π / 0.8 ≈ 7.85 s
pub const DEFAULT_SPEED: f64 = 0.8;

const AMPLITUDE: f64 = 127.0;
const GREEN_PHASE: f64 = 2.0;
const BLUE_PHASE: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationTicker {
    speed: f64,
}

impl Default for AnimationTicker {
    fn default() -> Self {
        Self::new(DEFAULT_SPEED)
    }
}

impl AnimationTicker {
    pub fn new(speed: f64) -> Self {
        Self { speed }
    }

    /// Colour for a wall-clock time in seconds
    pub fn rgb_at(&self, seconds: f64) -> (u8, u8, u8) {
        let t = seconds * self.speed;
        (channel(t), channel(t + GREEN_PHASE), channel(t + BLUE_PHASE))
    }

    /// Animation frame for a wall-clock time in seconds
    pub fn frame_at(&self, seconds: f64) -> Command {
        let (r, g, b) = self.rgb_at(seconds);
        Command::color(r, g, b).forced()
    }

    /// Animation frame for the current system time
    pub fn next_frame(&self) -> Command {
        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        self.frame_at(seconds)
    }
}

// Truncates toward zero; the input is never negative
fn channel(phase: f64) -> u8 {
    ((phase.sin() + 1.0) * AMPLITUDE) as u8
}
