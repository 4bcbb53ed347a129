//! Vibrato oscillators driving fractional delay-line reads.
//!
//! The phase speed is re-jittered every time the phase wraps so the
//! modulation never settles into an audible period. Jitter comes from the
//! owning instance's seeded PRNG, never from a global one.

use rand::Rng;
use std::f64::consts::TAU;

/// Lower bound of the per-cycle speed jitter.
pub const JITTER_MIN: f64 = 0.4294967295;
/// Width of the jitter range (`u32::MAX * 6.18e-11`).
pub const JITTER_SPAN: f64 = 0.2654267828;

#[derive(Debug, Clone)]
pub struct ModulationOscillator {
    phase: f64,
    rate: f64,
    depth: f64,
    jitter: f64,
}

impl ModulationOscillator {
    pub fn new(depth: f64) -> Self {
        Self {
            phase: 0.0,
            rate: 0.0,
            depth: depth.max(0.0),
            jitter: JITTER_MIN,
        }
    }

    /// Random start phase and jitter.
    pub fn seed<R: Rng>(&mut self, rng: &mut R) {
        self.phase = rng.random_range(0.0..TAU);
        self.jitter = draw_jitter(rng);
    }

    /// Phase increment per `advance` before jitter.
    pub fn set_rate(&mut self, rate: f64) {
        self.rate = rate.max(0.0);
    }

    /// Peak-to-peak offset is `2 * depth` samples.
    pub fn set_depth(&mut self, depth: f64) {
        self.depth = depth.max(0.0);
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    #[inline]
    pub fn advance<R: Rng>(&mut self, rng: &mut R) {
        self.phase += self.rate * self.jitter;
        if self.phase > TAU {
            self.phase = 0.0;
            self.jitter = draw_jitter(rng);
        }
    }

    /// Read offset in samples, always in `[0, 2 * depth]`.
    #[inline]
    pub fn offset(&self) -> f64 {
        self.offset_shifted(0.0)
    }

    /// Offset for a phase-shifted tap of the same oscillator.
    #[inline]
    pub fn offset_shifted(&self, shift: f64) -> f64 {
        ((self.phase + shift).sin() + 1.0) * self.depth
    }
}

fn draw_jitter<R: Rng>(rng: &mut R) -> f64 {
    JITTER_MIN + rng.random::<f64>() * JITTER_SPAN
}
