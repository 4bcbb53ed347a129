//! Tone shaping around the network: one-pole lowpasses and the
//! `asin`/`sin` saturation pair.
//!
//! The network stores `decode`d values, so no line ever holds more than
//! ±π/2, and reads them back through `encode`, so nothing it emits exceeds
//! ±1. The lowpasses sit on either side of it.

use crate::params::{CHANNELS, MIN_COEFFICIENT};

/// One-pole lowpass: `y = y·(1-c) + x·c`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OnePole {
    y: f64,
}

impl OnePole {
    #[inline]
    pub fn process(&mut self, x: f64, coefficient: f64) -> f64 {
        self.y = self.y * (1.0 - coefficient) + x * coefficient;
        self.y
    }

    pub fn reset(&mut self) {
        self.y = 0.0;
    }
}

/// Clamp then `asin`; the clamp keeps `asin` inside its domain.
#[inline]
pub fn decode(x: f64) -> f64 {
    x.clamp(-1.0, 1.0).asin()
}

#[inline]
pub fn encode(x: f64) -> f64 {
    x.sin()
}

/// Pre- and post-network filters, one independent pair per channel.
#[derive(Debug, Clone)]
pub struct ToneShaper {
    pre: [OnePole; CHANNELS],
    post: [OnePole; CHANNELS],
    coefficient: f64,
}

impl ToneShaper {
    pub fn new(coefficient: f64) -> Self {
        let mut shaper = Self {
            pre: [OnePole::default(); CHANNELS],
            post: [OnePole::default(); CHANNELS],
            coefficient: 1.0,
        };
        shaper.set_coefficient(coefficient);
        shaper
    }

    /// Always lands in `(0, 1]`; NaN opens the filter fully.
    pub fn set_coefficient(&mut self, coefficient: f64) {
        self.coefficient = if coefficient.is_nan() {
            1.0
        } else {
            coefficient.clamp(MIN_COEFFICIENT, 1.0)
        };
    }

    pub fn coefficient(&self) -> f64 {
        self.coefficient
    }

    /// Darken the source before it enters the network.
    #[inline]
    pub fn pre(&mut self, ch: usize, x: f64) -> f64 {
        self.pre[ch].process(x, self.coefficient)
    }

    /// Darken the network output. Runs once per network tick.
    #[inline]
    pub fn post(&mut self, ch: usize, x: f64) -> f64 {
        self.post[ch].process(x, self.coefficient)
    }

    pub fn reset(&mut self) {
        for f in self.pre.iter_mut().chain(self.post.iter_mut()) {
            f.reset();
        }
    }
}
