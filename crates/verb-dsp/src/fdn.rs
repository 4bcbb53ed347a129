//! The feedback delay network itself, one tick at a time.
//!
//! Each channel owns eight lines: an early group and a late group of four.
//! In eight-line mode the early outputs are Householder-mixed into the late
//! group and the late outputs are mixed (scaled by `regen`) back into the
//! opposite channel's early group on the next tick. In four-line mode only
//! the late-length group runs, feeding back into itself across channels.
//! Either way the output is the mean of the group that feeds back.
//!
//! Lines hold `asin`-decoded values. The mixing happens on the encoded
//! (`sin`) side, and every sum is clamped and decoded again before it is
//! stored, so the loop saturates instead of folding over.
//!
//! Lengths are counted in network ticks, so they do not depend on the sample
//! rate; the rate adapter decides how often a tick happens.

use rand::Rng;

use crate::delay::DelayLineBank;
use crate::matrix;
use crate::modulation::ModulationOscillator;
use crate::params::{ControlCurves, LineCount, CHANNELS, GROUP, MAX_SIZE};
use crate::tone::{decode, encode};

/// Base lengths of the early group.
pub const EARLY_LENGTHS: [usize; GROUP] = [4801, 2909, 1153, 461];
/// Base lengths of the late group.
pub const LATE_LENGTHS: [usize; GROUP] = [7607, 4217, 2269, 1597];

const EARLY: usize = 0;
const LATE: usize = GROUP;

/// Buffer capacities for one channel's bank, early group first.
pub fn capacities() -> Vec<usize> {
    EARLY_LENGTHS
        .iter()
        .chain(LATE_LENGTHS.iter())
        .map(|&base| (base as f64 * MAX_SIZE) as usize + 1)
        .collect()
}

/// Active length for a base length at a given size multiplier.
pub fn scaled_length(base: usize, size: f64) -> usize {
    ((base as f64 * size).floor() as usize).max(1)
}

/// Longest pass around the loop for a line count and size multiplier, in ticks.
pub fn longest_loop(lines: LineCount, size: f64) -> usize {
    let longest = |lengths: &[usize]| {
        lengths
            .iter()
            .map(|&b| scaled_length(b, size))
            .max()
            .unwrap_or(1)
    };
    match lines {
        LineCount::Four => longest(&LATE_LENGTHS),
        LineCount::Eight => longest(&EARLY_LENGTHS) + longest(&LATE_LENGTHS),
    }
}

#[derive(Debug, Clone)]
pub struct Network {
    banks: [DelayLineBank; CHANNELS],
    /// One vibrato per line of the input-side group.
    oscillators: [[ModulationOscillator; GROUP]; CHANNELS],
    /// Computed from the previous tick's outputs, indexed by receiving channel.
    feedback: [[f64; GROUP]; CHANNELS],
    lines: LineCount,
    regen: f64,
    size: f64,
}

impl Network {
    pub fn new() -> Self {
        let caps = capacities();
        Self {
            banks: [DelayLineBank::new(&caps), DelayLineBank::new(&caps)],
            oscillators: std::array::from_fn(|_| {
                std::array::from_fn(|_| ModulationOscillator::new(0.0))
            }),
            feedback: [[0.0; GROUP]; CHANNELS],
            lines: LineCount::Eight,
            regen: 0.0,
            size: MAX_SIZE,
        }
    }

    /// Apply one block's controls. Lines are resized, never cleared.
    pub fn configure(&mut self, curves: &ControlCurves, lines: LineCount, cycle_end: usize) {
        self.lines = lines;
        self.regen = curves.regen;
        self.size = curves.size;
        for bank in &mut self.banks {
            for (i, &base) in EARLY_LENGTHS.iter().enumerate() {
                bank.resize(EARLY + i, scaled_length(base, curves.size));
            }
            for (i, &base) in LATE_LENGTHS.iter().enumerate() {
                bank.resize(LATE + i, scaled_length(base, curves.size));
            }
        }
        for osc in self.oscillators.iter_mut().flatten() {
            osc.set_rate(curves.drift * cycle_end as f64);
            osc.set_depth(curves.line_depth);
        }
    }

    pub fn seed<R: Rng>(&mut self, rng: &mut R) {
        for osc in self.oscillators.iter_mut().flatten() {
            osc.seed(rng);
        }
    }

    pub fn clear(&mut self) {
        for bank in &mut self.banks {
            bank.clear();
        }
        self.feedback = [[0.0; GROUP]; CHANNELS];
    }

    pub fn lines(&self) -> LineCount {
        self.lines
    }

    /// Scale applied to any vector on one full pass around the loop.
    pub fn loop_gain(&self) -> f64 {
        matrix::loop_gain(self.lines.groups(), self.regen)
    }

    /// Longest single pass around the loop, in ticks.
    pub fn longest_loop(&self) -> usize {
        longest_loop(self.lines, self.size)
    }

    /// Run one tick and return the output frame, bounded by ±1.
    ///
    /// Every value written into a line goes through `decode`, so the stored
    /// contents never leave ±π/2; every value read back goes through `encode`.
    #[inline]
    pub fn tick<R: Rng>(&mut self, input: [f64; CHANNELS], rng: &mut R) -> [f64; CHANNELS] {
        let mut out = [0.0; CHANNELS];
        let mut next_feedback = [[0.0; GROUP]; CHANNELS];
        let first = match self.lines {
            LineCount::Four => LATE,
            LineCount::Eight => EARLY,
        };

        for ch in 0..CHANNELS {
            let bank = &mut self.banks[ch];
            let oscs = &self.oscillators[ch];

            let mut heads = [0.0; GROUP];
            for i in 0..GROUP {
                heads[i] = encode(bank.read(first + i, oscs[i].offset()));
            }
            for i in 0..GROUP {
                bank.write(first + i, decode(input[ch] + self.feedback[ch][i]));
            }

            let tails = match self.lines {
                LineCount::Four => heads,
                LineCount::Eight => {
                    let mut tails = [0.0; GROUP];
                    for (i, t) in tails.iter_mut().enumerate() {
                        *t = encode(bank.line(LATE + i).read_oldest());
                    }
                    let forward = matrix::mix(heads, 1.0);
                    for (i, &f) in forward.iter().enumerate() {
                        bank.write(LATE + i, decode(f));
                    }
                    tails
                }
            };

            out[ch] = tails.iter().sum::<f64>() / GROUP as f64;
            // cross-feed into the other channel
            next_feedback[1 - ch] = matrix::mix(tails, self.regen);
        }

        self.feedback = next_feedback;
        for osc in self.oscillators.iter_mut().flatten() {
            osc.advance(rng);
        }
        out
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}
