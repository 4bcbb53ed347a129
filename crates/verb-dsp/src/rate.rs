//! Sample-rate adaptive decimation of the network tick.
//!
//! Above 44.1 kHz the network runs once every `cycle_end` input samples.
//! The samples in between are rebuilt from the two most recent emitted
//! values with fixed blend tables, then every output sample goes through a
//! cascade of two-tap averages (one stage fewer than `cycle_end`) that
//! removes the remaining stair-steps. The blend tables are fixed constants.

use crate::params::{BASE_RATE, CHANNELS};

pub const MAX_CYCLE_END: usize = 4;

/// `floor(sample_rate / 44100)` clamped into `[1, 4]`.
pub fn cycle_end_for(sample_rate: f64) -> usize {
    let ratio = (sample_rate / BASE_RATE).floor();
    if ratio.is_nan() || ratio < 1.0 {
        1
    } else {
        (ratio as usize).min(MAX_CYCLE_END)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterPhase {
    /// Replay a stored reference; the network does not run.
    Accumulating,
    /// Run the network once and rebuild the references.
    Emit,
}

#[derive(Debug, Clone)]
pub struct RateAdapter {
    cycle: usize,
    cycle_end: usize,
    refs: [[f64; MAX_CYCLE_END + 1]; CHANNELS],
    taps: [[f64; MAX_CYCLE_END - 1]; CHANNELS],
}

impl RateAdapter {
    pub fn new(cycle_end: usize) -> Self {
        let mut adapter = Self {
            cycle: 0,
            cycle_end: 1,
            refs: [[0.0; MAX_CYCLE_END + 1]; CHANNELS],
            taps: [[0.0; MAX_CYCLE_END - 1]; CHANNELS],
        };
        adapter.set_cycle_end(cycle_end);
        adapter
    }

    pub fn cycle_end(&self) -> usize {
        self.cycle_end
    }

    pub fn cycle(&self) -> usize {
        self.cycle
    }

    /// Only called between blocks.
    pub fn set_cycle_end(&mut self, cycle_end: usize) {
        self.cycle_end = cycle_end.clamp(1, MAX_CYCLE_END);
        if self.cycle > self.cycle_end - 1 {
            self.cycle = self.cycle_end - 1;
        }
    }

    /// The most recently emitted frame.
    pub fn latest(&self) -> [f64; CHANNELS] {
        let i = if self.cycle_end == 1 { 0 } else { self.cycle_end };
        [self.refs[0][i], self.refs[1][i]]
    }

    /// What the next sample will do.
    pub fn phase(&self) -> AdapterPhase {
        if self.cycle + 1 >= self.cycle_end {
            AdapterPhase::Emit
        } else {
            AdapterPhase::Accumulating
        }
    }

    /// Reconstruction followed by the smoothing cascade.
    #[inline]
    pub fn process<F>(&mut self, tick: F) -> [f64; CHANNELS]
    where
        F: FnOnce() -> [f64; CHANNELS],
    {
        let frame = self.reconstruct(tick);
        self.smooth(frame)
    }

    /// Advance one input sample. `tick` runs only in the `Emit` phase.
    #[inline]
    pub fn reconstruct<F>(&mut self, tick: F) -> [f64; CHANNELS]
    where
        F: FnOnce() -> [f64; CHANNELS],
    {
        match self.phase() {
            AdapterPhase::Emit => {
                let emitted = tick();
                for (ch, &e) in emitted.iter().enumerate() {
                    self.store(ch, e);
                }
                self.cycle = 0;
            }
            AdapterPhase::Accumulating => self.cycle += 1,
        }
        let c = self.cycle;
        [self.refs[0][c], self.refs[1][c]]
    }

    /// Rebuild one channel's references from the previous emit and `e`.
    fn store(&mut self, ch: usize, e: f64) {
        let r = &mut self.refs[ch];
        match self.cycle_end {
            4 => {
                r[0] = r[4];
                r[2] = (r[0] + e) / 2.0;
                r[1] = (r[0] + r[2]) / 2.0;
                r[3] = (r[2] + e) / 2.0;
                r[4] = e;
            }
            3 => {
                r[0] = r[3];
                r[1] = (r[0] + r[0] + e) / 3.0;
                r[2] = (r[0] + e + e) / 3.0;
                r[3] = e;
            }
            2 => {
                r[0] = r[2];
                r[1] = (r[0] + e) / 2.0;
                r[2] = e;
            }
            _ => r[0] = e,
        }
    }

    /// `cycle_end - 1` cascaded two-tap averages per channel.
    #[inline]
    pub fn smooth(&mut self, frame: [f64; CHANNELS]) -> [f64; CHANNELS] {
        let stages = self.cycle_end - 1;
        let mut out = frame;
        for (ch, x) in out.iter_mut().enumerate() {
            for s in (0..stages).rev() {
                let prev = self.taps[ch][s];
                self.taps[ch][s] = *x;
                *x = (*x + prev) * 0.5;
            }
        }
        out
    }

    pub fn reset(&mut self) {
        self.cycle = 0;
        self.refs = [[0.0; MAX_CYCLE_END + 1]; CHANNELS];
        self.taps = [[0.0; MAX_CYCLE_END - 1]; CHANNELS];
    }
}
