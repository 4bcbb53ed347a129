//! Host-facing reverb instance.
//!
//! A `Reverb` owns every buffer it will ever touch; they are allocated in
//! `instantiate` and only zeroed afterwards. Controls set between blocks are
//! picked up at the start of the next `run`/`process_f64` call.
//!
//! Per frame:
//!
//! ```text
//! input -> denormal guard -> vibrato predelay (attenuated) -> pre lowpass
//!       -> rate adapter [network tick -> post lowpass] -> dry/wet -> dither
//! ```

use std::f64::consts::FRAC_PI_2;

use log::{debug, trace};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::delay::DelayLine;
use crate::dither::Dither;
use crate::error::VerbError;
use crate::fdn::{self, Network};
use crate::matrix;
use crate::modulation::ModulationOscillator;
use crate::params::{ControlCurves, DitherMode, LineCount, VerbParams, CHANNELS};
use crate::rate::{cycle_end_for, RateAdapter};
use crate::tone::ToneShaper;

/// Slots in the vibrato predelay.
pub const PREDELAY_LEN: usize = 256;
/// Vibrato sweep depth; peak offset is twice this, which still fits the predelay.
pub const PREDELAY_DEPTH: f64 = 127.0;

/// `wet · w + dry · (1 - w)`, or the wet sample alone at full wet.
#[inline]
pub fn dry_wet(dry: f64, wet: f64, w: f64) -> f64 {
    if w < 1.0 {
        wet * w + dry * (1.0 - w)
    } else {
        wet
    }
}

/// One network tick with the post lowpass applied, ready for the adapter.
#[inline]
fn emit(
    network: &mut Network,
    tone: &mut ToneShaper,
    pre: [f64; CHANNELS],
    rng: &mut ChaCha8Rng,
) -> [f64; CHANNELS] {
    let out = network.tick(pre, rng);
    [tone.post(0, out[0]), tone.post(1, out[1])]
}

#[derive(Clone)]
pub struct Reverb {
    sample_rate: f64,
    seed: u64,
    rng: ChaCha8Rng,

    params: VerbParams,
    pending: bool,
    curves: ControlCurves,
    cycle_end: usize,

    predelay: [DelayLine; CHANNELS],
    vibrato: ModulationOscillator,
    tone: ToneShaper,
    network: Network,
    adapter: RateAdapter,
    dither: [Dither; CHANNELS],
}

impl Reverb {
    /// Allocate every buffer for `sample_rate` and activate.
    pub fn instantiate(sample_rate: f64, seed: u64) -> Result<Self, VerbError> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(VerbError::InvalidSampleRate(sample_rate));
        }
        let cycle_end = cycle_end_for(sample_rate);
        let params = VerbParams::default();
        let curves = ControlCurves::derive(&params, sample_rate);

        let mut verb = Self {
            sample_rate,
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            params,
            pending: true,
            curves,
            cycle_end,
            predelay: [DelayLine::new(PREDELAY_LEN), DelayLine::new(PREDELAY_LEN)],
            vibrato: ModulationOscillator::new(PREDELAY_DEPTH),
            tone: ToneShaper::new(curves.lowpass),
            network: Network::new(),
            adapter: RateAdapter::new(cycle_end),
            dither: [Dither::new(0); CHANNELS],
        };
        debug!(
            "instantiate: sr={sample_rate} cycle_end={cycle_end} capacities={:?} seed={seed}",
            fdn::capacities()
        );
        verb.activate();
        Ok(verb)
    }

    /// Zero all state and reseed from the instance seed.
    ///
    /// Two instances with the same seed, params and input produce identical
    /// output after `activate`.
    pub fn activate(&mut self) {
        for line in &mut self.predelay {
            line.clear();
        }
        self.network.clear();
        self.tone.reset();
        self.adapter.reset();

        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.vibrato.seed(&mut self.rng);
        self.network.seed(&mut self.rng);
        for d in &mut self.dither {
            *d = Dither::seeded(&mut self.rng);
        }
        self.pending = true;
        debug!("activate: seed={}", self.seed);
    }

    /// Store new controls; they take effect at the next block.
    pub fn set_params(&mut self, params: &VerbParams) {
        let mut p = params.clone();
        p.normalize();
        if !p.same_controls(&self.params) {
            self.params = p;
            self.pending = true;
        }
    }

    pub fn params(&self) -> &VerbParams {
        &self.params
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn cycle_end(&self) -> usize {
        self.cycle_end
    }

    pub fn curves(&self) -> &ControlCurves {
        &self.curves
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Samples until the tail has fallen 60 dB, or `None` when it never does.
    ///
    /// Reflects the most recent `set_params`, even before the next block.
    pub fn tail_samples(&self) -> Option<usize> {
        if self.params.is_frozen() {
            return None;
        }
        let curves = ControlCurves::derive(&self.params, self.sample_rate);
        let gain = matrix::loop_gain(self.params.lines.groups(), curves.regen);
        if gain >= 1.0 {
            return None;
        }
        let passes = (1e-3f64).ln() / gain.ln();
        let per_pass = fdn::longest_loop(self.params.lines, curves.size) * self.cycle_end;
        Some((per_pass as f64 * passes).ceil() as usize + PREDELAY_LEN)
    }

    pub fn lines(&self) -> LineCount {
        self.network.lines()
    }

    /// Apply pending controls. Called once at the top of every block.
    fn begin_block(&mut self) {
        if !self.pending {
            return;
        }
        self.curves = ControlCurves::derive(&self.params, self.sample_rate);
        self.tone.set_coefficient(self.curves.lowpass);
        self.vibrato.set_rate(self.curves.drift);
        self.network.configure(&self.curves, self.params.lines, self.cycle_end);
        self.pending = false;
        trace!(
            "controls: regen={:.4} lowpass={:.6} size={:.3} wet={:.3} lines={:?}",
            self.curves.regen,
            self.curves.lowpass,
            self.curves.size,
            self.curves.wet,
            self.params.lines
        );
    }

    /// Guard, predelay and pre lowpass for one stereo frame.
    #[inline]
    fn source(&mut self, dry: [f64; CHANNELS]) -> [f64; CHANNELS] {
        let mut pre = [0.0; CHANNELS];
        for ch in 0..CHANNELS {
            let x = self.dither[ch].guard(dry[ch]);
            let line = &mut self.predelay[ch];
            line.write(x * self.curves.attenuate);
            let shift = if ch == 0 { 0.0 } else { FRAC_PI_2 };
            let v = line.read(self.vibrato.offset_shifted(shift));
            pre[ch] = self.tone.pre(ch, v);
        }
        self.vibrato.advance(&mut self.rng);
        pre
    }

    /// One stereo frame through everything but the output stage.
    #[inline]
    fn frame(&mut self, dry: [f64; CHANNELS]) -> [f64; CHANNELS] {
        let pre = self.source(dry);

        let network = &mut self.network;
        let tone = &mut self.tone;
        let rng = &mut self.rng;
        let mut wet = self.adapter.process(|| emit(network, tone, pre, rng));

        for ch in 0..CHANNELS {
            wet[ch] = dry_wet(dry[ch], wet[ch], self.curves.wet);
        }
        wet
    }

    /// Float32 host block. All four buffers must have the same length.
    pub fn run(
        &mut self,
        inputs: [&[f32]; CHANNELS],
        outputs: [&mut [f32]; CHANNELS],
    ) -> Result<(), VerbError> {
        let n = inputs[0].len();
        if inputs[1].len() != n || outputs[0].len() != n || outputs[1].len() != n {
            return Err(VerbError::BufferLength {
                in_left: inputs[0].len(),
                in_right: inputs[1].len(),
                out_left: outputs[0].len(),
                out_right: outputs[1].len(),
            });
        }
        self.begin_block();

        let mode = self.params.dither;
        let [out_l, out_r] = outputs;
        for i in 0..n {
            let y = self.frame([inputs[0][i] as f64, inputs[1][i] as f64]);
            out_l[i] = self.dither[0].finish(y[0], mode) as f32;
            out_r[i] = self.dither[1].finish(y[1], mode) as f32;
        }
        Ok(())
    }

    /// In-place double-precision block, no dither.
    pub fn process_f64(&mut self, left: &mut [f64], right: &mut [f64]) {
        self.begin_block();
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let y = self.frame([*l, *r]);
            *l = self.dither[0].finish(y[0], DitherMode::Off);
            *r = self.dither[1].finish(y[1], DitherMode::Off);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate::AdapterPhase;

    fn impulse(n: usize) -> (Vec<f64>, Vec<f64>) {
        let mut l = vec![0.0; n];
        l[0] = 1.0;
        (l.clone(), l)
    }

    #[test]
    fn test_rejects_bad_sample_rates() {
        for sr in [0.0, -44100.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(Reverb::instantiate(sr, 1), Err(VerbError::InvalidSampleRate(_))));
        }
        assert!(Reverb::instantiate(44100.0, 1).is_ok());
    }

    #[test]
    fn test_cycle_end_follows_sample_rate() {
        assert_eq!(Reverb::instantiate(48000.0, 0).unwrap().cycle_end(), 1);
        assert_eq!(Reverb::instantiate(96000.0, 0).unwrap().cycle_end(), 2);
        assert_eq!(Reverb::instantiate(176400.0, 0).unwrap().cycle_end(), 4);
    }

    #[test]
    fn test_buffer_length_mismatch_leaves_state_untouched() {
        let mut verb = Reverb::instantiate(44100.0, 3).unwrap();
        let inl = [0.5f32; 64];
        let inr = [0.5f32; 63];
        let mut outl = [0.0f32; 64];
        let mut outr = [0.0f32; 64];
        let err = verb.run([&inl, &inr], [&mut outl, &mut outr]);
        assert!(matches!(err, Err(VerbError::BufferLength { in_right: 63, .. })));
        assert!(outl.iter().all(|&v| v == 0.0));

        // Same instance still matches a fresh one.
        let mut fresh = Reverb::instantiate(44100.0, 3).unwrap();
        let (mut a, mut b) = impulse(2048);
        let (mut c, mut d) = impulse(2048);
        verb.process_f64(&mut a, &mut b);
        fresh.process_f64(&mut c, &mut d);
        assert_eq!(a, c);
    }

    #[test]
    fn test_params_apply_at_block_start() {
        let mut verb = Reverb::instantiate(44100.0, 6).unwrap();
        let before = *verb.curves();
        verb.set_params(&VerbParams {
            size: 0.2,
            lines: LineCount::Four,
            seed: 99,
            ..VerbParams::default()
        });
        assert_eq!(verb.params().size, 0.2);
        assert_eq!(*verb.curves(), before);
        assert_eq!(verb.lines(), LineCount::Eight);

        let (mut l, mut r) = impulse(16);
        verb.process_f64(&mut l, &mut r);
        assert!((verb.curves().size - (0.2 * 1.77 + 0.1)).abs() < 1e-12);
        assert_eq!(verb.lines(), LineCount::Four);
        // a live instance keeps the seed it was created with
        assert_eq!(verb.seed(), 6);
    }

    #[test]
    fn test_emitted_references_are_post_filtered() {
        let mut verb = Reverb::instantiate(176400.0, 2).unwrap();
        verb.set_params(&VerbParams {
            brightness: 0.5,
            wet: 1.0,
            dither: DitherMode::Off,
            ..VerbParams::default()
        });
        verb.begin_block();
        assert_eq!(verb.adapter.cycle_end(), 4);
        assert!(verb.tone.coefficient() < 1.0);

        let mut emits = 0;
        let mut filtered_away = false;
        for n in 0..40_000 {
            let dry = if n < 400 { [0.9, -0.6] } else { [0.0, 0.0] };
            if verb.adapter.phase() != AdapterPhase::Emit {
                verb.frame(dry);
                continue;
            }
            // Run the same tick by hand on a copy, filtering it afterwards.
            let mut shadow = verb.clone();
            let pre = shadow.source(dry);
            let raw = shadow.network.tick(pre, &mut shadow.rng);
            let expected = [shadow.tone.post(0, raw[0]), shadow.tone.post(1, raw[1])];

            verb.frame(dry);
            assert_eq!(verb.adapter.latest(), expected, "frame {n}");
            if (raw[0] - expected[0]).abs() > 1e-6 {
                filtered_away = true;
            }
            emits += 1;
        }
        assert_eq!(emits, 10_000);
        assert!(filtered_away);
    }

    #[test]
    fn test_activate_restarts_sequence() {
        let mut verb = Reverb::instantiate(44100.0, 11).unwrap();
        let (mut a, mut b) = impulse(4096);
        verb.process_f64(&mut a, &mut b);
        verb.activate();
        let (mut c, mut d) = impulse(4096);
        verb.process_f64(&mut c, &mut d);
        assert_eq!(a, c);
        assert_eq!(b, d);
    }

    #[test]
    fn test_dry_only_passes_input() {
        let mut verb = Reverb::instantiate(44100.0, 0).unwrap();
        verb.set_params(&VerbParams {
            wet: 0.0,
            ..VerbParams::default()
        });
        let mut l: Vec<f64> = (0..512).map(|i| (i as f64 * 0.05).sin() * 0.5).collect();
        let mut r = l.clone();
        let expected = l.clone();
        verb.process_f64(&mut l, &mut r);
        assert_eq!(l, expected);
        assert_eq!(r, expected);
    }

    #[test]
    fn test_tail_samples() {
        let mut verb = Reverb::instantiate(44100.0, 0).unwrap();
        verb.set_params(&VerbParams {
            size: 0.2,
            ..VerbParams::default()
        });
        let short = verb.tail_samples().unwrap();
        verb.set_params(&VerbParams::default());
        let long = verb.tail_samples().unwrap();
        assert!(long > short);

        verb.set_params(&VerbParams {
            lines: LineCount::Four,
            ..VerbParams::default()
        });
        assert!(verb.tail_samples().unwrap() < long);

        verb.set_params(&VerbParams {
            replace: 0.0,
            ..VerbParams::default()
        });
        assert_eq!(verb.tail_samples(), None);
    }

    #[test]
    fn test_instance_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Reverb>();
    }
}
