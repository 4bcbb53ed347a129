//! Per-channel noise source: denormal guard on the way in, float32 dither on
//! the way out.
//!
//! The state is a 32-bit xorshift seed advanced once per output frame. It is
//! a struct field so every instance (and channel) owns its own sequence.

use rand::Rng;

use crate::params::DitherMode;

/// Inputs quieter than this are replaced by tiny noise.
pub const DENORMAL_FLOOR: f64 = 1.18e-23;
/// Scale of the replacement noise; `u32::MAX * 1.18e-35` stays far below the floor.
pub const DENORMAL_NOISE: f64 = 1.18e-35;
/// Seeds below this are redrawn.
pub const MIN_SEED: u32 = 16386;

#[derive(Debug, Clone, Copy)]
pub struct Dither {
    fpd: u32,
}

impl Dither {
    pub fn new(seed: u32) -> Self {
        Self {
            fpd: seed.max(MIN_SEED),
        }
    }

    pub fn seeded<R: Rng>(rng: &mut R) -> Self {
        let mut fpd = 1u32;
        while fpd < MIN_SEED {
            fpd = rng.random();
        }
        Self { fpd }
    }

    pub fn state(&self) -> u32 {
        self.fpd
    }

    /// Replace near-silent input with noise well under the floor.
    #[inline]
    pub fn guard(&self, x: f64) -> f64 {
        if x.abs() < DENORMAL_FLOOR {
            self.fpd as f64 * DENORMAL_NOISE
        } else {
            x
        }
    }

    #[inline]
    pub fn step(&mut self) {
        self.fpd ^= self.fpd << 13;
        self.fpd ^= self.fpd >> 17;
        self.fpd ^= self.fpd << 5;
    }

    /// Advance the seed and apply the requested output stage.
    #[inline]
    pub fn finish(&mut self, x: f64, mode: DitherMode) -> f64 {
        self.step();
        match mode {
            DitherMode::Off => x,
            DitherMode::Float32 => {
                let expon = frexp_exponent(x);
                x + (self.fpd as f64 - 0x7fff_ffff as f64) * 5.5e-36 * 2f64.powi(expon + 62)
            }
        }
    }
}

/// Exponent `e` with `x = m · 2^e`, `0.5 <= |m| < 1`; 0 for zero and non-finite input.
fn frexp_exponent(x: f64) -> i32 {
    if x == 0.0 || !x.is_finite() {
        return 0;
    }
    let biased = ((x.to_bits() >> 52) & 0x7ff) as i32;
    if biased == 0 {
        // subnormal: renormalize
        return frexp_exponent(x * 2f64.powi(54)) - 54;
    }
    biased - 1022
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_frexp_exponent() {
        assert_eq!(frexp_exponent(1.0), 1);
        assert_eq!(frexp_exponent(0.5), 0);
        assert_eq!(frexp_exponent(0.75), 0);
        assert_eq!(frexp_exponent(-3.0), 2);
        assert_eq!(frexp_exponent(0.0), 0);
        assert_eq!(frexp_exponent(f64::MIN_POSITIVE), -1021);
        assert_eq!(frexp_exponent(f64::MIN_POSITIVE / 4.0), -1023);
    }

    #[test]
    fn test_seeded_is_above_minimum() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for _ in 0..100 {
            assert!(Dither::seeded(&mut rng).state() >= MIN_SEED);
        }
        assert_eq!(Dither::new(0).state(), MIN_SEED);
    }

    #[test]
    fn test_guard_replaces_only_tiny_values() {
        let d = Dither::new(u32::MAX);
        assert_eq!(d.guard(0.25), 0.25);
        let g = d.guard(0.0);
        assert!(g > 0.0 && g < DENORMAL_FLOOR);
    }

    #[test]
    fn test_xorshift_never_zero() {
        let mut d = Dither::new(12345678);
        for _ in 0..100_000 {
            d.step();
            assert_ne!(d.state(), 0);
        }
    }

    #[test]
    fn test_float32_dither_is_tiny_and_relative() {
        let mut d = Dither::new(99_999);
        for x in [0.9, 0.01, -0.5] {
            let y = d.finish(x, DitherMode::Float32);
            assert!((y - x).abs() < x.abs() * 1e-6, "x={x} y={y}");
        }
        assert_eq!(d.finish(0.3, DitherMode::Off), 0.3);
    }
}
