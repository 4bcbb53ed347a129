//! Householder feedback mixing for groups of four delay lines.
//!
//! The network never multiplies by a dense matrix; `mix` is the O(N)
//! "subtract the others" form. The dense builder is kept to check that the
//! fast path is exactly a scaled orthogonal reflection.

use crate::params::GROUP;

/// `f_i = (o_i - Σ_{j≠i} o_j) * gain`.
///
/// Before scaling this is `2·H·o` with `H = I - (2/N)·11ᵀ` (N = 4), so every
/// vector is scaled by exactly 2. A gain at or below 0.25 per loop pass is
/// what makes the tail decay.
#[inline]
pub fn mix(outputs: [f64; GROUP], gain: f64) -> [f64; GROUP] {
    let sum: f64 = outputs.iter().sum();
    let mut fb = [0.0; GROUP];
    for i in 0..GROUP {
        // o_i - (sum - o_i)
        fb[i] = (2.0 * outputs[i] - sum) * gain;
    }
    fb
}

/// Householder reflection: A = I - (2/N) * ones * ones^T
///
/// Returns flattened row-major N×N.
pub fn householder(n: usize) -> Vec<f64> {
    let mut m = vec![0.0; n * n];
    let scale = 2.0 / n as f64;
    for i in 0..n {
        for j in 0..n {
            m[i * n + j] = if i == j { 1.0 - scale } else { -scale };
        }
    }
    m
}

/// Spectral scale of one unscaled `mix` pass.
pub const MIX_NORM: f64 = 2.0;

/// Loop gain of the feedback path for `groups` cascaded groups with the
/// return pass scaled by `regen` and forward passes left at unity.
pub fn loop_gain(groups: usize, regen: f64) -> f64 {
    MIX_NORM.powi(groups as i32) * regen
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mat_mul(a: &[f64], b: &[f64], n: usize) -> Vec<f64> {
        let mut c = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..n {
                for k in 0..n {
                    c[i * n + j] += a[i * n + k] * b[k * n + j];
                }
            }
        }
        c
    }

    fn transpose(m: &[f64], n: usize) -> Vec<f64> {
        let mut t = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..n {
                t[j * n + i] = m[i * n + j];
            }
        }
        t
    }

    #[test]
    fn test_householder_unitary() {
        let m = householder(GROUP);
        let product = mat_mul(&m, &transpose(&m, GROUP), GROUP);
        for i in 0..GROUP {
            for j in 0..GROUP {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((product[i * GROUP + j] - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_fast_path_matches_dense() {
        let h = householder(GROUP);
        let o = [0.3, -0.7, 0.11, 0.9];
        let fast = mix(o, 1.0);
        for i in 0..GROUP {
            let dense: f64 = (0..GROUP).map(|j| h[i * GROUP + j] * o[j]).sum();
            assert!((fast[i] - MIX_NORM * dense).abs() < 1e-12);
        }
    }

    #[test]
    fn test_subtract_the_others() {
        let fb = mix([1.0, 2.0, 3.0, 4.0], 0.5);
        assert_eq!(
            fb,
            [
                (1.0 - 9.0) * 0.5,
                (2.0 - 8.0) * 0.5,
                (3.0 - 7.0) * 0.5,
                (4.0 - 6.0) * 0.5
            ]
        );
    }

    #[test]
    fn test_energy_scaling() {
        let o = [0.5, -0.25, 0.125, 1.0];
        let e_in: f64 = o.iter().map(|v| v * v).sum();
        let gain = 0.2;
        let fb = mix(o, gain);
        let e_out: f64 = fb.iter().map(|v| v * v).sum();
        let expected = e_in * (MIX_NORM * gain).powi(2);
        assert!((e_out - expected).abs() < 1e-12);
    }

    #[test]
    fn test_loop_gain_contracts() {
        assert!(loop_gain(1, 0.25) < 1.0);
        assert!(loop_gain(2, 0.1875) < 1.0);
        assert_eq!(loop_gain(2, 0.25), 1.0);
    }
}
