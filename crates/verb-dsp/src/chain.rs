//! Offline entry points for the reverb engine.
//!
//! Both render through a `Reverb` instance seeded from `params.seed`, in
//! fixed blocks so control handling matches a host.

use crate::error::VerbError;
use crate::params::VerbParams;
use crate::reverb::Reverb;

/// Frames per block.
pub const BLOCK: usize = 512;

/// Render mono input through the reverb.
///
/// Returns interleaved stereo output [L0, R0, L1, R1, ...].
pub fn render_verb(
    input: &[f64],
    params: &VerbParams,
    sample_rate: f64,
) -> Result<Vec<f64>, VerbError> {
    let (left, right) = render_verb_stereo(input, input, params, sample_rate)?;
    let mut output = Vec::with_capacity(left.len() * 2);
    for (l, r) in left.iter().zip(right.iter()) {
        output.push(*l);
        output.push(*r);
    }
    Ok(output)
}

/// Render stereo input through the reverb.
///
/// The shorter channel sets the length. Returns (left_out, right_out).
pub fn render_verb_stereo(
    left: &[f64],
    right: &[f64],
    params: &VerbParams,
    sample_rate: f64,
) -> Result<(Vec<f64>, Vec<f64>), VerbError> {
    let n_samples = left.len().min(right.len());
    let mut out_l = left[..n_samples].to_vec();
    let mut out_r = right[..n_samples].to_vec();

    let mut verb = Reverb::instantiate(sample_rate, params.seed)?;
    verb.set_params(params);
    for (l, r) in out_l.chunks_mut(BLOCK).zip(out_r.chunks_mut(BLOCK)) {
        verb.process_f64(l, r);
    }

    Ok((out_l, out_r))
}
