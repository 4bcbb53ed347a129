//! Offline analysis of rendered audio.
//!
//! Level and decay measurements used by the CLI report and the reverb
//! integration tests. Decibel values are relative to full scale unless a
//! function says otherwise.

/// Floor used when converting silence to decibels.
pub const SILENCE_DB: f64 = -300.0;

/// Linear amplitude or power ratio to dB, clamped at `SILENCE_DB`.
#[inline]
pub fn amp_to_db(amp: f64) -> f64 {
    if amp > 0.0 {
        (20.0 * amp.log10()).max(SILENCE_DB)
    } else {
        SILENCE_DB
    }
}

/// Largest absolute sample.
pub fn peak(samples: &[f64]) -> f64 {
    samples.iter().fold(0.0, |m: f64, s| m.max(s.abs()))
}

/// Root mean square over the whole slice.
pub fn rms(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f64).sqrt()
}

/// RMS level in dB for consecutive non-overlapping windows.
pub fn envelope_db(samples: &[f64], window: usize) -> Vec<f64> {
    samples.chunks(window.max(1)).map(|c| amp_to_db(rms(c))).collect()
}

/// Seconds between the loudest window and the last window still within
/// `drop_db` of it. Gaps between early echoes do not end the measurement.
pub fn time_above(samples: &[f64], sample_rate: f64, window: usize, drop_db: f64) -> f64 {
    let env = envelope_db(samples, window);
    let Some((peak_idx, &peak_db)) = env
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
    else {
        return 0.0;
    };
    let threshold = peak_db - drop_db.abs();
    let last = env
        .iter()
        .rposition(|&db| db > threshold)
        .unwrap_or(peak_idx);
    (last.saturating_sub(peak_idx) * window.max(1)) as f64 / sample_rate
}

/// Schroeder backward-integrated energy decay curve, in dB relative to the
/// total energy. Monotonically non-increasing.
pub fn schroeder_db(samples: &[f64]) -> Vec<f64> {
    let mut edc = vec![0.0; samples.len()];
    let mut acc = 0.0;
    for (i, s) in samples.iter().enumerate().rev() {
        acc += s * s;
        edc[i] = acc;
    }
    let total = edc.first().copied().unwrap_or(0.0);
    edc.iter()
        .map(|&e| {
            if total > 0.0 && e > 0.0 {
                (10.0 * (e / total).log10()).max(SILENCE_DB)
            } else {
                SILENCE_DB
            }
        })
        .collect()
}

/// Seconds until the energy decay curve first falls `drop_db` below its start.
///
/// Returns `None` for silence, and when the crossing only happens in the last
/// 1% of the buffer (that drop is the end of the render, not decay).
pub fn decay_time(samples: &[f64], sample_rate: f64, drop_db: f64) -> Option<f64> {
    let edc = schroeder_db(samples);
    if edc.first().map_or(true, |&d| d <= SILENCE_DB) {
        return None;
    }
    let threshold = -drop_db.abs();
    let cutoff = samples.len() - samples.len() / 100;
    edc.iter()
        .position(|&db| db <= threshold)
        .filter(|&i| i < cutoff)
        .map(|i| i as f64 / sample_rate)
}

/// Point-in-time level reading for reports.
#[derive(Debug, Clone, Copy)]
pub struct MetricsSnapshot {
    pub rms: f64,
    pub peak: f64,
}

impl MetricsSnapshot {
    pub fn of(samples: &[f64]) -> Self {
        Self {
            rms: rms(samples),
            peak: peak(samples),
        }
    }
}
