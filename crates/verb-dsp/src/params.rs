//! Parameter schema for the FDN reverb.
//!
//! All callers (host instance, offline renderer, CLI, presets) share the same
//! `VerbParams` struct. Controls are normalized `[0, 1]` at this boundary;
//! `ControlCurves` maps them to the values the DSP actually uses.

use serde::{Deserialize, Deserializer, Serialize};

/// Sample rate the control curves and delay lengths are tuned for.
pub const BASE_RATE: f64 = 44100.0;
/// Lines per feedback group.
pub const GROUP: usize = 4;
pub const CHANNELS: usize = 2;

/// Network line count: one feedback group, or two cascaded groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineCount {
    Four,
    Eight,
}

impl LineCount {
    pub fn groups(self) -> usize {
        match self {
            LineCount::Four => 1,
            LineCount::Eight => 2,
        }
    }

    pub fn lines(self) -> usize {
        self.groups() * GROUP
    }
}

/// Output stage applied by the float32 host path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DitherMode {
    Off,
    Float32,
}

/// Accept `"four"`/`"eight"` or `4`/`8`.
fn as_line_count<'de, D: Deserializer<'de>>(d: D) -> Result<LineCount, D::Error> {
    let v: serde_json::Value = Deserialize::deserialize(d)?;
    match &v {
        serde_json::Value::String(s) => match s.as_str() {
            "four" | "4" => Ok(LineCount::Four),
            "eight" | "8" => Ok(LineCount::Eight),
            _ => Err(serde::de::Error::custom(format!("unknown line count '{s}'"))),
        },
        serde_json::Value::Number(n) => match n.as_u64() {
            Some(4) => Ok(LineCount::Four),
            Some(8) => Ok(LineCount::Eight),
            _ => Err(serde::de::Error::custom(format!("line count must be 4 or 8, got {n}"))),
        },
        _ => Err(serde::de::Error::custom(format!("expected line count, got {v}"))),
    }
}

/// All reverb controls.
///
/// Uses `#[serde(default)]` so sparse preset JSON loads correctly;
/// missing keys get default values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerbParams {
    /// How much of the tail is replaced by new input. 0 freezes the tail.
    pub replace: f64,
    /// Pre/post lowpass opening.
    pub brightness: f64,
    /// Vibrato drift speed and per-line modulation depth.
    pub detune: f64,
    /// Delay-line length scale.
    pub size: f64,
    pub wet: f64,

    #[serde(deserialize_with = "as_line_count")]
    pub lines: LineCount,
    pub dither: DitherMode,
    /// Seeds modulation jitter, initial phases and dither state.
    pub seed: u64,

    // --- Metadata (ignored for DSP, present in presets) ---
    #[serde(rename = "_meta", default, skip_serializing)]
    pub meta: Option<serde_json::Value>,
}

impl Default for VerbParams {
    fn default() -> Self {
        Self {
            replace: 0.5,
            brightness: 0.5,
            detune: 0.5,
            size: 1.0,
            wet: 1.0,
            lines: LineCount::Eight,
            dither: DitherMode::Float32,
            seed: 42,
            meta: None,
        }
    }
}

impl VerbParams {
    /// Parse from JSON string. Missing fields get default values.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Clamp every control into `[0, 1]`; non-finite values fall back to defaults.
    pub fn normalize(&mut self) {
        let d = Self::default();
        self.replace = unit(self.replace, d.replace);
        self.brightness = unit(self.brightness, d.brightness);
        self.detune = unit(self.detune, d.detune);
        self.size = unit(self.size, d.size);
        self.wet = unit(self.wet, d.wet);
    }

    /// True when the tail is held indefinitely (no replacement, lossless loop).
    pub fn is_frozen(&self) -> bool {
        self.replace <= 0.0 && self.lines == LineCount::Eight
    }

    /// Same controls, comparing only what the DSP reads.
    pub fn same_controls(&self, other: &VerbParams) -> bool {
        self.replace == other.replace
            && self.brightness == other.brightness
            && self.detune == other.detune
            && self.size == other.size
            && self.wet == other.wet
            && self.lines == other.lines
            && self.dither == other.dither
    }
}

fn unit(v: f64, fallback: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        fallback
    }
}

/// Smallest lowpass coefficient; keeps the one-pole strictly inside `(0, 1]`.
pub const MIN_COEFFICIENT: f64 = 1e-6;

/// Derived DSP values for one block.
///
/// These curves are part of the observable behavior and must not be retuned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlCurves {
    /// `sample_rate / 44100`.
    pub overallscale: f64,
    /// Feedback gain after Householder mixing, in `[0.125, 0.25]`.
    pub regen: f64,
    /// Input gain into the network; reaches 0 when the loop is lossless.
    pub attenuate: f64,
    /// One-pole coefficient for both tone filters, in `(0, 1]`.
    pub lowpass: f64,
    /// Vibrato phase increment per input sample.
    pub drift: f64,
    /// Multiplier applied to the base delay lengths.
    pub size: f64,
    /// Wet gain of the dry/wet blend.
    pub wet: f64,
    /// Per-line read modulation depth in network ticks.
    pub line_depth: f64,
}

impl ControlCurves {
    pub fn derive(params: &VerbParams, sample_rate: f64) -> Self {
        let mut p = params.clone();
        p.normalize();
        let overallscale = sample_rate / BASE_RATE;

        let regen = 0.125 + (1.0 - p.replace) * 0.125;
        let attenuate = (1.0 - (regen - 0.125) / 0.125) * 1.333;
        let lowpass = ((1.00001 - (1.0 - p.brightness)).powi(2) / overallscale.sqrt())
            .clamp(MIN_COEFFICIENT, 1.0);
        let drift = p.detune.powi(3) * 0.001;
        let size = p.size * 1.77 + 0.1;
        let wet = 1.0 - (1.0 - p.wet).powi(3);

        Self {
            overallscale,
            regen,
            attenuate,
            lowpass,
            drift,
            size,
            wet,
            line_depth: p.detune * 4.0,
        }
    }
}

/// Largest value `ControlCurves::size` can take.
pub const MAX_SIZE: f64 = 1.87;
