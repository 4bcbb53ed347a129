//! Householder feedback-delay-network reverb engine.
//!
//! Host entry point: `Reverb` (instantiate, activate, set_params, run).
//! Offline entry point: `render_verb(input, params, sample_rate) -> output_audio`.

pub mod chain;
pub mod delay;
pub mod dither;
pub mod error;
pub mod fdn;
pub mod matrix;
pub mod modulation;
pub mod params;
pub mod presets;
pub mod rate;
pub mod reverb;
pub mod tone;

pub use chain::{render_verb, render_verb_stereo};
pub use error::VerbError;
pub use params::{ControlCurves, DitherMode, LineCount, VerbParams};
pub use presets::Preset;
pub use reverb::Reverb;
