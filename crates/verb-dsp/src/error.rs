//! Error type for the structural failures the engine refuses to recover from.
//!
//! Numeric trouble (denormals, out-of-range offsets, `asin` domain) is never
//! an error; it is clamped at the point of use.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerbError {
    #[error("sample rate must be positive and finite, got {0}")]
    InvalidSampleRate(f64),

    #[error("buffer lengths differ: inputs {in_left}/{in_right}, outputs {out_left}/{out_right}")]
    BufferLength {
        in_left: usize,
        in_right: usize,
        out_left: usize,
        out_right: usize,
    },

    #[error("invalid params JSON: {0}")]
    InvalidParams(#[from] serde_json::Error),

    #[error("unknown preset '{0}'")]
    UnknownPreset(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
