//! Analysis and WAV helpers shared by the reverb crates.

pub mod metrics;
pub mod wav;

pub use metrics::MetricsSnapshot;
