//! Offline renderer for the FDN reverb.
//!
//! Reads a mono or stereo WAV (or generates a unit click), renders it through
//! the reverb with a tail appended, writes 32-bit float WAV and prints a
//! short level and decay report to stderr.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use shared_dsp::metrics::{decay_time, MetricsSnapshot};
use shared_dsp::wav;
use verb_dsp::presets;
use verb_dsp::{render_verb_stereo, LineCount, VerbParams};

#[derive(Parser, Debug)]
#[command(name = "verb-cli", about = "Render audio through the Householder FDN reverb")]
struct Cli {
    /// Input WAV file (omit to render a unit click)
    #[arg()]
    input_wav: Option<PathBuf>,

    /// Output WAV file
    #[arg(short, long, default_value = "verb_output.wav")]
    output: PathBuf,

    /// Embedded preset name
    #[arg(long, conflicts_with = "preset_file")]
    preset: Option<String>,

    /// Preset JSON file
    #[arg(long)]
    preset_file: Option<PathBuf>,

    #[arg(long)]
    replace: Option<f64>,
    #[arg(long)]
    brightness: Option<f64>,
    #[arg(long)]
    detune: Option<f64>,
    #[arg(long)]
    size: Option<f64>,
    #[arg(long)]
    wet: Option<f64>,

    /// Line count: 4 or 8
    #[arg(long, value_parser = parse_lines)]
    lines: Option<LineCount>,

    #[arg(long)]
    seed: Option<u64>,

    /// Seconds of silence appended so the tail is rendered
    #[arg(long, default_value_t = 4.0)]
    tail: f64,

    /// Sample rate for the generated click (ignored with an input file)
    #[arg(long, default_value_t = 44100)]
    sample_rate: u32,

    /// Print the embedded presets and exit
    #[arg(long)]
    list_presets: bool,
}

fn parse_lines(s: &str) -> Result<LineCount, String> {
    match s {
        "4" | "four" => Ok(LineCount::Four),
        "8" | "eight" => Ok(LineCount::Eight),
        _ => Err(format!("expected 4 or 8, got '{s}'")),
    }
}

impl Cli {
    /// Preset (if any) with per-control flags layered on top.
    fn params(&self) -> Result<VerbParams> {
        let mut params = if let Some(name) = &self.preset {
            presets::find(name)?.params
        } else if let Some(path) = &self.preset_file {
            presets::load_file(path)
                .with_context(|| format!("loading preset {}", path.display()))?
                .params
        } else {
            VerbParams::default()
        };

        let overrides = [
            (&mut params.replace, self.replace),
            (&mut params.brightness, self.brightness),
            (&mut params.detune, self.detune),
            (&mut params.size, self.size),
            (&mut params.wet, self.wet),
        ];
        for (slot, value) in overrides {
            if let Some(v) = value {
                *slot = v;
            }
        }
        if let Some(lines) = self.lines {
            params.lines = lines;
        }
        if let Some(seed) = self.seed {
            params.seed = seed;
        }
        params.normalize();
        Ok(params)
    }
}

fn list_presets() {
    for p in presets::embedded() {
        eprintln!("{:<16} {:<8} {}", p.name, p.category, p.description);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.list_presets {
        list_presets();
        return Ok(());
    }
    if !cli.tail.is_finite() || cli.tail < 0.0 {
        bail!("--tail must be a non-negative number of seconds");
    }
    let params = cli.params()?;

    let (sample_rate, mut left, mut right) = match &cli.input_wav {
        Some(path) => {
            let audio = wav::read(path).with_context(|| format!("reading {}", path.display()))?;
            eprintln!(
                "Input: {} ch, {} Hz, {} samples/ch",
                audio.channels.len(),
                audio.sample_rate,
                audio.frames()
            );
            match audio.channels.as_slice() {
                [mono] => (audio.sample_rate, mono.clone(), mono.clone()),
                [l, r] => (audio.sample_rate, l.clone(), r.clone()),
                other => bail!("unsupported channel count: {}", other.len()),
            }
        }
        None => {
            eprintln!("Input: unit click at {} Hz", cli.sample_rate);
            (cli.sample_rate, vec![1.0], vec![1.0])
        }
    };

    let tail = (cli.tail * sample_rate as f64) as usize;
    left.resize(left.len() + tail, 0.0);
    right.resize(right.len() + tail, 0.0);

    eprintln!(
        "Rendering: replace={:.2} brightness={:.2} detune={:.2} size={:.2} wet={:.2}",
        params.replace, params.brightness, params.detune, params.size, params.wet
    );
    eprintln!("  lines={:?} seed={}", params.lines, params.seed);
    let (out_l, out_r) = render_verb_stereo(&left, &right, &params, sample_rate as f64)?;

    wav::write(&cli.output, sample_rate, &[out_l.as_slice(), out_r.as_slice()])
        .with_context(|| format!("writing {}", cli.output.display()))?;

    let mono: Vec<f64> = out_l.iter().zip(out_r.iter()).map(|(l, r)| 0.5 * (l + r)).collect();
    let levels = MetricsSnapshot::of(&mono);
    eprintln!("Written {} ({} samples)", cli.output.display(), out_l.len());
    eprintln!("  peak: {:.4}  rms: {:.4}", levels.peak, levels.rms);
    match decay_time(&mono, sample_rate as f64, 60.0) {
        Some(t) => eprintln!("  decay (-60 dB): {t:.2} s"),
        None if params.is_frozen() => eprintln!("  decay (-60 dB): frozen tail"),
        None => eprintln!("  decay (-60 dB): longer than the render"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["verb-cli"]);
        assert!(cli.input_wav.is_none());
        assert_eq!(cli.sample_rate, 44100);
        let p = cli.params().unwrap();
        assert_eq!(p.size, VerbParams::default().size);
    }

    #[test]
    fn test_overrides_layer_on_preset() {
        let cli = Cli::parse_from([
            "verb-cli",
            "--preset",
            "small_room",
            "--wet",
            "0.9",
            "--lines",
            "4",
            "--seed",
            "5",
        ]);
        let p = cli.params().unwrap();
        let base = presets::find("small_room").unwrap().params;
        assert_eq!(p.wet, 0.9);
        assert_eq!(p.size, base.size);
        assert_eq!(p.lines, LineCount::Four);
        assert_eq!(p.seed, 5);
    }

    #[test]
    fn test_overrides_are_clamped() {
        let cli = Cli::parse_from(["verb-cli", "--size", "3.0"]);
        assert_eq!(cli.params().unwrap().size, 1.0);
    }

    #[test]
    fn test_unknown_preset_fails() {
        let cli = Cli::parse_from(["verb-cli", "--preset", "nowhere"]);
        assert!(cli.params().is_err());
    }

    #[test]
    fn test_preset_flags_conflict() {
        let both = ["verb-cli", "--preset", "galactic", "--preset-file", "x.json"];
        assert!(Cli::try_parse_from(both).is_err());
        assert!(Cli::try_parse_from(["verb-cli", "--lines", "6"]).is_err());
    }
}
