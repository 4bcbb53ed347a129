//! WAV file I/O through `hound`.
//!
//! Samples are exchanged as `f64` in `[-1, 1]`, one `Vec` per channel.
//! Output is always 32-bit float.

use std::path::Path;

/// Decoded audio, one buffer per channel.
#[derive(Debug, Clone)]
pub struct Audio {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f64>>,
}

impl Audio {
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }
}

/// Read any integer or float WAV and deinterleave it.
pub fn read(path: &Path) -> Result<Audio, hound::Error> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let n_channels = spec.channels.max(1) as usize;

    let samples: Vec<f64> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max_val = (1_i64 << (spec.bits_per_sample - 1)) as f64;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f64 / max_val))
                .collect::<Result<_, _>>()?
        }
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.map(|v| v as f64))
            .collect::<Result<_, _>>()?,
    };

    let mut channels = vec![Vec::with_capacity(samples.len() / n_channels); n_channels];
    for frame in samples.chunks_exact(n_channels) {
        for (ch, &s) in frame.iter().enumerate() {
            channels[ch].push(s);
        }
    }
    Ok(Audio {
        sample_rate: spec.sample_rate,
        channels,
    })
}

/// Interleave and write as 32-bit float. The shortest channel sets the length.
pub fn write(path: &Path, sample_rate: u32, channels: &[&[f64]]) -> Result<(), hound::Error> {
    let spec = hound::WavSpec {
        channels: channels.len() as u16,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let frames = channels.iter().map(|c| c.len()).min().unwrap_or(0);
    let mut writer = hound::WavWriter::create(path, spec)?;
    for i in 0..frames {
        for ch in channels {
            writer.write_sample(ch[i] as f32)?;
        }
    }
    writer.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stereo_file_keeps_channel_order() {
        let path = std::env::temp_dir().join(format!("shared-dsp-wav-{}.wav", std::process::id()));
        let left = [0.25, -0.5, 0.75];
        let right = [0.0, 0.125, -1.0];
        write(&path, 48000, &[&left[..], &right[..]]).unwrap();

        let audio = read(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(audio.sample_rate, 48000);
        assert_eq!(audio.frames(), 3);
        assert_eq!(audio.channels[0], left.to_vec());
        assert_eq!(audio.channels[1], right.to_vec());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(read(Path::new("/nonexistent/definitely-missing.wav")).is_err());
    }
}
