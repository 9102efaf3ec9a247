//! # WAV File Module
//!
//! Loading uploaded model performances and exporting recorded ones.
//! Files of any channel count are reduced to their first channel on load;
//! exports are always mono 16-bit PCM.

use anyhow::{Context, Result, anyhow};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;

use crate::AudioBuffer;

/// Decodes a WAV file into a single-channel buffer.
///
/// Integer samples are scaled into [-1.0, 1.0] by their bit depth;
/// float samples are taken as-is.
pub fn load_wav(path: impl AsRef<Path>) -> Result<AudioBuffer> {
    let path = path.as_ref();
    let mut reader = WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file {}", path.display()))?;
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(anyhow!("WAV file {} declares zero channels", path.display()));
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .context("Failed to decode float samples")?,
        SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(anyhow!("Unsupported bit depth: {}", spec.bits_per_sample));
            }
            let scale = (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .context("Failed to decode integer samples")?
        }
    };

    let buffer = AudioBuffer::from_interleaved(&interleaved, spec.channels, spec.sample_rate);
    log::info!(
        "[WAV] Loaded {} ({} Hz, {} ch, {:.2} s)",
        path.display(),
        spec.sample_rate,
        spec.channels,
        buffer.duration_secs()
    );
    Ok(buffer)
}

/// Writes a buffer as a mono 16-bit PCM WAV file, clamping out-of-range samples.
pub fn save_wav(buffer: &AudioBuffer, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if buffer.sample_rate() == 0 {
        return Err(anyhow!("Cannot export a buffer without a sample rate"));
    }

    let spec = WavSpec {
        channels: 1,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file {}", path.display()))?;
    for &s in buffer.samples() {
        let clamped = s.clamp(-1.0, 1.0);
        let scaled = if clamped < 0.0 {
            clamped * 32768.0
        } else {
            clamped * i16::MAX as f32
        };
        writer.write_sample(scaled as i16)?;
    }
    writer.finalize().context("Failed to finalize WAV file")?;

    log::info!(
        "[WAV] Exported {} samples to {}",
        buffer.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("mimic-wav-{}-{}", std::process::id(), name))
    }

    #[test]
    fn export_then_load_keeps_rate_and_shape() {
        let path = temp_path("export.wav");
        let samples: Vec<f32> = (0..1000).map(|i| ((i as f32) * 0.05).sin() * 0.5).collect();
        let buffer = AudioBuffer::new(samples.clone(), 22050);

        save_wav(&buffer, &path).unwrap();
        let loaded = load_wav(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.sample_rate(), 22050);
        assert_eq!(loaded.len(), samples.len());
        for (a, b) in loaded.samples().iter().zip(&samples) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-3);
        }
    }

    #[test]
    fn export_clamps_out_of_range_samples() {
        let path = temp_path("clamp.wav");
        save_wav(&AudioBuffer::new(vec![2.0, -2.0], 8000), &path).unwrap();
        let loaded = load_wav(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_abs_diff_eq!(loaded.samples()[0], 1.0, epsilon = 1e-3);
        assert_abs_diff_eq!(loaded.samples()[1], -1.0, epsilon = 1e-3);
    }

    #[test]
    fn stereo_file_keeps_first_channel() {
        let path = temp_path("stereo.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for (left, right) in [(0.25f32, -0.75f32), (0.5, -0.5)] {
            writer.write_sample(left).unwrap();
            writer.write_sample(right).unwrap();
        }
        writer.finalize().unwrap();

        let loaded = load_wav(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded.samples(), &[0.25, 0.5]);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_wav(temp_path("missing.wav")).is_err());
    }

    #[test]
    fn export_without_sample_rate_is_an_error() {
        let path = temp_path("no-rate.wav");
        assert!(save_wav(&AudioBuffer::new(vec![0.0], 0), &path).is_err());
    }
}
