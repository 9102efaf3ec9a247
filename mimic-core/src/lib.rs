// mimic-core/src/lib.rs

//! The core logic for the performance comparison trainer.
//! This crate is responsible for pitch contour extraction, contour
//! alignment, scoring and overlay geometry, plus the headless audio
//! device and WAV helpers the application feeds it with. It contains
//! no GUI code.

pub mod align;
pub mod audio;
pub mod overlay;
pub mod pitch;
pub mod score;
pub mod settings;
pub mod wav;

use align::align_to_model;
use overlay::Overlay;
use pitch::{PitchContour, PitchEstimator};
use settings::AnalysisSettings;

/// A finite, single-channel block of PCM samples.
///
/// Samples are expected in [-1.0, 1.0]. Multi-channel material is reduced
/// to its first channel before it gets here.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    /// Builds a buffer from interleaved frames, keeping only the first channel.
    pub fn from_interleaved(data: &[f32], channels: u16, sample_rate: u32) -> Self {
        let channels = channels.max(1) as usize;
        let samples = data.iter().step_by(channels).copied().collect();
        Self { samples, sample_rate }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Length of the buffer in seconds.
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Reduces the buffer to a (min, max) pair per display column.
    ///
    /// Each column covers `ceil(len / columns)` samples. Columns past the end
    /// of the buffer come back as `(0.0, 0.0)`.
    pub fn waveform_envelope(&self, columns: usize) -> Vec<(f32, f32)> {
        if columns == 0 || self.samples.is_empty() {
            return Vec::new();
        }
        let step = self.samples.len().div_ceil(columns);
        (0..columns)
            .map(|column| {
                let start = (column * step).min(self.samples.len());
                let end = (start + step).min(self.samples.len());
                let chunk = &self.samples[start..end];
                if chunk.is_empty() {
                    return (0.0, 0.0);
                }
                chunk
                    .iter()
                    .fold((1.0f32, -1.0f32), |(lo, hi), &s| (lo.min(s), hi.max(s)))
            })
            .collect()
    }
}

/// The outcome of comparing one attempt against one model performance.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComparisonResult {
    /// Percentage of voiced frames within tolerance, in [0, 100].
    pub score: f32,
    /// Model and aligned-attempt contours in normalized display space.
    pub overlay: Overlay,
}

/// Extracts both pitch contours and compares them.
///
/// The model defines the timeline: the attempt is time-warped onto it.
pub fn compare(
    model: &AudioBuffer,
    user: &AudioBuffer,
    settings: &AnalysisSettings,
) -> ComparisonResult {
    let estimator = PitchEstimator::from_settings(settings);
    let model_contour = pitch::extract_contour(model, &estimator, settings.window_size);
    let user_contour = pitch::extract_contour(user, &estimator, settings.window_size);

    log::debug!(
        "[COMPARE] Model contour: {} frames ({} voiced), user contour: {} frames ({} voiced)",
        model_contour.len(),
        model_contour.voiced_count(),
        user_contour.len(),
        user_contour.voiced_count()
    );

    compare_contours(&model_contour, &user_contour, settings)
}

/// Compares two already extracted contours.
pub fn compare_contours(
    model: &PitchContour,
    user: &PitchContour,
    settings: &AnalysisSettings,
) -> ComparisonResult {
    let Some(pair) = align_to_model(model, user) else {
        log::info!("[COMPARE] Model has nothing voiced after trimming silence");
        return ComparisonResult::default();
    };

    let score = if pair.user().is_empty() {
        log::info!("[COMPARE] Attempt has nothing voiced, drawing the model alone");
        0.0
    } else {
        score::score_aligned(&pair, settings.tolerance_semitones)
    };
    let overlay = overlay::render_aligned(
        &pair,
        settings.overlay_floor_pad,
        settings.overlay_ceiling_pad,
    );

    log::info!("[COMPARE] Score {:.1} over {} aligned frames", score, pair.len());
    ComparisonResult { score, overlay }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_interleaved_keeps_first_channel() {
        let data = [0.1, -0.1, 0.2, -0.2, 0.3, -0.3];
        let buffer = AudioBuffer::from_interleaved(&data, 2, 8000);
        assert_eq!(buffer.samples(), &[0.1, 0.2, 0.3]);
        assert_eq!(buffer.sample_rate(), 8000);
    }

    #[test]
    fn zero_channels_is_treated_as_mono() {
        let buffer = AudioBuffer::from_interleaved(&[0.5, 0.25], 0, 8000);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn duration_uses_sample_rate() {
        let buffer = AudioBuffer::new(vec![0.0; 22050], 44100);
        assert_eq!(buffer.duration_secs(), 0.5);
        assert_eq!(AudioBuffer::new(vec![0.0; 10], 0).duration_secs(), 0.0);
    }

    #[test]
    fn envelope_tracks_min_and_max_per_column() {
        let buffer = AudioBuffer::new(vec![0.5, -0.5, 0.25, 0.75, -1.0], 8000);
        let envelope = buffer.waveform_envelope(3);
        // step = ceil(5 / 3) = 2
        assert_eq!(envelope, vec![(-0.5, 0.5), (0.25, 0.75), (-1.0, -1.0)]);
    }

    #[test]
    fn envelope_pads_columns_past_the_end() {
        let buffer = AudioBuffer::new(vec![0.5, -0.5], 8000);
        let envelope = buffer.waveform_envelope(4);
        assert_eq!(envelope.len(), 4);
        assert_eq!(envelope[0], (0.5, 0.5));
        assert_eq!(envelope[1], (-0.5, -0.5));
        assert_eq!(envelope[3], (0.0, 0.0));
    }

    #[test]
    fn silent_buffers_compare_to_zero_with_empty_overlay() {
        let silence = AudioBuffer::new(vec![0.0; 44100], 44100);
        let result = compare(&silence, &silence, &AnalysisSettings::default());
        assert_eq!(result.score, 0.0);
        assert!(result.overlay.is_empty());
    }
}
