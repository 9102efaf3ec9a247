//! # Pitch Detection Module
//!
//! Turns raw audio into a pitch contour: one fundamental-frequency
//! estimate per fixed-size, non-overlapping window.
//!
//! ## Features
//! - Time-domain autocorrelation pitch estimation (50-1500 Hz by default)
//! - RMS noise gate that short-circuits silent windows
//! - Periodicity gate relative to window energy
//! - Contours that encode "no pitch" as `None`, never as a magic number

use crate::AudioBuffer;
use crate::settings::{
    AnalysisSettings, CORRELATION_RATIO, MAX_FREQUENCY, MIN_FREQUENCY, SILENCE_RMS, WINDOW_SIZE,
};

/// A sequence of per-window pitch estimates.
///
/// Every voiced frame holds a positive, finite frequency in Hz; anything
/// else is stored as `None` (silence, noise, or low confidence).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PitchContour {
    frames: Vec<Option<f32>>,
}

impl PitchContour {
    /// Creates a contour, demoting any non-positive or non-finite value to unvoiced.
    pub fn new(frames: Vec<Option<f32>>) -> Self {
        frames.into_iter().collect()
    }

    /// Creates a contour from raw Hz values, where any value `<= 0` means unvoiced.
    pub fn from_hz(values: impl IntoIterator<Item = f32>) -> Self {
        values.into_iter().map(Some).collect()
    }

    pub fn frames(&self) -> &[Option<f32>] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of frames carrying a pitch.
    pub fn voiced_count(&self) -> usize {
        self.frames.iter().filter(|f| f.is_some()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<f32>> + '_ {
        self.frames.iter().copied()
    }
}

impl FromIterator<Option<f32>> for PitchContour {
    fn from_iter<I: IntoIterator<Item = Option<f32>>>(iter: I) -> Self {
        let frames = iter
            .into_iter()
            .map(|f| f.filter(|hz| hz.is_finite() && *hz > 0.0))
            .collect();
        Self { frames }
    }
}

/// Autocorrelation pitch estimator for a single analysis window.
///
/// The confidence gate compares the raw (unnormalized) correlation of the
/// best lag against the energy of the whole window. Long lags overlap fewer
/// samples and are not compensated for that.
#[derive(Debug, Clone, PartialEq)]
pub struct PitchEstimator {
    /// Minimum RMS for a window to be analysed at all.
    pub silence_rms: f32,
    /// Lowest detectable frequency in Hz (sets the longest lag).
    pub min_frequency: f32,
    /// Highest detectable frequency in Hz (sets the shortest lag).
    pub max_frequency: f32,
    /// Fraction of the window energy the best correlation must exceed.
    pub correlation_ratio: f32,
}

impl Default for PitchEstimator {
    fn default() -> Self {
        Self {
            silence_rms: SILENCE_RMS,
            min_frequency: MIN_FREQUENCY,
            max_frequency: MAX_FREQUENCY,
            correlation_ratio: CORRELATION_RATIO,
        }
    }
}

impl PitchEstimator {
    pub fn from_settings(settings: &AnalysisSettings) -> Self {
        Self {
            silence_rms: settings.silence_rms,
            min_frequency: settings.min_frequency,
            max_frequency: settings.max_frequency,
            correlation_ratio: settings.correlation_ratio,
        }
    }

    /// Estimates the fundamental frequency of one window.
    ///
    /// # Returns
    /// * `Some(frequency)` - `sample_rate / best_lag` in Hz
    /// * `None` - window too quiet, or not periodic enough
    pub fn estimate(&self, window: &[f32], sample_rate: u32) -> Option<f32> {
        let size = window.len();
        if size == 0 || sample_rate == 0 {
            return None;
        }

        // --- Noise Gate: the correlation search never runs on silence ---
        let sum_of_squares: f64 = window.iter().map(|&s| s as f64 * s as f64).sum();
        let rms = (sum_of_squares / size as f64).sqrt();
        if rms < self.silence_rms as f64 {
            return None;
        }

        let min_lag = ((sample_rate as f64 / self.max_frequency as f64).floor() as usize).max(1);
        let max_lag = (sample_rate as f64 / self.min_frequency as f64).floor() as usize;

        // Strict `>` keeps the shortest lag on ties.
        let mut best_lag = None;
        let mut max_correlation = 0.0f64;
        for lag in min_lag..=max_lag {
            if lag >= size {
                break;
            }
            let correlation: f64 = window[..size - lag]
                .iter()
                .zip(&window[lag..])
                .map(|(&a, &b)| a as f64 * b as f64)
                .sum();
            if correlation > max_correlation {
                max_correlation = correlation;
                best_lag = Some(lag);
            }
        }

        let best_lag = best_lag?;
        if max_correlation > self.correlation_ratio as f64 * sum_of_squares {
            Some(sample_rate as f32 / best_lag as f32)
        } else {
            None
        }
    }
}

/// Estimates the pitch of one window with the default thresholds.
pub fn detect_pitch_autocorrelation(signal: &[f32], sample_rate: u32) -> Option<f32> {
    PitchEstimator::default().estimate(signal, sample_rate)
}

/// Slices a buffer into consecutive windows and estimates each one.
///
/// Windows start every `window_size` samples and are taken only while a
/// window fits strictly inside the buffer. Trailing samples that cannot
/// complete that window are dropped, never zero-padded, so a buffer whose
/// length is an exact multiple of `window_size` also loses its last window.
pub fn extract_contour(
    buffer: &AudioBuffer,
    estimator: &PitchEstimator,
    window_size: usize,
) -> PitchContour {
    if window_size == 0 {
        log::warn!("[PITCH] Window size of zero requested, returning an empty contour");
        return PitchContour::default();
    }

    let samples = buffer.samples();
    let sample_rate = buffer.sample_rate();
    let frame_count = samples.len().saturating_sub(1) / window_size;

    (0..frame_count)
        .map(|frame| {
            let start = frame * window_size;
            estimator.estimate(&samples[start..start + window_size], sample_rate)
        })
        .collect()
}

/// Extracts a contour with the default estimator and `WINDOW_SIZE` windows.
pub fn extract_pitch_sequence(buffer: &AudioBuffer) -> PitchContour {
    extract_contour(buffer, &PitchEstimator::default(), WINDOW_SIZE)
}
