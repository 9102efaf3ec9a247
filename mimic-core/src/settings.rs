//! # Analysis Settings Module
//!
//! Tunable parameters for pitch extraction, scoring and overlay layout.
//! The defaults are the values the comparison is tuned for; the
//! struct exists so the application can persist adjustments as JSON.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Number of samples per analysis window.
pub const WINDOW_SIZE: usize = 4096;

/// RMS level below which a window is treated as silence.
pub const SILENCE_RMS: f32 = 0.01;

/// Lowest fundamental frequency searched, in Hz.
pub const MIN_FREQUENCY: f32 = 50.0;

/// Highest fundamental frequency searched, in Hz.
pub const MAX_FREQUENCY: f32 = 1500.0;

/// The best lag's correlation must exceed this fraction of the window energy.
pub const CORRELATION_RATIO: f32 = 0.2;

/// Maximum pitch distance, in semitones, for two frames to count as a match.
pub const TOLERANCE_SEMITONES: f32 = 1.0;

/// Headroom multiplier below the lowest voiced frequency in the overlay.
pub const OVERLAY_FLOOR_PAD: f32 = 0.8;

/// Headroom multiplier above the highest voiced frequency in the overlay.
pub const OVERLAY_CEILING_PAD: f32 = 1.2;

/// Recording stops automatically after this many seconds.
pub const MAX_RECORDING_SECS: u32 = 180;

/// All user-adjustable analysis parameters.
///
/// Missing fields in a settings file fall back to their defaults, so a
/// file only needs to list what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Samples per non-overlapping analysis window.
    pub window_size: usize,
    /// RMS energy gate for the pitch estimator.
    pub silence_rms: f32,
    /// Lower bound of the pitch search range in Hz.
    pub min_frequency: f32,
    /// Upper bound of the pitch search range in Hz.
    pub max_frequency: f32,
    /// Periodicity confidence gate relative to window energy.
    pub correlation_ratio: f32,
    /// Binary match tolerance used by the score.
    pub tolerance_semitones: f32,
    /// Multiplier applied to the lowest overlay frequency.
    pub overlay_floor_pad: f32,
    /// Multiplier applied to the highest overlay frequency.
    pub overlay_ceiling_pad: f32,
    /// Recording length limit in seconds.
    pub max_recording_secs: u32,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            window_size: WINDOW_SIZE,
            silence_rms: SILENCE_RMS,
            min_frequency: MIN_FREQUENCY,
            max_frequency: MAX_FREQUENCY,
            correlation_ratio: CORRELATION_RATIO,
            tolerance_semitones: TOLERANCE_SEMITONES,
            overlay_floor_pad: OVERLAY_FLOOR_PAD,
            overlay_ceiling_pad: OVERLAY_CEILING_PAD,
            max_recording_secs: MAX_RECORDING_SECS,
        }
    }
}

/// Saves the settings as pretty-printed JSON.
pub fn save_settings(settings: &AnalysisSettings, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let json_string =
        serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;
    let mut file = File::create(path)
        .with_context(|| format!("Failed to create settings file {}", path.display()))?;
    file.write_all(json_string.as_bytes())?;
    log::info!("[SETTINGS] Saved settings to {}", path.display());
    Ok(())
}

/// Loads settings from a JSON file written by [`save_settings`] or by hand.
pub fn load_settings(path: impl AsRef<Path>) -> Result<AnalysisSettings> {
    let path = path.as_ref();
    let mut file = File::open(path)
        .with_context(|| format!("Failed to open settings file {}", path.display()))?;
    let mut data = String::new();
    file.read_to_string(&mut data)?;
    let settings: AnalysisSettings = serde_json::from_str(&data)
        .with_context(|| format!("Invalid settings in {}", path.display()))?;
    log::info!("[SETTINGS] Loaded settings from {}", path.display());
    Ok(settings)
}
