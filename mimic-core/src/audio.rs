//! # Audio Device Module
//!
//! This module handles microphone capture and buffer playback using CPAL
//! (Cross-Platform Audio Library). It only moves samples between devices
//! and channels; analysis happens once a recording is complete.
//!
//! ## Features
//! - Default input device capture, reduced to the first channel
//! - Recording accumulator with a hard duration limit
//! - Buffer playback from a shared, resumable cursor
//! - Naive rate conversion when the output device rejects the buffer's rate

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SupportedStreamConfigRange};
use crossbeam_channel::Sender;
use anyhow::{Result, anyhow};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::AudioBuffer;

/// Preferred capture rate in Hz.
pub const TARGET_SAMPLE_RATE: u32 = 44100;

/// Starts audio capture from the default input device.
///
/// Every callback's first-channel samples are forwarded to `sender` as one
/// chunk. Send errors are ignored: a closed channel just means the
/// recording has been stopped.
///
/// # Returns
/// * `Ok((stream, sample_rate))` - Running stream handle and its sample rate
/// * `Err(e)` - No device, no f32 format, or the stream failed to start
pub fn start_input_stream(sender: Sender<Vec<f32>>) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    log::info!("[AUDIO] Using audio input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, TARGET_SAMPLE_RATE)
        .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

    let sample_rate = clamp_rate(&supported_config, TARGET_SAMPLE_RATE);
    let channels = supported_config.channels().max(1) as usize;
    let config: cpal::StreamConfig = supported_config
        .with_sample_rate(cpal::SampleRate(sample_rate))
        .into();

    log::info!(
        "[AUDIO] Selected input format: {} Hz, {} channel(s)",
        sample_rate,
        channels
    );

    let err_fn = |err| log::error!("[AUDIO] An error occurred on the input stream: {}", err);

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            let chunk: Vec<f32> = data.iter().step_by(channels).copied().collect();
            let _ = sender.try_send(chunk);
        },
        err_fn,
        None,
    )?;

    stream.play()?;

    Ok((stream, sample_rate))
}

/// Finds the best supported f32 configuration for the target sample rate.
///
/// Mono configurations win over multi-channel ones; within the same
/// channel preference the range closest to `target_rate` wins.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .min_by_key(|c| {
            let min_diff = (c.min_sample_rate().0 as i64 - target_rate as i64).abs();
            let max_diff = (c.max_sample_rate().0 as i64 - target_rate as i64).abs();
            let contains = c.min_sample_rate().0 <= target_rate && target_rate <= c.max_sample_rate().0;
            let rate_distance = if contains { 0 } else { min_diff.min(max_diff) };
            (c.channels() != 1, rate_distance)
        })
}

/// The rate closest to `target_rate` that a configuration range supports.
fn clamp_rate(config: &SupportedStreamConfigRange, target_rate: u32) -> u32 {
    target_rate.clamp(config.min_sample_rate().0, config.max_sample_rate().0)
}

/// Collects captured chunks into one buffer, up to a fixed length.
#[derive(Debug, Clone)]
pub struct RecordingAccumulator {
    samples: Vec<f32>,
    sample_rate: u32,
    limit: usize,
}

impl RecordingAccumulator {
    /// Creates an accumulator holding at most `max_secs` seconds of audio.
    pub fn new(sample_rate: u32, max_secs: u32) -> Self {
        let limit = sample_rate as usize * max_secs as usize;
        Self {
            samples: Vec::with_capacity(limit.min(sample_rate as usize * 10)),
            sample_rate,
            limit,
        }
    }

    /// Appends a chunk, dropping anything past the limit.
    ///
    /// Returns `true` once the limit has been reached.
    pub fn push(&mut self, chunk: &[f32]) -> bool {
        let room = self.limit.saturating_sub(self.samples.len());
        self.samples.extend_from_slice(&chunk[..chunk.len().min(room)]);
        self.is_full()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.limit
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Recorded length in seconds.
    pub fn elapsed_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    pub fn into_buffer(self) -> AudioBuffer {
        AudioBuffer::new(self.samples, self.sample_rate)
    }
}

/// Shared playback position, in source samples.
///
/// The GUI keeps one per buffer so a paused playback resumes where it left
/// off. `finished` is raised by the output callback at the end of the buffer.
#[derive(Debug, Default)]
pub struct PlaybackCursor {
    position: AtomicUsize,
    finished: AtomicBool,
}

impl PlaybackCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> usize {
        self.position.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }

    /// Moves back to the first sample and clears the finished flag.
    pub fn rewind(&self) {
        self.position.store(0, Ordering::Relaxed);
        self.finished.store(false, Ordering::Relaxed);
    }

    fn store(&self, position: usize, finished: bool) {
        self.position.store(position, Ordering::Relaxed);
        self.finished.store(finished, Ordering::Relaxed);
    }
}

/// Fills one interleaved output block from `samples`, starting at `phase`.
///
/// `step` is the number of source samples per output frame (source rate
/// over device rate). Each source sample is copied to every channel. Frames
/// past the end are silent.
///
/// # Returns
/// * `(next_phase, finished)` - where the next block starts and whether the
///   end of the source was reached
pub fn fill_output_block(
    out: &mut [f32],
    channels: usize,
    samples: &[f32],
    phase: f64,
    step: f64,
) -> (f64, bool) {
    let channels = channels.max(1);
    let mut phase = phase;
    for frame in out.chunks_mut(channels) {
        let value = samples.get(phase as usize).copied().unwrap_or(0.0);
        frame.fill(value);
        if (phase as usize) < samples.len() {
            phase += step;
        }
    }
    let finished = phase as usize >= samples.len();
    (phase, finished)
}

/// Starts playing `buffer` on the default output device from `cursor`.
///
/// The stream keeps running silently after the end of the buffer; the
/// owner drops it once `cursor.is_finished()` turns true.
pub fn start_output_stream(
    buffer: Arc<AudioBuffer>,
    cursor: Arc<PlaybackCursor>,
) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| anyhow!("No output device available"))?;

    log::info!("[AUDIO] Using audio output device: {}", device.name()?);

    let source_rate = buffer.sample_rate();
    if source_rate == 0 {
        return Err(anyhow!("Cannot play a buffer without a sample rate"));
    }

    let configs = device.supported_output_configs()?.collect::<Vec<_>>();
    let supported_config = configs
        .into_iter()
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .find(|c| c.min_sample_rate().0 <= source_rate && source_rate <= c.max_sample_rate().0)
        .map(|c| c.with_sample_rate(cpal::SampleRate(source_rate)))
        .map_or_else(|| device.default_output_config(), Ok)?;

    if supported_config.sample_format() != SampleFormat::F32 {
        return Err(anyhow!(
            "Output device only offers {:?} samples",
            supported_config.sample_format()
        ));
    }

    let device_rate = supported_config.sample_rate().0;
    let channels = supported_config.channels() as usize;
    let config: cpal::StreamConfig = supported_config.into();
    let step = source_rate as f64 / device_rate as f64;

    log::info!(
        "[AUDIO] Playing {:.2} s at {} Hz on a {} Hz device",
        buffer.duration_secs(),
        source_rate,
        device_rate
    );

    let mut phase = cursor.position() as f64;
    let callback_cursor = Arc::clone(&cursor);
    let err_fn = |err| log::error!("[AUDIO] An error occurred on the output stream: {}", err);

    let stream = device.build_output_stream(
        &config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            let (next, finished) = fill_output_block(data, channels, buffer.samples(), phase, step);
            phase = next;
            callback_cursor.store(phase as usize, finished);
        },
        err_fn,
        None,
    )?;

    stream.play()?;

    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpal::{SampleRate, SupportedBufferSize};

    fn range(channels: u16, min: u32, max: u32, format: SampleFormat) -> SupportedStreamConfigRange {
        SupportedStreamConfigRange::new(
            channels,
            SampleRate(min),
            SampleRate(max),
            SupportedBufferSize::Unknown,
            format,
        )
    }

    #[test]
    fn prefers_mono_f32_configs() {
        let configs = vec![
            range(2, 8000, 96000, SampleFormat::F32),
            range(1, 48000, 48000, SampleFormat::F32),
            range(1, 8000, 96000, SampleFormat::I16),
        ];
        let chosen = find_supported_config(configs, 44100).unwrap();
        assert_eq!(chosen.channels(), 1);
        assert_eq!(chosen.sample_format(), SampleFormat::F32);
        assert_eq!(clamp_rate(&chosen, 44100), 48000);
    }

    #[test]
    fn falls_back_to_stereo_when_no_mono_exists() {
        let configs = vec![range(2, 8000, 96000, SampleFormat::F32)];
        let chosen = find_supported_config(configs, 44100).unwrap();
        assert_eq!(chosen.channels(), 2);
        assert_eq!(clamp_rate(&chosen, 44100), 44100);
    }

    #[test]
    fn no_f32_config_means_none() {
        let configs = vec![range(1, 8000, 96000, SampleFormat::I16)];
        assert!(find_supported_config(configs, 44100).is_none());
    }

    #[test]
    fn accumulator_stops_at_limit() {
        let mut acc = RecordingAccumulator::new(10, 1);
        assert!(!acc.push(&[0.1; 6]));
        assert!(acc.push(&[0.2; 6]));
        assert_eq!(acc.len(), 10);
        assert!(acc.push(&[0.3; 6]));
        assert_eq!(acc.elapsed_secs(), 1.0);
        let buffer = acc.into_buffer();
        assert_eq!(buffer.len(), 10);
        assert_eq!(buffer.sample_rate(), 10);
        assert_eq!(buffer.samples()[9], 0.2);
    }

    #[test]
    fn output_block_duplicates_mono_into_channels() {
        let mut out = [9.0f32; 6];
        let (phase, finished) = fill_output_block(&mut out, 2, &[0.1, 0.2, 0.3], 0.0, 1.0);
        assert_eq!(out, [0.1, 0.1, 0.2, 0.2, 0.3, 0.3]);
        assert_eq!(phase, 3.0);
        assert!(finished);
    }

    #[test]
    fn output_block_pads_with_silence_and_resumes() {
        let samples = [0.5, 0.25, 0.125];
        let mut out = [1.0f32; 2];
        let (phase, finished) = fill_output_block(&mut out, 1, &samples, 1.0, 1.0);
        assert_eq!(out, [0.25, 0.125]);
        assert!(finished);

        let mut tail = [1.0f32; 2];
        let (_, finished) = fill_output_block(&mut tail, 1, &samples, phase, 1.0);
        assert_eq!(tail, [0.0, 0.0]);
        assert!(finished);
    }

    #[test]
    fn output_block_steps_through_source_rate() {
        let samples = [0.0, 0.1, 0.2, 0.3];
        let mut out = [0.0f32; 2];
        let (phase, finished) = fill_output_block(&mut out, 1, &samples, 0.0, 2.0);
        assert_eq!(out, [0.0, 0.2]);
        assert_eq!(phase, 4.0);
        assert!(finished);
    }

    #[test]
    fn cursor_rewind_resets_state() {
        let cursor = PlaybackCursor::new();
        cursor.store(42, true);
        assert_eq!(cursor.position(), 42);
        assert!(cursor.is_finished());
        cursor.rewind();
        assert_eq!(cursor.position(), 0);
        assert!(!cursor.is_finished());
    }
}
