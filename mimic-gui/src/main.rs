//! # Mimic - Performance Comparison GUI
//!
//! This module contains the desktop application around the comparison
//! engine. The user records or loads a model performance, records an
//! attempt, and gets a score plus an overlay of both pitch contours.
//!
//! ## Architecture
//! - **Main Thread**: Iced GUI application with dark theme
//! - **Audio Threads**: One capture thread while recording, one playback
//!   thread per playing track, each owning its CPAL stream
//! - **Comparison Thread**: Runs the analysis once per finished attempt
//! - **Communication**: Crossbeam channels, polled on a 16 ms tick

mod ui;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use cpal::traits::StreamTrait;
use iced::{Element, Subscription, Theme};
use mimic_core::{
    AudioBuffer, ComparisonResult, compare,
    audio::{self, PlaybackCursor, RecordingAccumulator},
    overlay::Overlay,
    settings::{self, AnalysisSettings},
    wav,
};
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use ui::main_display::create_main_view;

/// Settings file looked up in the working directory.
const SETTINGS_PATH: &str = "mimic_settings.json";

/// Main entry point for the Mimic application.
pub fn main() -> iced::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("[MAIN] Starting Mimic application...");
    let result = iced::application("Mimic", MimicApp::update, MimicApp::view)
        .subscription(MimicApp::subscription)
        .theme(MimicApp::theme)
        .run();
    log::info!("[MAIN] Application finished with result: {:?}", result);
    result
}

/// Which of the two performances a control acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Track {
    /// The reference performance
    Model,
    /// The user's attempt
    User,
}

impl Track {
    pub fn label(self) -> &'static str {
        match self {
            Track::Model => "Model",
            Track::User => "Attempt",
        }
    }
}

/// Application message types for the Iced GUI framework.
#[derive(Debug, Clone)]
pub enum Message {
    // Transport
    Record(Track),
    StopRecording(Track),
    Play(Track),
    Pause(Track),

    // Model file handling
    ModelPathChanged(String),
    LoadModel,
    ExportModel,

    // Settings file
    SaveSettings,
    ReloadSettings,

    // Continuous update message
    Tick,
}

/// What the score area currently shows.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreDisplay {
    /// No comparison yet
    Empty,
    /// Analysis is running on the comparison thread
    Calculating,
    /// Counting up towards the final score, one point per tick
    Counting { shown: f32, target: f32 },
}

/// Per-track data needed for rendering.
#[derive(Debug, Clone, Default)]
pub struct TrackDisplay {
    pub status: String,
    pub buffer: Option<Arc<AudioBuffer>>,
    pub playing: bool,
}

/// UI-specific data needed for rendering the interface.
#[derive(Debug, Clone)]
pub struct AppDisplayData {
    pub model: TrackDisplay,
    pub user: TrackDisplay,
    /// The track currently being recorded, if any
    pub recording: Option<Track>,
    /// Exporting only makes sense for a model recorded in the app
    pub model_recorded: bool,
    pub model_path: String,
    pub score: ScoreDisplay,
    pub overlay: Overlay,
    pub settings: AnalysisSettings,
    pub settings_status: String,
}

impl AppDisplayData {
    pub fn track(&self, track: Track) -> &TrackDisplay {
        match track {
            Track::Model => &self.model,
            Track::User => &self.user,
        }
    }

    fn track_mut(&mut self, track: Track) -> &mut TrackDisplay {
        match track {
            Track::Model => &mut self.model,
            Track::User => &mut self.user,
        }
    }
}

/// Startup/failure report from the capture thread.
#[derive(Debug)]
enum WorkerStatus {
    Started(u32),
    Failed(String),
}

/// Result of polling the capture thread once.
enum RecordingPoll {
    Running,
    LimitReached,
    Failed(String),
}

/// Capture thread management structure.
///
/// The thread owns the input stream; samples arrive on `chunk_rx` and are
/// collected here on the GUI thread.
#[derive(Debug)]
struct RecordingWorker {
    track: Track,
    max_secs: u32,
    shutdown_tx: Sender<()>,
    status_rx: Receiver<WorkerStatus>,
    chunk_rx: Receiver<Vec<f32>>,
    accumulator: Option<RecordingAccumulator>,
    thread_handle: Option<JoinHandle<()>>,
}

impl RecordingWorker {
    fn spawn(track: Track, max_secs: u32) -> Self {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
        let (status_tx, status_rx) = crossbeam_channel::bounded(1);
        let (chunk_tx, chunk_rx) = crossbeam_channel::unbounded::<Vec<f32>>();

        let thread_handle = thread::spawn(move || {
            log::info!("[AUDIO-THREAD] Starting capture for {}", track.label());
            let (stream, sample_rate) = match audio::start_input_stream(chunk_tx) {
                Ok(tuple) => tuple,
                Err(e) => {
                    log::error!("[AUDIO-THREAD] Fatal error starting capture: {:#}", e);
                    let _ = status_tx.send(WorkerStatus::Failed(e.to_string()));
                    return;
                }
            };
            let _ = status_tx.send(WorkerStatus::Started(sample_rate));

            // Blocks until a stop is requested or the GUI side goes away.
            let _ = shutdown_rx.recv();

            if let Err(e) = stream.pause() {
                log::warn!("[AUDIO-THREAD] Error pausing input stream: {}", e);
            }
            drop(stream);
            log::info!("[AUDIO-THREAD] Capture thread finished");
        });

        Self {
            track,
            max_secs,
            shutdown_tx,
            status_rx,
            chunk_rx,
            accumulator: None,
            thread_handle: Some(thread_handle),
        }
    }

    fn poll(&mut self) -> RecordingPoll {
        while let Ok(status) = self.status_rx.try_recv() {
            match status {
                WorkerStatus::Started(sample_rate) => {
                    log::info!("[MAIN] Capture running at {} Hz", sample_rate);
                    self.accumulator = Some(RecordingAccumulator::new(sample_rate, self.max_secs));
                }
                WorkerStatus::Failed(message) => return RecordingPoll::Failed(message),
            }
        }

        // Chunks stay queued until the sample rate is known.
        if let Some(accumulator) = self.accumulator.as_mut() {
            while let Ok(chunk) = self.chunk_rx.try_recv() {
                if accumulator.push(&chunk) {
                    return RecordingPoll::LimitReached;
                }
            }
        }
        RecordingPoll::Running
    }

    /// Seconds captured so far.
    fn elapsed_secs(&self) -> f32 {
        self.accumulator.as_ref().map_or(0.0, |a| a.elapsed_secs())
    }

    /// Stops the capture thread and returns everything recorded.
    fn finish(mut self) -> Option<AudioBuffer> {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                log::error!("[MAIN] Capture thread panicked");
            }
        }

        // Pick up a late start message and the samples still in flight.
        if let RecordingPoll::Failed(message) = self.poll() {
            log::error!("[MAIN] Capture failed: {}", message);
        }
        self.accumulator.take().map(RecordingAccumulator::into_buffer)
    }
}

/// Playback thread management structure.
#[derive(Debug)]
struct PlaybackWorker {
    shutdown_tx: Sender<()>,
    failure_rx: Receiver<String>,
    thread_handle: Option<JoinHandle<()>>,
}

impl PlaybackWorker {
    fn spawn(track: Track, buffer: Arc<AudioBuffer>, cursor: Arc<PlaybackCursor>) -> Self {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
        let (failure_tx, failure_rx) = crossbeam_channel::bounded(1);

        let thread_handle = thread::spawn(move || {
            log::info!(
                "[PLAYBACK-THREAD] Playing {} from sample {}",
                track.label(),
                cursor.position()
            );
            let stream = match audio::start_output_stream(buffer, Arc::clone(&cursor)) {
                Ok(stream) => stream,
                Err(e) => {
                    log::error!("[PLAYBACK-THREAD] Error starting playback: {:#}", e);
                    let _ = failure_tx.send(e.to_string());
                    return;
                }
            };

            loop {
                match shutdown_rx.recv_timeout(Duration::from_millis(20)) {
                    Err(RecvTimeoutError::Timeout) if !cursor.is_finished() => continue,
                    _ => break,
                }
            }

            if let Err(e) = stream.pause() {
                log::warn!("[PLAYBACK-THREAD] Error pausing output stream: {}", e);
            }
            drop(stream);
            log::info!("[PLAYBACK-THREAD] Playback thread finished");
        });

        Self {
            shutdown_tx,
            failure_rx,
            thread_handle: Some(thread_handle),
        }
    }

    fn is_done(&self) -> bool {
        self.thread_handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Stops playback and returns the failure message, if the stream never started.
    fn stop(mut self) -> Option<String> {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                log::error!("[MAIN] Playback thread panicked");
            }
        }
        self.failure_rx.try_recv().ok()
    }
}

/// Main application state.
#[derive(Debug)]
struct MimicApp {
    recording: Option<RecordingWorker>,
    model_playback: Option<PlaybackWorker>,
    user_playback: Option<PlaybackWorker>,
    model_cursor: Arc<PlaybackCursor>,
    user_cursor: Arc<PlaybackCursor>,
    comparison_rx: Option<Receiver<ComparisonResult>>,

    // Single source of truth for all display data
    display_data: AppDisplayData,
}

impl Default for MimicApp {
    fn default() -> Self {
        log::info!("[MAIN] Creating MimicApp...");
        let (settings, settings_status) = initial_settings();
        Self {
            recording: None,
            model_playback: None,
            user_playback: None,
            model_cursor: Arc::new(PlaybackCursor::new()),
            user_cursor: Arc::new(PlaybackCursor::new()),
            comparison_rx: None,
            display_data: AppDisplayData {
                model: TrackDisplay {
                    status: "Idle".to_string(),
                    ..TrackDisplay::default()
                },
                user: TrackDisplay {
                    status: "Idle".to_string(),
                    ..TrackDisplay::default()
                },
                recording: None,
                model_recorded: false,
                model_path: String::new(),
                score: ScoreDisplay::Empty,
                overlay: Overlay::default(),
                settings,
                settings_status,
            },
        }
    }
}

impl MimicApp {
    fn update(&mut self, message: Message) {
        if !matches!(message, Message::Tick) {
            log::debug!("[UPDATE] Received message: {:?}", message);
        }

        match message {
            Message::Record(track) => self.start_recording(track),
            Message::StopRecording(track) => {
                if self.display_data.recording == Some(track) {
                    self.stop_recording(false);
                }
            }
            Message::Play(track) => self.start_playback(track),
            Message::Pause(track) => self.pause_playback(track),
            Message::ModelPathChanged(path) => {
                self.display_data.model_path = path;
            }
            Message::LoadModel => self.load_model(),
            Message::ExportModel => self.export_model(),
            Message::SaveSettings => {
                self.display_data.settings_status =
                    match settings::save_settings(&self.display_data.settings, SETTINGS_PATH) {
                        Ok(()) => format!("Saved to {}", SETTINGS_PATH),
                        Err(e) => {
                            log::error!("[MAIN] Error saving settings: {:#}", e);
                            format!("Save failed: {}", e)
                        }
                    };
            }
            Message::ReloadSettings => match settings::load_settings(SETTINGS_PATH) {
                Ok(loaded) => {
                    self.display_data.settings = loaded;
                    self.display_data.settings_status = format!("Loaded {}", SETTINGS_PATH);
                }
                Err(e) => {
                    log::error!("[MAIN] Error loading settings: {:#}", e);
                    self.display_data.settings_status = format!("Load failed: {}", e);
                }
            },
            Message::Tick => self.on_tick(),
        }
    }

    fn start_recording(&mut self, track: Track) {
        if self.recording.is_some() {
            log::warn!("[MAIN] Already recording, ignoring record request");
            return;
        }
        self.stop_playback_full(track);

        let max_secs = self.display_data.settings.max_recording_secs;
        self.recording = Some(RecordingWorker::spawn(track, max_secs));
        self.display_data.recording = Some(track);
        self.display_data.track_mut(track).status = "Recording...".to_string();
        log::info!("[MAIN] Recording {} (limit {} s)", track.label(), max_secs);
    }

    fn stop_recording(&mut self, limit_reached: bool) {
        let Some(worker) = self.recording.take() else {
            return;
        };
        let track = worker.track;
        self.display_data.recording = None;

        let buffer = worker.finish().filter(|b| !b.is_empty());
        let Some(buffer) = buffer else {
            self.display_data.track_mut(track).status = "Nothing was recorded".to_string();
            return;
        };

        let duration = buffer.duration_secs();
        log::info!("[MAIN] {} recorded: {:.2} s", track.label(), duration);
        let status = if limit_reached {
            format!(
                "Stopped at the {} s limit ({:.1} s recorded)",
                self.display_data.settings.max_recording_secs, duration
            )
        } else {
            format!("Recorded {:.1} s", duration)
        };

        let display = self.display_data.track_mut(track);
        display.buffer = Some(Arc::new(buffer));
        display.status = status;
        self.cursor(track).rewind();

        match track {
            Track::Model => self.display_data.model_recorded = true,
            Track::User => {
                if self.display_data.model.buffer.is_some() {
                    self.start_comparison();
                }
            }
        }
    }

    fn cursor(&self, track: Track) -> &Arc<PlaybackCursor> {
        match track {
            Track::Model => &self.model_cursor,
            Track::User => &self.user_cursor,
        }
    }

    fn playback_slot(&mut self, track: Track) -> &mut Option<PlaybackWorker> {
        match track {
            Track::Model => &mut self.model_playback,
            Track::User => &mut self.user_playback,
        }
    }

    fn start_playback(&mut self, track: Track) {
        if self.playback_slot(track).is_some() || self.display_data.recording == Some(track) {
            return;
        }
        let Some(buffer) = self.display_data.track(track).buffer.clone() else {
            return;
        };

        let cursor = Arc::clone(self.cursor(track));
        if cursor.is_finished() || cursor.position() >= buffer.len() {
            cursor.rewind();
        }

        *self.playback_slot(track) = Some(PlaybackWorker::spawn(track, buffer, cursor));
        self.display_data.track_mut(track).playing = true;
    }

    fn pause_playback(&mut self, track: Track) {
        if let Some(worker) = self.playback_slot(track).take() {
            if let Some(failure) = worker.stop() {
                self.display_data.track_mut(track).status = format!("Playback failed: {}", failure);
            }
            if self.cursor(track).is_finished() {
                self.cursor(track).rewind();
            }
        }
        self.display_data.track_mut(track).playing = false;
    }

    /// Stops playback and moves back to the start.
    fn stop_playback_full(&mut self, track: Track) {
        self.pause_playback(track);
        self.cursor(track).rewind();
    }

    fn load_model(&mut self) {
        if self.display_data.recording == Some(Track::Model) {
            return;
        }
        let path = self.display_data.model_path.trim().to_string();
        if path.is_empty() {
            self.display_data.model.status = "Enter a WAV file path first".to_string();
            return;
        }

        match wav::load_wav(&path) {
            Ok(buffer) => {
                self.stop_playback_full(Track::Model);
                let name = Path::new(&path)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or(path);
                self.display_data.model.status = format!("Loaded file: {}", name);
                self.display_data.model.buffer = Some(Arc::new(buffer));
                self.display_data.model_recorded = false;
            }
            Err(e) => {
                log::error!("[MAIN] Error loading model: {:#}", e);
                self.display_data.model.status = format!("Could not load file: {}", e);
            }
        }
    }

    fn export_model(&mut self) {
        if !self.display_data.model_recorded {
            return;
        }
        let Some(buffer) = self.display_data.model.buffer.clone() else {
            self.display_data.model.status = "No recording to export".to_string();
            return;
        };

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let file_name = format!("mimic_model_{}.wav", timestamp);

        self.display_data.model.status = match wav::save_wav(&buffer, &file_name) {
            Ok(()) => format!("Exported {}", file_name),
            Err(e) => {
                log::error!("[MAIN] Export failed: {:#}", e);
                format!("Export failed: {}", e)
            }
        };
    }

    /// Runs the analysis off the GUI thread; the result is picked up on a tick.
    fn start_comparison(&mut self) {
        let (Some(model), Some(user)) = (
            self.display_data.model.buffer.clone(),
            self.display_data.user.buffer.clone(),
        ) else {
            self.display_data.score = ScoreDisplay::Empty;
            return;
        };

        log::info!("[MAIN] Calculating score...");
        let settings = self.display_data.settings.clone();
        let (result_tx, result_rx) = crossbeam_channel::bounded(1);
        thread::spawn(move || {
            let result = compare(&model, &user, &settings);
            let _ = result_tx.send(result);
        });

        self.comparison_rx = Some(result_rx);
        self.display_data.score = ScoreDisplay::Calculating;
        self.display_data.overlay = Overlay::default();
    }

    fn on_tick(&mut self) {
        // --- Recording ---
        if let Some(worker) = self.recording.as_mut() {
            match worker.poll() {
                RecordingPoll::Running => {
                    let track = worker.track;
                    let elapsed = worker.elapsed_secs();
                    self.display_data.track_mut(track).status =
                        format!("Recording... {:.1} s", elapsed);
                }
                RecordingPoll::LimitReached => {
                    log::info!("[MAIN] Maximum recording duration reached");
                    self.stop_recording(true);
                }
                RecordingPoll::Failed(message) => {
                    let track = worker.track;
                    self.recording = None;
                    self.display_data.recording = None;
                    self.display_data.track_mut(track).status =
                        format!("Microphone unavailable: {}", message);
                }
            }
        }

        // --- Playback end detection ---
        for track in [Track::Model, Track::User] {
            if self.playback_slot(track).as_ref().is_some_and(PlaybackWorker::is_done) {
                self.pause_playback(track);
            }
        }

        // --- Comparison result ---
        if let Some(receiver) = &self.comparison_rx {
            match receiver.try_recv() {
                Ok(result) => {
                    self.display_data.score = ScoreDisplay::Counting {
                        shown: 0.0,
                        target: result.score,
                    };
                    self.display_data.overlay = result.overlay;
                    self.comparison_rx = None;
                }
                Err(crossbeam_channel::TryRecvError::Empty) => {}
                Err(crossbeam_channel::TryRecvError::Disconnected) => {
                    log::error!("[MAIN] Comparison thread ended without a result");
                    self.display_data.score = ScoreDisplay::Empty;
                    self.comparison_rx = None;
                }
            }
        }

        // --- Score count-up ---
        if let ScoreDisplay::Counting { shown, target } = &mut self.display_data.score {
            if *shown < *target {
                *shown = (*shown + 1.0).min(*target);
            }
        }
    }

    fn view(&self) -> Element<'_, Message> {
        create_main_view(&self.display_data)
    }

    /// Returns a timer subscription that fires every 16ms (60 FPS).
    fn subscription(&self) -> Subscription<Message> {
        iced::time::every(Duration::from_millis(16)).map(|_| Message::Tick)
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

/// Loads `SETTINGS_PATH` when it exists, falling back to the defaults.
fn initial_settings() -> (AnalysisSettings, String) {
    if !Path::new(SETTINGS_PATH).exists() {
        return (AnalysisSettings::default(), "Using default settings".to_string());
    }
    match settings::load_settings(SETTINGS_PATH) {
        Ok(loaded) => (loaded, format!("Loaded {}", SETTINGS_PATH)),
        Err(e) => {
            log::warn!("[MAIN] Ignoring unreadable settings file: {:#}", e);
            (AnalysisSettings::default(), "Settings file unreadable, using defaults".to_string())
        }
    }
}
