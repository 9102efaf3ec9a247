//! # Main Display Module
//!
//! This module contains the main display components and layout logic
//! for the Mimic comparison application.

use iced::widget::{Space, button, column, container, row, text, text_input};
use iced::{Alignment, Element, Length};

use super::{overlay_chart, waveform};
use crate::{AppDisplayData, Message, ScoreDisplay, Track};

/// Configuration for a single button in the settings sidebar
#[derive(Debug, Clone)]
struct ButtonConfig {
    label: &'static str,
    message: Message,
}

/// Static sidebar configuration
const SETTINGS_CONFIG: &[(&str, &[ButtonConfig])] = &[(
    "Program",
    &[
        ButtonConfig { label: "Save Settings", message: Message::SaveSettings },
        ButtonConfig { label: "Reload Settings", message: Message::ReloadSettings },
    ],
)];

/// Creates the complete main application view
pub fn create_main_view(data: &AppDisplayData) -> Element<'static, Message> {
    log::trace!("[VIEW] Rendering GUI...");

    let title = text("Mimic").size(28);

    let model_panel = create_track_panel(data, Track::Model);
    let user_panel = create_track_panel(data, Track::User);
    let result_panel = create_result_panel(data);
    let sidebar = create_sidebar(data);

    let main_content = row![
        column![
            title,
            Space::with_height(20),
            row![model_panel, Space::with_width(10), user_panel].align_y(Alignment::Start),
            Space::with_height(10),
            result_panel,
        ]
        .width(Length::Fill)
        .spacing(10),
        Space::with_width(10),
        sidebar,
    ]
    .align_y(Alignment::Start)
    .padding(20);

    container(main_content)
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

/// Creates the panel for one performance: status, waveform and transport.
fn create_track_panel(data: &AppDisplayData, track: Track) -> Element<'static, Message> {
    let display = data.track(track);
    let recording_this = data.recording == Some(track);
    let has_audio = display.buffer.is_some();

    let record_button = if recording_this {
        make_button("Stop", Some(Message::StopRecording(track)))
    } else {
        make_button(
            "Record",
            data.recording.is_none().then_some(Message::Record(track)),
        )
    };
    let play_button = if display.playing {
        make_button("Pause", Some(Message::Pause(track)))
    } else {
        make_button(
            "Play",
            (has_audio && !recording_this).then_some(Message::Play(track)),
        )
    };

    let waveform_content = container(waveform::Waveform::new(display.buffer.clone()).view())
        .width(Length::Fill)
        .height(Length::Fixed(110.0));

    let mut content = column![
        text(track.label()).size(18),
        text(display.status.clone()).size(14),
        waveform_content,
        row![record_button, Space::with_width(10), play_button],
    ]
    .spacing(8);

    if track == Track::Model {
        let model_idle = !recording_this;
        let path_input = text_input("Path to a WAV file", &data.model_path)
            .on_input(Message::ModelPathChanged)
            .on_submit(Message::LoadModel)
            .size(14)
            .padding(6);
        let export_enabled = model_idle && has_audio && data.model_recorded;

        content = content.push(
            row![
                path_input,
                Space::with_width(10),
                make_button("Load WAV", model_idle.then_some(Message::LoadModel)),
                Space::with_width(10),
                make_button("Export WAV", export_enabled.then_some(Message::ExportModel)),
            ]
            .align_y(Alignment::Center),
        );
    }

    container(content.padding(15))
        .width(Length::Fill)
        .height(Length::Fixed(260.0))
        .into()
}

/// Creates the score readout and the pitch overlay chart.
fn create_result_panel(data: &AppDisplayData) -> Element<'static, Message> {
    let score_text = match &data.score {
        ScoreDisplay::Empty => "--".to_string(),
        ScoreDisplay::Calculating => "Calculating...".to_string(),
        ScoreDisplay::Counting { shown, .. } => format!("{}", shown.floor() as u32),
    };

    let chart_content = container(overlay_chart::OverlayChart::new(data.overlay.clone()).view())
        .width(Length::Fill)
        .height(Length::Fill);

    container(
        column![
            row![
                text("Score").size(18),
                Space::with_width(20),
                text(score_text).size(40),
            ]
            .align_y(Alignment::Center),
            Space::with_height(10),
            chart_content,
        ]
        .spacing(5)
        .padding(15),
    )
    .width(Length::Fill)
    .height(Length::Fixed(320.0))
    .into()
}

/// Creates the settings sidebar widget.
///
/// Shows the file buttons from [`SETTINGS_CONFIG`] followed by the
/// analysis parameters currently in effect.
fn create_sidebar(data: &AppDisplayData) -> Element<'static, Message> {
    let mut sections = column![].spacing(10);

    for (title, buttons) in SETTINGS_CONFIG {
        sections = sections.push(make_settings_section(*title, buttons));
    }

    let settings = &data.settings;
    sections = sections.push(
        column![
            text("Analysis").size(16),
            text(format!("Window: {} samples", settings.window_size)).size(13),
            text(format!(
                "Range: {:.0}-{:.0} Hz",
                settings.min_frequency, settings.max_frequency
            ))
            .size(13),
            text(format!("Tolerance: {} semitone(s)", settings.tolerance_semitones)).size(13),
            text(format!("Max recording: {} s", settings.max_recording_secs)).size(13),
        ]
        .spacing(4),
    );
    sections = sections.push(text(data.settings_status.clone()).size(12));

    container(sections.padding(15))
        .width(Length::Fixed(250.0))
        .height(Length::Fill)
        .into()
}

/// Creates a sidebar section with a title and its buttons.
fn make_settings_section(title: &'static str, buttons: &[ButtonConfig]) -> Element<'static, Message> {
    let mut section = column![text(title).size(16)].spacing(5);
    for config in buttons {
        section = section.push(make_button(config.label, Some(config.message.clone())));
    }
    section.into()
}

/// Creates a button; without a message it renders disabled.
fn make_button(label: &'static str, message: Option<Message>) -> Element<'static, Message> {
    button(text(label).size(14))
        .padding([6, 10])
        .on_press_maybe(message)
        .into()
}
