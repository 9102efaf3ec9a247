//! # Waveform Widget
//!
//! Static view of a whole recording: one vertical min/max bar per pixel
//! column, drawn over a black background.

use iced::widget::canvas::{self, Geometry, Path, Stroke};
use iced::widget::container;
use iced::{Color, Element, Length, Point, Rectangle, Renderer, Theme, mouse};
use mimic_core::AudioBuffer;
use std::sync::Arc;

/// Envelope line colour.
const WAVEFORM_COLOR: Color = Color {
    r: 197.0 / 255.0,
    g: 160.0 / 255.0,
    b: 89.0 / 255.0,
    a: 1.0,
};

pub struct Waveform {
    buffer: Option<Arc<AudioBuffer>>,
}

impl Waveform {
    pub fn new(buffer: Option<Arc<AudioBuffer>>) -> Self {
        Self { buffer }
    }

    pub fn view(self) -> Element<'static, crate::Message> {
        container(
            canvas::Canvas::new(self)
                .width(Length::Fill)
                .height(Length::Fill),
        )
        .into()
    }
}

impl<Message> canvas::Program<Message> for Waveform {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());

        if !bounds.width.is_finite() || !bounds.height.is_finite() {
            return vec![frame.into_geometry()];
        }
        frame.fill(&Path::rectangle(Point::ORIGIN, bounds.size()), Color::BLACK);

        let Some(buffer) = self.buffer.as_ref().filter(|b| !b.is_empty()) else {
            return vec![frame.into_geometry()];
        };

        let amplitude = bounds.height / 2.0;
        let envelope = buffer.waveform_envelope(bounds.width.floor() as usize);
        let path = Path::new(|builder| {
            for (column, &(low, high)) in envelope.iter().enumerate() {
                let x = column as f32 + 0.5;
                builder.move_to(Point::new(x, (1.0 + low) * amplitude));
                builder.line_to(Point::new(x, (1.0 + high) * amplitude));
            }
        });
        frame.stroke(
            &path,
            Stroke::default().with_width(1.0).with_color(WAVEFORM_COLOR),
        );

        vec![frame.into_geometry()]
    }
}
