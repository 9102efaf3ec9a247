//! # Overlay Chart Widget
//!
//! Draws the model and attempt pitch contours on a shared frequency axis.
//! The core crate hands over unit-square coordinates; this widget only
//! scales them to the canvas and strokes each voiced run separately.

use iced::widget::canvas::{self, Geometry, Path, Stroke};
use iced::widget::container;
use iced::{Color, Element, Length, Point, Rectangle, Renderer, Size, Theme, mouse};
use mimic_core::overlay::{Overlay, Polyline};

const BACKGROUND: Color = Color {
    r: 26.0 / 255.0,
    g: 26.0 / 255.0,
    b: 46.0 / 255.0,
    a: 1.0,
};
const MODEL_COLOR: Color = Color {
    r: 197.0 / 255.0,
    g: 160.0 / 255.0,
    b: 89.0 / 255.0,
    a: 1.0,
};
const USER_COLOR: Color = Color {
    r: 179.0 / 255.0,
    g: 62.0 / 255.0,
    b: 48.0 / 255.0,
    a: 1.0,
};

pub struct OverlayChart {
    overlay: Overlay,
}

impl OverlayChart {
    pub fn new(overlay: Overlay) -> Self {
        Self { overlay }
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

/// Strokes every run of a polyline, scaled to `size`.
fn stroke_polyline(
    frame: &mut canvas::Frame,
    line: &Polyline,
    size: Size,
    line_width: f32,
    color: Color,
) {
    for run in &line.strokes {
        let Some((first, rest)) = run.split_first() else {
            continue;
        };
        let path = Path::new(|builder| {
            builder.move_to(Point::new(first.x * size.width, first.y * size.height));
            for point in rest {
                builder.line_to(Point::new(point.x * size.width, point.y * size.height));
            }
        });
        frame.stroke(
            &path,
            Stroke::default().with_width(line_width).with_color(color),
        );
    }
}

impl<Message> canvas::Program<Message> for OverlayChart {
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
        frame.fill(&Path::rectangle(Point::ORIGIN, bounds.size()), BACKGROUND);

        // Model underneath, attempt on top.
        stroke_polyline(
            &mut frame,
            &self.overlay.model,
            bounds.size(),
            3.0,
            MODEL_COLOR,
        );
        stroke_polyline(
            &mut frame,
            &self.overlay.user,
            bounds.size(),
            2.0,
            USER_COLOR,
        );

        vec![frame.into_geometry()]
    }
}
