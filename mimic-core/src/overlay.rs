//! # Overlay Module
//!
//! Turns an aligned model/attempt pair into drawable geometry. Both
//! contours share one frequency axis and one time axis, normalized to the
//! unit square so any drawing surface can scale them. Higher pitch maps to
//! a smaller `y`, matching screen coordinates.

use crate::align::{AlignedPair, align_to_model};
use crate::pitch::PitchContour;
use crate::settings::{OVERLAY_CEILING_PAD, OVERLAY_FLOOR_PAD};

/// A vertex in normalized display space, both axes in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayPoint {
    pub x: f32,
    pub y: f32,
}

/// A contour drawn as disconnected strokes.
///
/// Each stroke is a run of consecutive voiced frames; unvoiced frames
/// split the line so silence is never bridged.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polyline {
    pub strokes: Vec<Vec<OverlayPoint>>,
}

impl Polyline {
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    /// Total vertex count over all strokes.
    pub fn point_count(&self) -> usize {
        self.strokes.iter().map(Vec::len).sum()
    }
}

/// The two lines of the comparison chart: model first, attempt second.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Overlay {
    pub model: Polyline,
    pub user: Polyline,
}

impl Overlay {
    pub fn is_empty(&self) -> bool {
        self.model.is_empty() && self.user.is_empty()
    }
}

/// Builds the overlay for a model contour and an attempt contour.
///
/// A silent model draws nothing; a silent attempt leaves the model line alone.
pub fn render(model: &PitchContour, user: &PitchContour) -> Overlay {
    match align_to_model(model, user) {
        Some(pair) => render_aligned(&pair, OVERLAY_FLOOR_PAD, OVERLAY_CEILING_PAD),
        None => Overlay::default(),
    }
}

/// Builds the overlay for an aligned pair.
///
/// The frequency axis spans the voiced range of both contours, widened by
/// `floor_pad` and `ceiling_pad` multipliers.
pub fn render_aligned(pair: &AlignedPair, floor_pad: f32, ceiling_pad: f32) -> Overlay {
    let voiced = pair.model().iter().chain(pair.user().iter()).flatten();
    let Some((min_f, max_f)) = voiced.fold(None, |range: Option<(f32, f32)>, f| {
        Some(match range {
            Some((lo, hi)) => (lo.min(f), hi.max(f)),
            None => (f, f),
        })
    }) else {
        return Overlay::default();
    };

    let min_f = min_f * floor_pad;
    let max_f = max_f * ceiling_pad;
    let span = max_f - min_f;
    if span <= 0.0 || !span.is_finite() {
        log::warn!("[OVERLAY] Degenerate frequency range {min_f}..{max_f}, nothing to draw");
        return Overlay::default();
    }

    // A single frame has nowhere to go but x = 0.
    let x_denominator = pair.len().saturating_sub(1).max(1) as f32;

    let project = |contour: &PitchContour| -> Polyline {
        let mut strokes = Vec::new();
        let mut current: Vec<OverlayPoint> = Vec::new();
        for (i, frame) in contour.iter().enumerate() {
            match frame {
                Some(freq) => current.push(OverlayPoint {
                    x: i as f32 / x_denominator,
                    y: 1.0 - (freq - min_f) / span,
                }),
                None if !current.is_empty() => strokes.push(std::mem::take(&mut current)),
                None => {}
            }
        }
        if !current.is_empty() {
            strokes.push(current);
        }
        Polyline { strokes }
    };

    Overlay {
        model: project(pair.model()),
        user: project(pair.user()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn contour(values: &[f32]) -> PitchContour {
        PitchContour::from_hz(values.iter().copied())
    }

    #[test]
    fn gaps_split_strokes() {
        let model = contour(&[100.0, 110.0, -1.0, 120.0, 130.0]);
        let overlay = render(&model, &model);
        assert_eq!(overlay.model.strokes.len(), 2);
        assert_eq!(overlay.model.strokes[0].len(), 2);
        assert_eq!(overlay.model.strokes[1].len(), 2);
        assert_eq!(overlay.model, overlay.user);
    }

    #[test]
    fn coordinates_follow_padded_range() {
        // min 100 -> 80, max 200 -> 240, span 160
        let model = contour(&[100.0, 200.0]);
        let user = contour(&[150.0, 150.0]);
        let overlay = render(&model, &user);

        let m = &overlay.model.strokes[0];
        assert_abs_diff_eq!(m[0].x, 0.0);
        assert_abs_diff_eq!(m[1].x, 1.0);
        assert_abs_diff_eq!(m[0].y, 1.0 - 20.0 / 160.0, epsilon = 1e-5);
        assert_abs_diff_eq!(m[1].y, 1.0 - 120.0 / 160.0, epsilon = 1e-5);

        let u = &overlay.user.strokes[0];
        assert_abs_diff_eq!(u[0].y, 1.0 - 70.0 / 160.0, epsilon = 1e-5);
    }

    #[test]
    fn all_points_fall_in_unit_square() {
        let model = contour(&[-1.0, 90.0, 440.0, -1.0, 1200.0, 300.0]);
        let user = contour(&[500.0, -1.0, 60.0, 700.0, 80.0, 90.0, 100.0]);
        let overlay = render(&model, &user);
        assert!(!overlay.is_empty());
        for line in [&overlay.model, &overlay.user] {
            for p in line.strokes.iter().flatten() {
                assert!((0.0..=1.0).contains(&p.x), "x out of range: {}", p.x);
                assert!((0.0..=1.0).contains(&p.y), "y out of range: {}", p.y);
            }
        }
    }

    #[test]
    fn single_frame_sits_at_left_edge() {
        let overlay = render(&contour(&[220.0]), &contour(&[220.0, 230.0]));
        assert_eq!(overlay.model.point_count(), 1);
        assert_eq!(overlay.user.point_count(), 1);
        assert_eq!(overlay.model.strokes[0][0].x, 0.0);
    }

    #[test]
    fn silent_model_renders_nothing() {
        let silent = contour(&[-1.0; 10]);
        assert!(render(&silent, &contour(&[100.0])).is_empty());
        assert!(render(&silent, &silent).is_empty());
    }

    #[test]
    fn silent_attempt_still_draws_the_model() {
        let model = contour(&[100.0, 110.0, 120.0]);
        let overlay = render(&model, &contour(&[-1.0; 5]));
        assert!(overlay.user.is_empty());
        assert_eq!(overlay.model.point_count(), 3);

        // Range comes from the model alone: 80..144.
        let m = &overlay.model.strokes[0];
        assert_abs_diff_eq!(m[0].x, 0.0);
        assert_abs_diff_eq!(m[2].x, 1.0);
        assert_abs_diff_eq!(m[0].y, 1.0 - 20.0 / 64.0, epsilon = 1e-5);
        assert_abs_diff_eq!(m[2].y, 1.0 - 40.0 / 64.0, epsilon = 1e-5);
    }

    #[test]
    fn user_line_has_model_length() {
        let model = contour(&[100.0, 110.0, 120.0, 130.0, 140.0]);
        let user = contour(&[100.0, 140.0]);
        let overlay = render(&model, &user);
        assert_eq!(overlay.user.point_count(), 5);
        let last = overlay.user.strokes[0].last().unwrap();
        assert_abs_diff_eq!(last.x, 1.0);
    }
}
