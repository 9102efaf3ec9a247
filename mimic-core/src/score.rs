//! # Scoring Module
//!
//! Frame-by-frame match rate between a model contour and an attempt.
//! A frame matches when both sides are voiced and lie within a fixed
//! semitone tolerance of each other. This is a binary hit rate, not a
//! continuous pitch error.

use crate::align::{AlignedPair, align};
use crate::pitch::PitchContour;
use crate::settings::TOLERANCE_SEMITONES;

/// Distance from `reference` to `freq` in semitones (positive = sharp).
pub fn semitone_difference(freq: f32, reference: f32) -> f32 {
    12.0 * (freq / reference).log2()
}

/// Scores an attempt against a model with the default ±1 semitone tolerance.
///
/// The attempt is warped onto the model, so swapping the arguments can
/// change the result.
///
/// # Returns
/// * Percentage in [0, 100]; 0 when either side is empty after trimming
pub fn score(model: &PitchContour, user: &PitchContour) -> f32 {
    score_with_tolerance(model, user, TOLERANCE_SEMITONES)
}

pub fn score_with_tolerance(model: &PitchContour, user: &PitchContour, tolerance: f32) -> f32 {
    match align(model, user) {
        Some(pair) => score_aligned(&pair, tolerance),
        None => 0.0,
    }
}

/// Scores an already aligned pair.
///
/// Frames where either side is unvoiced are ignored entirely: they count
/// toward neither the matches nor the total.
pub fn score_aligned(pair: &AlignedPair, tolerance: f32) -> f32 {
    let (matches, valid) = pair
        .frames()
        .filter_map(|frames| match frames {
            (Some(reference), Some(input)) => Some((reference, input)),
            _ => None,
        })
        .fold((0usize, 0usize), |(matches, valid), (reference, input)| {
            let hit = semitone_difference(input, reference).abs() < tolerance;
            (matches + usize::from(hit), valid + 1)
        });

    if valid == 0 {
        return 0.0;
    }

    (100.0 * matches as f32 / valid as f32).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn contour(values: &[f32]) -> PitchContour {
        PitchContour::from_hz(values.iter().copied())
    }

    #[test]
    fn octave_is_twelve_semitones() {
        assert_abs_diff_eq!(semitone_difference(880.0, 440.0), 12.0, epsilon = 1e-4);
        assert_abs_diff_eq!(semitone_difference(220.0, 440.0), -12.0, epsilon = 1e-4);
    }

    #[test]
    fn close_attempt_scores_full() {
        let model = contour(&[100.0, 110.0, -1.0, 120.0]);
        let user = contour(&[101.0, 111.0, -1.0, 119.0]);
        assert_eq!(score(&model, &user), 100.0);
    }

    #[test]
    fn octave_off_scores_zero() {
        let model = contour(&[100.0; 4]);
        let user = contour(&[200.0; 4]);
        assert_eq!(score(&model, &user), 0.0);
    }

    #[test]
    fn identical_contours_score_full() {
        let c = contour(&[-1.0, 196.0, 220.0, -1.0, 246.9, 261.6, -1.0]);
        assert_eq!(score(&c, &c), 100.0);
    }

    #[test]
    fn all_silent_side_scores_zero() {
        let silent = contour(&[-1.0; 10]);
        let voiced = contour(&[100.0, 200.0, 300.0]);
        assert_eq!(score(&silent, &voiced), 0.0);
        assert_eq!(score(&voiced, &silent), 0.0);
        assert_eq!(score(&PitchContour::default(), &voiced), 0.0);
    }

    #[test]
    fn one_sided_voicing_is_not_counted() {
        // Frame 1 is voiced only in the model, frame 2 only in the attempt.
        let model = contour(&[100.0, 100.0, -1.0, 100.0]);
        let user = contour(&[100.0, -1.0, 100.0, 200.0]);
        assert_eq!(score(&model, &user), 50.0);
    }

    #[test]
    fn tolerance_is_strict() {
        let model = contour(&[100.0]);
        let just_over_a_semitone = contour(&[100.0 * 2f32.powf(1.0 / 12.0) * 1.0001]);
        assert_eq!(score(&model, &just_over_a_semitone), 0.0);
        assert_eq!(score_with_tolerance(&model, &just_over_a_semitone, 2.0), 100.0);
    }

    #[test]
    fn swapping_roles_changes_the_score() {
        let model = contour(&[100.0, 100.0, 200.0, 200.0]);
        let user = contour(&[100.0, 200.0]);
        assert_eq!(score(&model, &user), 50.0);
        assert_eq!(score(&user, &model), 100.0);
    }
}
