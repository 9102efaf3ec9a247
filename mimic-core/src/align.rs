//! # Contour Alignment Module
//!
//! Brings two pitch contours onto a common timeline. Leading and trailing
//! silence is trimmed from both, then the attempt is time-stretched onto
//! the model's frame count. The model timeline is authoritative; the
//! attempt is never the reference.

use crate::pitch::PitchContour;

/// The model contour and the attempt contour warped to the same length.
///
/// The attempt is empty instead when it had no voiced frame.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedPair {
    model: PitchContour,
    user: PitchContour,
}

impl AlignedPair {
    pub fn model(&self) -> &PitchContour {
        &self.model
    }

    pub fn user(&self) -> &PitchContour {
        &self.user
    }

    /// Frame count of the model timeline.
    pub fn len(&self) -> usize {
        self.model.len()
    }

    pub fn is_empty(&self) -> bool {
        self.model.is_empty()
    }

    /// Iterates `(model, user)` frames side by side.
    pub fn frames(&self) -> impl Iterator<Item = (Option<f32>, Option<f32>)> + '_ {
        self.model.iter().zip(self.user.iter())
    }
}

/// Removes unvoiced frames from both ends of a contour.
///
/// Gaps in the middle are kept. A contour with no voiced frame trims to empty.
pub fn trim_silence(contour: &PitchContour) -> PitchContour {
    let frames = contour.frames();
    let Some(start) = frames.iter().position(Option::is_some) else {
        return PitchContour::default();
    };
    // A voiced frame exists, so the reverse search always succeeds.
    let end = frames.iter().rposition(Option::is_some).unwrap_or(start);
    PitchContour::new(frames[start..=end].to_vec())
}

/// Resamples a contour to exactly `target_len` frames by piecewise-linear
/// interpolation.
///
/// When either neighbour of an output position is unvoiced, the nearer
/// neighbour is copied instead of blending pitch with silence. A
/// single-frame target takes the first source frame.
pub fn stretch(contour: &PitchContour, target_len: usize) -> PitchContour {
    let source = contour.frames();
    let source_len = source.len();

    if source_len == 0 || target_len == 0 {
        return PitchContour::default();
    }
    if source_len == target_len {
        return contour.clone();
    }
    if target_len == 1 {
        return PitchContour::new(vec![source[0]]);
    }

    let factor = (source_len - 1) as f64 / (target_len - 1) as f64;
    let last = source_len - 1;

    (0..target_len)
        .map(|i| {
            let pos = i as f64 * factor;
            let lower = (pos.floor() as usize).min(last);
            let upper = (pos.ceil() as usize).min(last);
            let weight = pos - lower as f64;

            match (source[lower], source[upper]) {
                (Some(a), Some(b)) => {
                    Some((a as f64 * (1.0 - weight) + b as f64 * weight) as f32)
                }
                (a, b) => {
                    if weight < 0.5 {
                        a
                    } else {
                        b
                    }
                }
            }
        })
        .collect()
}

/// Trims both contours and warps the attempt onto the model's length.
///
/// Returns `None` when either side has nothing voiced to compare.
pub fn align(model: &PitchContour, user: &PitchContour) -> Option<AlignedPair> {
    align_to_model(model, user).filter(|pair| !pair.user.is_empty())
}

/// Like [`align`], but only the model has to be voiced.
///
/// A silent attempt comes back as an empty user contour, so the model
/// can still be drawn on its own.
pub fn align_to_model(model: &PitchContour, user: &PitchContour) -> Option<AlignedPair> {
    let model = trim_silence(model);
    if model.is_empty() {
        return None;
    }

    let user = stretch(&trim_silence(user), model.len());
    Some(AlignedPair { model, user })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn contour(values: &[f32]) -> PitchContour {
        PitchContour::from_hz(values.iter().copied())
    }

    #[test]
    fn trim_removes_outer_silence_only() {
        let trimmed = trim_silence(&contour(&[-1.0, -1.0, 100.0, -1.0, 120.0, -1.0]));
        assert_eq!(trimmed, contour(&[100.0, -1.0, 120.0]));
    }

    #[test]
    fn trim_of_all_silence_is_empty() {
        assert!(trim_silence(&contour(&[-1.0; 10])).is_empty());
        assert!(trim_silence(&PitchContour::default()).is_empty());
    }

    #[test]
    fn trim_without_silence_is_unchanged() {
        let c = contour(&[100.0, 200.0]);
        assert_eq!(trim_silence(&c), c);
    }

    #[test]
    fn stretch_same_length_is_identity() {
        let c = contour(&[100.0, -1.0, 300.0]);
        assert_eq!(stretch(&c, 3), c);
    }

    #[test]
    fn stretch_interpolates_voiced_neighbours() {
        let stretched = stretch(&contour(&[100.0, 200.0]), 3);
        let frames = stretched.frames();
        assert_eq!(frames.len(), 3);
        assert_abs_diff_eq!(frames[0].unwrap(), 100.0);
        assert_abs_diff_eq!(frames[1].unwrap(), 150.0, epsilon = 1e-3);
        assert_abs_diff_eq!(frames[2].unwrap(), 200.0);
    }

    #[test]
    fn stretch_uses_nearest_neighbour_next_to_gaps() {
        // factor = 2/4: positions 0, 0.5, 1, 1.5, 2
        let stretched = stretch(&contour(&[100.0, -1.0, 300.0]), 5);
        assert_eq!(
            stretched.frames(),
            &[Some(100.0), None, None, Some(300.0), Some(300.0)]
        );
    }

    #[test]
    fn stretch_weight_below_half_keeps_lower() {
        // factor = 1/3: positions 0, 0.33, 0.67, 1
        let stretched = stretch(&contour(&[100.0, -1.0]), 4);
        assert_eq!(stretched.frames(), &[Some(100.0), Some(100.0), None, None]);
    }

    #[test]
    fn stretch_shrinks() {
        let stretched = stretch(&contour(&[100.0, 110.0, 120.0, 130.0, 140.0]), 3);
        let frames: Vec<f32> = stretched.iter().map(|f| f.unwrap()).collect();
        assert_eq!(frames.len(), 3);
        assert_abs_diff_eq!(frames[0], 100.0);
        assert_abs_diff_eq!(frames[1], 120.0, epsilon = 1e-3);
        assert_abs_diff_eq!(frames[2], 140.0, epsilon = 1e-3);
    }

    #[test]
    fn stretch_degenerate_lengths() {
        let c = contour(&[150.0, 250.0, 350.0]);
        assert_eq!(stretch(&c, 1), contour(&[150.0]));
        assert!(stretch(&c, 0).is_empty());
        assert!(stretch(&PitchContour::default(), 4).is_empty());
    }

    #[test]
    fn stretch_single_frame_source_repeats_it() {
        let stretched = stretch(&contour(&[220.0]), 4);
        assert_eq!(stretched, contour(&[220.0; 4]));
    }

    #[test]
    fn align_warps_user_to_trimmed_model_length() {
        let model = contour(&[-1.0, 100.0, 110.0, 120.0, 130.0, -1.0]);
        let user = contour(&[100.0, 130.0, -1.0]);
        let pair = align(&model, &user).unwrap();
        assert_eq!(pair.len(), 4);
        assert_eq!(pair.model().len(), pair.user().len());
        assert_eq!(pair.model(), &contour(&[100.0, 110.0, 120.0, 130.0]));
    }

    #[test]
    fn align_fails_when_either_side_is_silent() {
        let voiced = contour(&[100.0, 110.0]);
        let silent = contour(&[-1.0; 10]);
        assert!(align(&voiced, &silent).is_none());
        assert!(align(&silent, &voiced).is_none());
    }

    #[test]
    fn align_to_model_keeps_model_when_attempt_is_silent() {
        let model = contour(&[-1.0, 100.0, 110.0, 120.0]);
        let silent = contour(&[-1.0; 5]);
        let pair = align_to_model(&model, &silent).unwrap();
        assert_eq!(pair.model(), &contour(&[100.0, 110.0, 120.0]));
        assert!(pair.user().is_empty());
        assert_eq!(pair.frames().count(), 0);

        assert!(align_to_model(&silent, &model).is_none());
    }
}
