//! Eye aspect ratio

use crate::landmarks::{EyeIndices, LandmarkSet};
use tracing::{trace, warn};

/// Eye aspect ratio for one eye:
/// `(|p2 - p6| + |p3 - p5|) / (2 * |p1 - p4|)`
///
/// Returns `None` when a contour point is missing or the horizontal
/// distance is zero (the ratio is undefined there).
pub fn eye_aspect_ratio(landmarks: &LandmarkSet, indices: &EyeIndices) -> Option<f64> {
    let [p1, p2, p3, p4, p5, p6] = [
        landmarks.get(indices[0])?,
        landmarks.get(indices[1])?,
        landmarks.get(indices[2])?,
        landmarks.get(indices[3])?,
        landmarks.get(indices[4])?,
        landmarks.get(indices[5])?,
    ];

    let vertical_outer = p2.distance_2d(p6);
    let vertical_inner = p3.distance_2d(p5);
    let horizontal = p1.distance_2d(p4);

    if !(horizontal > 0.0) || !horizontal.is_finite() {
        trace!("Degenerate eye contour: horizontal distance {}", horizontal);
        return None;
    }

    let ratio = (vertical_outer + vertical_inner) / (2.0 * horizontal);
    ratio.is_finite().then_some(ratio)
}

/// Whole-face ratio: mean of both eyes
///
/// A degenerate eye is skipped in favour of the other one; with both eyes
/// degenerate the ratio is 0.0.
pub fn face_aspect_ratio(landmarks: &LandmarkSet, left: &EyeIndices, right: &EyeIndices) -> f64 {
    match (
        eye_aspect_ratio(landmarks, left),
        eye_aspect_ratio(landmarks, right),
    ) {
        (Some(l), Some(r)) => (l + r) / 2.0,
        (Some(v), None) | (None, Some(v)) => v,
        (None, None) => {
            warn!("Both eye contours degenerate, reporting closed eyes");
            0.0
        }
    }
}
