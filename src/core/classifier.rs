//! Angle classifier: landmark geometry → discrete head pose
//!
//! Horizontal nose-offset heuristic: how far the nose tip sits from the
//! midpoint between the outer eye corners, normalized by inter-eye
//! distance. Pure; no side effects.
//!
//! Sign convention: the preview is displayed horizontally flipped, so a
//! positive nose offset (nose toward the right edge in camera coordinates)
//! reads as a LEFT turn to the user. The mapping here matches that
//! mirrored display.

use crate::types::{FaceLandmarks, HeadAngle, PoseSample};
use crate::MIN_FACE_WIDTH_PX;

/// Intermediate geometry behind a classification, exposed for the
/// verbose CLI breakdown
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleEstimate {
    /// Midpoint between the outer eye corners (x)
    pub eye_center_x: f64,
    /// nose.x - eye_center_x
    pub nose_offset: f64,
    /// |right eye x - left eye x|
    pub face_width: f64,
    /// |nose_offset| / face_width
    pub ratio: f64,
}

/// Compute the raw pose geometry for one face.
///
/// Returns `None` when the landmark array is missing a required index or
/// the inter-eye distance is degenerate; the caller treats that tick as
/// "no face".
pub fn estimate(landmarks: &FaceLandmarks) -> Option<AngleEstimate> {
    let left_eye = landmarks.left_eye_corner()?;
    let right_eye = landmarks.right_eye_corner()?;
    let nose = landmarks.nose_tip()?;

    let eye_center_x = (left_eye.x + right_eye.x) / 2.0;
    let nose_offset = nose.x - eye_center_x;
    let face_width = (right_eye.x - left_eye.x).abs();

    if face_width < MIN_FACE_WIDTH_PX {
        return None;
    }

    Some(AngleEstimate {
        eye_center_x,
        nose_offset,
        face_width,
        ratio: nose_offset.abs() / face_width,
    })
}

/// Classify one face against a ratio threshold.
///
/// `ratio <= threshold` → front; otherwise the offset sign picks the turn
/// direction (mirrored-display convention, see module docs).
pub fn classify(landmarks: &FaceLandmarks, threshold: f64) -> Option<PoseSample> {
    let est = estimate(landmarks)?;

    let angle = if est.ratio <= threshold {
        HeadAngle::Front
    } else if est.nose_offset > 0.0 {
        HeadAngle::Left
    } else {
        HeadAngle::Right
    };

    Some(PoseSample {
        angle,
        ratio: est.ratio,
    })
}

// =============================================================================
// TESTS
// =============================================================================
