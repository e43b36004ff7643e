//! Face landmark geometry produced by the pose estimator
//!
//! The estimator is an external collaborator: it hands us an indexed
//! 68-point array per detected face. Only three indices matter for angle
//! classification (eye corners and nose tip).

use serde::{Deserialize, Serialize};

use crate::types::{HeadAngle, Photo};
use crate::{LEFT_EYE_OUTER_IDX, NOSE_TIP_IDX, RIGHT_EYE_OUTER_IDX};

/// A 2D landmark position in frame pixel coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One detected face as an indexed landmark array (68-point model)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceLandmarks {
    points: Vec<Point>,
}

impl FaceLandmarks {
    /// Wrap an estimator-provided point array
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Build a 68-slot landmark set from just the three points the
    /// classifier needs; everything else stays at the origin
    pub fn from_key_points(left_eye: Point, right_eye: Point, nose: Point) -> Self {
        let mut points = vec![Point::default(); 68];
        points[LEFT_EYE_OUTER_IDX] = left_eye;
        points[RIGHT_EYE_OUTER_IDX] = right_eye;
        points[NOSE_TIP_IDX] = nose;
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Outer left-eye corner, if the array carries that index
    pub fn left_eye_corner(&self) -> Option<Point> {
        self.points.get(LEFT_EYE_OUTER_IDX).copied()
    }

    /// Outer right-eye corner
    pub fn right_eye_corner(&self) -> Option<Point> {
        self.points.get(RIGHT_EYE_OUTER_IDX).copied()
    }

    /// Nose tip
    pub fn nose_tip(&self) -> Option<Point> {
        self.points.get(NOSE_TIP_IDX).copied()
    }
}

/// One classified detection tick: discrete angle plus the continuity ratio
/// that produced it. Absence of a sample means "no face this tick".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseSample {
    /// Discrete head-pose class
    pub angle: HeadAngle,
    /// |nose offset| / inter-eye distance
    pub ratio: f64,
}

/// A read-only snapshot of the camera at one detection tick.
///
/// Carries the already-encoded still (the photo captured if this tick
/// satisfies a step) and the capture timestamp. Frames are never decoded
/// or re-encoded by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    /// Encoded JPEG still of this frame as a data URI
    pub photo: Photo,
}

impl Frame {
    pub fn new(photo: Photo) -> Self {
        Self { photo }
    }
}
