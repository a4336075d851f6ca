use serde::{Deserialize, Serialize};

/// A point in image coordinates (pixels, origin top-left).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Planar Euclidean distance to `other`.
    pub fn distance(&self, other: &Point2D) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<[f32; 2]> for Point2D {
    fn from(p: [f32; 2]) -> Self {
        Self::new(p[0], p[1])
    }
}

/// Landmarks of the most prominent face in one frame.
///
/// Only the eye centres and the nose bridge are consumed; detectors that
/// report more points (mouth corners, ears) are trimmed by [`from_points`].
///
/// [`from_points`]: LandmarkSample::from_points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkSample {
    pub left_eye: Point2D,
    pub right_eye: Point2D,
    pub nose: Point2D,
}

impl LandmarkSample {
    pub const fn new(left_eye: Point2D, right_eye: Point2D, nose: Point2D) -> Self {
        Self {
            left_eye,
            right_eye,
            nose,
        }
    }

    /// Build a sample from a detector landmark list.
    ///
    /// Index convention: 0 = left eye, 1 = right eye, 2 = nose. Returns
    /// `None` when fewer than three points are present.
    pub fn from_points(points: &[[f32; 2]]) -> Option<Self> {
        match points {
            [left, right, nose, ..] => Some(Self::new(
                Point2D::from(*left),
                Point2D::from(*right),
                Point2D::from(*nose),
            )),
            _ => None,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.left_eye.is_finite() && self.right_eye.is_finite() && self.nose.is_finite()
    }
}

/// Outcome of running the landmark detector on one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Observation {
    Face(LandmarkSample),
    NoFace,
}

impl From<Option<LandmarkSample>> for Observation {
    fn from(sample: Option<LandmarkSample>) -> Self {
        match sample {
            Some(s) => Observation::Face(s),
            None => Observation::NoFace,
        }
    }
}
