//! Per-frame head orientation and blink metrics.
//!
//! Every metric divides by a landmark-derived length. A momentary bad
//! detection can collapse that length to zero, so each function reports
//! [`GeometryError`] instead of returning NaN or infinity; callers treat the
//! error as an inconclusive frame.

use thiserror::Error;

use crate::landmarks::LandmarkSample;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    #[error("landmark coordinates are not finite")]
    NonFinite,
    #[error("right eye coincides with the nose")]
    ZeroNoseDistance,
    #[error("eyes have zero horizontal separation")]
    ZeroEyeSeparation,
}

/// Ratio of the left-eye-to-nose distance to the right-eye-to-nose distance.
///
/// Close to 1.0 for a frontal face. As the head yaws, the nose projects
/// closer to one eye, pushing the ratio below 1.0 on one side and above it
/// on the other.
pub fn orientation_ratio(sample: &LandmarkSample) -> Result<f32, GeometryError> {
    ensure_finite(sample)?;

    let right = finite(sample.right_eye.distance(&sample.nose))?;
    if right == 0.0 {
        return Err(GeometryError::ZeroNoseDistance);
    }
    let left = finite(sample.left_eye.distance(&sample.nose))?;

    finite(left / right)
}

/// Vertical eye misalignment over horizontal eye separation, used as a
/// blink proxy.
pub fn eye_aspect_ratio(sample: &LandmarkSample) -> Result<f32, GeometryError> {
    ensure_finite(sample)?;

    let dx = (sample.left_eye.x - sample.right_eye.x).abs();
    if dx == 0.0 {
        return Err(GeometryError::ZeroEyeSeparation);
    }
    let dy = (sample.left_eye.y - sample.right_eye.y).abs();

    finite(dy / dx)
}

/// In-plane angle of the line from the left eye to the right eye, in
/// degrees. Zero for level eyes; negative when the right eye sits higher
/// in the image.
pub fn roll_angle_degrees(sample: &LandmarkSample) -> Result<f32, GeometryError> {
    ensure_finite(sample)?;

    let dx = sample.right_eye.x - sample.left_eye.x;
    let dy = sample.right_eye.y - sample.left_eye.y;
    if dx == 0.0 && dy == 0.0 {
        return Err(GeometryError::ZeroEyeSeparation);
    }

    finite(dy.atan2(dx).to_degrees())
}

fn ensure_finite(sample: &LandmarkSample) -> Result<(), GeometryError> {
    if sample.is_finite() {
        Ok(())
    } else {
        Err(GeometryError::NonFinite)
    }
}

// Huge but finite coordinates can still overflow to infinity, both in the
// distances and in the quotient.
fn finite(value: f32) -> Result<f32, GeometryError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(GeometryError::NonFinite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::Point2D;

    fn sample(left: (f32, f32), right: (f32, f32), nose: (f32, f32)) -> LandmarkSample {
        LandmarkSample::new(
            Point2D::new(left.0, left.1),
            Point2D::new(right.0, right.1),
            Point2D::new(nose.0, nose.1),
        )
    }

    #[test]
    fn test_frontal_face_ratio_is_one() {
        let s = sample((100.0, 200.0), (200.0, 200.0), (150.0, 205.0));
        let ratio = orientation_ratio(&s).unwrap();
        assert!((ratio - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_nose_near_left_eye_gives_low_ratio() {
        let s = sample((100.0, 200.0), (200.0, 200.0), (105.0, 205.0));
        let ratio = orientation_ratio(&s).unwrap();
        // sqrt(50) / sqrt(9050)
        assert!((ratio - 0.0743).abs() < 1e-3);
        assert!(ratio < 0.6);
    }

    #[test]
    fn test_nose_near_right_eye_gives_high_ratio() {
        let s = sample((100.0, 200.0), (200.0, 200.0), (195.0, 205.0));
        let ratio = orientation_ratio(&s).unwrap();
        assert!(ratio > 1.4);
    }

    #[test]
    fn test_nose_on_right_eye_is_degenerate() {
        let s = sample((100.0, 200.0), (200.0, 200.0), (200.0, 200.0));
        assert_eq!(orientation_ratio(&s), Err(GeometryError::ZeroNoseDistance));
    }

    #[test]
    fn test_eye_aspect_ratio() {
        let s = sample((100.0, 200.0), (200.0, 203.0), (150.0, 205.0));
        let ear = eye_aspect_ratio(&s).unwrap();
        assert!((ear - 0.03).abs() < 1e-6);

        // Order of the eyes does not matter
        let swapped = sample((200.0, 203.0), (100.0, 200.0), (150.0, 205.0));
        assert!((eye_aspect_ratio(&swapped).unwrap() - ear).abs() < 1e-6);
    }

    #[test]
    fn test_eye_aspect_ratio_zero_separation() {
        let s = sample((150.0, 200.0), (150.0, 230.0), (150.0, 205.0));
        assert_eq!(eye_aspect_ratio(&s), Err(GeometryError::ZeroEyeSeparation));
    }

    #[test]
    fn test_roll_angle() {
        let level = sample((100.0, 200.0), (200.0, 200.0), (150.0, 205.0));
        assert!(roll_angle_degrees(&level).unwrap().abs() < 1e-6);

        let tilted = sample((100.0, 200.0), (200.0, 100.0), (150.0, 205.0));
        assert!((roll_angle_degrees(&tilted).unwrap() + 45.0).abs() < 1e-4);

        let coincident = sample((100.0, 200.0), (100.0, 200.0), (150.0, 205.0));
        assert_eq!(
            roll_angle_degrees(&coincident),
            Err(GeometryError::ZeroEyeSeparation)
        );
    }

    #[test]
    fn test_non_finite_rejected() {
        let s = sample((f32::NAN, 200.0), (200.0, 200.0), (150.0, 205.0));
        assert_eq!(orientation_ratio(&s), Err(GeometryError::NonFinite));
        assert_eq!(eye_aspect_ratio(&s), Err(GeometryError::NonFinite));
        assert_eq!(roll_angle_degrees(&s), Err(GeometryError::NonFinite));
    }

    #[test]
    fn test_large_coordinates_keep_true_ratio() {
        let s = sample((0.0, 0.0), (1.0e20, 0.0), (1.0e19, 0.0));
        let ratio = orientation_ratio(&s).unwrap();
        assert!((ratio - 1.0 / 9.0).abs() < 1e-4);
    }

    #[test]
    fn test_infinite_distance_rejected() {
        // Each coordinate is finite but the eye-to-nose span is not
        let s = sample((0.0, 0.0), (3.0e38, 0.0), (-3.0e38, 0.0));
        assert_eq!(orientation_ratio(&s), Err(GeometryError::NonFinite));
    }

    #[test]
    fn test_overflow_rejected() {
        // Finite inputs whose quotient overflows f32
        let s = sample((0.0, 3.0e38), (1.0e-30, 0.0), (0.0, 0.0));
        assert_eq!(eye_aspect_ratio(&s), Err(GeometryError::NonFinite));
    }
}
