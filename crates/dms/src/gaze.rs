//! Gaze direction from eye landmarks
//!
//! Each eye yields a horizontal ratio (pupil position between the outer and
//! inner corner) and a vertical ratio (pupil position between the two eyelid
//! references). The two eyes are averaged and the averages are compared
//! against fixed thresholds. Landmarks are `f32`; offsets are computed
//! in `f64`.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::landmarks::{EyeLandmarks, FaceLandmarks};
use crate::DmsError;

/// Discrete gaze direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GazeDirection {
    Left,
    Right,
    Up,
    Down,
    #[default]
    Center,
}

impl GazeDirection {
    /// Human-readable label shown on the overlay
    pub fn label(&self) -> &'static str {
        match self {
            Self::Left => "Looking Left",
            Self::Right => "Looking Right",
            Self::Up => "Looking Up",
            Self::Down => "Looking Down",
            Self::Center => "Looking Center",
        }
    }
}

impl fmt::Display for GazeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classification thresholds on the averaged offsets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GazeThresholds {
    /// `x` below this is Left
    pub left: f64,
    /// `x` above this is Right
    pub right: f64,
    /// `y` above this is Down
    pub down: f64,
    /// `y` below this is Up
    pub up: f64,
}

impl Default for GazeThresholds {
    fn default() -> Self {
        Self {
            left: 0.4,
            right: 0.6,
            down: 0.02,
            up: -0.06,
        }
    }
}

/// Averaged pupil offsets of both eyes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeOffset {
    /// 0 = toward the outer corner, 1 = toward the inner corner
    pub x: f64,
    /// Pupil position between the bottom and top eyelid references
    pub y: f64,
}

impl GazeOffset {
    /// Compute the averaged offsets.
    ///
    /// Returns [`DmsError::DegenerateGeometry`] when an eye has zero width,
    /// an eyelid pair has zero separation, or the result is not finite.
    pub fn from_landmarks(face: &FaceLandmarks) -> Result<Self, DmsError> {
        let (left_x, left_y) = eye_offset(&face.left)?;
        let (right_x, right_y) = eye_offset(&face.right)?;

        let offset = Self {
            x: (left_x + right_x) / 2.0,
            y: (left_y + right_y) / 2.0,
        };
        if !(offset.x.is_finite() && offset.y.is_finite()) {
            return Err(DmsError::DegenerateGeometry("non-finite gaze offset"));
        }
        Ok(offset)
    }

    /// Apply thresholds in order: Left, Right, Down, Up, otherwise Center
    pub fn classify(&self, thresholds: &GazeThresholds) -> GazeDirection {
        if self.x < thresholds.left {
            GazeDirection::Left
        } else if self.x > thresholds.right {
            GazeDirection::Right
        } else if self.y > thresholds.down {
            GazeDirection::Down
        } else if self.y < thresholds.up {
            GazeDirection::Up
        } else {
            GazeDirection::Center
        }
    }
}

fn eye_offset(eye: &EyeLandmarks) -> Result<(f64, f64), DmsError> {
    let (outer_x, inner_x, pupil_x) = (
        f64::from(eye.outer.x),
        f64::from(eye.inner.x),
        f64::from(eye.pupil.x),
    );
    let (bottom_y, top_y, pupil_y) = (
        f64::from(eye.bottom.y),
        f64::from(eye.top.y),
        f64::from(eye.pupil.y),
    );

    let width = (inner_x - outer_x).abs();
    if width == 0.0 {
        return Err(DmsError::DegenerateGeometry("zero eye width"));
    }
    let lid_span = top_y - bottom_y;
    if lid_span == 0.0 {
        return Err(DmsError::DegenerateGeometry("zero eyelid separation"));
    }

    Ok(((pupil_x - outer_x) / width, (pupil_y - bottom_y) / lid_span))
}

/// Gaze estimator with configurable thresholds
#[derive(Debug, Clone, Default)]
pub struct GazeEstimator {
    thresholds: GazeThresholds,
}

impl GazeEstimator {
    pub fn new(thresholds: GazeThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &GazeThresholds {
        &self.thresholds
    }

    /// Averaged offsets, or `None` for degenerate geometry
    pub fn offset(&self, face: &FaceLandmarks) -> Option<GazeOffset> {
        match GazeOffset::from_landmarks(face) {
            Ok(offset) => Some(offset),
            Err(e) => {
                debug!("Gaze offset unavailable: {}", e);
                None
            }
        }
    }

    /// Estimate the gaze direction; degenerate geometry falls back to Center
    pub fn estimate(&self, face: &FaceLandmarks) -> GazeDirection {
        self.offset(face)
            .map_or(GazeDirection::Center, |offset| offset.classify(&self.thresholds))
    }
}

/// Estimate the gaze direction with default thresholds
pub fn estimate_gaze(face: &FaceLandmarks) -> GazeDirection {
    GazeEstimator::default().estimate(face)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::Landmark;
    use proptest::prelude::*;

    /// Eye spanning x in [0, 1] and lids at y 0 (bottom) and 1 (top), so the
    /// per-eye offsets equal the pupil coordinates.
    fn unit_eye(pupil_x: f32, pupil_y: f32) -> EyeLandmarks {
        EyeLandmarks {
            outer: Landmark::new(0.0, 0.5),
            inner: Landmark::new(1.0, 0.5),
            pupil: Landmark::new(pupil_x, pupil_y),
            bottom: Landmark::new(0.5, 0.0),
            top: Landmark::new(0.5, 1.0),
        }
    }

    fn face(x: f32, y: f32) -> FaceLandmarks {
        FaceLandmarks {
            left: unit_eye(x, y),
            right: unit_eye(x, y),
        }
    }

    #[test]
    fn test_offsets_average_both_eyes() {
        let face = FaceLandmarks {
            left: unit_eye(0.2, 0.1),
            right: unit_eye(0.6, -0.3),
        };
        let offset = GazeOffset::from_landmarks(&face).unwrap();
        assert!((offset.x - 0.4).abs() < 1e-6);
        assert!((offset.y + 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_eye_width_ignores_corner_order() {
        let mut eye = unit_eye(0.5, 0.0);
        std::mem::swap(&mut eye.outer, &mut eye.inner);
        // pupil measured from the outer corner (now at x=1) over |width|
        let (x, _) = eye_offset(&eye).unwrap();
        assert!((x + 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_directions_at_reference_points() {
        assert_eq!(estimate_gaze(&face(0.1, 0.0)), GazeDirection::Left);
        assert_eq!(estimate_gaze(&face(0.9, 0.0)), GazeDirection::Right);
        assert_eq!(estimate_gaze(&face(0.5, 0.5)), GazeDirection::Down);
        assert_eq!(estimate_gaze(&face(0.5, -0.5)), GazeDirection::Up);
        assert_eq!(estimate_gaze(&face(0.5, 0.0)), GazeDirection::Center);
    }

    #[test]
    fn test_threshold_boundaries_are_exclusive() {
        let thresholds = GazeThresholds::default();
        let at = |x, y| GazeOffset { x, y }.classify(&thresholds);
        assert_eq!(at(0.4, 0.0), GazeDirection::Center);
        assert_eq!(at(0.6, 0.0), GazeDirection::Center);
        assert_eq!(at(0.5, 0.02), GazeDirection::Center);
        assert_eq!(at(0.5, -0.06), GazeDirection::Center);
    }

    #[test]
    fn test_offsets_use_widened_landmarks() {
        // 0.6f32 is slightly above 0.6 once widened; an f32 comparison
        // against 0.6f32 would call this Center.
        let face = face(0.6, 0.0);
        let offset = GazeOffset::from_landmarks(&face).unwrap();

        assert_eq!(offset.x, f64::from(0.6f32));
        assert!(offset.x > 0.6);
        assert_eq!(estimate_gaze(&face), GazeDirection::Right);
    }

    #[test]
    fn test_zero_eye_width_is_center() {
        let mut degenerate = face(0.1, 0.5);
        degenerate.left.inner = degenerate.left.outer;

        assert!(matches!(
            GazeOffset::from_landmarks(&degenerate),
            Err(DmsError::DegenerateGeometry(_))
        ));
        assert_eq!(estimate_gaze(&degenerate), GazeDirection::Center);
    }

    #[test]
    fn test_zero_eyelid_separation_is_center() {
        let mut degenerate = face(0.1, 0.5);
        degenerate.right.top = degenerate.right.bottom;
        assert_eq!(estimate_gaze(&degenerate), GazeDirection::Center);
    }

    #[test]
    fn test_crossed_mesh_eyelids_are_used_as_given() {
        // Build a raw mesh and go through the index table, so the right eye
        // sees its lid references swapped relative to the left eye.
        let mut mesh = vec![Landmark::default(); 478];
        mesh[33] = Landmark::new(0.30, 0.40);
        mesh[133] = Landmark::new(0.40, 0.40);
        mesh[468] = Landmark::new(0.35, 0.41);
        mesh[362] = Landmark::new(0.60, 0.40);
        mesh[263] = Landmark::new(0.70, 0.40);
        mesh[473] = Landmark::new(0.65, 0.41);
        mesh[159] = Landmark::new(0.35, 0.38);
        mesh[386] = Landmark::new(0.65, 0.39);

        let face = FaceLandmarks::from_mesh(&mesh).unwrap();
        let offset = GazeOffset::from_landmarks(&face).unwrap();

        // left: (0.41 - 0.38) / (0.39 - 0.38) = 3.0
        // right: (0.41 - 0.39) / (0.38 - 0.39) = -2.0
        assert!((offset.x - 0.5).abs() < 1e-4);
        assert!((offset.y - 0.5).abs() < 1e-3);
        assert_eq!(estimate_gaze(&face), GazeDirection::Down);
    }

    #[test]
    fn test_custom_thresholds() {
        let estimator = GazeEstimator::new(GazeThresholds {
            left: 0.2,
            ..Default::default()
        });
        assert_eq!(estimator.estimate(&face(0.3, 0.0)), GazeDirection::Center);
        assert_eq!(estimate_gaze(&face(0.3, 0.0)), GazeDirection::Left);
    }

    #[test]
    fn test_labels() {
        assert_eq!(GazeDirection::Down.to_string(), "Looking Down");
        assert_eq!(GazeDirection::Center.label(), "Looking Center");
    }

    proptest! {
        #[test]
        fn left_wins_regardless_of_vertical(x in -1.0f32..0.399, y in -10.0f32..10.0) {
            prop_assert_eq!(estimate_gaze(&face(x, y)), GazeDirection::Left);
        }

        #[test]
        fn right_wins_regardless_of_vertical(x in 0.601f32..2.0, y in -10.0f32..10.0) {
            prop_assert_eq!(estimate_gaze(&face(x, y)), GazeDirection::Right);
        }

        #[test]
        fn centered_and_low_is_down(x in 0.4f32..0.5999, y in 0.0201f32..10.0) {
            prop_assert_eq!(estimate_gaze(&face(x, y)), GazeDirection::Down);
        }

        #[test]
        fn centered_and_high_is_up(x in 0.4f32..0.5999, y in -10.0f32..-0.0601) {
            prop_assert_eq!(estimate_gaze(&face(x, y)), GazeDirection::Up);
        }

        #[test]
        fn centered_band_is_center(x in 0.4f32..0.5999, y in -0.06f32..=0.02) {
            prop_assert_eq!(estimate_gaze(&face(x, y)), GazeDirection::Center);
        }

        #[test]
        fn estimate_is_deterministic(x in -1.0f32..2.0, y in -2.0f32..2.0) {
            let f = face(x, y);
            prop_assert_eq!(estimate_gaze(&f), estimate_gaze(&f));
        }
    }
}
