//! Per-face analysis results

use serde::{Deserialize, Serialize};

use crate::distraction::DistractionStatus;
use crate::gaze::{GazeDirection, GazeOffset};

/// Gaze and distraction verdict for one face in one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceReport {
    /// Discrete gaze direction
    pub gaze: GazeDirection,

    /// Averaged offsets; absent when the eye geometry was degenerate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<GazeOffset>,

    /// Distraction verdict
    pub status: DistractionStatus,
}

impl FaceReport {
    pub fn is_distracted(&self) -> bool {
        self.status == DistractionStatus::Distracted
    }
}

/// Status of the first face, if any
pub fn primary_status(faces: &[FaceReport]) -> Option<DistractionStatus> {
    faces.first().map(|f| f.status)
}
