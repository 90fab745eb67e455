//! Distraction Monitoring Core
//!
//! Per-frame analysis of a person at a desk:
//! - Face-mesh landmark detection
//! - Gaze direction from eye landmarks
//! - Distraction verdict from gaze and detected objects (phone, notebook)
//!
//! Gaze estimation and distraction classification are pure functions of the
//! current frame's data; nothing is carried between frames.

pub mod analysis;
pub mod config;
pub mod detector;
pub mod distraction;
pub mod gaze;
pub mod landmarks;

pub use analysis::{primary_status, FaceReport};
pub use config::DmsConfig;
pub use detector::{
    detector_from_config, FaceMesh, FaceMeshDetector, LandmarkDetector, StaticLandmarkDetector,
};
pub use distraction::{
    classify_distraction, BoundingBox, DetectedObject, DistractionClassifier, DistractionRules,
    DistractionStatus,
};
pub use gaze::{estimate_gaze, GazeDirection, GazeEstimator, GazeOffset, GazeThresholds};
pub use landmarks::{EyeLandmarks, FaceLandmarks, Landmark, MESH_INDICES};

use thiserror::Error;
use tracing::{debug, warn};

/// DMS error types
#[derive(Error, Debug)]
pub enum DmsError {
    #[error("Degenerate eye geometry: {0}")]
    DegenerateGeometry(&'static str),

    #[error("Landmark index {index} out of range for mesh of {len} points")]
    LandmarkIndexOutOfRange { index: usize, len: usize },

    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),
}

/// Gaze estimator and distraction classifier configured together
#[derive(Debug, Clone, Default)]
pub struct FocusAnalyzer {
    estimator: GazeEstimator,
    classifier: DistractionClassifier,
}

impl FocusAnalyzer {
    pub fn new(config: &DmsConfig) -> Self {
        Self {
            estimator: GazeEstimator::new(config.gaze),
            classifier: DistractionClassifier::new(config.rules.clone()),
        }
    }

    /// Analyze one face
    pub fn analyze_face(&self, face: &FaceLandmarks, objects: &[DetectedObject]) -> FaceReport {
        let offset = self.estimator.offset(face);
        let gaze = offset.map_or(GazeDirection::Center, |o| o.classify(self.estimator.thresholds()));
        let status = self.classifier.classify(gaze, objects);
        debug!(?gaze, ?offset, ?status, "Face analyzed");

        FaceReport { gaze, offset, status }
    }

    /// Analyze every face mesh of a frame against the frame's objects.
    ///
    /// Meshes lacking the eye landmarks are skipped.
    pub fn analyze(&self, meshes: &[FaceMesh], objects: &[DetectedObject]) -> Vec<FaceReport> {
        meshes
            .iter()
            .filter_map(|mesh| match FaceLandmarks::from_mesh(mesh) {
                Ok(face) => Some(self.analyze_face(&face, objects)),
                Err(e) => {
                    warn!("Skipping face: {}", e);
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn centered_meshes() -> Vec<FaceMesh> {
        let frame = camera_capture::VideoFrame::new(vec![0; 3], 1, 1, 0, 0);
        StaticLandmarkDetector::centered().detect(&frame).unwrap()
    }

    fn looking_down_mesh() -> FaceMesh {
        let mut mesh = centered_meshes().remove(0);
        // drop both pupils well below the lid references
        mesh[468].y += 0.05;
        mesh[473].y -= 0.05;
        mesh
    }

    #[test]
    fn test_analyze_face_combines_gaze_and_objects() {
        let analyzer = FocusAnalyzer::default();
        let phone = DetectedObject::new("cell phone", BoundingBox::default());

        let reports = analyzer.analyze(&[looking_down_mesh()], &[phone.clone()]);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].gaze, GazeDirection::Down);
        assert_eq!(reports[0].status, DistractionStatus::Distracted);
        assert!(reports[0].is_distracted());

        let centered = centered_meshes();
        let reports = analyzer.analyze(&centered, &[phone]);
        assert_eq!(reports[0].status, DistractionStatus::Focused);
    }

    #[test]
    fn test_short_mesh_is_skipped() {
        let analyzer = FocusAnalyzer::default();
        let reports = analyzer.analyze(&[vec![Landmark::default(); 10]], &[]);
        assert!(reports.is_empty());
        assert_eq!(primary_status(&reports), None);
    }

    #[test]
    fn test_degenerate_face_reports_center_without_offset() {
        let analyzer = FocusAnalyzer::default();
        let mesh = vec![Landmark::new(0.5, 0.5); 478];

        let reports = analyzer.analyze(&[mesh], &[]);
        assert_eq!(reports[0].gaze, GazeDirection::Center);
        assert_eq!(reports[0].offset, None);
        assert_eq!(reports[0].status, DistractionStatus::Focused);
    }
}
