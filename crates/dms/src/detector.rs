//! Face-mesh landmark detection

use std::path::Path;

use camera_capture::frame::VideoFrame;
use tract_onnx::prelude::*;
use tracing::{debug, error, info, warn};

use crate::landmarks::{Landmark, MESH_INDICES};
use crate::{DmsConfig, DmsError};

/// Raw face mesh: one landmark per mesh index
pub type FaceMesh = Vec<Landmark>;

/// Produces a face mesh for every face found in a frame
pub trait LandmarkDetector: Send + Sync {
    fn detect(&self, frame: &VideoFrame) -> Result<Vec<FaceMesh>, DmsError>;
}

/// Pick the detector described by `config`.
///
/// Falls back to [`StaticLandmarkDetector`] when no model is configured.
pub fn detector_from_config(config: &DmsConfig) -> Result<Box<dyn LandmarkDetector>, DmsError> {
    match &config.face_model_path {
        Some(path) => Ok(Box::new(FaceMeshDetector::load(
            path,
            config.model_input_size,
            config.face_confidence,
        )?)),
        None => {
            warn!("No face model path configured. Using static landmarks.");
            Ok(Box::new(StaticLandmarkDetector::centered()))
        }
    }
}

impl<D: LandmarkDetector + ?Sized> LandmarkDetector for Box<D> {
    fn detect(&self, frame: &VideoFrame) -> Result<Vec<FaceMesh>, DmsError> {
        (**self).detect(frame)
    }
}

/// Face mesh ONNX model run with tract.
///
/// Expects a `1x3xSxS` RGB input scaled to 0..1 and a flat `[x, y, z] * N`
/// landmark output in input pixels. A second output, when present, is read
/// as the face presence logit.
pub struct FaceMeshDetector {
    model: TypedRunnableModel<TypedModel>,
    input_size: u32,
    confidence_threshold: f32,
}

impl FaceMeshDetector {
    pub fn load(
        path: impl AsRef<Path>,
        input_size: u32,
        confidence_threshold: f32,
    ) -> Result<Self, DmsError> {
        let path = path.as_ref();
        info!("Loading face mesh model from {}", path.display());

        let size = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|m| {
                m.with_input_fact(
                    0,
                    InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, size, size)),
                )
            })
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable())
            .map_err(|e| {
                error!("Failed to load face mesh model: {}", e);
                DmsError::ModelLoad(e.to_string())
            })?;

        Ok(Self {
            model,
            input_size,
            confidence_threshold,
        })
    }

    fn build_input(&self, frame: &VideoFrame) -> Result<Tensor, DmsError> {
        let img = frame
            .to_image()
            .map_err(|e| DmsError::ImageProcessing(e.to_string()))?;
        let resized = image::imageops::resize(
            &img,
            self.input_size,
            self.input_size,
            image::imageops::FilterType::Triangle,
        );

        let size = self.input_size as usize;
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, size, size), |(_, c, y, x)| {
            resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
        });
        Ok(input.into_tensor())
    }
}

impl LandmarkDetector for FaceMeshDetector {
    fn detect(&self, frame: &VideoFrame) -> Result<Vec<FaceMesh>, DmsError> {
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| DmsError::Inference(e.to_string()))?;

        if let Some(presence) = outputs.get(1) {
            let logit = presence
                .to_array_view::<f32>()
                .map_err(|e| DmsError::Inference(e.to_string()))?
                .iter()
                .copied()
                .next()
                .unwrap_or(f32::NEG_INFINITY);
            let score = 1.0 / (1.0 + (-logit).exp());
            if score < self.confidence_threshold {
                debug!("Face presence {:.2} below threshold", score);
                return Ok(Vec::new());
            }
        }

        let coords = outputs
            .first()
            .ok_or_else(|| DmsError::Inference("model produced no outputs".into()))?
            .to_array_view::<f32>()
            .map_err(|e| DmsError::Inference(e.to_string()))?
            .iter()
            .copied()
            .collect::<Vec<f32>>();

        let scale = self.input_size as f32;
        let mesh: FaceMesh = coords
            .chunks_exact(3)
            .map(|p| Landmark {
                x: p[0] / scale,
                y: p[1] / scale,
                z: p[2] / scale,
            })
            .collect();

        if mesh.len() < MESH_INDICES.required_len() {
            return Err(DmsError::Inference(format!(
                "model returned {} landmarks, need {}",
                mesh.len(),
                MESH_INDICES.required_len()
            )));
        }

        Ok(vec![mesh])
    }
}

/// Returns the same meshes for every frame
#[derive(Debug, Clone, Default)]
pub struct StaticLandmarkDetector {
    meshes: Vec<FaceMesh>,
}

impl StaticLandmarkDetector {
    pub fn new(meshes: Vec<FaceMesh>) -> Self {
        Self { meshes }
    }

    /// No faces in any frame
    pub fn empty() -> Self {
        Self::default()
    }

    /// One face looking straight at the camera
    pub fn centered() -> Self {
        let mut mesh = vec![Landmark::new(0.5, 0.5); 478];
        // subject's right eye
        mesh[33] = Landmark::new(0.38, 0.40);
        mesh[133] = Landmark::new(0.46, 0.40);
        mesh[468] = Landmark::new(0.42, 0.40);
        mesh[159] = Landmark::new(0.42, 0.40);
        // subject's left eye
        mesh[362] = Landmark::new(0.54, 0.41);
        mesh[263] = Landmark::new(0.62, 0.41);
        mesh[473] = Landmark::new(0.58, 0.41);
        mesh[386] = Landmark::new(0.58, 0.41);
        Self::new(vec![mesh])
    }
}

impl LandmarkDetector for StaticLandmarkDetector {
    fn detect(&self, _frame: &VideoFrame) -> Result<Vec<FaceMesh>, DmsError> {
        Ok(self.meshes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaze::{estimate_gaze, GazeDirection};
    use crate::landmarks::FaceLandmarks;

    fn frame() -> VideoFrame {
        VideoFrame::new(vec![0; 8 * 8 * 3], 8, 8, 0, 0)
    }

    #[test]
    fn test_centered_static_face_looks_center() {
        let meshes = StaticLandmarkDetector::centered().detect(&frame()).unwrap();
        assert_eq!(meshes.len(), 1);

        let face = FaceLandmarks::from_mesh(&meshes[0]).unwrap();
        assert_eq!(estimate_gaze(&face), GazeDirection::Center);
    }

    #[test]
    fn test_empty_static_detector() {
        assert!(StaticLandmarkDetector::empty().detect(&frame()).unwrap().is_empty());
    }

    #[test]
    fn test_config_without_model_uses_static_detector() {
        let detector = detector_from_config(&DmsConfig::default()).unwrap();
        assert_eq!(detector.detect(&frame()).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_model_file_is_load_error() {
        let config = DmsConfig {
            face_model_path: Some("/nonexistent/face_mesh.onnx".into()),
            ..Default::default()
        };
        assert!(matches!(
            detector_from_config(&config),
            Err(DmsError::ModelLoad(_))
        ));
    }
}
