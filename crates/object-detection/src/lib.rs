//! Object Detection
//!
//! Finds labelled objects (cell phone, notebook, ...) in a frame:
//! - Roboflow hosted inference client
//! - Static detector for running without an API key

pub mod config;
pub mod roboflow;

pub use config::DetectionConfig;
pub use dms::{BoundingBox, DetectedObject};
pub use roboflow::{Prediction, RoboflowClient, RoboflowResponse};

use std::future::Future;

use camera_capture::frame::VideoFrame;
use thiserror::Error;
use tracing::warn;

/// Object detection error types
#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("No API key configured")]
    MissingApiKey,

    #[error("Frame encoding failed: {0}")]
    Encode(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Detection service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed detection response: {0}")]
    Decode(String),
}

/// Detects objects in a single frame
pub trait ObjectDetector: Send + Sync {
    fn detect(
        &self,
        frame: &VideoFrame,
    ) -> impl Future<Output = Result<Vec<DetectedObject>, DetectionError>> + Send;
}

/// Returns the same objects for every frame
#[derive(Debug, Clone, Default)]
pub struct StaticObjectDetector {
    objects: Vec<DetectedObject>,
}

impl StaticObjectDetector {
    pub fn new(objects: Vec<DetectedObject>) -> Self {
        Self { objects }
    }
}

impl ObjectDetector for StaticObjectDetector {
    async fn detect(&self, _frame: &VideoFrame) -> Result<Vec<DetectedObject>, DetectionError> {
        Ok(self.objects.clone())
    }
}

/// Detector chosen at startup from configuration
pub enum AnyObjectDetector {
    Roboflow(RoboflowClient),
    Static(StaticObjectDetector),
}

impl AnyObjectDetector {
    /// Roboflow when an API key is available, otherwise a detector that
    /// never finds anything.
    pub fn from_config(config: &DetectionConfig) -> Result<Self, DetectionError> {
        if config.api_key.as_deref().map_or(true, str::is_empty) {
            warn!("No object detection API key configured. Objects will not be detected.");
            return Ok(Self::Static(StaticObjectDetector::default()));
        }
        Ok(Self::Roboflow(RoboflowClient::new(config.clone())?))
    }
}

impl ObjectDetector for AnyObjectDetector {
    async fn detect(&self, frame: &VideoFrame) -> Result<Vec<DetectedObject>, DetectionError> {
        match self {
            Self::Roboflow(client) => client.detect(frame).await,
            Self::Static(detector) => detector.detect(frame).await,
        }
    }
}
