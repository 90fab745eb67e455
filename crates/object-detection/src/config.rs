//! Object detection configuration

use serde::{Deserialize, Serialize};

/// Hosted detection service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Service base URL
    pub api_url: String,

    /// Model and version, e.g. "coco/3"
    pub model_id: String,

    /// API key; detection is disabled when unset
    pub api_key: Option<String>,

    /// Minimum confidence (0-1); the service default applies when unset
    pub confidence: Option<f32>,

    /// JPEG quality of the uploaded frame
    pub jpeg_quality: u8,

    /// Request timeout (milliseconds)
    pub timeout_ms: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            api_url: "https://detect.roboflow.com".to_string(),
            model_id: "coco/3".to_string(),
            api_key: None,
            confidence: None,
            jpeg_quality: 85,
            timeout_ms: 5000,
        }
    }
}
