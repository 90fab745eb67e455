//! DMS configuration

use serde::{Deserialize, Serialize};

use crate::distraction::DistractionRules;
use crate::gaze::GazeThresholds;

/// DMS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsConfig {
    /// Gaze classification thresholds
    pub gaze: GazeThresholds,

    /// Object labels used by the distraction rules
    pub rules: DistractionRules,

    /// Face mesh ONNX model; the static detector is used when unset
    pub face_model_path: Option<String>,

    /// Square model input edge (pixels)
    pub model_input_size: u32,

    /// Minimum face presence score when the model reports one
    pub face_confidence: f32,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            gaze: GazeThresholds::default(),
            rules: DistractionRules::default(),
            face_model_path: None,
            model_input_size: 192,
            face_confidence: 0.5,
        }
    }
}
