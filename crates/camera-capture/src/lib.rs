//! Camera Capture Library
//!
//! Provides webcam frames for the focus monitor.
//! Supports:
//! - V4L2 webcams (`v4l2` feature)
//! - Synthetic frames for `stub://` device paths
//! - A still image repeated as a video feed

pub mod frame;
pub mod source;
#[cfg(feature = "v4l2")]
mod v4l2;

pub use frame::{decode_image, VideoFrame};
pub use source::{CameraSource, StillImageSource};

use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open camera: {0}")]
    Open(String),

    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Streaming error: {0}")]
    Stream(String),

    #[error("Capture timeout")]
    Timeout,

    #[error("Camera not initialized")]
    NotInitialized,

    #[error("Image decoding failed: {0}")]
    Decode(String),

    #[error("Image encoding failed: {0}")]
    Encode(String),
}

/// Camera configuration
#[derive(Debug, Clone)]
pub struct CameraConfig {
    /// Device path (e.g., "/dev/video0", or "stub://name" for synthetic frames)
    pub device: String,
    /// Capture width
    pub width: u32,
    /// Capture height
    pub height: u32,
    /// Target FPS
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            width: 640,
            height: 480,
            fps: 15,
        }
    }
}

impl CameraConfig {
    /// Synthetic camera config, used by tests and demos without a webcam
    pub fn synthetic() -> Self {
        Self {
            device: "stub://synthetic".to_string(),
            width: 320,
            height: 240,
            ..Default::default()
        }
    }
}

/// Anything that yields video frames, one at a time
pub trait FrameSource: Send {
    /// Read the next frame, blocking until one is available
    fn read_frame(&mut self) -> Result<VideoFrame, CameraError>;

    /// Capture statistics
    fn stats(&self) -> FrameSourceStats;
}

/// Capture statistics for a frame source
#[derive(Debug, Clone, Default)]
pub struct FrameSourceStats {
    pub frames_captured: u64,
    pub source: String,
}

impl<F: FrameSource + ?Sized> FrameSource for Box<F> {
    fn read_frame(&mut self) -> Result<VideoFrame, CameraError> {
        (**self).read_frame()
    }

    fn stats(&self) -> FrameSourceStats {
        (**self).stats()
    }
}
