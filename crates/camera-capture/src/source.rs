//! Frame sources: webcam, synthetic and still image

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::info;

use crate::{CameraConfig, CameraError, FrameSource, FrameSourceStats, VideoFrame};

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Webcam source.
///
/// `stub://` device paths produce synthetic frames; anything else is opened
/// as a V4L2 device when built with the `v4l2` feature.
pub struct CameraSource {
    backend: Backend,
}

enum Backend {
    Synthetic(SyntheticCamera),
    #[cfg(feature = "v4l2")]
    Device(crate::v4l2::V4l2Camera),
}

impl CameraSource {
    /// Open the camera described by `config`
    pub fn open(config: CameraConfig) -> Result<Self, CameraError> {
        if config.device.starts_with("stub://") {
            info!("Camera {}: synthetic {}x{}", config.device, config.width, config.height);
            return Ok(Self {
                backend: Backend::Synthetic(SyntheticCamera::new(config)),
            });
        }

        #[cfg(feature = "v4l2")]
        {
            Ok(Self {
                backend: Backend::Device(crate::v4l2::V4l2Camera::open(config)?),
            })
        }

        #[cfg(not(feature = "v4l2"))]
        {
            tracing::warn!("Camera {} requested but built without the v4l2 feature", config.device);
            Err(CameraError::Open(format!(
                "{}: V4L2 support not compiled in (enable the `v4l2` feature)",
                config.device
            )))
        }
    }
}

impl FrameSource for CameraSource {
    fn read_frame(&mut self) -> Result<VideoFrame, CameraError> {
        match &mut self.backend {
            Backend::Synthetic(camera) => Ok(camera.next_frame()),
            #[cfg(feature = "v4l2")]
            Backend::Device(camera) => camera.next_frame(),
        }
    }

    fn stats(&self) -> FrameSourceStats {
        match &self.backend {
            Backend::Synthetic(camera) => FrameSourceStats {
                frames_captured: camera.sequence as u64,
                source: camera.config.device.clone(),
            },
            #[cfg(feature = "v4l2")]
            Backend::Device(camera) => camera.stats(),
        }
    }
}

/// Generates a flat grey scene with a bright bar sweeping across it
struct SyntheticCamera {
    config: CameraConfig,
    sequence: u32,
}

impl SyntheticCamera {
    fn new(config: CameraConfig) -> Self {
        Self { config, sequence: 0 }
    }

    fn next_frame(&mut self) -> VideoFrame {
        let (width, height) = (self.config.width, self.config.height);
        let mut data = vec![96u8; (width * height * 3) as usize];

        if width > 0 {
            let bar_x = self.sequence % width;
            for y in 0..height {
                let idx = ((y * width + bar_x) * 3) as usize;
                data[idx..idx + 3].copy_from_slice(&[255, 255, 255]);
            }
        }

        let frame = VideoFrame::new(data, width, height, now_ns(), self.sequence);
        self.sequence = self.sequence.wrapping_add(1);
        frame
    }
}

/// Repeats one decoded image as an endless feed
pub struct StillImageSource {
    path: PathBuf,
    frame: VideoFrame,
    sequence: u32,
}

impl StillImageSource {
    /// Decode the image at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CameraError> {
        let path = path.as_ref().to_path_buf();
        let image = image::open(&path)
            .map_err(|e| CameraError::Open(format!("{}: {}", path.display(), e)))?
            .to_rgb8();
        info!(
            "Still image source {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        Ok(Self {
            frame: VideoFrame::from_image(image, 0, 0),
            path,
            sequence: 0,
        })
    }
}

impl FrameSource for StillImageSource {
    fn read_frame(&mut self) -> Result<VideoFrame, CameraError> {
        let mut frame = self.frame.clone();
        frame.timestamp_ns = now_ns();
        frame.sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        Ok(frame)
    }

    fn stats(&self) -> FrameSourceStats {
        FrameSourceStats {
            frames_captured: self.sequence as u64,
            source: self.path.display().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_source_produces_sequenced_frames() {
        let mut source = CameraSource::open(CameraConfig::synthetic()).unwrap();

        let first = source.read_frame().unwrap();
        let second = source.read_frame().unwrap();

        assert_eq!((first.width, first.height), (320, 240));
        assert_eq!(first.data.len(), 320 * 240 * 3);
        assert_eq!(second.sequence, first.sequence + 1);
        assert_ne!(first.data, second.data);
        assert_eq!(source.stats().frames_captured, 2);
    }

    #[cfg(not(feature = "v4l2"))]
    #[test]
    fn test_device_path_requires_v4l2_feature() {
        let result = CameraSource::open(CameraConfig::default());
        assert!(matches!(result, Err(CameraError::Open(_))));
    }

    #[test]
    fn test_still_image_repeats() {
        let path = std::env::temp_dir().join(format!("still-source-{}.png", std::process::id()));
        image::RgbImage::from_pixel(8, 6, image::Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();

        let mut source = StillImageSource::open(&path).unwrap();
        let a = source.read_frame().unwrap();
        let b = source.read_frame().unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!((a.width, a.height), (8, 6));
        assert_eq!(a.data, b.data);
        assert_eq!(b.sequence, 1);
        assert_eq!(a.get_pixel(0, 0), Some([10, 20, 30]));
    }

    #[test]
    fn test_missing_still_image_is_open_error() {
        let result = StillImageSource::open("/nonexistent/frame.png");
        assert!(matches!(result, Err(CameraError::Open(_))));
    }
}
