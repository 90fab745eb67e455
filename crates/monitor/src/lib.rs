//! Focus Monitor Loop
//!
//! Runs the per-frame pipeline with injected collaborators:
//! capture -> mirror -> landmarks -> objects -> gaze + distraction ->
//! annotate -> JPEG -> publish.
//!
//! Capture and landmark inference block, so they run on the blocking pool.

pub mod overlay;
pub mod publish;

pub use publish::{FrameFeed, FramePublisher, MonitorStats};

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use camera_capture::{CameraError, FrameSource, VideoFrame};
use dms::{
    primary_status, DetectedObject, DistractionStatus, FaceMesh, FaceReport, FocusAnalyzer, LandmarkDetector,
};
use object_detection::ObjectDetector;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Monitor error types
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Camera failed {0} times in a row")]
    CameraExhausted(u32),

    #[error("Failed to render frame: {0}")]
    Render(#[source] CameraError),

    #[error("Overlay font could not be loaded: {0}")]
    Font(#[from] ab_glyph::InvalidFont),
}

/// Loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Flip frames horizontally before analysis (selfie view)
    pub mirror: bool,

    /// JPEG quality of the published frames
    pub jpeg_quality: u8,

    /// Consecutive camera failures before the loop stops (0 = never stop)
    pub max_consecutive_camera_failures: u32,

    /// Minimum time between frames (milliseconds)
    pub frame_interval_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            mirror: true,
            jpeg_quality: 80,
            max_consecutive_camera_failures: 1,
            frame_interval_ms: 66,
        }
    }
}

/// Analysis results for one frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameReport {
    pub sequence: u32,
    pub timestamp_ms: u64,
    pub faces: Vec<FaceReport>,
    pub objects: Vec<DetectedObject>,
}

impl FrameReport {
    /// Verdict of the first face
    pub fn status(&self) -> Option<DistractionStatus> {
        primary_status(&self.faces)
    }
}

/// Annotated JPEG and the report it shows
#[derive(Debug, Clone)]
pub struct AnnotatedFrame {
    pub jpeg: Vec<u8>,
    pub report: FrameReport,
}

/// The per-frame pipeline
pub struct FocusMonitor<S, L, O> {
    config: MonitorConfig,
    source: Arc<Mutex<S>>,
    landmarks: Arc<L>,
    objects: O,
    analyzer: FocusAnalyzer,
    stats: Arc<MonitorStats>,
}

impl<S, L, O> FocusMonitor<S, L, O>
where
    S: FrameSource + 'static,
    L: LandmarkDetector + 'static,
    O: ObjectDetector,
{
    pub fn new(config: MonitorConfig, source: S, landmarks: L, objects: O, analyzer: FocusAnalyzer) -> Self {
        Self {
            config,
            source: Arc::new(Mutex::new(source)),
            landmarks: Arc::new(landmarks),
            objects,
            analyzer,
            stats: Arc::new(MonitorStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<MonitorStats> {
        Arc::clone(&self.stats)
    }

    /// Run one capture/analyze/annotate iteration.
    ///
    /// Camera failures surface as [`MonitorError::Camera`], rendering
    /// failures as [`MonitorError::Render`]. Landmark and object detection
    /// failures are logged and treated as "nothing found" for this frame.
    pub async fn process_frame(&mut self) -> Result<AnnotatedFrame, MonitorError> {
        let mut frame = self.capture().await?;
        if self.config.mirror {
            frame.mirror().map_err(MonitorError::Render)?;
        }

        let frame = Arc::new(frame);
        let meshes = self.detect_landmarks(Arc::clone(&frame)).await;

        let objects = match self.objects.detect(&frame).await {
            Ok(objects) => objects,
            Err(e) => {
                warn!("Object detection failed: {}", e);
                Vec::new()
            }
        };
        let mut frame = Arc::try_unwrap(frame).unwrap_or_else(|shared| (*shared).clone());

        let faces = self.analyzer.analyze(&meshes, &objects);
        let report = FrameReport {
            sequence: frame.sequence,
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0),
            faces,
            objects,
        };

        overlay::annotate(&mut frame, &report.objects, report.faces.first())?;
        let jpeg = frame
            .to_jpeg(self.config.jpeg_quality)
            .map_err(MonitorError::Render)?;

        debug!(
            sequence = report.sequence,
            faces = report.faces.len(),
            objects = report.objects.len(),
            status = ?report.status(),
            "Frame processed"
        );

        Ok(AnnotatedFrame { jpeg, report })
    }

    async fn capture(&self) -> Result<VideoFrame, CameraError> {
        let source = Arc::clone(&self.source);
        task::spawn_blocking(move || {
            let mut guard = source
                .lock()
                .map_err(|_| CameraError::Stream("frame source lock poisoned".into()))?;
            guard.read_frame()
        })
        .await
        .map_err(|e| CameraError::Stream(format!("capture task failed: {}", e)))?
    }

    async fn detect_landmarks(&self, frame: Arc<VideoFrame>) -> Vec<FaceMesh> {
        let landmarks = Arc::clone(&self.landmarks);
        match task::spawn_blocking(move || landmarks.detect(&frame)).await {
            Ok(Ok(meshes)) => meshes,
            Ok(Err(e)) => {
                warn!("Landmark detection failed: {}", e);
                Vec::new()
            }
            Err(e) => {
                warn!("Landmark task failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Process frames until shutdown or the camera gives out
    pub async fn run(
        mut self,
        publisher: FramePublisher,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), MonitorError> {
        let mut ticker = tokio::time::interval(Duration::from_millis(self.config.frame_interval_ms.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut camera_failures = 0u32;

        info!("Focus monitor started");
        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    match self.process_frame().await {
                        Ok(frame) => {
                            camera_failures = 0;
                            self.stats.record_processed(frame.report.status());
                            publisher.publish(frame);
                        }
                        Err(MonitorError::Camera(e)) => {
                            camera_failures += 1;
                            self.stats.record_dropped();
                            let limit = self.config.max_consecutive_camera_failures;
                            if limit > 0 && camera_failures >= limit {
                                error!("Camera failed {} times, stopping: {}", camera_failures, e);
                                return Err(MonitorError::CameraExhausted(camera_failures));
                            }
                            warn!("Camera read failed ({}): {}", camera_failures, e);
                        }
                        Err(e) => {
                            // the camera delivered; only this frame is lost
                            camera_failures = 0;
                            self.stats.record_dropped();
                            warn!("Frame dropped: {}", e);
                        }
                    }
                }
            }
        }

        info!(
            "Focus monitor stopped after {} frames",
            self.stats.frames_processed()
        );
        Ok(())
    }
}
