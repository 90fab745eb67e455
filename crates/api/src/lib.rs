//! Focus Monitor API Server
//!
//! Serves the working page, the annotated MJPEG feed and a JSON status API.

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use camera_capture::{CameraError, CameraSource, FrameSource, StillImageSource};
use dms::{detector_from_config, DmsError, FocusAnalyzer, LandmarkDetector};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use monitor::{FocusMonitor, FrameFeed, FramePublisher, MonitorStats};
use object_detection::{AnyObjectDetector, DetectionError};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

pub mod config;
pub mod routes;

pub use config::AppConfig;

/// Errors while wiring the pipeline together
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Camera: {0}")]
    Camera(#[from] CameraError),

    #[error("Landmark detector: {0}")]
    Landmarks(#[from] DmsError),

    #[error("Object detector: {0}")]
    Objects(#[from] DetectionError),
}

/// Application state shared across handlers
pub struct AppState {
    /// Latest annotated frame
    pub feed: FrameFeed,
    /// Loop counters
    pub stats: Arc<MonitorStats>,
    /// Prometheus renderer, when a recorder is installed
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(feed: FrameFeed, stats: Arc<MonitorStats>) -> Self {
        Self {
            feed,
            stats,
            metrics: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` while the monitor loop publishes, `degraded` once it stopped
    pub status: String,
    pub monitor_running: bool,
    pub version: String,
    pub uptime_seconds: u64,
    pub frames_processed: u64,
    pub frames_dropped: u64,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(routes::pages::home))
        .route("/begin_working", get(routes::pages::begin_working))
        .route("/video_feed", get(routes::stream::video_feed))
        .route("/api/v1/status", get(routes::status::get_status))
        .route("/api/v1/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    // the publisher is dropped when the monitor loop exits
    let monitor_running = state.feed.has_changed().is_ok();
    let status = if monitor_running { "healthy" } else { "degraded" };
    Json(HealthResponse {
        status: status.to_string(),
        monitor_running,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        frames_processed: state.stats.frames_processed(),
        frames_dropped: state.stats.frames_dropped(),
    })
}

/// Prometheus exposition
async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state
        .metrics
        .as_ref()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}

/// Initialize logging; `RUST_LOG` overrides the default `info` level
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // a subscriber may already be set (tests, embedding)
    let _ = fmt().with_env_filter(filter).with_target(true).try_init();
}

/// Open the configured frame source
pub fn open_source(config: &AppConfig) -> Result<Box<dyn FrameSource>, StartupError> {
    match &config.camera.image_path {
        Some(path) => Ok(Box::new(StillImageSource::open(path)?)),
        None => Ok(Box::new(CameraSource::open((&config.camera).into())?)),
    }
}

/// Type of the monitor built from configuration
pub type ConfiguredMonitor =
    FocusMonitor<Box<dyn FrameSource>, Box<dyn LandmarkDetector>, AnyObjectDetector>;

/// Build the monitor with the collaborators named in `config`
pub fn build_monitor(config: &AppConfig) -> Result<ConfiguredMonitor, StartupError> {
    let source = open_source(config)?;
    let landmarks = detector_from_config(&config.dms)?;
    let objects = AnyObjectDetector::from_config(&config.detection)?;

    Ok(FocusMonitor::new(
        config.monitor.clone(),
        source,
        landmarks,
        objects,
        FocusAnalyzer::new(&config.dms),
    ))
}

/// Run the monitor loop and the server until ctrl-c
pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    let monitor = build_monitor(&config)?;
    let publisher = FramePublisher::new();
    let mut state = AppState::new(publisher.subscribe(), monitor.stats());
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => state = state.with_metrics(handle),
        Err(e) => error!("Metrics recorder unavailable: {}", e),
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let monitor_task = tokio::spawn(monitor.run(publisher, shutdown_rx));

    let app = create_router(Arc::new(state));
    info!("Starting API server on {}", config.server.addr);
    let listener = tokio::net::TcpListener::bind(&config.server.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = monitor_task.await? {
        error!("Monitor loop ended with error: {}", e);
    }
    Ok(())
}
