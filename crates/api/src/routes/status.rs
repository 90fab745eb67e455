//! Status Routes

use std::sync::Arc;

use axum::{extract::State, Json};
use monitor::FrameReport;
use serde::Serialize;

use crate::AppState;

/// Response for the status endpoint
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Overlay text of the first face's verdict
    pub status: Option<&'static str>,
    /// Gaze text of the first face
    pub gaze: Option<&'static str>,
    /// Latest frame report; null until the first frame
    pub frame: Option<FrameReport>,
}

/// Latest frame analysis
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let frame = state
        .feed
        .borrow()
        .as_ref()
        .map(|f| f.report.clone());

    let first_face = frame.as_ref().and_then(|f| f.faces.first().copied());
    Json(StatusResponse {
        status: first_face.map(|f| f.status.label()),
        gaze: first_face.map(|f| f.gaze.label()),
        frame,
    })
}
