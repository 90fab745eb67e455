//! HTML pages

use axum::response::Html;

const HOME_PAGE: &str = include_str!("../../templates/home.html");
const WORKING_PAGE: &str = include_str!("../../templates/index.html");

/// Landing page with the "Begin Working!" button
pub async fn home() -> Html<&'static str> {
    Html(HOME_PAGE)
}

/// Live feed with gaze and status readout
pub async fn begin_working() -> Html<&'static str> {
    Html(WORKING_PAGE)
}
