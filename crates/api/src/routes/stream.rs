//! MJPEG video feed

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::header,
    response::IntoResponse,
};
use monitor::FrameFeed;
use tracing::debug;

use crate::AppState;

pub const BOUNDARY: &str = "frame";

/// One multipart section carrying a JPEG
pub fn multipart_part(jpeg: &[u8]) -> Vec<u8> {
    let header = format!("--{}\r\nContent-Type: image/jpeg\r\n\r\n", BOUNDARY);
    let mut part = Vec::with_capacity(header.len() + jpeg.len() + 4);
    part.extend_from_slice(header.as_bytes());
    part.extend_from_slice(jpeg);
    part.extend_from_slice(b"\r\n\r\n");
    part
}

/// Stream of multipart sections, one per published frame.
///
/// Ends when the monitor loop stops.
fn mjpeg_stream(feed: FrameFeed) -> impl futures::Stream<Item = Result<Vec<u8>, Infallible>> {
    futures::stream::unfold(feed, |mut feed| async move {
        loop {
            if feed.changed().await.is_err() {
                debug!("Frame feed closed");
                return None;
            }
            let latest = feed.borrow_and_update().clone();
            if let Some(frame) = latest {
                return Some((Ok(multipart_part(&frame.jpeg)), feed));
            }
        }
    })
}

/// `multipart/x-mixed-replace` stream of annotated frames
pub async fn video_feed(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let content_type = format!("multipart/x-mixed-replace; boundary={}", BOUNDARY);
    (
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "no-cache".to_string()),
        ],
        Body::from_stream(mjpeg_stream(state.feed.clone())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multipart_part_framing() {
        let part = multipart_part(&[0xFF, 0xD8, 0xFF, 0xD9]);
        let mut expected = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n".to_vec();
        expected.extend_from_slice(&[0xFF, 0xD8, 0xFF, 0xD9]);
        expected.extend_from_slice(b"\r\n\r\n");
        assert_eq!(part, expected);
    }
}
