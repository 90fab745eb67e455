//! Latest-frame fan-out to HTTP clients

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dms::DistractionStatus;
use tokio::sync::watch;

use crate::AnnotatedFrame;

/// Receiving side: always holds the most recent frame
pub type FrameFeed = watch::Receiver<Option<Arc<AnnotatedFrame>>>;

/// Counters shared between the loop and the HTTP layer
#[derive(Debug, Default)]
pub struct MonitorStats {
    frames_processed: AtomicU64,
    frames_dropped: AtomicU64,
}

impl MonitorStats {
    pub fn frames_processed(&self) -> u64 {
        self.frames_processed.load(Ordering::Relaxed)
    }

    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped.load(Ordering::Relaxed)
    }

    pub(crate) fn record_processed(&self, status: Option<DistractionStatus>) {
        self.frames_processed.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("focus_frames_processed_total").increment(1);
        let label = status.map_or("NO FACE", |s| s.label());
        metrics::counter!("focus_status_total", "status" => label).increment(1);
    }

    pub(crate) fn record_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("focus_frames_dropped_total").increment(1);
    }
}

/// Sending side, owned by the monitor loop
#[derive(Debug)]
pub struct FramePublisher {
    tx: watch::Sender<Option<Arc<AnnotatedFrame>>>,
}

impl FramePublisher {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    pub fn subscribe(&self) -> FrameFeed {
        self.tx.subscribe()
    }

    /// Replace the current frame; subscribers that lag only see the newest
    pub fn publish(&self, frame: AnnotatedFrame) {
        self.tx.send_replace(Some(Arc::new(frame)));
    }
}

impl Default for FramePublisher {
    fn default() -> Self {
        Self::new()
    }
}
