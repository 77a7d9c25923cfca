//! Progress reporting for extraction runs.
//!
//! [`ProgressCallback`] receives a [`ProgressInfo`] snapshot after every
//! capture the extraction driver appends to the result store. Callbacks only
//! observe: there is no mid-run cancellation.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use thumbstrip::{ExtractOptions, ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(pct) = info.percentage {
//!             println!("{pct:.1}% ({:?})", info.outcome);
//!         }
//!     }
//! }
//!
//! let options = ExtractOptions::new().with_progress(Arc::new(PrintProgress));
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::reference::ReferenceKind;

/// A snapshot of extraction progress, delivered after each capture.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// How many grid entries have been captured so far.
    pub current: u64,
    /// Number of entries in the timestamp grid.
    pub total: u64,
    /// Completion percentage (0.0 – 100.0). `None` for an empty grid.
    pub percentage: Option<f32>,
    /// Wall-clock time elapsed since the run started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on current throughput.
    pub estimated_remaining: Option<Duration>,
    /// The grid timestamp that was just captured.
    pub current_timestamp: Duration,
    /// What the capture produced.
    pub outcome: ReferenceKind,
}

/// Trait for receiving progress updates during extraction.
///
/// Implementations must be [`Send`] and [`Sync`] so options can be shared
/// with runs driven from any task.
pub trait ProgressCallback: Send + Sync {
    /// Called once per captured grid entry.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications. The default callback.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Tracks run timing and emits callbacks.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    total: u64,
    current: u64,
    start_time: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(callback: Arc<dyn ProgressCallback>, total: u64) -> Self {
        Self {
            callback,
            total,
            current: 0,
            start_time: Instant::now(),
        }
    }

    /// Record one captured entry and notify the callback.
    pub(crate) fn advance(&mut self, timestamp: Duration, outcome: ReferenceKind) {
        self.current += 1;

        let elapsed = self.start_time.elapsed();
        let percentage =
            (self.total > 0).then(|| (self.current as f32 / self.total as f32) * 100.0);
        let remaining = self.total.saturating_sub(self.current);
        let estimated_remaining = (self.current > 0).then(|| {
            let per_item = elapsed / self.current as u32;
            per_item * remaining as u32
        });

        let info = ProgressInfo {
            current: self.current,
            total: self.total,
            percentage,
            elapsed,
            estimated_remaining,
            current_timestamp: timestamp,
            outcome,
        };

        self.callback.on_progress(&info);
    }
}
