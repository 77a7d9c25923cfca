//! The extraction driver.
//!
//! [`ExtractionDriver::run`] walks the timestamp grid for one decoder,
//! awaiting each capture before issuing the next seek, and always leaves the
//! result store in [`RunStatus::Completed`](crate::RunStatus::Completed).
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "ffmpeg")]
//! # async fn example() -> Result<(), thumbstrip::ThumbstripError> {
//! use thumbstrip::{ExtractOptions, ExtractionDriver, FfmpegDecoder};
//!
//! let mut decoder = FfmpegDecoder::open("input.mp4")?;
//! let driver = ExtractionDriver::new(ExtractOptions::new());
//! let report = driver.run(&mut decoder).await;
//! println!("{} frames, {} skipped", report.frames, report.skipped);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use crate::capture::FrameCapture;
use crate::configuration::ExtractOptions;
use crate::decoder::DecoderHandle;
use crate::error::ThumbstripError;
use crate::grid::TimestampGrid;
use crate::placeholder::{PlaceholderService, SolidColorPlaceholder};
use crate::progress::ProgressTracker;
use crate::reference::ReferenceKind;
use crate::renderer::FrameCanvas;
use crate::store::ResultStore;

/// Summary of one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Entries in the timestamp grid (0 when the duration was invalid).
    pub grid_len: usize,
    /// Entries actually captured.
    pub attempted: usize,
    pub frames: usize,
    pub skipped: usize,
    pub errors: usize,
    pub permission_denied: bool,
    /// The walk stopped before the end of the grid after a permission failure.
    pub stopped_early: bool,
    /// The duration was unknown or not positive; no seek was issued.
    pub invalid_duration: bool,
    /// The interval was zero or too small for the duration; no seek was issued.
    pub invalid_interval: bool,
}

impl ExtractionReport {
    fn record(&mut self, kind: ReferenceKind) {
        self.attempted += 1;
        match kind {
            ReferenceKind::Frame => self.frames += 1,
            ReferenceKind::Skipped => self.skipped += 1,
            ReferenceKind::Error => self.errors += 1,
        }
    }
}

/// Owns the run-level state of extraction: options, the result store, and
/// the placeholder service.
#[derive(Clone)]
pub struct ExtractionDriver {
    options: ExtractOptions,
    store: ResultStore,
    placeholders: Arc<dyn PlaceholderService>,
}

impl ExtractionDriver {
    /// Create a driver with a fresh store and solid-colour placeholders.
    pub fn new(options: ExtractOptions) -> Self {
        Self {
            options,
            store: ResultStore::new(),
            placeholders: Arc::new(SolidColorPlaceholder),
        }
    }

    /// Publish results into `store` instead of a private one.
    #[must_use]
    pub fn with_store(mut self, store: ResultStore) -> Self {
        self.store = store;
        self
    }

    #[must_use]
    pub fn with_placeholders(mut self, placeholders: Arc<dyn PlaceholderService>) -> Self {
        self.placeholders = placeholders;
        self
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Run one extraction over `decoder`.
    ///
    /// Resets the store, walks the grid sequentially, and marks the store
    /// completed, whether the walk finished, stopped on a permission failure,
    /// or never started because the duration was invalid. Callers must not
    /// start a second run on the same store before this one resolves.
    pub async fn run<D: DecoderHandle + ?Sized>(&self, decoder: &mut D) -> ExtractionReport {
        self.store.begin_run();
        let mut report = ExtractionReport::default();

        let duration = decoder.duration();
        let grid = match TimestampGrid::new(duration, self.options.interval) {
            Ok(grid) => grid,
            Err(error) => {
                log::warn!("Extraction aborted before seeking: {error}");
                match error {
                    ThumbstripError::InvalidDuration(_) => report.invalid_duration = true,
                    _ => report.invalid_interval = true,
                }
                self.store.complete();
                return report;
            }
        };
        report.grid_len = grid.len();
        log::info!(
            "Extracting {} frame(s) every {:?} from {duration:.3}s of media",
            grid.len(),
            grid.interval()
        );

        let (width, height) = decoder
            .native_dimensions()
            .unwrap_or(self.options.fallback_dimensions);
        let mut canvas = FrameCanvas::new(width, height);
        let mut tracker = ProgressTracker::new(self.options.progress.clone(), grid.len() as u64);
        let mut capture = FrameCapture::new(
            decoder,
            &mut canvas,
            &*self.placeholders,
            &self.store,
            &self.options,
        );

        for (index, &timestamp) in grid.iter().enumerate() {
            if self.options.stop_on_permission_denied && self.store.permission_denied() {
                log::warn!(
                    "Pixel access denied; stopping after {index} of {} frame(s)",
                    grid.len()
                );
                report.stopped_early = true;
                break;
            }

            let result = capture.capture(index, timestamp).await;
            let kind = result.reference.kind();
            report.record(kind);
            tracker.advance(timestamp, kind);
        }

        report.permission_denied = self.store.permission_denied();
        self.store.complete();
        log::info!(
            "Extraction finished: {} frame(s), {} skipped, {} error(s)",
            report.frames,
            report.skipped,
            report.errors
        );
        report
    }
}
