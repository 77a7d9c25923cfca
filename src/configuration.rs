//! Extraction configuration.
//!
//! [`ExtractOptions`] is a builder that carries the fixed constants of an
//! extraction run (grid interval, seek timeout, settle delay, fallback canvas
//! size) and its progress callback through the pipeline without polluting
//! every function signature.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use thumbstrip::ExtractOptions;
//!
//! let options = ExtractOptions::new()
//!     .with_interval(Duration::from_secs(10))
//!     .with_seek_timeout(Duration::from_secs(2))
//!     .with_fallback_dimensions(320, 180);
//! assert_eq!(options.interval(), Duration::from_secs(10));
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;
use std::time::Duration;

use crate::progress::{NoOpProgress, ProgressCallback};

/// Default grid step.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);
/// Default seek-settle budget per capture.
pub const DEFAULT_SEEK_TIMEOUT: Duration = Duration::from_millis(5000);
/// Default delay between readiness and the extraction trigger.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);
/// Canvas size used when the decoder does not report native dimensions.
pub const DEFAULT_FALLBACK_DIMENSIONS: (u32, u32) = (160, 90);
/// Successful encodings smaller than this are logged as suspicious.
pub const DEFAULT_MIN_ENCODED_BYTES: usize = 1024;

/// Configuration for an extraction run.
///
/// All fields have sensible defaults. Options are cloned into the run when
/// it starts and never change while it is in progress.
#[derive(Clone)]
pub struct ExtractOptions {
    pub(crate) interval: Duration,
    pub(crate) seek_timeout: Duration,
    pub(crate) settle_delay: Duration,
    pub(crate) fallback_dimensions: (u32, u32),
    pub(crate) min_encoded_bytes: usize,
    pub(crate) stop_on_permission_denied: bool,
    pub(crate) progress: Arc<dyn ProgressCallback>,
}

impl Debug for ExtractOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ExtractOptions")
            .field("interval", &self.interval)
            .field("seek_timeout", &self.seek_timeout)
            .field("settle_delay", &self.settle_delay)
            .field("fallback_dimensions", &self.fallback_dimensions)
            .field("min_encoded_bytes", &self.min_encoded_bytes)
            .field("stop_on_permission_denied", &self.stop_on_permission_denied)
            .finish_non_exhaustive()
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractOptions {
    /// Create options with the default constants.
    ///
    /// Defaults: 5 s interval, 5000 ms seek timeout, 500 ms settle delay,
    /// 160×90 fallback canvas, stop on permission denial, no progress callback.
    pub fn new() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            seek_timeout: DEFAULT_SEEK_TIMEOUT,
            settle_delay: DEFAULT_SETTLE_DELAY,
            fallback_dimensions: DEFAULT_FALLBACK_DIMENSIONS,
            min_encoded_bytes: DEFAULT_MIN_ENCODED_BYTES,
            stop_on_permission_denied: true,
            progress: Arc::new(NoOpProgress),
        }
    }

    /// Set the spacing between grid timestamps.
    ///
    /// A zero interval is accepted here and rejected with
    /// [`ThumbstripError::InvalidInterval`](crate::ThumbstripError::InvalidInterval)
    /// when the grid is built.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set how long a capture waits for the decoder to confirm a seek.
    #[must_use]
    pub fn with_seek_timeout(mut self, timeout: Duration) -> Self {
        self.seek_timeout = timeout;
        self
    }

    /// Set the delay between readiness detection and the extraction trigger.
    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Set the canvas size used when native dimensions are unknown.
    ///
    /// Zero values are clamped to 1.
    #[must_use]
    pub fn with_fallback_dimensions(mut self, width: u32, height: u32) -> Self {
        self.fallback_dimensions = (width.max(1), height.max(1));
        self
    }

    /// Set the size below which a successful encoding is logged as suspicious.
    #[must_use]
    pub fn with_min_encoded_bytes(mut self, bytes: usize) -> Self {
        self.min_encoded_bytes = bytes;
        self
    }

    /// Control whether the grid walk stops once a permission failure is seen.
    ///
    /// Defaults to `true`. When `false` every grid entry is still attempted
    /// and each tainted capture yields its own error placeholder; the
    /// `permission_denied` flag is set either way.
    #[must_use]
    pub fn with_stop_on_permission_denied(mut self, stop: bool) -> Self {
        self.stop_on_permission_denied = stop;
        self
    }

    /// Attach a progress callback, invoked once per captured grid entry.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// The grid step.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The per-capture seek timeout.
    pub fn seek_timeout(&self) -> Duration {
        self.seek_timeout
    }

    /// The readiness-to-trigger delay.
    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    /// The fallback canvas size as `(width, height)`.
    pub fn fallback_dimensions(&self) -> (u32, u32) {
        self.fallback_dimensions
    }
}
