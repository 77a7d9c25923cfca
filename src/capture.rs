//! The frame capture unit.
//!
//! [`FrameCapture::capture`] positions the decoder at one grid timestamp,
//! races the decoder's settle event against the seek timeout, renders the
//! settled surface, and appends exactly one [`CaptureResult`] to the result
//! store. It never fails outward: every error is classified and turned into
//! a placeholder tile.

use std::time::Duration;

use tokio::sync::broadcast::{Receiver, error::RecvError};

use crate::configuration::ExtractOptions;
use crate::decoder::{DecoderEvent, DecoderHandle, SeekTicket};
use crate::error::ThumbstripError;
use crate::placeholder::{ERROR_COLOR, ERROR_LABEL, PlaceholderService, SKIPPED_COLOR};
use crate::reference::{DisplayReference, ReferenceKind};
use crate::renderer::FrameCanvas;
use crate::store::{CaptureResult, ResultStore};
use crate::utilities::rounded_seconds;

/// Captures frames from one decoder into one canvas.
///
/// Borrowed from the extraction driver for the duration of a run. Holding
/// the decoder by `&mut` guarantees a single capture is in flight at a time.
pub struct FrameCapture<'a, D: DecoderHandle + ?Sized> {
    decoder: &'a mut D,
    canvas: &'a mut FrameCanvas,
    placeholders: &'a dyn PlaceholderService,
    store: &'a ResultStore,
    options: &'a ExtractOptions,
}

impl<'a, D: DecoderHandle + ?Sized> FrameCapture<'a, D> {
    pub fn new(
        decoder: &'a mut D,
        canvas: &'a mut FrameCanvas,
        placeholders: &'a dyn PlaceholderService,
        store: &'a ResultStore,
        options: &'a ExtractOptions,
    ) -> Self {
        Self {
            decoder,
            canvas,
            placeholders,
            store,
            options,
        }
    }

    /// Capture grid entry `index` at `timestamp` and append it to the store.
    ///
    /// Resolves within the seek timeout plus rendering time even if the
    /// decoder never confirms the seek. A permission failure sets the
    /// store's sticky `permission_denied` flag.
    pub async fn capture(&mut self, index: usize, timestamp: Duration) -> CaptureResult {
        let reference = match self.attempt(timestamp).await {
            Ok(reference) => reference,
            Err(error) => self.recover(timestamp, error),
        };

        let result = CaptureResult {
            index,
            timestamp,
            reference,
        };
        self.store.push(result.clone());
        result
    }

    async fn attempt(&mut self, timestamp: Duration) -> Result<DisplayReference, ThumbstripError> {
        if !self.decoder.is_attached() {
            return Err(ThumbstripError::MissingResource("decoder handle"));
        }
        if !self.canvas.is_available() {
            return Err(ThumbstripError::MissingResource("pixel surface"));
        }

        // Subscribe before seeking so a synchronous settle is not missed.
        let mut events = self.decoder.subscribe();
        let ticket = self.decoder.seek(timestamp);
        log::debug!("Seeking to {timestamp:?} ({ticket:?})");

        let timeout = self.options.seek_timeout;
        tokio::time::timeout(timeout, wait_for_settle(&mut events, ticket))
            .await
            .map_err(|_| ThumbstripError::SeekTimeout { timestamp, timeout })??;
        drop(events);

        self.render(timestamp)
    }

    fn render(&mut self, timestamp: Duration) -> Result<DisplayReference, ThumbstripError> {
        if let Some((width, height)) = self.decoder.native_dimensions() {
            self.canvas.ensure_dimensions(width, height);
        }

        let surface = self.decoder.surface()?;
        self.canvas.draw(&surface)?;
        let png = self.canvas.encode_png()?;

        if png.len() < self.options.min_encoded_bytes {
            log::warn!(
                "Frame at {timestamp:?} encoded to only {} bytes; keeping it",
                png.len()
            );
        }

        let (width, height) = self.canvas.dimensions();
        log::debug!("Captured {width}x{height} frame at {timestamp:?}");
        Ok(DisplayReference::frame(width, height, png))
    }

    fn recover(&self, timestamp: Duration, error: ThumbstripError) -> DisplayReference {
        let (width, height) = self.placeholder_dimensions();
        match error {
            ThumbstripError::SeekTimeout { .. } => {
                log::warn!("{error}; skipping");
                let label = format!("Skipped {}s", rounded_seconds(timestamp));
                self.placeholders.placeholder(
                    ReferenceKind::Skipped,
                    width,
                    height,
                    SKIPPED_COLOR,
                    &label,
                )
            }
            ThumbstripError::PermissionDenied => {
                log::warn!("Frame at {timestamp:?} is not readable (cross-origin); {error}");
                self.store.mark_permission_denied();
                self.error_placeholder(width, height)
            }
            other => {
                log::warn!("Capture at {timestamp:?} failed: {other}");
                self.error_placeholder(width, height)
            }
        }
    }

    fn error_placeholder(&self, width: u32, height: u32) -> DisplayReference {
        self.placeholders
            .placeholder(ReferenceKind::Error, width, height, ERROR_COLOR, ERROR_LABEL)
    }

    fn placeholder_dimensions(&self) -> (u32, u32) {
        if self.canvas.is_available() {
            self.canvas.dimensions()
        } else {
            self.options.fallback_dimensions
        }
    }
}

/// Wait for the settle event carrying `ticket`, ignoring everything else.
async fn wait_for_settle(
    events: &mut Receiver<DecoderEvent>,
    ticket: SeekTicket,
) -> Result<(), ThumbstripError> {
    loop {
        match events.recv().await {
            Ok(DecoderEvent::PositionSettled(settled)) if settled == ticket => return Ok(()),
            Ok(_) => {}
            Err(RecvError::Lagged(missed)) => {
                log::debug!("Decoder event observer lagged by {missed} events");
            }
            Err(RecvError::Closed) => return Err(ThumbstripError::DecoderClosed),
        }
    }
}
