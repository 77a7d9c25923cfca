//! The decoder handle seam.
//!
//! [`DecoderHandle`] wraps a hidden media-decoding resource with a single
//! mutable playback position. Readiness and seek completion are reported
//! asynchronously as [`DecoderEvent`]s over a broadcast channel; everything
//! else is a synchronous query. The extraction pipeline takes the handle by
//! exclusive reference, so it is never aliased with a playback decoder.

use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use tokio::sync::broadcast::Receiver;

use crate::error::ThumbstripError;

/// How much of the media the decoder has available, in increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ReadyState {
    /// Nothing is known about the media yet.
    #[default]
    HaveNothing,
    /// Duration and native dimensions are known.
    HaveMetadata,
    /// Enough data is buffered to play through; extraction may start.
    HaveEnoughData,
}

/// Identifies one seek request so its settle event can be matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeekTicket(pub u64);

impl SeekTicket {
    /// The ticket that follows this one.
    pub fn next(self) -> Self {
        SeekTicket(self.0.wrapping_add(1))
    }
}

/// Asynchronous notifications emitted by a decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderEvent {
    /// Duration and native dimensions became available.
    MetadataLoaded,
    /// The decoder reached [`ReadyState::HaveEnoughData`].
    CanPlayThrough,
    /// The seek identified by the ticket completed and the surface shows
    /// the new position.
    PositionSettled(SeekTicket),
}

/// The decoder's currently visible picture.
#[derive(Debug, Clone)]
pub struct VideoSurface {
    /// RGBA pixels at the decoder's native size.
    pub pixels: Arc<RgbaImage>,
    /// `false` when the content may be displayed but not read back
    /// (cross-origin media without authorisation).
    pub origin_clean: bool,
}

impl VideoSurface {
    pub fn new(pixels: Arc<RgbaImage>, origin_clean: bool) -> Self {
        Self {
            pixels,
            origin_clean,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}

/// A media decoder driven by the extraction pipeline.
///
/// Implementations must deliver [`DecoderEvent::PositionSettled`] only to
/// receivers subscribed before the event is sent; a capture subscribes
/// first and seeks second.
pub trait DecoderHandle: Send {
    /// `false` once the underlying resource has been released.
    fn is_attached(&self) -> bool;

    fn ready_state(&self) -> ReadyState;

    /// Total duration in seconds. `NaN` while unknown.
    fn duration(&self) -> f64;

    /// Native `(width, height)`, if known and non-zero.
    fn native_dimensions(&self) -> Option<(u32, u32)>;

    /// The position the surface currently reflects.
    fn current_position(&self) -> Duration;

    /// Register an observer for decoder events. Dropping the receiver
    /// unregisters it.
    fn subscribe(&self) -> Receiver<DecoderEvent>;

    /// Request a move to `position`. Completion is reported by a
    /// [`DecoderEvent::PositionSettled`] carrying the returned ticket, or
    /// never, if the decoder stalls.
    fn seek(&mut self, position: Duration) -> SeekTicket;

    /// Read the currently visible surface.
    ///
    /// # Errors
    ///
    /// [`ThumbstripError::MissingResource`] when no picture is available, or
    /// [`ThumbstripError::RenderError`] when it cannot be produced.
    fn surface(&self) -> Result<VideoSurface, ThumbstripError>;

    /// Start loading the media resource.
    fn load(&mut self) -> Result<(), ThumbstripError>;

    fn play(&mut self) -> Result<(), ThumbstripError>;

    fn pause(&mut self) -> Result<(), ThumbstripError>;
}
