//! Error types for the `thumbstrip` crate.
//!
//! This module defines [`ThumbstripError`], the unified error type used by
//! every fallible operation in the crate. Capture failures never escape the
//! extraction pipeline: the frame capture unit classifies them and turns
//! them into placeholder tiles. The error type still carries rich context so
//! those classifications can be logged and tested.

use std::{io::Error as IoError, path::PathBuf, time::Duration};

#[cfg(feature = "ffmpeg")]
use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `thumbstrip` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ThumbstripError {
    /// The decoder handle or the pixel surface was not available when a
    /// capture was requested.
    #[error("Missing resource: {0}")]
    MissingResource(&'static str),

    /// The media duration is unknown (`NaN`), infinite, or not positive.
    #[error("Invalid media duration: {0}")]
    InvalidDuration(f64),

    /// An interval or step value of zero was provided.
    #[error("Interval must be greater than zero")]
    InvalidInterval,

    /// The interval is so small relative to the duration that the grid
    /// would exceed the entry limit.
    #[error("Grid of {entries} entries exceeds the limit of {limit}")]
    GridTooLarge {
        /// Entries the grid would have held.
        entries: u128,
        /// Maximum number of entries allowed.
        limit: usize,
    },

    /// The decoder did not confirm a seek within the timeout budget.
    #[error("Seek to {timestamp:?} did not settle within {timeout:?}")]
    SeekTimeout {
        /// The requested seek target.
        timestamp: Duration,
        /// The timeout budget that elapsed.
        timeout: Duration,
    },

    /// Pixel data could not be read back because the surface holds content
    /// the caller is not authorised to read (a tainted canvas).
    #[error("Permission denied: surface pixels are not readable")]
    PermissionDenied,

    /// The decoder's surface could not be drawn into the pixel buffer.
    #[error("Failed to render frame: {0}")]
    RenderError(String),

    /// The pixel buffer could not be serialized to an image payload.
    #[error("Failed to encode frame: {0}")]
    EncodeError(String),

    /// The load / play / pause priming sequence was rejected.
    #[error("Failed to prime decoder: {0}")]
    PrimingError(String),

    /// The decoder's event channel closed (the resource was disposed).
    #[error("Decoder closed")]
    DecoderClosed,

    /// The media source could not be opened.
    #[error("Failed to open media source at {path}: {reason}")]
    FileOpen {
        /// Path or URL that was passed to the decoder.
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The source does not contain a video stream.
    #[error("No video stream found in source")]
    NoVideoStream,

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),
}

impl ThumbstripError {
    /// Returns `true` for the sticky, run-wide permission failure.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, ThumbstripError::PermissionDenied)
    }
}

#[cfg(feature = "ffmpeg")]
impl From<FfmpegError> for ThumbstripError {
    fn from(error: FfmpegError) -> Self {
        ThumbstripError::FfmpegError(error.to_string())
    }
}
