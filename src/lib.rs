//! # thumbstrip
//!
//! Extract a strip of still-frame thumbnails from a video at fixed time
//! intervals.
//!
//! `thumbstrip` drives a media decoder through a sequence of seeks, captures
//! the rendered frame at each grid timestamp, and collects the results, in
//! order, into a [`ResultStore`] that a presentation layer can observe. A
//! stalled seek never blocks the pipeline: every capture is raced against a
//! timeout and yields either the encoded frame or a placeholder tile.
//!
//! ## Quick Start
//!
//! ```no_run
//! # #[cfg(feature = "ffmpeg")]
//! # async fn example() -> Result<(), thumbstrip::ThumbstripError> {
//! use std::time::Duration;
//!
//! use thumbstrip::{ExtractOptions, ExtractionDriver, FfmpegDecoder, LifecycleController};
//!
//! let decoder = FfmpegDecoder::open("input.mp4")?;
//! let options = ExtractOptions::new().with_interval(Duration::from_secs(10));
//! let driver = ExtractionDriver::new(options);
//! let store = driver.store().clone();
//!
//! LifecycleController::new(decoder, driver).run().await;
//! for result in store.snapshot().results {
//!     std::fs::write(format!("thumb_{:04}.png", result.index), result.reference.bytes())?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline
//!
//! - [`LifecycleController`] primes the decoder, waits until it can play
//!   through, and triggers one extraction run.
//! - [`ExtractionDriver`] walks the [`TimestampGrid`] sequentially and stops
//!   early once pixel access is denied.
//! - [`FrameCapture`] seeks, waits for the settle event or the timeout,
//!   renders into a [`FrameCanvas`], and appends exactly one result.
//! - [`ResultStore`] publishes [`ExtractionSnapshot`]s after every mutation.
//!
//! Any decoder can be plugged in by implementing [`DecoderHandle`].
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ffmpeg` | `FfmpegDecoder` and the `thumbstrip` CLI, via `ffmpeg-next` |
//! | `full` | Enables all of the above |
//!
//! ## Requirements
//!
//! The `ffmpeg` feature needs the FFmpeg development libraries installed on
//! your system.

pub mod capture;
pub mod configuration;
pub mod decoder;
pub mod error;
pub mod extraction;
#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;
pub mod grid;
pub mod lifecycle;
pub mod placeholder;
pub mod progress;
pub mod reference;
pub mod renderer;
pub mod store;
mod utilities;

pub use capture::FrameCapture;
pub use configuration::ExtractOptions;
pub use decoder::{DecoderEvent, DecoderHandle, ReadyState, SeekTicket, VideoSurface};
pub use error::ThumbstripError;
pub use extraction::{ExtractionDriver, ExtractionReport};
#[cfg(feature = "ffmpeg")]
pub use ffmpeg::FfmpegDecoder;
pub use grid::TimestampGrid;
pub use lifecycle::{LifecycleController, LifecycleOutcome, LifecycleState, Teardown};
pub use placeholder::{PlaceholderService, SolidColorPlaceholder};
pub use progress::{ProgressCallback, ProgressInfo};
pub use reference::{DisplayReference, ReferenceKind};
pub use renderer::FrameCanvas;
pub use store::{CaptureResult, ExtractionSnapshot, ResultStore, RunStatus};
