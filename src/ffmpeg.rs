//! FFmpeg-backed decoder handle.
//!
//! [`FfmpegDecoder`] implements [`DecoderHandle`] over `ffmpeg-next`. The
//! demuxer, decoder, and scaler live on a dedicated worker thread; the handle
//! sends it commands and the worker reports readiness and seek completion as
//! [`DecoderEvent`]s, the same way a media element would.
//!
//! # Example
//!
//! ```no_run
//! use thumbstrip::{DecoderHandle, FfmpegDecoder};
//!
//! let mut decoder = FfmpegDecoder::open("input.mp4")?;
//! let events = decoder.subscribe();
//! decoder.load()?;
//! println!("{:.1}s at {:?}", decoder.duration(), decoder.native_dimensions());
//! # drop(events);
//! # Ok::<(), thumbstrip::ThumbstripError>(())
//! ```

use std::path::PathBuf;
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, Ordering},
};
use std::thread::JoinHandle;
use std::time::Duration;

use ffmpeg_next::{
    Rational,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::RgbaImage;
use tokio::sync::broadcast::{self, Receiver, Sender};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::decoder::{DecoderEvent, DecoderHandle, ReadyState, SeekTicket, VideoSurface};
use crate::error::ThumbstripError;
use crate::utilities::{duration_to_seek_timestamp, pts_to_seconds};

/// Capacity of the decoder event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

enum Command {
    Load,
    Seek { ticket: SeekTicket, position: Duration },
    Shutdown,
}

#[derive(Debug, Default)]
struct SharedState {
    ready_state: ReadyState,
    position: Duration,
    frame: Option<Arc<RgbaImage>>,
    playing: bool,
}

/// A [`DecoderHandle`] backed by an FFmpeg worker thread.
pub struct FfmpegDecoder {
    source: String,
    duration: f64,
    dimensions: Option<(u32, u32)>,
    commands: UnboundedSender<Command>,
    events: Sender<DecoderEvent>,
    shared: Arc<Mutex<SharedState>>,
    attached: Arc<AtomicBool>,
    next_ticket: SeekTicket,
    worker: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for FfmpegDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegDecoder")
            .field("source", &self.source)
            .field("duration", &self.duration)
            .field("dimensions", &self.dimensions)
            .field("attached", &self.is_attached())
            .finish_non_exhaustive()
    }
}

impl FfmpegDecoder {
    /// Open a media file or URL and start its worker thread.
    ///
    /// The container is probed immediately, but readiness events are only
    /// emitted after [`load`](DecoderHandle::load).
    ///
    /// # Errors
    ///
    /// [`ThumbstripError::FileOpen`] if FFmpeg cannot open the source, or
    /// [`ThumbstripError::NoVideoStream`] if it has no video.
    pub fn open(source: impl Into<String>) -> Result<Self, ThumbstripError> {
        let source = source.into();
        let file_open = |reason: String| ThumbstripError::FileOpen {
            path: PathBuf::from(&source),
            reason,
        };

        ffmpeg_next::init()
            .map_err(|error| file_open(format!("FFmpeg initialisation failed: {error}")))?;
        let input = ffmpeg_next::format::input(&source).map_err(|error| file_open(error.to_string()))?;

        let stream = input
            .streams()
            .best(Type::Video)
            .ok_or(ThumbstripError::NoVideoStream)?;
        let stream_index = stream.index();
        let parameters = CodecContext::from_parameters(stream.parameters())?;
        let video = parameters.decoder().video()?;
        let dimensions = (video.width() > 0 && video.height() > 0)
            .then(|| (video.width(), video.height()));

        let duration_microseconds = input.duration();
        let duration = if duration_microseconds > 0 {
            duration_microseconds as f64 / 1_000_000.0
        } else {
            f64::NAN
        };
        log::debug!(
            "Opened {source}: duration {duration:.3}s, dimensions {dimensions:?}, stream {stream_index}"
        );

        let (commands, receiver) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let shared = Arc::new(Mutex::new(SharedState::default()));
        let attached = Arc::new(AtomicBool::new(true));

        let worker = Worker {
            input,
            stream_index,
            events: events.clone(),
            shared: shared.clone(),
            _detach: DetachOnDrop(attached.clone()),
        };
        let handle = std::thread::Builder::new()
            .name("thumbstrip-decoder".to_string())
            .spawn(move || worker.run(receiver))?;

        Ok(Self {
            source,
            duration,
            dimensions,
            commands,
            events,
            shared,
            attached,
            next_ticket: SeekTicket(0),
            worker: Some(handle),
        })
    }

    /// The path or URL this decoder was opened with.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether the host asked for playback. Extraction never presents frames.
    pub fn is_playing(&self) -> bool {
        lock(&self.shared).playing
    }

    fn send(&self, command: Command) -> Result<(), ThumbstripError> {
        self.commands
            .send(command)
            .map_err(|_| ThumbstripError::DecoderClosed)
    }
}

impl DecoderHandle for FfmpegDecoder {
    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    fn ready_state(&self) -> ReadyState {
        lock(&self.shared).ready_state
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn native_dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    fn current_position(&self) -> Duration {
        lock(&self.shared).position
    }

    fn subscribe(&self) -> Receiver<DecoderEvent> {
        self.events.subscribe()
    }

    fn seek(&mut self, position: Duration) -> SeekTicket {
        self.next_ticket = self.next_ticket.next();
        let ticket = self.next_ticket;
        if self.send(Command::Seek { ticket, position }).is_err() {
            log::warn!("Seek to {position:?} dropped: decoder worker has exited");
        }
        ticket
    }

    fn surface(&self) -> Result<VideoSurface, ThumbstripError> {
        let frame = lock(&self.shared)
            .frame
            .clone()
            .ok_or(ThumbstripError::MissingResource("decoded frame"))?;
        Ok(VideoSurface::new(frame, true))
    }

    fn load(&mut self) -> Result<(), ThumbstripError> {
        self.send(Command::Load)
    }

    fn play(&mut self) -> Result<(), ThumbstripError> {
        if !self.is_attached() {
            return Err(ThumbstripError::DecoderClosed);
        }
        lock(&self.shared).playing = true;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), ThumbstripError> {
        lock(&self.shared).playing = false;
        Ok(())
    }
}

impl Drop for FfmpegDecoder {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                log::warn!("Decoder worker for {} panicked", self.source);
            }
        }
    }
}

fn lock(shared: &Mutex<SharedState>) -> MutexGuard<'_, SharedState> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the attached flag however the worker exits.
struct DetachOnDrop(Arc<AtomicBool>);

impl Drop for DetachOnDrop {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct Worker {
    input: Input,
    stream_index: usize,
    events: Sender<DecoderEvent>,
    shared: Arc<Mutex<SharedState>>,
    _detach: DetachOnDrop,
}

impl Worker {
    fn run(mut self, mut commands: UnboundedReceiver<Command>) {
        // Created on this thread: the scaler must not cross threads.
        let mut session = None;
        while let Some(command) = commands.blocking_recv() {
            match command {
                Command::Load => self.load(&mut session),
                Command::Seek { ticket, position } => self.seek(&mut session, ticket, position),
                Command::Shutdown => break,
            }
        }
        log::debug!("Decoder worker exiting");
    }

    fn load(&mut self, session: &mut Option<DecodeSession>) {
        if lock(&self.shared).ready_state >= ReadyState::HaveMetadata {
            return;
        }
        lock(&self.shared).ready_state = ReadyState::HaveMetadata;
        let _ = self.events.send(DecoderEvent::MetadataLoaded);

        match self.decode_at(session, Duration::ZERO) {
            Ok(frame) => {
                {
                    let mut shared = lock(&self.shared);
                    shared.frame = Some(Arc::new(frame));
                    shared.position = Duration::ZERO;
                    shared.ready_state = ReadyState::HaveEnoughData;
                }
                let _ = self.events.send(DecoderEvent::CanPlayThrough);
            }
            Err(error) => log::warn!("Failed to decode the first frame: {error}"),
        }
    }

    fn seek(&mut self, session: &mut Option<DecodeSession>, ticket: SeekTicket, position: Duration) {
        match self.decode_at(session, position) {
            Ok(frame) => {
                {
                    let mut shared = lock(&self.shared);
                    shared.frame = Some(Arc::new(frame));
                    shared.position = position;
                }
                let _ = self.events.send(DecoderEvent::PositionSettled(ticket));
            }
            // No settle event: the capture times out and skips this entry.
            Err(error) => log::warn!("Seek to {position:?} failed: {error}"),
        }
    }

    fn decode_at(
        &mut self,
        slot: &mut Option<DecodeSession>,
        position: Duration,
    ) -> Result<RgbaImage, ThumbstripError> {
        let mut session = match slot.take() {
            Some(session) => session,
            None => DecodeSession::new(&self.input, self.stream_index)?,
        };
        let frame = session.decode_at(&mut self.input, position);
        *slot = Some(session);
        frame
    }
}

/// Decoder and scaler for the selected video stream.
struct DecodeSession {
    decoder: VideoDecoder,
    scaler: ScalingContext,
    stream_index: usize,
    time_base: Rational,
}

impl DecodeSession {
    fn new(input: &Input, stream_index: usize) -> Result<Self, ThumbstripError> {
        let stream = input
            .stream(stream_index)
            .ok_or(ThumbstripError::NoVideoStream)?;
        let time_base = stream.time_base();
        let decoder = CodecContext::from_parameters(stream.parameters())?
            .decoder()
            .video()?;
        let scaler = ScalingContext::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            Pixel::RGBA,
            decoder.width(),
            decoder.height(),
            ScalingFlags::BILINEAR,
        )?;
        Ok(Self {
            decoder,
            scaler,
            stream_index,
            time_base,
        })
    }

    /// Seek to the keyframe at or before `position` and decode forward to the
    /// first frame at or after it. Falls back to the last frame at end of
    /// stream.
    fn decode_at(
        &mut self,
        input: &mut Input,
        position: Duration,
    ) -> Result<RgbaImage, ThumbstripError> {
        let seek_timestamp = duration_to_seek_timestamp(position);
        input.seek(seek_timestamp, ..=seek_timestamp)?;
        self.decoder.flush();

        let target = position.as_secs_f64();
        let mut decoded = VideoFrame::empty();
        let mut latest: Option<VideoFrame> = None;

        for (stream, packet) in input.packets() {
            if stream.index() != self.stream_index {
                continue;
            }
            self.decoder.send_packet(&packet)?;
            while self.decoder.receive_frame(&mut decoded).is_ok() {
                if self.frame_seconds(&decoded) >= target {
                    return self.convert(&decoded);
                }
                latest = Some(decoded.clone());
            }
        }

        self.decoder.send_eof()?;
        while self.decoder.receive_frame(&mut decoded).is_ok() {
            if self.frame_seconds(&decoded) >= target {
                return self.convert(&decoded);
            }
            latest = Some(decoded.clone());
        }

        match latest {
            Some(frame) => self.convert(&frame),
            None => Err(ThumbstripError::RenderError(format!(
                "no frame decoded at or after {position:?}"
            ))),
        }
    }

    fn frame_seconds(&self, frame: &VideoFrame) -> f64 {
        let pts = frame.timestamp().or(frame.pts()).unwrap_or(0);
        pts_to_seconds(pts, self.time_base)
    }

    fn convert(&mut self, frame: &VideoFrame) -> Result<RgbaImage, ThumbstripError> {
        let mut rgba = VideoFrame::empty();
        self.scaler.run(frame, &mut rgba)?;
        let (width, height) = (rgba.width(), rgba.height());
        let buffer = frame_to_buffer(&rgba, width, height, 4);
        RgbaImage::from_raw(width, height, buffer).ok_or_else(|| {
            ThumbstripError::RenderError(
                "Failed to construct RGBA image from decoded frame data".to_string(),
            )
        })
    }
}

/// Copy pixel data from an FFmpeg frame into a tightly-packed buffer,
/// stripping per-row stride padding.
fn frame_to_buffer(
    video_frame: &VideoFrame,
    width: u32,
    height: u32,
    bytes_per_pixel: usize,
) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let row_bytes = (width as usize) * bytes_per_pixel;
    let data = video_frame.data(0);

    if stride == row_bytes {
        data[..row_bytes * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_bytes * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + row_bytes]);
        }
        buffer
    }
}
