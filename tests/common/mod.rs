//! Scripted decoder shared by the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::{Rgba, RgbaImage};
use thumbstrip::{
    DecoderEvent, DecoderHandle, ReadyState, SeekTicket, ThumbstripError, VideoSurface,
};
use tokio::sync::broadcast::{self, Receiver, Sender};

/// Capacity of the mock's event channel.
pub const EVENT_CAPACITY: usize = 16;

/// When the mock reports readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Already able to play through before any observer attaches.
    Immediate,
    /// Emits `MetadataLoaded` then `CanPlayThrough` from `load()`.
    OnLoad,
    /// Only when the test sends events itself.
    Manual,
}

pub struct MockDecoder {
    pub duration: f64,
    pub dimensions: Option<(u32, u32)>,
    pub attached: bool,
    pub readiness: Readiness,
    pub fail_load: bool,
    pub fail_play: bool,
    /// Seeks whose settle event never fires.
    pub stalls: Vec<Duration>,
    /// Positions whose surface is not origin-clean.
    pub tainted: Vec<Duration>,
    /// Positions whose surface cannot be produced.
    pub render_failures: Vec<Duration>,
    /// Every seek target, in order.
    pub seeks: Vec<Duration>,
    /// Every load / play / pause call, in order.
    pub calls: Vec<&'static str>,
    ready_state: Arc<Mutex<ReadyState>>,
    position: Duration,
    next_ticket: SeekTicket,
    events: Sender<DecoderEvent>,
}

impl MockDecoder {
    pub fn new(duration: f64) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            duration,
            dimensions: Some((64, 36)),
            attached: true,
            readiness: Readiness::OnLoad,
            fail_load: false,
            fail_play: false,
            stalls: Vec::new(),
            tainted: Vec::new(),
            render_failures: Vec::new(),
            seeks: Vec::new(),
            calls: Vec::new(),
            ready_state: Arc::new(Mutex::new(ReadyState::HaveNothing)),
            position: Duration::ZERO,
            next_ticket: SeekTicket(0),
            events,
        }
    }

    pub fn with_readiness(mut self, readiness: Readiness) -> Self {
        if readiness == Readiness::Immediate {
            self.set_ready_state(ReadyState::HaveEnoughData);
        }
        self.readiness = readiness;
        self
    }

    pub fn stalling_at(mut self, seconds: u64) -> Self {
        self.stalls.push(Duration::from_secs(seconds));
        self
    }

    pub fn tainted_at(mut self, seconds: u64) -> Self {
        self.tainted.push(Duration::from_secs(seconds));
        self
    }

    pub fn failing_render_at(mut self, seconds: u64) -> Self {
        self.render_failures.push(Duration::from_secs(seconds));
        self
    }

    /// Shared readiness tier, writable while the mock is owned elsewhere.
    pub fn ready_state_handle(&self) -> Arc<Mutex<ReadyState>> {
        self.ready_state.clone()
    }

    fn set_ready_state(&self, state: ReadyState) {
        *self.ready_state.lock().expect("ready state lock") = state;
    }

    /// A sender for emitting events while the mock is owned elsewhere.
    pub fn emitter(&self) -> Sender<DecoderEvent> {
        self.events.clone()
    }
}

impl DecoderHandle for MockDecoder {
    fn is_attached(&self) -> bool {
        self.attached
    }

    fn ready_state(&self) -> ReadyState {
        *self.ready_state.lock().expect("ready state lock")
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn native_dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    fn current_position(&self) -> Duration {
        self.position
    }

    fn subscribe(&self) -> Receiver<DecoderEvent> {
        self.events.subscribe()
    }

    fn seek(&mut self, position: Duration) -> SeekTicket {
        self.next_ticket = self.next_ticket.next();
        self.seeks.push(position);
        if !self.stalls.contains(&position) {
            self.position = position;
            let _ = self.events.send(DecoderEvent::PositionSettled(self.next_ticket));
        }
        self.next_ticket
    }

    fn surface(&self) -> Result<VideoSurface, ThumbstripError> {
        if self.render_failures.contains(&self.position) {
            return Err(ThumbstripError::RenderError("surface lost".to_string()));
        }
        let (width, height) = self.dimensions.unwrap_or((16, 9));
        let shade = (self.position.as_secs() % 256) as u8;
        let pixels = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([shade, (x * 7) as u8, (y * 13) as u8, 255])
        });
        let origin_clean = !self.tainted.contains(&self.position);
        Ok(VideoSurface::new(Arc::new(pixels), origin_clean))
    }

    fn load(&mut self) -> Result<(), ThumbstripError> {
        self.calls.push("load");
        if self.fail_load {
            return Err(ThumbstripError::PrimingError("load rejected".to_string()));
        }
        if self.readiness == Readiness::OnLoad {
            self.set_ready_state(ReadyState::HaveMetadata);
            let _ = self.events.send(DecoderEvent::MetadataLoaded);
            self.set_ready_state(ReadyState::HaveEnoughData);
            let _ = self.events.send(DecoderEvent::CanPlayThrough);
        }
        Ok(())
    }

    fn play(&mut self) -> Result<(), ThumbstripError> {
        self.calls.push("play");
        if self.fail_play {
            return Err(ThumbstripError::PrimingError(
                "autoplay is not allowed".to_string(),
            ));
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<(), ThumbstripError> {
        self.calls.push("pause");
        Ok(())
    }
}
