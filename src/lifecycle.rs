//! The lifecycle controller.
//!
//! [`LifecycleController`] owns the extraction decoder from mount to
//! disposal. It primes the decoder, waits for the can-play-through
//! readiness tier, lets the decoder settle for a short delay, and then
//! triggers the extraction driver exactly once.
//!
//! ```text
//! Unready ──metadata──▶ MetadataKnown ──can play through──▶ ReadyForExtraction
//!    │                        │                                   │ settle delay
//!    └────────────────────────┴──────── teardown ──▶ Disposed     ▼
//!                                                              Triggered
//! ```
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "ffmpeg")]
//! # async fn example() -> Result<(), thumbstrip::ThumbstripError> {
//! use thumbstrip::{ExtractOptions, ExtractionDriver, FfmpegDecoder, LifecycleController};
//!
//! let decoder = FfmpegDecoder::open("input.mp4")?;
//! let driver = ExtractionDriver::new(ExtractOptions::new());
//! let store = driver.store().clone();
//!
//! let outcome = LifecycleController::new(decoder, driver).run().await;
//! println!("{:?}: {} result(s)", outcome.state, store.len());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tokio::sync::broadcast::{Receiver, error::RecvError};
use tokio::sync::watch::{self, Sender};

use crate::decoder::{DecoderEvent, DecoderHandle, ReadyState};
use crate::error::ThumbstripError;
use crate::extraction::{ExtractionDriver, ExtractionReport};

/// Where the controller is in the decoder's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LifecycleState {
    #[default]
    Unready,
    MetadataKnown,
    ReadyForExtraction,
    /// Extraction has been started. Terminal.
    Triggered,
    /// Torn down before extraction was triggered. Terminal.
    Disposed,
}

/// Disposal signal for a [`LifecycleController`]. Clones share the signal.
///
/// Disposing before the trigger unregisters every decoder observer and
/// prevents extraction from starting. Disposing after the trigger has no
/// effect on the run in progress.
#[derive(Debug, Clone)]
pub struct Teardown {
    sender: Arc<Sender<bool>>,
}

impl Default for Teardown {
    fn default() -> Self {
        Self::new()
    }
}

impl Teardown {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn dispose(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_disposed(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolve once [`dispose`](Teardown::dispose) has been called.
    pub async fn disposed(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = receiver.wait_for(|disposed| *disposed).await;
    }
}

/// What a controller run ended with. Hands the decoder back to the caller.
#[derive(Debug)]
pub struct LifecycleOutcome<D> {
    pub decoder: D,
    pub state: LifecycleState,
    /// Present only if extraction was triggered.
    pub report: Option<ExtractionReport>,
}

/// Drives one decoder from mount to a single extraction run.
pub struct LifecycleController<D> {
    decoder: D,
    driver: ExtractionDriver,
    teardown: Teardown,
}

impl<D: DecoderHandle> LifecycleController<D> {
    pub fn new(decoder: D, driver: ExtractionDriver) -> Self {
        Self {
            decoder,
            driver,
            teardown: Teardown::new(),
        }
    }

    /// Use an externally owned teardown signal.
    #[must_use]
    pub fn with_teardown(mut self, teardown: Teardown) -> Self {
        self.teardown = teardown;
        self
    }

    /// A handle that disposes this controller.
    pub fn teardown(&self) -> Teardown {
        self.teardown.clone()
    }

    /// Run the lifecycle to completion.
    ///
    /// Consumes the controller, so extraction is triggered at most once per
    /// decoder regardless of how many readiness events arrive.
    pub async fn run(self) -> LifecycleOutcome<D> {
        let LifecycleController {
            mut decoder,
            driver,
            teardown,
        } = self;
        let mut state = LifecycleState::Unready;

        if teardown.is_disposed() {
            return disposed(decoder, state);
        }

        let mut events = decoder.subscribe();
        prime(&mut decoder);

        let ready = tokio::select! {
            biased;
            _ = teardown.disposed() => None,
            ready = wait_until_ready(&mut events, &decoder, &mut state) => Some(ready),
        };
        // Unregister the readiness observers before anything else can fire.
        drop(events);

        match ready {
            None => return disposed(decoder, state),
            Some(false) => {
                log::warn!("Decoder closed before it was ready; extraction not started");
                return LifecycleOutcome {
                    decoder,
                    state,
                    report: None,
                };
            }
            Some(true) => {}
        }

        let delay = driver.options().settle_delay();
        tokio::select! {
            biased;
            _ = teardown.disposed() => return disposed(decoder, state),
            _ = tokio::time::sleep(delay) => {}
        }

        transition(&mut state, LifecycleState::Triggered);
        let report = driver.run(&mut decoder).await;

        LifecycleOutcome {
            decoder,
            state,
            report: Some(report),
        }
    }
}

fn disposed<D>(decoder: D, state: LifecycleState) -> LifecycleOutcome<D> {
    log::debug!("Lifecycle disposed in state {state:?}");
    LifecycleOutcome {
        decoder,
        state: LifecycleState::Disposed,
        report: None,
    }
}

/// Encourage the host to allocate decoding resources. Failures are logged
/// and never block readiness detection.
fn prime<D: DecoderHandle + ?Sized>(decoder: &mut D) {
    if let Err(error) = decoder.load() {
        log::warn!("{}", ThumbstripError::PrimingError(error.to_string()));
    }
    let round_trip = match decoder.play() {
        Ok(()) => decoder.pause(),
        Err(error) => Err(error),
    };
    if let Err(error) = round_trip {
        log::warn!("{}", ThumbstripError::PrimingError(error.to_string()));
    }
}

/// Returns `true` once the decoder can play through, `false` if it closed.
async fn wait_until_ready<D: DecoderHandle + ?Sized>(
    events: &mut Receiver<DecoderEvent>,
    decoder: &D,
    state: &mut LifecycleState,
) -> bool {
    if check_ready_state(decoder, state) {
        return true;
    }
    loop {
        match events.recv().await {
            Ok(DecoderEvent::MetadataLoaded) => {
                if *state == LifecycleState::Unready {
                    transition(state, LifecycleState::MetadataKnown);
                }
            }
            Ok(DecoderEvent::CanPlayThrough) => {
                transition(state, LifecycleState::ReadyForExtraction);
                return true;
            }
            Ok(DecoderEvent::PositionSettled(_)) => {}
            Err(RecvError::Lagged(missed)) => {
                log::debug!("Readiness observer lagged by {missed} events");
                if check_ready_state(decoder, state) {
                    return true;
                }
            }
            Err(RecvError::Closed) => return false,
        }
    }
}

fn check_ready_state<D: DecoderHandle + ?Sized>(decoder: &D, state: &mut LifecycleState) -> bool {
    match decoder.ready_state() {
        ReadyState::HaveEnoughData => {
            transition(state, LifecycleState::ReadyForExtraction);
            true
        }
        ReadyState::HaveMetadata if *state == LifecycleState::Unready => {
            transition(state, LifecycleState::MetadataKnown);
            false
        }
        _ => false,
    }
}

fn transition(state: &mut LifecycleState, next: LifecycleState) {
    log::debug!("Lifecycle {state:?} -> {next:?}");
    *state = next;
}
