//! The result store observed by the presentation layer.
//!
//! [`ResultStore`] holds the ordered capture results of the current run plus
//! its status flags. The extraction driver is the only writer; readers
//! subscribe to a [`watch`] channel and see a fresh [`ExtractionSnapshot`]
//! after every mutation.
//!
//! # Example
//!
//! ```
//! use thumbstrip::{ResultStore, RunStatus};
//!
//! let store = ResultStore::new();
//! let receiver = store.subscribe();
//! assert_eq!(receiver.borrow().status, RunStatus::NotStarted);
//! assert!(store.snapshot().results.is_empty());
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch::{self, Receiver, Sender};
use tokio_stream::wrappers::WatchStream;

use crate::reference::DisplayReference;

/// Lifecycle of an extraction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RunStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

/// One display reference bound to its grid position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureResult {
    /// Position in the timestamp grid.
    pub index: usize,
    /// The grid timestamp that was requested.
    pub timestamp: Duration,
    pub reference: DisplayReference,
}

/// Read-only projection of the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionSnapshot {
    pub status: RunStatus,
    /// Sticky for the run: once set it stays set until the next run starts.
    pub permission_denied: bool,
    /// Results in grid order.
    pub results: Vec<CaptureResult>,
}

/// Shared handle to the run's results. Clones observe the same store.
#[derive(Debug, Clone)]
pub struct ResultStore {
    sender: Arc<Sender<ExtractionSnapshot>>,
}

impl Default for ResultStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultStore {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(ExtractionSnapshot::default());
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Receive a notification after every mutation.
    pub fn subscribe(&self) -> Receiver<ExtractionSnapshot> {
        self.sender.subscribe()
    }

    /// Snapshots as a stream, starting with the current state.
    pub fn stream(&self) -> WatchStream<ExtractionSnapshot> {
        WatchStream::new(self.subscribe())
    }

    /// Clone the current state.
    pub fn snapshot(&self) -> ExtractionSnapshot {
        self.sender.borrow().clone()
    }

    pub fn status(&self) -> RunStatus {
        self.sender.borrow().status
    }

    pub fn permission_denied(&self) -> bool {
        self.sender.borrow().permission_denied
    }

    pub fn len(&self) -> usize {
        self.sender.borrow().results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear results and flags and mark the run in progress.
    pub(crate) fn begin_run(&self) {
        self.sender.send_replace(ExtractionSnapshot {
            status: RunStatus::InProgress,
            permission_denied: false,
            results: Vec::new(),
        });
    }

    /// Append one result. Results are never reordered or removed.
    pub(crate) fn push(&self, result: CaptureResult) {
        self.sender.send_modify(|snapshot| snapshot.results.push(result));
    }

    pub(crate) fn mark_permission_denied(&self) {
        self.sender.send_if_modified(|snapshot| {
            let changed = !snapshot.permission_denied;
            snapshot.permission_denied = true;
            changed
        });
    }

    pub(crate) fn complete(&self) {
        self.sender
            .send_modify(|snapshot| snapshot.status = RunStatus::Completed);
    }
}
