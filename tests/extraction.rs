//! Extraction driver tests.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::MockDecoder;
use thumbstrip::{
    ExtractOptions, ExtractionDriver, ProgressCallback, ProgressInfo, ReferenceKind, ResultStore,
    RunStatus,
};
use tokio_stream::StreamExt;

fn driver() -> ExtractionDriver {
    ExtractionDriver::new(ExtractOptions::new())
}

fn kinds(store: &ResultStore) -> Vec<ReferenceKind> {
    store
        .snapshot()
        .results
        .iter()
        .map(|result| result.reference.kind())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn scenario_all_frames_in_order() {
    let mut decoder = MockDecoder::new(12.0);
    let driver = driver();

    let report = driver.run(&mut decoder).await;

    let snapshot = driver.store().snapshot();
    assert_eq!(snapshot.status, RunStatus::Completed);
    assert!(!snapshot.permission_denied);
    let timestamps: Vec<u64> = snapshot.results.iter().map(|r| r.timestamp.as_secs()).collect();
    assert_eq!(timestamps, vec![0, 5, 10]);
    let indices: Vec<usize> = snapshot.results.iter().map(|r| r.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert_eq!(kinds(driver.store()), vec![ReferenceKind::Frame; 3]);

    assert_eq!(report.grid_len, 3);
    assert_eq!(report.frames, 3);
    assert!(!report.stopped_early);
}

#[tokio::test(start_paused = true)]
async fn scenario_stalled_seek_is_skipped_and_walk_continues() {
    let mut decoder = MockDecoder::new(12.0).stalling_at(5);
    let driver = driver();

    let report = driver.run(&mut decoder).await;

    let snapshot = driver.store().snapshot();
    assert_eq!(
        kinds(driver.store()),
        vec![ReferenceKind::Frame, ReferenceKind::Skipped, ReferenceKind::Frame]
    );
    assert_eq!(snapshot.results[1].reference.label(), Some("Skipped 5s"));
    assert_eq!(snapshot.status, RunStatus::Completed);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.frames, 2);
}

#[tokio::test(start_paused = true)]
async fn scenario_permission_denial_stops_the_walk() {
    let mut decoder = MockDecoder::new(12.0).tainted_at(0);
    let driver = driver();

    let report = driver.run(&mut decoder).await;

    let snapshot = driver.store().snapshot();
    assert_eq!(snapshot.results.len(), 1);
    assert_eq!(snapshot.results[0].reference.kind(), ReferenceKind::Error);
    assert!(snapshot.permission_denied);
    assert_eq!(snapshot.status, RunStatus::Completed);
    assert_eq!(decoder.seeks, vec![Duration::ZERO]);
    assert!(report.stopped_early);
    assert!(report.permission_denied);
}

#[tokio::test(start_paused = true)]
async fn scenario_zero_duration_issues_no_seeks() {
    let mut decoder = MockDecoder::new(0.0);
    let driver = driver();

    let report = driver.run(&mut decoder).await;

    assert!(driver.store().is_empty());
    assert_eq!(driver.store().status(), RunStatus::Completed);
    assert!(decoder.seeks.is_empty());
    assert!(report.invalid_duration);
    assert_eq!(report.grid_len, 0);
}

#[tokio::test(start_paused = true)]
async fn unknown_duration_is_treated_as_invalid() {
    let mut decoder = MockDecoder::new(f64::NAN);
    let driver = driver();

    let report = driver.run(&mut decoder).await;

    assert!(report.invalid_duration);
    assert!(decoder.seeks.is_empty());
    assert_eq!(driver.store().status(), RunStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn denial_midway_keeps_earlier_results() {
    let mut decoder = MockDecoder::new(30.0).tainted_at(10);
    let driver = driver();

    driver.run(&mut decoder).await;

    assert_eq!(
        kinds(driver.store()),
        vec![ReferenceKind::Frame, ReferenceKind::Frame, ReferenceKind::Error]
    );
    assert_eq!(decoder.seeks.len(), 3);
    assert!(driver.store().permission_denied());
}

#[tokio::test(start_paused = true)]
async fn keep_going_attempts_every_entry_after_denial() {
    let mut decoder = MockDecoder::new(12.0).tainted_at(0);
    let driver =
        ExtractionDriver::new(ExtractOptions::new().with_stop_on_permission_denied(false));

    let report = driver.run(&mut decoder).await;

    assert_eq!(report.attempted, 3);
    assert!(!report.stopped_early);
    assert!(report.permission_denied);
    // The canvas stays tainted once a cross-origin frame was drawn into it.
    assert_eq!(kinds(driver.store()), vec![ReferenceKind::Error; 3]);
}

#[tokio::test(start_paused = true)]
async fn second_run_resets_the_store() {
    let driver = driver();

    let mut tainted = MockDecoder::new(12.0).tainted_at(0);
    driver.run(&mut tainted).await;
    assert!(driver.store().permission_denied());

    let mut clean = MockDecoder::new(6.0);
    driver.run(&mut clean).await;

    let snapshot = driver.store().snapshot();
    assert!(!snapshot.permission_denied);
    assert_eq!(snapshot.results.len(), 2);
    assert_eq!(snapshot.status, RunStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn shared_store_receives_results() {
    let store = ResultStore::new();
    let driver = driver().with_store(store.clone());
    let mut decoder = MockDecoder::new(12.0);

    driver.run(&mut decoder).await;

    assert_eq!(store.len(), 3);
    assert_eq!(store.status(), RunStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn subscribers_observe_progressive_snapshots() {
    let driver = driver();
    let mut receiver = driver.store().subscribe();
    let mut decoder = MockDecoder::new(12.0).stalling_at(5);

    let observe = async {
        let mut lengths = Vec::new();
        loop {
            if receiver.changed().await.is_err() {
                break;
            }
            let snapshot = receiver.borrow_and_update().clone();
            lengths.push(snapshot.results.len());
            if snapshot.status == RunStatus::Completed {
                break;
            }
        }
        lengths
    };
    let (_, lengths) = tokio::join!(driver.run(&mut decoder), observe);

    // The stalled seek yields to the observer between results.
    assert!(lengths.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(lengths.contains(&1));
    assert_eq!(lengths.last(), Some(&3));
}

#[derive(Default)]
struct Recorder(Mutex<Vec<(u64, u64, ReferenceKind)>>);

impl ProgressCallback for Recorder {
    fn on_progress(&self, info: &ProgressInfo) {
        self.0
            .lock()
            .expect("recorder lock")
            .push((info.current, info.total, info.outcome));
    }
}

#[tokio::test(start_paused = true)]
async fn progress_is_reported_per_entry() {
    let recorder = Arc::new(Recorder::default());
    let options = ExtractOptions::new().with_progress(recorder.clone());
    let driver = ExtractionDriver::new(options);
    let mut decoder = MockDecoder::new(12.0).stalling_at(10);

    driver.run(&mut decoder).await;

    let calls = recorder.0.lock().expect("recorder lock").clone();
    assert_eq!(
        calls,
        vec![
            (1, 3, ReferenceKind::Frame),
            (2, 3, ReferenceKind::Frame),
            (3, 3, ReferenceKind::Skipped),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn missing_dimensions_fall_back_to_configured_canvas() {
    let mut decoder = MockDecoder::new(4.0);
    decoder.dimensions = None;
    let driver = ExtractionDriver::new(ExtractOptions::new().with_fallback_dimensions(40, 30));

    driver.run(&mut decoder).await;

    let snapshot = driver.store().snapshot();
    assert_eq!(snapshot.results.len(), 1);
    let reference = &snapshot.results[0].reference;
    assert_eq!(reference.kind(), ReferenceKind::Frame);
    assert_eq!((reference.width(), reference.height()), (40, 30));
}

#[tokio::test(start_paused = true)]
async fn zero_interval_is_reported_as_an_interval_problem() {
    let mut decoder = MockDecoder::new(12.0);
    let driver = ExtractionDriver::new(ExtractOptions::new().with_interval(Duration::ZERO));

    let report = driver.run(&mut decoder).await;

    assert!(report.invalid_interval);
    assert!(!report.invalid_duration);
    assert_eq!(report.grid_len, 0);
    assert!(decoder.seeks.is_empty());
    assert_eq!(driver.store().status(), RunStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn oversized_grid_is_reported_as_an_interval_problem() {
    let mut decoder = MockDecoder::new(12.0);
    let driver = ExtractionDriver::new(ExtractOptions::new().with_interval(Duration::from_nanos(1)));

    let report = driver.run(&mut decoder).await;

    assert!(report.invalid_interval);
    assert!(!report.invalid_duration);
    assert!(decoder.seeks.is_empty());
}

#[tokio::test(start_paused = true)]
async fn snapshot_stream_ends_on_the_completed_run() {
    let driver = driver();
    let mut stream = driver.store().stream();
    let mut decoder = MockDecoder::new(12.0).stalling_at(5);

    let drain = async {
        let mut seen = Vec::new();
        while let Some(snapshot) = stream.next().await {
            let done = snapshot.status == RunStatus::Completed;
            seen.push(snapshot);
            if done {
                break;
            }
        }
        seen
    };
    let (_, seen) = tokio::join!(driver.run(&mut decoder), drain);

    assert!(seen.windows(2).all(|pair| pair[0].results.len() <= pair[1].results.len()));
    let last = seen.last().expect("stream yielded snapshots");
    assert_eq!(last.status, RunStatus::Completed);
    assert_eq!(last.results.len(), 3);
    assert_eq!(last.results[1].reference.kind(), ReferenceKind::Skipped);
}
