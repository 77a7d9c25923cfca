//! Error handling integration tests.
//!
//! These tests verify that meaningful errors are returned for various
//! failure conditions. The FFmpeg tests need `--features ffmpeg`; the ones
//! that decode real media also need `tests/fixtures/sample_video.mp4`.

use std::time::Duration;

use thumbstrip::{ThumbstripError, TimestampGrid};

#[test]
fn invalid_duration_message_carries_value() {
    let error = TimestampGrid::new(-3.0, Duration::from_secs(5)).unwrap_err();
    assert!(matches!(error, ThumbstripError::InvalidDuration(value) if value == -3.0));
    assert_eq!(error.to_string(), "Invalid media duration: -3");
}

#[test]
fn infinite_duration_is_rejected() {
    let error = TimestampGrid::new(f64::INFINITY, Duration::from_secs(5)).unwrap_err();
    assert!(matches!(error, ThumbstripError::InvalidDuration(_)));
}

#[test]
fn seek_timeout_names_target_and_budget() {
    let error = ThumbstripError::SeekTimeout {
        timestamp: Duration::from_secs(5),
        timeout: Duration::from_millis(5000),
    };
    let message = error.to_string();
    assert!(message.contains("5s"), "{message}");
    assert!(!error.is_permission_denied());
}

#[test]
fn permission_denied_is_classified() {
    assert!(ThumbstripError::PermissionDenied.is_permission_denied());
    assert!(!ThumbstripError::MissingResource("pixel surface").is_permission_denied());
}

#[test]
fn io_errors_convert() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let error: ThumbstripError = io.into();
    assert!(error.to_string().starts_with("I/O error"));
}

#[cfg(feature = "ffmpeg")]
mod ffmpeg {
    use std::path::Path;
    use std::time::Duration;

    use thumbstrip::{
        DecoderHandle, ExtractOptions, ExtractionDriver, FfmpegDecoder, LifecycleController,
        LifecycleState, ReferenceKind,
    };

    const SAMPLE_VIDEO: &str = "tests/fixtures/sample_video.mp4";

    #[test]
    fn open_nonexistent_file() {
        let result = FfmpegDecoder::open("this_file_does_not_exist.mp4");
        let error_message = result.err().expect("open must fail").to_string();
        assert!(
            error_message.contains("Failed to open media source"),
            "Error message should mention open failure: {error_message}",
        );
    }

    #[test]
    fn open_invalid_file() {
        let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
        let invalid_file_path = temporary_directory.path().join("invalid.mp4");
        std::fs::write(&invalid_file_path, b"this is not a media file")
            .expect("Failed to write invalid file");

        let result = FfmpegDecoder::open(invalid_file_path.display().to_string());
        assert!(result.is_err(), "Expected error for invalid media file");
    }

    #[tokio::test]
    async fn sample_video_extracts_frames() {
        if !Path::new(SAMPLE_VIDEO).exists() {
            return;
        }

        let decoder = FfmpegDecoder::open(SAMPLE_VIDEO).expect("Failed to open test video");
        assert!(decoder.duration() > 0.0);
        let options = ExtractOptions::new()
            .with_interval(Duration::from_secs(1))
            .with_settle_delay(Duration::ZERO);
        let driver = ExtractionDriver::new(options);
        let store = driver.store().clone();

        let outcome = LifecycleController::new(decoder, driver).run().await;

        assert_eq!(outcome.state, LifecycleState::Triggered);
        let snapshot = store.snapshot();
        assert!(!snapshot.results.is_empty());
        assert!(
            snapshot
                .results
                .iter()
                .all(|result| result.reference.kind() == ReferenceKind::Frame)
        );
    }
}
