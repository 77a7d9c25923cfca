//! Internal utility functions.
//!
//! Timestamp conversions shared by the grid, the placeholder labels, and the
//! FFmpeg-backed decoder.

use std::time::Duration;

#[cfg(feature = "ffmpeg")]
use ffmpeg_next::Rational;

/// Convert a decoder-reported duration in seconds to a [`Duration`].
///
/// Returns `None` for `NaN`, infinite, negative, or unrepresentable values.
pub fn seconds_to_duration(seconds: f64) -> Option<Duration> {
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(seconds).ok()
}

/// Round a timestamp to whole seconds for display labels.
pub fn rounded_seconds(timestamp: Duration) -> u64 {
    timestamp.as_secs_f64().round() as u64
}

/// Convert a [`Duration`] to a seek timestamp in AV_TIME_BASE (microseconds).
///
/// `input_context.seek()` with no stream index expects container-level
/// AV_TIME_BASE units.
#[cfg(feature = "ffmpeg")]
pub fn duration_to_seek_timestamp(duration: Duration) -> i64 {
    duration.as_micros() as i64
}

/// Rescale a PTS value from stream time base to seconds.
#[cfg(feature = "ffmpeg")]
pub fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}
