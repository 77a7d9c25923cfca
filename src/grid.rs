//! The timestamp grid walked by an extraction run.
//!
//! A grid for duration `D` and step `S` holds `⌈D/S⌉` timestamps
//! `0, S, 2S, …`, strictly increasing and strictly below `D`. The final entry
//! is clamped to `D − ε` when it would otherwise land within `ε` of the end,
//! so the decoder is never asked to seek to end-of-media.

use std::ops::Deref;
use std::time::Duration;

use crate::error::ThumbstripError;
use crate::utilities::seconds_to_duration;

/// Distance kept between the last grid entry and the end of the media.
pub const END_OF_MEDIA_MARGIN: Duration = Duration::from_millis(1);

/// Most entries a single grid may hold.
pub const MAX_GRID_ENTRIES: usize = 100_000;

/// Ordered, strictly increasing seek targets for one extraction run.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use thumbstrip::TimestampGrid;
///
/// let grid = TimestampGrid::new(12.0, Duration::from_secs(5))?;
/// assert_eq!(
///     grid.as_slice(),
///     &[Duration::ZERO, Duration::from_secs(5), Duration::from_secs(10)],
/// );
/// # Ok::<(), thumbstrip::ThumbstripError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampGrid {
    duration: Duration,
    interval: Duration,
    timestamps: Vec<Duration>,
}

impl TimestampGrid {
    /// Build the grid for a media duration given in seconds.
    ///
    /// # Errors
    ///
    /// - [`ThumbstripError::InvalidInterval`] if `interval` is zero.
    /// - [`ThumbstripError::InvalidDuration`] if `duration_seconds` is
    ///   `NaN`, infinite, or not strictly positive.
    /// - [`ThumbstripError::GridTooLarge`] if the grid would hold more than
    ///   [`MAX_GRID_ENTRIES`] entries.
    pub fn new(duration_seconds: f64, interval: Duration) -> Result<Self, ThumbstripError> {
        if interval.is_zero() {
            return Err(ThumbstripError::InvalidInterval);
        }
        let duration = seconds_to_duration(duration_seconds)
            .filter(|duration| !duration.is_zero())
            .ok_or(ThumbstripError::InvalidDuration(duration_seconds))?;

        let entries = duration.as_nanos().div_ceil(interval.as_nanos());
        let count = usize::try_from(entries)
            .ok()
            .filter(|&count| count <= MAX_GRID_ENTRIES)
            .ok_or(ThumbstripError::GridTooLarge {
                entries,
                limit: MAX_GRID_ENTRIES,
            })?;

        // (count - 1) * interval < duration, so every entry is below the end.
        let mut timestamps: Vec<Duration> = (0..count as u32).map(|k| interval * k).collect();

        if let Some(limit) = duration.checked_sub(END_OF_MEDIA_MARGIN) {
            let previous = timestamps.len().checked_sub(2).map(|i| timestamps[i]);
            if let Some(last) = timestamps.last_mut() {
                if *last > limit && previous.is_none_or(|previous| limit > previous) {
                    *last = limit;
                }
            }
        }

        Ok(Self {
            duration,
            interval,
            timestamps,
        })
    }

    /// The media duration the grid was derived from.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// The step between consecutive entries.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The grid timestamps in increasing order.
    pub fn as_slice(&self) -> &[Duration] {
        &self.timestamps
    }
}

impl Deref for TimestampGrid {
    type Target = [Duration];

    fn deref(&self) -> &Self::Target {
        &self.timestamps
    }
}

impl<'a> IntoIterator for &'a TimestampGrid {
    type Item = &'a Duration;
    type IntoIter = std::slice::Iter<'a, Duration>;

    fn into_iter(self) -> Self::IntoIter {
        self.timestamps.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_multiple_excludes_the_end() {
        let grid = TimestampGrid::new(10.0, Duration::from_secs(5)).unwrap();
        assert_eq!(grid.as_slice(), &[Duration::ZERO, Duration::from_secs(5)]);
    }

    #[test]
    fn last_entry_is_clamped_below_the_end() {
        let grid = TimestampGrid::new(10.0005, Duration::from_secs(5)).unwrap();
        assert_eq!(grid.len(), 3);
        let last = grid[2];
        assert!(last < Duration::from_secs_f64(10.0005));
        assert!(last <= Duration::from_secs(10));
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(matches!(
            TimestampGrid::new(10.0, Duration::ZERO),
            Err(ThumbstripError::InvalidInterval)
        ));
    }

    #[test]
    fn unusable_durations_are_rejected() {
        for duration in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                TimestampGrid::new(duration, Duration::from_secs(5)),
                Err(ThumbstripError::InvalidDuration(_))
            ));
        }
    }

    #[test]
    fn decimal_durations_keep_the_exact_entry_count() {
        let grid = TimestampGrid::new(2.1, Duration::from_millis(300)).unwrap();
        assert_eq!(grid.len(), 7);
        assert_eq!(grid[6], Duration::from_millis(1800));

        let grid = TimestampGrid::new(2.1, Duration::from_millis(700)).unwrap();
        assert_eq!(
            grid.as_slice(),
            &[Duration::ZERO, Duration::from_millis(700), Duration::from_millis(1400)]
        );
    }

    #[test]
    fn tiny_interval_is_rejected_without_allocating() {
        assert!(matches!(
            TimestampGrid::new(1.0e9, Duration::from_nanos(1)),
            Err(ThumbstripError::GridTooLarge { limit: MAX_GRID_ENTRIES, .. })
        ));
    }

    #[test]
    fn grid_at_the_entry_limit_is_accepted() {
        let grid = TimestampGrid::new(100.0, Duration::from_millis(1)).unwrap();
        assert_eq!(grid.len(), MAX_GRID_ENTRIES);
    }

    #[test]
    fn grid_shorter_than_one_step_has_only_zero() {
        let grid = TimestampGrid::new(0.0004, Duration::from_secs(5)).unwrap();
        assert_eq!(grid.as_slice(), &[Duration::ZERO]);
    }
}
