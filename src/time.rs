//! Conversions between sample counts and instants.
//!
//! Instants are kept at nanosecond resolution, so a sample period that is
//! not a whole number of nanoseconds is rounded.
use chrono::{DateTime, Duration, Utc};

/// Offsets smaller than this are rounding of instants to nanoseconds.
///
/// Capped at half a sample period so that a missing sample is never
/// rounding, whatever the rate.
pub fn time_tolerance(fs: f64) -> Duration {
    Duration::microseconds(1).min(sample_period(fs) / 2)
}

pub fn sample_period(fs: f64) -> Duration {
    Duration::nanoseconds((1e9 / fs).round() as i64)
}

pub fn as_secs_f64(duration: Duration) -> f64 {
    duration.num_seconds() as f64 + duration.subsec_nanos() as f64 * 1e-9
}

/// Instant of the sample `n` samples after `first`.
pub fn offset_time(first: DateTime<Utc>, n: u64, fs: f64) -> DateTime<Utc> {
    first + Duration::nanoseconds((n as f64 * 1e9 / fs).round() as i64)
}

/// Fractional number of sample periods from `first` to `time`.
pub fn periods_between(first: DateTime<Utc>, time: DateTime<Utc>, fs: f64) -> f64 {
    as_secs_f64(time - first) * fs
}

/// Number of samples in `first..=last`.
pub fn sample_count(first: DateTime<Utc>, last: DateTime<Utc>, fs: f64) -> i64 {
    periods_between(first, last, fs).round() as i64 + 1
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_period() {
        assert_eq!(sample_period(10.0), Duration::milliseconds(100));
        assert_eq!(sample_period(3.0), Duration::nanoseconds(333_333_333));
        assert_eq!(sample_period(2400.0), Duration::nanoseconds(416_667));
    }

    #[test]
    fn test_tolerance() {
        assert_eq!(time_tolerance(10.0), Duration::microseconds(1));
        assert_eq!(time_tolerance(500_000.0), Duration::microseconds(1));
        assert_eq!(time_tolerance(2_000_000.0), Duration::nanoseconds(250));
    }

    #[test]
    fn test_offsets() {
        let last = offset_time(t0(), 99, 10.0);
        assert_eq!(last - t0(), Duration::milliseconds(9900));
        assert_eq!(sample_count(t0(), last, 10.0), 100);
        assert_eq!(sample_count(t0(), t0(), 128.0), 1);

        let last = offset_time(t0(), 1, 3.0);
        assert_eq!(sample_count(t0(), last, 3.0), 2);
        assert!((periods_between(t0(), last, 3.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_negative_secs() {
        assert_eq!(as_secs_f64(Duration::milliseconds(-1500)), -1.5);
    }
}
