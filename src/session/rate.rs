//! Converts configured sampling rates into provider subscription intervals.
//!
//! | Sensor        | Setting                                  | Unit | Fallback |
//! |---------------|------------------------------------------|------|----------|
//! | Accelerometer | `accelerometerRate`                      | Hz   | 1000 ms  |
//! | Gyro          | `gyroRate`, else `accelerometerRate`     | Hz   | 1000 ms  |
//! | GPS           | `gpsRate`                                | ms   | 5000 ms  |
//!
//! A setting that is absent, unparsable, zero, negative, non-finite or too
//! large to express as a [`Duration`] falls through to the next row entry.
//! Resolved intervals are clamped to [`MIN_INTERVAL`]..=[`MAX_INTERVAL`].

use crate::sensor::SensorKind;
use crate::settings::SensorRates;
use std::time::Duration;

/// Interval used for motion sensors without a usable rate (1 Hz).
pub const DEFAULT_MOTION_INTERVAL: Duration = Duration::from_millis(1000);

/// Interval used for GPS without a usable rate.
pub const DEFAULT_GPS_INTERVAL: Duration = Duration::from_millis(5000);

/// Shortest interval handed to a provider.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Longest interval handed to a provider (one day).
pub const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Parse a rate setting into a positive finite number.
fn positive(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v > 0.0)
}

fn hz_to_interval(hz: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(1.0 / hz).ok()
}

fn ms_to_interval(ms: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(ms / 1000.0).ok()
}

/// Subscription interval for `kind` under the given rate settings.
pub fn resolve_interval(kind: SensorKind, rates: &SensorRates) -> Duration {
    let interval = match kind {
        SensorKind::Accelerometer => positive(rates.accelerometer_rate.as_deref())
            .and_then(hz_to_interval)
            .unwrap_or(DEFAULT_MOTION_INTERVAL),
        SensorKind::Gyro => positive(rates.gyro_rate.as_deref())
            .and_then(hz_to_interval)
            .or_else(|| positive(rates.accelerometer_rate.as_deref()).and_then(hz_to_interval))
            .unwrap_or(DEFAULT_MOTION_INTERVAL),
        SensorKind::Gps => positive(rates.gps_rate.as_deref())
            .and_then(ms_to_interval)
            .unwrap_or(DEFAULT_GPS_INTERVAL),
    };
    interval.clamp(MIN_INTERVAL, MAX_INTERVAL)
}

/// Effective rate in Hz for display.
pub fn interval_to_hz(interval: Duration) -> f64 {
    1.0 / interval.as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rates(gps: Option<&str>, acc: Option<&str>, gyro: Option<&str>) -> SensorRates {
        SensorRates {
            gps_rate: gps.map(String::from),
            accelerometer_rate: acc.map(String::from),
            gyro_rate: gyro.map(String::from),
        }
    }

    #[test]
    fn test_accelerometer_hz_to_interval() {
        let r = rates(None, Some("2"), None);
        assert_eq!(
            resolve_interval(SensorKind::Accelerometer, &r),
            Duration::from_millis(500)
        );

        let r = rates(None, Some("50"), None);
        assert_eq!(
            resolve_interval(SensorKind::Accelerometer, &r),
            Duration::from_millis(20)
        );
    }

    #[test]
    fn test_accelerometer_fallbacks() {
        for bad in [None, Some("0"), Some(""), Some("abc"), Some("-5"), Some("NaN"), Some("inf")] {
            let r = rates(None, bad, None);
            assert_eq!(
                resolve_interval(SensorKind::Accelerometer, &r),
                Duration::from_millis(1000),
                "rate {bad:?}"
            );
        }
    }

    #[test]
    fn test_gyro_falls_back_to_accelerometer_rate() {
        let r = rates(None, Some("4"), None);
        assert_eq!(resolve_interval(SensorKind::Gyro, &r), Duration::from_millis(250));

        let r = rates(None, Some("4"), Some("10"));
        assert_eq!(resolve_interval(SensorKind::Gyro, &r), Duration::from_millis(100));

        let r = rates(None, Some("4"), Some("0"));
        assert_eq!(resolve_interval(SensorKind::Gyro, &r), Duration::from_millis(250));

        let r = rates(None, None, None);
        assert_eq!(resolve_interval(SensorKind::Gyro, &r), Duration::from_millis(1000));
    }

    #[test]
    fn test_gps_interval_is_milliseconds() {
        let r = rates(Some("1000"), None, None);
        assert_eq!(resolve_interval(SensorKind::Gps, &r), Duration::from_millis(1000));

        let r = rates(None, Some("2"), None);
        assert_eq!(resolve_interval(SensorKind::Gps, &r), Duration::from_millis(5000));

        let r = rates(Some("nope"), None, None);
        assert_eq!(resolve_interval(SensorKind::Gps, &r), Duration::from_millis(5000));
    }

    #[test]
    fn test_sub_millisecond_intervals_are_clamped() {
        let r = rates(Some("0.2"), Some("5000"), None);
        assert_eq!(resolve_interval(SensorKind::Accelerometer, &r), MIN_INTERVAL);
        assert_eq!(resolve_interval(SensorKind::Gps, &r), MIN_INTERVAL);
    }

    #[test]
    fn test_unrepresentable_rates_fall_back() {
        let r = rates(Some("1e30"), Some("1e-300"), None);
        assert_eq!(
            resolve_interval(SensorKind::Accelerometer, &r),
            DEFAULT_MOTION_INTERVAL
        );
        assert_eq!(resolve_interval(SensorKind::Gyro, &r), DEFAULT_MOTION_INTERVAL);
        assert_eq!(resolve_interval(SensorKind::Gps, &r), DEFAULT_GPS_INTERVAL);

        // An unusable gyro rate still defers to a usable accelerometer rate.
        let r = rates(None, Some("4"), Some("1e-300"));
        assert_eq!(resolve_interval(SensorKind::Gyro, &r), Duration::from_millis(250));
    }

    #[test]
    fn test_long_intervals_are_clamped() {
        let r = rates(Some("1e12"), Some("1e-9"), None);
        assert_eq!(resolve_interval(SensorKind::Accelerometer, &r), MAX_INTERVAL);
        assert_eq!(resolve_interval(SensorKind::Gps, &r), MAX_INTERVAL);
    }

    #[test]
    fn test_interval_to_hz() {
        assert_eq!(interval_to_hz(Duration::from_millis(500)), 2.0);
    }
}
