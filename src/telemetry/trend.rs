//! Trend calculation: percentage change of a metric versus ~24h prior.

use chrono::{DateTime, Duration, Utc};

use crate::models::{Metric, Reading};

// ---

/// Percentage change from `reference` to `current`.
///
/// Returns `None` ("trend unavailable") when either operand is missing or
/// the reference is zero. Positive means increase.
pub fn compute_trend(current: Option<f64>, reference: Option<f64>) -> Option<f64> {
    // ---
    let current = current?;
    let reference = reference?;
    if reference == 0.0 {
        return None;
    }
    Some((current - reference) / reference * 100.0)
}

/// Reference value for a trend: the metric as reported by the reading
/// whose timestamp is closest to `now - 24h`.
///
/// With fewer than two readings there is no meaningful "prior" point and
/// no reference exists. The closest reading may itself not have reported
/// the metric, in which case the trend is unavailable too.
pub fn reference_value(readings: &[Reading], metric: Metric, now: DateTime<Utc>) -> Option<f64> {
    // ---
    if readings.len() < 2 {
        return None;
    }

    let target = now - Duration::hours(24);
    let closest = readings.iter().min_by_key(|r| {
        (r.received_at - target).num_milliseconds().abs()
    })?;

    metric.value(&closest.metrics)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::{Metrics, Signal};
    use chrono::TimeZone;

    fn reading(received_at: DateTime<Utc>, temperature_c: Option<f64>) -> Reading {
        // ---
        Reading {
            device_id: "station-01".to_string(),
            application_id: "weather-stations".to_string(),
            device_address: "station-01".to_string(),
            received_at,
            metrics: Metrics {
                temperature_c,
                ..Metrics::default()
            },
            signal: Signal::default(),
        }
    }

    #[test]
    fn trend_guards_return_none() {
        // ---
        assert_eq!(compute_trend(Some(25.0), Some(0.0)), None);
        assert_eq!(compute_trend(None, Some(20.0)), None);
        assert_eq!(compute_trend(Some(25.0), None), None);
    }

    #[test]
    fn ten_percent_increase() {
        // ---
        let trend = compute_trend(Some(22.0), Some(20.0)).unwrap();
        assert!((trend - 10.0).abs() < 1e-9);
    }

    #[test]
    fn decrease_is_negative() {
        // ---
        let trend = compute_trend(Some(18.0), Some(20.0)).unwrap();
        assert!((trend + 10.0).abs() < 1e-9);
    }

    #[test]
    fn reference_picks_reading_closest_to_24h_ago() {
        // ---
        let now = Utc.with_ymd_and_hms(2026, 3, 26, 12, 0, 0).unwrap();
        let readings = vec![
            reading(now, Some(22.0)),
            reading(now - Duration::hours(20), Some(17.0)),
            // 25h ago: 1h off target vs 4h for the one above
            reading(now - Duration::hours(25), Some(19.0)),
            reading(now - Duration::hours(40), Some(12.0)),
        ];

        assert_eq!(reference_value(&readings, Metric::Temperature, now), Some(19.0));
    }

    #[test]
    fn reference_requires_at_least_two_readings() {
        // ---
        let now = Utc.with_ymd_and_hms(2026, 3, 26, 12, 0, 0).unwrap();
        let one = vec![reading(now - Duration::hours(24), Some(19.0))];

        assert_eq!(reference_value(&one, Metric::Temperature, now), None);
        assert_eq!(reference_value(&[], Metric::Temperature, now), None);
    }

    #[test]
    fn reference_is_none_when_closest_reading_lacks_the_metric() {
        // ---
        let now = Utc.with_ymd_and_hms(2026, 3, 26, 12, 0, 0).unwrap();
        let readings = vec![
            reading(now, Some(22.0)),
            reading(now - Duration::hours(24), None),
        ];

        assert_eq!(reference_value(&readings, Metric::Temperature, now), None);
    }
}
