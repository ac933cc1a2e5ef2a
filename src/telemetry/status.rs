//! Device liveness classification from the recency of its last reading.
//!
//! Classification is a pure function of `(last reading time, now,
//! threshold)`; it holds no timer, so callers must re-evaluate whenever
//! "now" advances. The online threshold is configuration
//! (`ONLINE_THRESHOLD_MINUTES`): historically every screen hard-coded its
//! own constant, so two views could disagree about the same station.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Devices quiet for longer than the online threshold but less than this
/// many minutes count as idle rather than offline.
pub const IDLE_CUTOFF_MINUTES: i64 = 180;

// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatusLabel {
    Online,
    Idle,
    Offline,
    Unknown,
}

/// Liveness of one device, recomputed on every query and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceStatus {
    // ---
    pub label: StatusLabel,
    pub ago_text: String,
}

/// Classify a device from its most recent reading timestamp.
pub fn classify(
    last_reading_time: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    online_threshold_minutes: i64,
) -> DeviceStatus {
    // ---
    let Some(last) = last_reading_time else {
        return DeviceStatus {
            label: StatusLabel::Unknown,
            ago_text: "No timestamp available".to_string(),
        };
    };

    let age_minutes = (now - last).num_minutes();
    let label = if age_minutes < online_threshold_minutes {
        StatusLabel::Online
    } else if age_minutes < IDLE_CUTOFF_MINUTES {
        StatusLabel::Idle
    } else {
        StatusLabel::Offline
    };

    DeviceStatus {
        label,
        ago_text: format_time_ago(last, now),
    }
}

/// Human-readable "time ago" description of `then` relative to `now`.
pub fn format_time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    // ---
    let minutes = (now - then).num_minutes();

    if minutes < 1 {
        return "just now".to_string();
    }
    if minutes < 60 {
        return format!("{minutes} min ago");
    }

    let hours = minutes / 60;
    let remainder = minutes % 60;
    if hours < 24 {
        return if remainder > 0 {
            format!("{hours}h {remainder}m ago")
        } else {
            format!("{hours}h ago")
        };
    }

    let days = hours / 24;
    format!("{days} day{} ago", if days == 1 { "" } else { "s" })
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 26, 12, 0, 0).unwrap()
    }

    #[test]
    fn thresholds_partition_the_timeline() {
        // ---
        let now = now();

        let online = classify(Some(now - Duration::minutes(10)), now, 30);
        assert_eq!(online.label, StatusLabel::Online);

        let idle = classify(Some(now - Duration::minutes(45)), now, 30);
        assert_eq!(idle.label, StatusLabel::Idle);

        let offline = classify(Some(now - Duration::hours(4)), now, 30);
        assert_eq!(offline.label, StatusLabel::Offline);

        let unknown = classify(None, now, 30);
        assert_eq!(unknown.label, StatusLabel::Unknown);
        assert_eq!(unknown.ago_text, "No timestamp available");
    }

    #[test]
    fn threshold_is_a_parameter_not_a_constant() {
        // ---
        let now = now();
        let last = Some(now - Duration::minutes(45));

        assert_eq!(classify(last, now, 30).label, StatusLabel::Idle);
        assert_eq!(classify(last, now, 60).label, StatusLabel::Online);
    }

    #[test]
    fn ago_text_formats_by_magnitude() {
        // ---
        let now = now();

        assert_eq!(format_time_ago(now - Duration::seconds(20), now), "just now");
        assert_eq!(format_time_ago(now - Duration::minutes(5), now), "5 min ago");
        assert_eq!(format_time_ago(now - Duration::minutes(125), now), "2h 5m ago");
        assert_eq!(format_time_ago(now - Duration::hours(3), now), "3h ago");
        assert_eq!(format_time_ago(now - Duration::hours(26), now), "1 day ago");
        assert_eq!(format_time_ago(now - Duration::days(3), now), "3 days ago");
    }

    #[test]
    fn classification_tracks_the_advancing_clock() {
        // ---
        let t0 = now();
        let last = Some(t0 - Duration::minutes(20));

        assert_eq!(classify(last, t0, 30).label, StatusLabel::Online);
        // Same inputs except "now": an hour later the device has gone idle.
        assert_eq!(
            classify(last, t0 + Duration::hours(1), 30).label,
            StatusLabel::Idle
        );
    }
}
