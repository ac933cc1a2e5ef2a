//! Time-window selection over normalized readings.

use chrono::{DateTime, Duration, Utc};

use crate::models::Reading;

/// Device selector sentinel that bypasses per-device filtering.
pub const ALL_DEVICES: &str = "all";

// ---

/// A named or custom time range used to select readings for aggregation.
///
/// `Custom` bounds are interpreted inclusively, with `end` widened to
/// 23:59:59 of its calendar day so same-day readings are not silently
/// excluded. Validation of a custom range (start not after end) is the
/// caller's responsibility; this filter assumes a pre-validated range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// Last 24 hours.
    Day,
    /// Last 7 days.
    Week,
    /// Last 30 days.
    Month,
    Custom {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl Window {
    // ---
    /// Inclusive `[start, end]` bounds of this window at evaluation time
    /// `now`.
    pub fn bounds(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        // ---
        match *self {
            Window::Day => (now - Duration::hours(24), now),
            Window::Week => (now - Duration::days(7), now),
            Window::Month => (now - Duration::days(30), now),
            Window::Custom { start, end } => (start, end_of_day(end)),
        }
    }

    /// Effective span, used by the aggregator's granularity policy.
    pub fn span(&self, now: DateTime<Utc>) -> Duration {
        // ---
        let (start, end) = self.bounds(now);
        end - start
    }
}

/// Keep readings inside `window` (evaluated at `now`), optionally narrowed
/// to one device. [`ALL_DEVICES`] skips the device filter.
pub fn select_window(
    readings: Vec<Reading>,
    window: &Window,
    device_id: &str,
    now: DateTime<Utc>,
) -> Vec<Reading> {
    // ---
    let (start, end) = window.bounds(now);

    readings
        .into_iter()
        .filter(|r| r.received_at >= start && r.received_at <= end)
        .filter(|r| device_id == ALL_DEVICES || r.device_id == device_id)
        .collect()
}

fn end_of_day(t: DateTime<Utc>) -> DateTime<Utc> {
    // ---
    // 23:59:59 exists on every calendar day, so the fallback never fires.
    match t.date_naive().and_hms_opt(23, 59, 59) {
        Some(eod) => eod.and_utc(),
        None => t,
    }
}
