//! Bucketed aggregation of readings into chartable series.
//!
//! Buckets are hour- or day-sized depending on the window span. Every
//! metric is averaged per bucket **except** rain accumulation, which is a
//! cumulative quantity and is summed. Averages divide by the number of
//! readings that actually reported the metric, not by the bucket's total
//! sample count; the legacy dashboard zero-filled missing values into the
//! running sum, which dragged every average toward zero whenever one
//! sensor went quiet.

use std::collections::BTreeMap;

use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;

use crate::models::{Metrics, Reading};
use crate::telemetry::window::Window;

// ---

/// Bucket size for one aggregation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Hourly,
    Daily,
}

impl Granularity {
    // ---
    /// Granularity policy: hourly for spans up to 7 days, daily beyond.
    ///
    /// `Week` buckets daily even though its span is exactly 7 days; the
    /// dashboard has always charted the week view as one point per day and
    /// the chart consumers rely on that.
    pub fn for_window(window: &Window, now: DateTime<Utc>) -> Granularity {
        // ---
        match window {
            Window::Day => Granularity::Hourly,
            Window::Week | Window::Month => Granularity::Daily,
            Window::Custom { .. } => {
                if window.span(now) > chrono::Duration::days(7) {
                    Granularity::Daily
                } else {
                    Granularity::Hourly
                }
            }
        }
    }

    /// Chart label for the bucket containing `t`: `YYYY-MM-DD` for daily,
    /// `YYYY-MM-DD HH:00` for hourly.
    pub fn key(self, t: DateTime<Utc>) -> String {
        // ---
        match self {
            Granularity::Daily => t.format("%Y-%m-%d").to_string(),
            Granularity::Hourly => t.format("%Y-%m-%d %H:00").to_string(),
        }
    }

    /// Start instant of the bucket containing `t`.
    pub fn truncate(self, t: DateTime<Utc>) -> DateTime<Utc> {
        // ---
        let hour = t.with_minute(0).and_then(|t| t.with_second(0)).and_then(|t| t.with_nanosecond(0));
        let truncated = match self {
            Granularity::Hourly => hour,
            Granularity::Daily => hour.and_then(|t| t.with_hour(0)),
        };
        truncated.unwrap_or(t)
    }
}

/// One aggregation cell. A bucket exists iff at least one reading
/// contributed to it, so `sample_count` is always positive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    // ---
    pub key: String,
    pub representative_time: DateTime<Utc>,
    pub sample_count: u32,
    pub metrics: Metrics,
}

// ---

/// Group readings into buckets sized by `window`'s granularity and combine
/// each metric per the averaging/summation rules. Output is ascending by
/// bucket time. Pure: identical input yields identical output.
pub fn aggregate(readings: &[Reading], window: &Window, now: DateTime<Utc>) -> Vec<Bucket> {
    // ---
    let granularity = Granularity::for_window(window, now);

    let mut cells: BTreeMap<DateTime<Utc>, Cell> = BTreeMap::new();
    for reading in readings {
        let start = granularity.truncate(reading.received_at);
        cells.entry(start).or_default().push(&reading.metrics);
    }

    cells
        .into_iter()
        .map(|(start, cell)| Bucket {
            key: granularity.key(start),
            representative_time: start,
            sample_count: cell.samples,
            metrics: cell.finish(),
        })
        .collect()
}

/// Running aggregate for one bucket: a `(sum, count)` pair per averaged
/// metric so each mean divides only by its own reporting readings, plus a
/// plain sum for rain accumulation.
#[derive(Default)]
struct Cell {
    // ---
    samples: u32,
    temperature_c: Avg,
    humidity_pct: Avg,
    pressure_hpa: Avg,
    wind_speed_mps: Avg,
    wind_direction_deg: Avg,
    wind_gust_mps: Avg,
    rain_accumulation_mm: Sum,
    rain_rate_mm_per_hour: Avg,
    light_intensity_lux: Avg,
    uv_index: Avg,
}

impl Cell {
    // ---
    fn push(&mut self, m: &Metrics) {
        // ---
        self.samples += 1;
        self.temperature_c.push(m.temperature_c);
        self.humidity_pct.push(m.humidity_pct);
        self.pressure_hpa.push(m.pressure_hpa);
        self.wind_speed_mps.push(m.wind_speed_mps);
        self.wind_direction_deg.push(m.wind_direction_deg);
        self.wind_gust_mps.push(m.wind_gust_mps);
        self.rain_accumulation_mm.push(m.rain_accumulation_mm);
        self.rain_rate_mm_per_hour.push(m.rain_rate_mm_per_hour);
        self.light_intensity_lux.push(m.light_intensity_lux);
        self.uv_index.push(m.uv_index);
    }

    fn finish(self) -> Metrics {
        // ---
        Metrics {
            temperature_c: self.temperature_c.mean(),
            humidity_pct: self.humidity_pct.mean(),
            pressure_hpa: self.pressure_hpa.mean(),
            wind_speed_mps: self.wind_speed_mps.mean(),
            wind_direction_deg: self.wind_direction_deg.mean(),
            wind_gust_mps: self.wind_gust_mps.mean(),
            rain_accumulation_mm: self.rain_accumulation_mm.total(),
            rain_rate_mm_per_hour: self.rain_rate_mm_per_hour.mean(),
            light_intensity_lux: self.light_intensity_lux.mean(),
            uv_index: self.uv_index.mean(),
        }
    }
}

#[derive(Default)]
struct Avg {
    sum: f64,
    n: u32,
}

impl Avg {
    // ---
    fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.n += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        (self.n > 0).then(|| self.sum / f64::from(self.n))
    }
}

#[derive(Default)]
struct Sum {
    total: f64,
    n: u32,
}

impl Sum {
    // ---
    fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.total += v;
            self.n += 1;
        }
    }

    fn total(&self) -> Option<f64> {
        (self.n > 0).then_some(self.total)
    }
}
