//! Data models for the weather-station telemetry pipeline.
//!
//! The upstream feed delivers records in two historically-evolved shapes:
//! the canonical LoRaWAN-style uplink (`end_device_ids` +
//! `uplink_message.decoded_payload`) and an older flat shape with top-level
//! metric fields. Both are modeled explicitly as variants of [`RawRecord`]
//! so a new shape is added by adding a variant and an adapter, not by
//! extending a fallback chain. Normalization into [`Reading`] lives in
//! `telemetry::normalize`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---

/// One raw record as delivered by the upstream feed.
///
/// Variants are tried in declaration order; the uplink shape is
/// distinguished by its mandatory `end_device_ids` object, so the flat
/// shape (all fields optional) must come last.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawRecord {
    Uplink(UplinkRecord),
    Flat(FlatRecord),
}

/// Canonical nested uplink shape.
#[derive(Debug, Clone, Deserialize)]
pub struct UplinkRecord {
    // ---
    pub received_at: Option<String>,
    pub end_device_ids: EndDeviceIds,
    pub uplink_message: Option<UplinkMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndDeviceIds {
    // ---
    pub device_id: Option<String>,
    pub application_ids: Option<ApplicationIds>,
    pub dev_addr: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationIds {
    pub application_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UplinkMessage {
    // ---
    pub decoded_payload: Option<DecodedPayload>,
    #[serde(default)]
    pub rx_metadata: Vec<RxMetadata>,
    pub packet_error_rate: Option<f64>,
}

/// Decoded sensor payload of the uplink shape. `barometric_pressure` is in
/// pascals on the wire and converted to hPa during normalization.
#[derive(Debug, Clone, Deserialize)]
pub struct DecodedPayload {
    // ---
    pub air_temperature: Option<f64>,
    pub air_humidity: Option<f64>,
    pub barometric_pressure: Option<f64>,
    pub light_intensity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction_sensor: Option<f64>,
    pub peak_wind_gust: Option<f64>,
    pub rain_accumulation: Option<f64>,
    pub rain_gauge: Option<f64>,
    pub uv_index: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RxMetadata {
    pub rssi: Option<f64>,
    pub snr: Option<f64>,
}

/// Legacy flat shape with top-level metric fields. Several fields have a
/// long and a short spelling in the wild (`temperature`/`air_temperature`);
/// the adapter prefers the short one, matching the historical ingesters.
#[derive(Debug, Clone, Deserialize)]
pub struct FlatRecord {
    // ---
    pub device_id: Option<String>,
    pub application_id: Option<String>,
    pub device_addr: Option<String>,
    pub timestamp: Option<String>,
    pub time: Option<String>,
    pub temperature: Option<f64>,
    pub air_temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub air_humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub light: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
    pub wind_gust: Option<f64>,
    pub rain: Option<f64>,
    pub rain_gauge: Option<f64>,
    pub uv: Option<f64>,
    pub rssi: Option<f64>,
    pub snr: Option<f64>,
    pub error_rate: Option<f64>,
}

// ---

/// One normalized telemetry sample.
///
/// Every metric is optional; `None` means "not reported", never zero. The
/// column layout of `station_readings` mirrors this struct, with `None`
/// stored as SQL NULL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reading {
    // ---
    pub device_id: String,
    pub application_id: String,
    pub device_address: String,
    pub received_at: DateTime<Utc>,
    #[sqlx(flatten)]
    pub metrics: Metrics,
    #[sqlx(flatten)]
    pub signal: Signal,
}

/// Sensor metrics of a reading (or the aggregates of a bucket).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Metrics {
    // ---
    pub temperature_c: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub pressure_hpa: Option<f64>,
    pub wind_speed_mps: Option<f64>,
    pub wind_direction_deg: Option<f64>,
    pub wind_gust_mps: Option<f64>,
    pub rain_accumulation_mm: Option<f64>,
    pub rain_rate_mm_per_hour: Option<f64>,
    pub light_intensity_lux: Option<f64>,
    pub uv_index: Option<f64>,
}

/// Radio-link quality of a reading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Signal {
    // ---
    pub rssi_dbm: Option<f64>,
    pub snr_db: Option<f64>,
    pub packet_error_rate: Option<f64>,
}

// ---

/// Named metric, used to select a value out of [`Metrics`] when computing
/// trends or single-metric series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Temperature,
    Humidity,
    Pressure,
    WindSpeed,
    WindDirection,
    WindGust,
    Rain,
    RainRate,
    Light,
    Uv,
}

impl Metric {
    // ---
    /// The metrics shown on the dashboard overview cards, in display order.
    pub const CHARTED: [Metric; 7] = [
        Metric::Temperature,
        Metric::Humidity,
        Metric::Pressure,
        Metric::WindSpeed,
        Metric::Light,
        Metric::Rain,
        Metric::Uv,
    ];

    /// Stable name used in API payloads, matching the serde spelling.
    pub fn name(self) -> &'static str {
        // ---
        match self {
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
            Metric::Pressure => "pressure",
            Metric::WindSpeed => "wind_speed",
            Metric::WindDirection => "wind_direction",
            Metric::WindGust => "wind_gust",
            Metric::Rain => "rain",
            Metric::RainRate => "rain_rate",
            Metric::Light => "light",
            Metric::Uv => "uv",
        }
    }

    /// Read this metric's value out of a metrics record.
    pub fn value(self, metrics: &Metrics) -> Option<f64> {
        // ---
        match self {
            Metric::Temperature => metrics.temperature_c,
            Metric::Humidity => metrics.humidity_pct,
            Metric::Pressure => metrics.pressure_hpa,
            Metric::WindSpeed => metrics.wind_speed_mps,
            Metric::WindDirection => metrics.wind_direction_deg,
            Metric::WindGust => metrics.wind_gust_mps,
            Metric::Rain => metrics.rain_accumulation_mm,
            Metric::RainRate => metrics.rain_rate_mm_per_hour,
            Metric::Light => metrics.light_intensity_lux,
            Metric::Uv => metrics.uv_index,
        }
    }
}
