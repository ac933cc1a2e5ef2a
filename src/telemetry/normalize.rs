//! Reading normalizer: adapts each known raw shape to the canonical
//! [`Reading`].
//!
//! A record is dropped (returns `None`) when no device id can be derived
//! or its timestamp does not parse; normalization itself never fails the
//! whole batch. Unreported metrics stay `None`. The legacy ingesters
//! zero-filled them, which made a silent sensor indistinguishable from a
//! real 0 °C / 0 mm sample and skewed every downstream average.

use chrono::{DateTime, Utc};

use crate::models::{FlatRecord, Metrics, RawRecord, Reading, Signal, UplinkRecord};

/// Application id assumed for legacy records that never carried one.
const DEFAULT_APPLICATION_ID: &str = "weather-stations";

// ---

/// Normalize one raw record. `None` means the record is unusable and the
/// caller should drop it.
pub fn normalize(raw: RawRecord) -> Option<Reading> {
    // ---
    match raw {
        RawRecord::Uplink(record) => from_uplink(record),
        RawRecord::Flat(record) => from_flat(record),
    }
}

/// Normalize a batch, dropping unusable records.
pub fn normalize_all(raws: Vec<RawRecord>) -> Vec<Reading> {
    // ---
    let total = raws.len();
    let readings: Vec<Reading> = raws.into_iter().filter_map(normalize).collect();

    if readings.len() < total {
        tracing::debug!(
            "Dropped {} of {} raw records during normalization",
            total - readings.len(),
            total
        );
    }
    readings
}

/// Deduplicate by `device_id`, keeping the first-encountered reading per
/// device. Callers wanting "latest per device" must sort by `received_at`
/// descending first; see [`latest_per_device`].
pub fn dedup_by_device(readings: Vec<Reading>) -> Vec<Reading> {
    // ---
    let mut seen = std::collections::HashSet::new();
    readings
        .into_iter()
        .filter(|r| seen.insert(r.device_id.clone()))
        .collect()
}

/// The most recent reading for each device.
pub fn latest_per_device(mut readings: Vec<Reading>) -> Vec<Reading> {
    // ---
    readings.sort_by(|a, b| b.received_at.cmp(&a.received_at));
    dedup_by_device(readings)
}

// ---

fn from_uplink(record: UplinkRecord) -> Option<Reading> {
    // ---
    let device_id = non_empty(record.end_device_ids.device_id)?;
    let received_at = parse_instant(record.received_at.as_deref()?)?;

    let application_id = record
        .end_device_ids
        .application_ids
        .and_then(|ids| non_empty(ids.application_id))
        .unwrap_or_else(|| DEFAULT_APPLICATION_ID.to_string());
    let device_address = non_empty(record.end_device_ids.dev_addr).unwrap_or_else(|| device_id.clone());

    let mut metrics = Metrics::default();
    let mut signal = Signal::default();

    if let Some(uplink) = record.uplink_message {
        if let Some(payload) = uplink.decoded_payload {
            metrics = Metrics {
                temperature_c: payload.air_temperature,
                humidity_pct: payload.air_humidity,
                // Wire value is pascals
                pressure_hpa: payload.barometric_pressure.map(|pa| pa / 100.0),
                wind_speed_mps: payload.wind_speed,
                wind_direction_deg: payload.wind_direction_sensor,
                wind_gust_mps: payload.peak_wind_gust,
                rain_accumulation_mm: payload.rain_accumulation,
                rain_rate_mm_per_hour: payload.rain_gauge,
                light_intensity_lux: payload.light_intensity,
                uv_index: payload.uv_index,
            };
        }
        if let Some(rx) = uplink.rx_metadata.first() {
            signal.rssi_dbm = rx.rssi;
            signal.snr_db = rx.snr;
        }
        signal.packet_error_rate = uplink.packet_error_rate;
    }

    Some(Reading {
        device_id,
        application_id,
        device_address,
        received_at,
        metrics,
        signal,
    })
}

fn from_flat(record: FlatRecord) -> Option<Reading> {
    // ---
    let device_id = non_empty(record.device_id)?;
    let received_at = parse_instant(record.timestamp.as_deref().or(record.time.as_deref())?)?;

    let application_id = non_empty(record.application_id)
        .unwrap_or_else(|| DEFAULT_APPLICATION_ID.to_string());
    let device_address = non_empty(record.device_addr).unwrap_or_else(|| device_id.clone());

    Some(Reading {
        device_id,
        application_id,
        device_address,
        received_at,
        metrics: Metrics {
            temperature_c: record.temperature.or(record.air_temperature),
            humidity_pct: record.humidity.or(record.air_humidity),
            // Already hPa in the flat shape
            pressure_hpa: record.pressure,
            wind_speed_mps: record.wind_speed,
            wind_direction_deg: record.wind_direction,
            wind_gust_mps: record.wind_gust,
            rain_accumulation_mm: record.rain,
            rain_rate_mm_per_hour: record.rain_gauge,
            light_intensity_lux: record.light,
            uv_index: record.uv,
        },
        signal: Signal {
            rssi_dbm: record.rssi,
            snr_db: record.snr,
            packet_error_rate: record.error_rate,
        },
    })
}

// ---

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    // ---
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::TimeZone;

    fn flat(device_id: Option<&str>, timestamp: Option<&str>) -> RawRecord {
        // ---
        RawRecord::Flat(FlatRecord {
            device_id: device_id.map(String::from),
            application_id: None,
            device_addr: None,
            timestamp: timestamp.map(String::from),
            time: None,
            temperature: Some(12.5),
            air_temperature: None,
            humidity: None,
            air_humidity: Some(64.0),
            pressure: None,
            light: None,
            wind_speed: None,
            wind_direction: None,
            wind_gust: None,
            rain: None,
            rain_gauge: None,
            uv: None,
            rssi: Some(-92.0),
            snr: None,
            error_rate: None,
        })
    }

    #[test]
    fn record_without_device_id_is_dropped() {
        // ---
        assert!(normalize(flat(None, Some("2026-03-26T10:00:00Z"))).is_none());
        assert!(normalize(flat(Some(""), Some("2026-03-26T10:00:00Z"))).is_none());
    }

    #[test]
    fn record_with_bad_timestamp_is_dropped() {
        // ---
        assert!(normalize(flat(Some("legacy-7"), Some("yesterday-ish"))).is_none());
        assert!(normalize(flat(Some("legacy-7"), None)).is_none());
    }

    #[test]
    fn flat_record_normalizes_with_fallback_spellings() {
        // ---
        let reading = normalize(flat(Some("legacy-7"), Some("2026-03-26T10:00:00Z"))).unwrap();

        assert_eq!(reading.device_id, "legacy-7");
        assert_eq!(reading.application_id, DEFAULT_APPLICATION_ID);
        // dev_addr falls back to the device id
        assert_eq!(reading.device_address, "legacy-7");
        assert_eq!(reading.metrics.temperature_c, Some(12.5));
        // `air_humidity` spelling picked up when `humidity` is absent
        assert_eq!(reading.metrics.humidity_pct, Some(64.0));
        // Unreported metrics stay unset, not zero
        assert_eq!(reading.metrics.pressure_hpa, None);
        assert_eq!(reading.signal.rssi_dbm, Some(-92.0));
    }

    #[test]
    fn uplink_record_normalizes_and_converts_pressure() {
        // ---
        let json = r#"{
            "received_at": "2026-03-26T18:45:00+00:00",
            "end_device_ids": {
                "device_id": "station-01",
                "application_ids": { "application_id": "campus-weather" },
                "dev_addr": "260B1F00"
            },
            "uplink_message": {
                "decoded_payload": {
                    "air_temperature": 21.5,
                    "barometric_pressure": 101325.0,
                    "rain_accumulation": 0.2
                },
                "rx_metadata": [{ "rssi": -80, "snr": 9.5 }],
                "packet_error_rate": 0.01
            }
        }"#;
        let raw: RawRecord = serde_json::from_str(json).unwrap();

        let reading = normalize(raw).unwrap();
        assert_eq!(reading.device_id, "station-01");
        assert_eq!(reading.application_id, "campus-weather");
        assert_eq!(reading.device_address, "260B1F00");
        assert_eq!(
            reading.received_at,
            Utc.with_ymd_and_hms(2026, 3, 26, 18, 45, 0).unwrap()
        );
        assert_eq!(reading.metrics.pressure_hpa, Some(1013.25));
        assert_eq!(reading.metrics.rain_accumulation_mm, Some(0.2));
        assert_eq!(reading.metrics.humidity_pct, None);
        assert_eq!(reading.signal.snr_db, Some(9.5));
        assert_eq!(reading.signal.packet_error_rate, Some(0.01));
    }

    #[test]
    fn uplink_without_payload_keeps_identity_only() {
        // ---
        let json = r#"{
            "received_at": "2026-03-26T18:45:00Z",
            "end_device_ids": { "device_id": "station-02" }
        }"#;
        let raw: RawRecord = serde_json::from_str(json).unwrap();

        let reading = normalize(raw).unwrap();
        assert_eq!(reading.device_id, "station-02");
        assert_eq!(reading.metrics, Metrics::default());
        assert_eq!(reading.signal, Signal::default());
    }

    #[test]
    fn dedup_keeps_first_encountered_per_device() {
        // ---
        let mk = |id: &str, hour: u32| {
            normalize(flat(Some(id), Some(&format!("2026-03-26T{hour:02}:00:00Z")))).unwrap()
        };
        let readings = vec![mk("a", 8), mk("b", 9), mk("a", 10)];

        let deduped = dedup_by_device(readings.clone());
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].received_at.format("%H").to_string(), "08");

        let latest = latest_per_device(readings);
        assert_eq!(latest.len(), 2);
        let a = latest.iter().find(|r| r.device_id == "a").unwrap();
        assert_eq!(a.received_at.format("%H").to_string(), "10");
    }
}
