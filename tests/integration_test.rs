use anyhow::Result;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

// HTTP-level tests against a running stationflow instance. Point BASE_URL
// at the service (default: local dev server); the instance needs its
// database and STATION_FEED_URL configured.

#[derive(Debug, Deserialize)]
struct Reading {
    device_id: String,
    application_id: String,
    received_at: DateTime<Utc>,
    metrics: Metrics,
}

#[derive(Debug, Deserialize)]
struct Metrics {
    temperature_c: Option<f64>,
    rain_accumulation_mm: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Bucket {
    key: String,
    representative_time: DateTime<Utc>,
    sample_count: u32,
    metrics: Metrics,
}

#[derive(Debug, Deserialize)]
struct DeviceSummary {
    device_id: String,
    name: String,
    status: DeviceStatus,
}

#[derive(Debug, Deserialize)]
struct DeviceStatus {
    label: String,
    ago_text: String,
}

fn base_url() -> String {
    std::env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8080".into())
}

// ---

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    // ---
    let client = Client::new();
    let response = client.get(format!("{}/health", base_url())).send().await?;

    assert!(response.status().is_success());
    Ok(())
}

#[tokio::test]
async fn readings_pipeline_normalizes_and_filters() -> Result<()> {
    // ---
    let base = base_url();
    let client = Client::new();

    let url = format!("{}/api/readings?limit=50", base);
    let readings: Vec<Reading> = client.get(&url).send().await?.json().await?;

    assert!(readings.len() <= 50, "Limit filter failed");

    for r in &readings {
        // Normalization guarantees: derivable identity, parseable instant
        assert!(!r.device_id.is_empty(), "device_id should not be empty");
        assert!(
            !r.application_id.is_empty(),
            "application_id should not be empty"
        );
        assert!(
            r.received_at > DateTime::from_timestamp(0, 0).unwrap(),
            "received_at should be valid"
        );
    }

    // Device filter: every returned reading matches the requested station
    if let Some(first) = readings.first() {
        let url = format!("{}/api/readings?device_id={}&limit=10", base, first.device_id);
        let filtered: Vec<Reading> = client.get(&url).send().await?.json().await?;
        for r in &filtered {
            assert_eq!(r.device_id, first.device_id, "Device filter failed");
        }
    }

    Ok(())
}

#[tokio::test]
async fn history_buckets_are_ordered_and_nonempty() -> Result<()> {
    // ---
    let url = format!("{}/api/history?range=day", base_url());
    let client = Client::new();
    let buckets: Vec<Bucket> = client.get(&url).send().await?.json().await?;

    for pair in buckets.windows(2) {
        assert!(
            pair[0].representative_time < pair[1].representative_time,
            "Buckets must ascend by time"
        );
    }
    for b in &buckets {
        assert!(b.sample_count > 0, "Empty bucket emitted: {}", b.key);
        if let (Some(t), Some(_)) = (b.metrics.temperature_c, b.metrics.rain_accumulation_mm) {
            assert!(t.is_finite());
        }
    }

    Ok(())
}

#[tokio::test]
async fn invalid_custom_range_is_rejected() -> Result<()> {
    // ---
    let base = base_url();
    let client = Client::new();

    // Start after end
    let url = format!(
        "{}/api/history?range=custom&start=2026-03-10&end=2026-03-01",
        base
    );
    let response = client.get(&url).send().await?;
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    // Custom without dates
    let url = format!("{}/api/history?range=custom", base);
    let response = client.get(&url).send().await?;
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn device_list_carries_a_valid_status() -> Result<()> {
    // ---
    let url = format!("{}/api/devices", base_url());
    let client = Client::new();
    let devices: Vec<DeviceSummary> = client.get(&url).send().await?.json().await?;

    for d in &devices {
        assert!(!d.device_id.is_empty());
        assert!(d.name.starts_with("Weather Station "));
        assert!(
            ["Online", "Idle", "Offline", "Unknown"].contains(&d.status.label.as_str()),
            "Unexpected status label {}",
            d.status.label
        );
        assert!(!d.status.ago_text.is_empty());
    }

    Ok(())
}

#[tokio::test]
async fn csv_export_returns_attachment() -> Result<()> {
    // ---
    let url = format!("{}/api/history/export?range=week", base_url());
    let client = Client::new();
    let response = client.get(&url).send().await?;

    assert!(response.status().is_success());
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/csv"));

    let body = response.text().await?;
    let header = body.lines().next().unwrap_or_default();
    assert!(header.starts_with("bucket,samples,"), "CSV header missing");

    Ok(())
}
