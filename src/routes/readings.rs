//! Ingest pipeline endpoint: pull the upstream station feed, normalize the
//! raw records, persist them, and return the filtered batch.
//!
//! The feed is inherently noisy: records arrive in two shapes and some
//! are malformed. A record that fails to parse, normalize, or store is
//! logged and skipped; it never aborts the batch.

use axum::{
    extract::Query, extract::State, http::StatusCode, response::IntoResponse, routing::get, Json,
    Router,
};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{debug, error, info};

use crate::telemetry::normalize_all;
use crate::{Config, RawRecord, Reading};

// ---

pub fn router() -> Router<(PgPool, Config)> {
    // ---
    Router::new().route("/api/readings", get(handler))
}

async fn handler(
    Query(params): Query<ReadingsQuery>,
    State((pool, config)): State<(PgPool, Config)>,
) -> impl IntoResponse {
    // ---
    info!("GET /api/readings - Starting pipeline");

    // Step 1: Fetch raw records from the station feed
    debug!("GET /api/readings - Step 1");

    let raw_records = match fetch_feed_records(&config.feed_url, config.feed_max_pages).await {
        Ok(records) => records,
        Err(e) => {
            error!("Failed to fetch station feed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json("Failed to fetch station feed"),
            )
                .into_response();
        }
    };

    // Step 2: Normalize (malformed records are dropped, not fatal)
    debug!("GET /api/readings - Step 2");

    let readings = normalize_all(raw_records);

    // Step 3: Persist normalized readings
    debug!("GET /api/readings - Step 3");

    let mut stored = Vec::new();
    for reading in readings {
        if let Err(e) = store_reading(&pool, &reading).await {
            error!("Failed to store reading for {}: {}", reading.device_id, e);
            continue;
        }
        stored.push(reading);
    }

    // Step 4: Apply filters and return data
    let filtered = apply_filters(stored, &params);
    info!("Pipeline complete, returning {} readings", filtered.len());
    debug!("GET /api/readings - Returning OK");
    (StatusCode::OK, Json(filtered)).into_response()
}

// ---

/// Fetch paginated raw records from the upstream station feed.
///
/// The feed returns `{ "results": [...], "next_cursor": "..." }` pages;
/// items that do not match any known record shape are logged and skipped.
async fn fetch_feed_records(
    base_url: &str,
    max_pages: u32,
) -> Result<Vec<RawRecord>, Box<dyn std::error::Error>> {
    // ---
    let client = reqwest::Client::new();
    let mut all_records = Vec::new();
    let mut cursor: Option<String> = None;
    let mut page_count = 0;

    loop {
        if page_count >= max_pages {
            tracing::debug!(
                "Hit page limit of {}, stopping pagination. Fetched {} records so far.",
                max_pages,
                all_records.len()
            );
            break;
        }
        page_count += 1;

        let url = if let Some(ref cursor) = cursor {
            format!("{}?cursor={}", base_url, cursor)
        } else {
            base_url.to_string()
        };

        tracing::debug!("Fetching page {} from: {}", page_count, url);

        let response: serde_json::Value = client.get(&url).send().await?.json().await?;

        if let Some(items) = response.get("results").and_then(|d| d.as_array()) {
            tracing::debug!(
                "Page {} found results array with {} items",
                page_count,
                items.len()
            );
            for (i, item) in items.iter().enumerate() {
                match serde_json::from_value::<RawRecord>(item.clone()) {
                    Ok(record) => {
                        all_records.push(record);
                    }
                    Err(e) => {
                        tracing::debug!(
                            "Failed to parse item {} on page {}: {} - Raw item: {}",
                            i,
                            page_count,
                            e,
                            item
                        );
                    }
                }
            }
        } else {
            tracing::debug!(
                "Page {} response missing 'results' field or not an array",
                page_count
            );
        }

        cursor = response
            .get("next_cursor")
            .and_then(|c| c.as_str())
            .map(String::from);

        tracing::debug!("Page {} next_cursor: {:?}", page_count, cursor);

        if cursor.is_none() {
            tracing::info!(
                "No more pages, stopping. Total records fetched: {}",
                all_records.len()
            );
            break;
        }
    }

    tracing::info!(
        "Finished fetching {} total records from {} pages",
        all_records.len(),
        page_count
    );
    Ok(all_records)
}

/// Store one normalized reading in the database.
pub(crate) async fn store_reading(pool: &PgPool, reading: &Reading) -> Result<(), sqlx::Error> {
    // ---
    sqlx::query(
        r#"
        INSERT INTO station_readings (
            device_id, application_id, device_address, received_at,
            temperature_c, humidity_pct, pressure_hpa,
            wind_speed_mps, wind_direction_deg, wind_gust_mps,
            rain_accumulation_mm, rain_rate_mm_per_hour,
            light_intensity_lux, uv_index,
            rssi_dbm, snr_db, packet_error_rate
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
        "#,
    )
    .bind(&reading.device_id)
    .bind(&reading.application_id)
    .bind(&reading.device_address)
    .bind(reading.received_at)
    .bind(reading.metrics.temperature_c)
    .bind(reading.metrics.humidity_pct)
    .bind(reading.metrics.pressure_hpa)
    .bind(reading.metrics.wind_speed_mps)
    .bind(reading.metrics.wind_direction_deg)
    .bind(reading.metrics.wind_gust_mps)
    .bind(reading.metrics.rain_accumulation_mm)
    .bind(reading.metrics.rain_rate_mm_per_hour)
    .bind(reading.metrics.light_intensity_lux)
    .bind(reading.metrics.uv_index)
    .bind(reading.signal.rssi_dbm)
    .bind(reading.signal.snr_db)
    .bind(reading.signal.packet_error_rate)
    .execute(pool)
    .await?;

    Ok(())
}

/// Query parameters for filtering returned readings
#[derive(Debug, Deserialize)]
pub struct ReadingsQuery {
    device_id: Option<String>,
    limit: Option<u32>,
}

/// Apply query filters to the freshly ingested readings
fn apply_filters(readings: Vec<Reading>, params: &ReadingsQuery) -> Vec<Reading> {
    // ---
    info!("Apply filter: {:?}", params);
    readings
        .into_iter()
        .filter(|r| {
            params
                .device_id
                .as_ref()
                .map_or(true, |id| &r.device_id == id)
        })
        .take(params.limit.unwrap_or(1000) as usize)
        .collect()
}
