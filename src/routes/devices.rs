//! Device management endpoints.
//!
//! A "device" is not stored separately: it is derived from the readings
//! table, where the current view of a station is its most recent reading.
//! Registration therefore inserts a bootstrap reading carrying identity
//! only (all metrics NULL), and deletion removes the station's most recent
//! reading, matching how the dashboard has always managed stations.

use axum::{
    extract::Path, extract::State, http::StatusCode, response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{error, info};

use crate::telemetry::{classify, latest_per_device, DeviceStatus};
use crate::{Config, Metrics, Reading, Signal};

// ---

pub fn router() -> Router<(PgPool, Config)> {
    // ---
    Router::new()
        .route("/api/devices", get(list_devices).post(register_device))
        .route("/api/devices/{device_id}", delete(remove_device))
}

/// One station as shown in the device management table.
#[derive(Debug, Serialize)]
struct DeviceSummary {
    // ---
    device_id: String,
    name: String,
    application_id: String,
    device_address: String,
    last_seen: DateTime<Utc>,
    status: DeviceStatus,
}

/// Handle `GET /api/devices`.
///
/// Lists every known station with its liveness, derived from the most
/// recent stored reading per device. Status is computed fresh against the
/// request's clock and the configured online threshold.
async fn list_devices(State((pool, config)): State<(PgPool, Config)>) -> impl IntoResponse {
    // ---
    let readings = match sqlx::query_as::<_, Reading>(
        r#"
        SELECT * FROM station_readings
        ORDER BY received_at DESC
        LIMIT $1
        "#,
    )
    .bind(i64::from(config.history_fetch_limit))
    .fetch_all(&pool)
    .await
    {
        Ok(readings) => readings,
        Err(e) => {
            error!("Failed to load readings for device list: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json("Failed to load devices"),
            )
                .into_response();
        }
    };

    let now = Utc::now();
    let threshold = i64::from(config.online_threshold_minutes);

    let devices: Vec<DeviceSummary> = latest_per_device(readings)
        .into_iter()
        .map(|r| DeviceSummary {
            name: display_name(&r.device_id),
            status: classify(Some(r.received_at), now, threshold),
            device_id: r.device_id,
            application_id: r.application_id,
            device_address: r.device_address,
            last_seen: r.received_at,
        })
        .collect();

    info!("Returning {} devices", devices.len());
    (StatusCode::OK, Json(devices)).into_response()
}

// ---

/// Request body for `POST /api/devices`.
#[derive(Debug, Deserialize)]
struct RegisterDeviceRequest {
    // ---
    device_id: String,
    application_id: String,
    device_address: Option<String>,
}

#[derive(Debug, Serialize)]
struct RegisterDeviceResponse {
    device_id: String,
}

/// Handle `POST /api/devices`.
///
/// Registers a new station by inserting a bootstrap reading stamped now.
/// The bootstrap carries no metric values; a station that has never
/// reported must not look like one that measured zeroes everywhere.
async fn register_device(
    State((pool, _config)): State<(PgPool, Config)>,
    Json(request): Json<RegisterDeviceRequest>,
) -> impl IntoResponse {
    // ---
    if request.device_id.is_empty() {
        return (StatusCode::BAD_REQUEST, Json("Device ID is required")).into_response();
    }
    if request.application_id.is_empty() {
        return (StatusCode::BAD_REQUEST, Json("Application ID is required")).into_response();
    }

    let device_address = request
        .device_address
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| request.device_id.clone());

    let bootstrap = Reading {
        device_id: request.device_id.clone(),
        application_id: request.application_id,
        device_address,
        received_at: Utc::now(),
        metrics: Metrics::default(),
        signal: Signal::default(),
    };

    if let Err(e) = super::readings::store_reading(&pool, &bootstrap).await {
        error!("Failed to register device {}: {}", request.device_id, e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json("Failed to register device"),
        )
            .into_response();
    }

    info!("Registered device {}", request.device_id);
    (
        StatusCode::CREATED,
        Json(RegisterDeviceResponse {
            device_id: request.device_id,
        }),
    )
        .into_response()
}

/// Handle `DELETE /api/devices/{device_id}`.
///
/// Removes the station's most recent reading. 404 when the station has no
/// stored readings at all.
async fn remove_device(
    Path(device_id): Path<String>,
    State((pool, _config)): State<(PgPool, Config)>,
) -> impl IntoResponse {
    // ---
    let result = sqlx::query(
        r#"
        DELETE FROM station_readings
        WHERE id = (
            SELECT id FROM station_readings
            WHERE device_id = $1
            ORDER BY received_at DESC
            LIMIT 1
        )
        "#,
    )
    .bind(&device_id)
    .execute(&pool)
    .await;

    match result {
        Ok(done) if done.rows_affected() == 0 => {
            (StatusCode::NOT_FOUND, Json("Device not found")).into_response()
        }
        Ok(_) => {
            info!("Deleted most recent reading for device {}", device_id);
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => {
            error!("Failed to delete device {}: {}", device_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json("Failed to delete device"),
            )
                .into_response()
        }
    }
}

// ---

/// Display name shown in the dashboard: the station id's last four
/// characters make the human-facing suffix.
fn display_name(device_id: &str) -> String {
    // ---
    let suffix: String = device_id
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("Weather Station {suffix}")
}
