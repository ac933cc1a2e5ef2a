//! Historical data endpoints: windowed bucket aggregation for the charts
//! and 24h trend percentages for the overview cards.
//!
//! Handlers validate user-supplied ranges *before* invoking the telemetry
//! core, whose window filter assumes a pre-validated range. The
//! database narrows the candidate set by timestamp; exact window bounds,
//! device filtering, and bucketing all happen in the pure core with one
//! `Utc::now()` snapshot per request.

use std::collections::BTreeMap;

use axum::{
    extract::Query, extract::State, http::StatusCode, response::IntoResponse, response::Response,
    routing::get, Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{error, info};

use crate::telemetry::{
    aggregate, compute_trend, reference_value, select_window, Bucket, Window, ALL_DEVICES,
};
use crate::{Config, Metric, Reading};

// ---

pub fn router() -> Router<(PgPool, Config)> {
    // ---
    Router::new()
        .route("/api/history", get(history_handler))
        .route("/api/trends", get(trends_handler))
}

/// Query parameters shared by `/api/history` and `/api/history/export`.
#[derive(Debug, Deserialize)]
pub(crate) struct HistoryQuery {
    // ---
    /// `day` (default), `week`, `month`, or `custom`.
    pub range: Option<String>,
    /// Custom range start date, `YYYY-MM-DD`. Required when `range=custom`.
    pub start: Option<String>,
    /// Custom range end date, `YYYY-MM-DD`. Inclusive of the whole day.
    pub end: Option<String>,
    /// Station to chart; omitted or `all` means every station.
    pub device_id: Option<String>,
}

impl HistoryQuery {
    pub(crate) fn device_id(&self) -> &str {
        self.device_id.as_deref().unwrap_or(ALL_DEVICES)
    }
}

/// Translate query parameters into a [`Window`], rejecting invalid custom
/// ranges so the core never sees one.
pub(crate) fn build_window(params: &HistoryQuery) -> Result<Window, String> {
    // ---
    match params.range.as_deref().unwrap_or("day") {
        "day" => Ok(Window::Day),
        "week" => Ok(Window::Week),
        "month" => Ok(Window::Month),
        "custom" => {
            let start = parse_date(params.start.as_deref(), "start")?;
            let end = parse_date(params.end.as_deref(), "end")?;
            if start > end {
                return Err("Start date must be before end date".to_string());
            }
            Ok(Window::Custom { start, end })
        }
        other => Err(format!("Unknown range '{other}'")),
    }
}

fn parse_date(raw: Option<&str>, which: &str) -> Result<DateTime<Utc>, String> {
    // ---
    let raw = raw.ok_or_else(|| format!("Missing {which} date for custom range"))?;
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| format!("Invalid {which} date '{raw}', expected YYYY-MM-DD"))?;
    match date.and_hms_opt(0, 0, 0) {
        Some(t) => Ok(t.and_utc()),
        None => Err(format!("Invalid {which} date '{raw}'")),
    }
}

/// Load the candidate readings for a window from the database. The exact
/// inclusive bounds are re-applied by the core; this query only narrows
/// the rows that travel to the application.
pub(crate) async fn load_window_readings(
    pool: &PgPool,
    config: &Config,
    window: &Window,
    now: DateTime<Utc>,
) -> Result<Vec<Reading>, sqlx::Error> {
    // ---
    let (start, end) = window.bounds(now);
    sqlx::query_as::<_, Reading>(
        r#"
        SELECT * FROM station_readings
        WHERE received_at >= $1 AND received_at <= $2
        ORDER BY received_at ASC
        LIMIT $3
        "#,
    )
    .bind(start)
    .bind(end)
    .bind(i64::from(config.history_fetch_limit))
    .fetch_all(pool)
    .await
}

/// Select + aggregate one window's readings into chart buckets.
pub(crate) async fn aggregate_window(
    pool: &PgPool,
    config: &Config,
    params: &HistoryQuery,
    now: DateTime<Utc>,
) -> Result<Vec<Bucket>, Response> {
    // ---
    let window = match build_window(params) {
        Ok(window) => window,
        Err(message) => return Err((StatusCode::BAD_REQUEST, Json(message)).into_response()),
    };

    let readings = match load_window_readings(pool, config, &window, now).await {
        Ok(readings) => readings,
        Err(e) => {
            error!("Failed to load readings for history query: {}", e);
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json("Failed to load history".to_string()),
            )
                .into_response());
        }
    };

    let windowed = select_window(readings, &window, params.device_id(), now);
    Ok(aggregate(&windowed, &window, now))
}

/// Handle `GET /api/history`.
///
/// Returns time-ordered aggregation buckets for the requested window and
/// station, ready for the charting frontend.
async fn history_handler(
    Query(params): Query<HistoryQuery>,
    State((pool, config)): State<(PgPool, Config)>,
) -> impl IntoResponse {
    // ---
    info!("GET /api/history - {:?}", params);

    let now = Utc::now();
    match aggregate_window(&pool, &config, &params, now).await {
        Ok(buckets) => {
            info!("Returning {} buckets", buckets.len());
            (StatusCode::OK, Json(buckets)).into_response()
        }
        Err(response) => response,
    }
}

// ---

#[derive(Debug, Deserialize)]
struct TrendsQuery {
    device_id: String,
}

/// Percentage change of each charted metric versus ~24h prior, keyed by
/// metric name. `null` means "trend unavailable" and renders as no
/// indicator.
#[derive(Debug, Serialize)]
struct TrendsResponse {
    // ---
    device_id: String,
    trends: BTreeMap<&'static str, Option<f64>>,
}

/// Handle `GET /api/trends`.
///
/// Compares the station's latest reading against the reading closest to
/// 24 hours ago, per metric.
async fn trends_handler(
    Query(params): Query<TrendsQuery>,
    State((pool, config)): State<(PgPool, Config)>,
) -> impl IntoResponse {
    // ---
    info!("GET /api/trends - device {}", params.device_id);

    let readings = match sqlx::query_as::<_, Reading>(
        r#"
        SELECT * FROM station_readings
        WHERE device_id = $1
        ORDER BY received_at DESC
        LIMIT $2
        "#,
    )
    .bind(&params.device_id)
    .bind(i64::from(config.history_fetch_limit))
    .fetch_all(&pool)
    .await
    {
        Ok(readings) => readings,
        Err(e) => {
            error!("Failed to load readings for trends: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json("Failed to load trends"),
            )
                .into_response();
        }
    };

    let now = Utc::now();
    let latest = readings.first();

    let trends = Metric::CHARTED
        .iter()
        .map(|&metric| {
            let current = latest.and_then(|r| metric.value(&r.metrics));
            let trend = compute_trend(current, reference_value(&readings, metric, now));
            (metric.name(), trend)
        })
        .collect();

    let response = TrendsResponse {
        device_id: params.device_id,
        trends,
    };

    (StatusCode::OK, Json(response)).into_response()
}
