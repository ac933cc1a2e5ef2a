//! CSV export of aggregated history buckets.
//!
//! Same selection as `/api/history`, rendered as a downloadable CSV. The
//! exporter owns column order, headers, and decimal formatting; the core
//! hands it raw bucket values. Metrics a bucket never saw are left as
//! empty cells rather than zeroes.

use axum::{
    extract::Query,
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::Utc;
use sqlx::PgPool;
use tracing::info;

use crate::telemetry::Bucket;
use crate::Config;

use super::history::{aggregate_window, HistoryQuery};

// ---

pub fn router() -> Router<(PgPool, Config)> {
    // ---
    Router::new().route("/api/history/export", get(handler))
}

/// Handle `GET /api/history/export`.
///
/// Streams the aggregated buckets as `text/csv` with a dated download
/// filename, one row per bucket.
async fn handler(
    Query(params): Query<HistoryQuery>,
    State((pool, config)): State<(PgPool, Config)>,
) -> impl IntoResponse {
    // ---
    info!("GET /api/history/export - {:?}", params);

    let now = Utc::now();
    let range = params.range.clone().unwrap_or_else(|| "day".to_string());

    let buckets = match aggregate_window(&pool, &config, &params, now).await {
        Ok(buckets) => buckets,
        Err(response) => return response,
    };

    let csv = render_csv(&buckets);
    let filename = format!("weather_data_{}_{}.csv", range, now.format("%Y-%m-%d"));

    info!("Exporting {} buckets as {}", buckets.len(), filename);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        csv,
    )
        .into_response()
}

// ---

/// Render buckets as CSV: header row, then one row per bucket in the
/// aggregator's (ascending) order.
fn render_csv(buckets: &[Bucket]) -> String {
    // ---
    let mut lines = Vec::with_capacity(buckets.len() + 1);
    lines.push(
        "bucket,samples,temperature_c,humidity_pct,pressure_hpa,wind_speed_mps,rain_mm"
            .to_string(),
    );

    for bucket in buckets {
        lines.push(
            [
                bucket.key.clone(),
                bucket.sample_count.to_string(),
                cell(bucket.metrics.temperature_c, 1),
                cell(bucket.metrics.humidity_pct, 0),
                cell(bucket.metrics.pressure_hpa, 1),
                cell(bucket.metrics.wind_speed_mps, 1),
                cell(bucket.metrics.rain_accumulation_mm, 2),
            ]
            .join(","),
        );
    }

    lines.join("\n")
}

fn cell(value: Option<f64>, decimals: usize) -> String {
    // ---
    match value {
        Some(v) => format!("{v:.decimals$}"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::Metrics;
    use chrono::TimeZone;

    #[test]
    fn csv_has_header_and_formats_by_column() {
        // ---
        let buckets = vec![Bucket {
            key: "2026-03-26 08:00".to_string(),
            representative_time: Utc.with_ymd_and_hms(2026, 3, 26, 8, 0, 0).unwrap(),
            sample_count: 3,
            metrics: Metrics {
                temperature_c: Some(15.25),
                humidity_pct: Some(61.4),
                rain_accumulation_mm: Some(1.5),
                ..Metrics::default()
            },
        }];

        let csv = render_csv(&buckets);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "bucket,samples,temperature_c,humidity_pct,pressure_hpa,wind_speed_mps,rain_mm"
        );
        // Missing pressure/wind stay empty, not zero
        assert_eq!(lines.next().unwrap(), "2026-03-26 08:00,3,15.2,61,,,1.50");
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn empty_bucket_list_exports_header_only() {
        // ---
        assert_eq!(
            render_csv(&[]),
            "bucket,samples,temperature_c,humidity_pct,pressure_hpa,wind_speed_mps,rain_mm"
        );
    }
}
