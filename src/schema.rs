//! Database schema management for `stationflow`.
//!
//! Ensures required tables and indexes exist before serving requests.
//! Applied once on startup from `main.rs`.

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create or update the database schema (idempotent).
///
/// Creates the `station_readings` table holding one row per normalized
/// reading. Metric columns are nullable: NULL means "not reported", which
/// is distinct from a measured zero. Safe to call on every startup; no-op
/// if objects already exist.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    // One row per normalized telemetry sample
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS station_readings (
            id                    SERIAL PRIMARY KEY,
            device_id             TEXT        NOT NULL,
            application_id        TEXT        NOT NULL,
            device_address        TEXT        NOT NULL,
            received_at           TIMESTAMPTZ NOT NULL,
            temperature_c         DOUBLE PRECISION,
            humidity_pct          DOUBLE PRECISION,
            pressure_hpa          DOUBLE PRECISION,
            wind_speed_mps        DOUBLE PRECISION,
            wind_direction_deg    DOUBLE PRECISION,
            wind_gust_mps         DOUBLE PRECISION,
            rain_accumulation_mm  DOUBLE PRECISION,
            rain_rate_mm_per_hour DOUBLE PRECISION,
            light_intensity_lux   DOUBLE PRECISION,
            uv_index              DOUBLE PRECISION,
            rssi_dbm              DOUBLE PRECISION,
            snr_db                DOUBLE PRECISION,
            packet_error_rate     DOUBLE PRECISION
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Indexes for the per-device and windowed history queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_station_readings_device_id
            ON station_readings (device_id);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_station_readings_received_at
            ON station_readings (received_at);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
