use axum::Router;
use sqlx::PgPool;

use crate::Config;

mod devices;
mod export;
mod health;
mod history;
mod readings;

// ---

pub fn router(pool: PgPool, config: Config) -> Router {
    // ---
    Router::new()
        .merge(readings::router())
        .merge(devices::router())
        .merge(history::router())
        .merge(export::router())
        .merge(health::router())
        .with_state((pool, config))
}
