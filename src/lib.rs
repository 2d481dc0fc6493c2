// src/lib.rs

use std::sync::Arc;

use axum::{routing::get, Router};
use services::rate_store::RateStore;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RateStore>,
}

pub mod entities {
    pub mod prelude;
    pub mod aggregator_answers;
    pub mod daily_snx_prices;
    pub mod fifteen_minute_snx_prices;
    pub mod latest_rates;
    pub mod rate_updates;
    pub mod rates_updated;
    pub mod sync_status;
}

pub mod services {
    pub mod aggregation;
    pub mod aggregator_answer_handler;
    pub mod contracts;
    pub mod db_store;
    pub mod encoding;
    pub mod indexer;
    pub mod rate_events;
    pub mod rate_store;
    pub mod rates_updated_handler;
    pub mod sync_status;
    pub mod units;
}

pub mod handlers {
    pub mod rates;
}

pub mod config;
pub mod jobs;
pub mod models;

/// HTTP routes over the indexed rate data
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::rates::health))
        .route("/rates/latest/{synth}", get(handlers::rates::get_latest_rate))
        .route("/rates/usd-value/{synth}", get(handlers::rates::get_usd_value))
        .route("/snx-prices/daily/{id}", get(handlers::rates::get_daily_snx_price))
        .route(
            "/snx-prices/fifteen-minute/{id}",
            get(handlers::rates::get_fifteen_minute_snx_price),
        )
        .route("/rate-updates/{id}", get(handlers::rates::get_rate_update))
        .route(
            "/aggregator-answers/{id}",
            get(handlers::rates::get_aggregator_answer),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
