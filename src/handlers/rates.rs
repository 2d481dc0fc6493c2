use alloy::primitives::U256;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::models::rate::{AggregatorAnswer, Granularity, RateUpdate, SnxPrice};
use crate::models::response::{
    AggregatorAnswerResponse, ErrorResponse, LatestRateResponse, RateUpdateResponse,
    SnxPriceResponse, UsdValueQuery, UsdValueResponse,
};
use crate::services::rate_store::{self, StoreError};
use crate::services::units::{
    parse_u256, to_decimal, usd_amount_from_asset_amount, DEFAULT_DECIMALS,
};
use crate::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn not_found(message: String) -> ApiError {
    (StatusCode::NOT_FOUND, Json(ErrorResponse { error: message }))
}

fn store_error(e: StoreError) -> ApiError {
    tracing::error!("Store error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

pub async fn health() -> &'static str {
    "ok"
}

async fn latest_rate_or_404(state: &AppState, synth: &str) -> Result<U256, ApiError> {
    rate_store::get_latest_rate(state.store.as_ref(), synth, None)
        .await
        .map_err(store_error)?
        .ok_or_else(|| not_found(format!("No rate recorded for {}", synth)))
}

pub async fn get_latest_rate(
    State(state): State<AppState>,
    Path(synth): Path<String>,
) -> Result<Json<LatestRateResponse>, ApiError> {
    let rate = latest_rate_or_404(&state, &synth).await?;

    let rate_decimal = match to_decimal(rate, DEFAULT_DECIMALS) {
        Ok(decimal) => Some(decimal.to_string()),
        Err(e) => {
            tracing::warn!(synth = %synth, error = %e, "Rate has no decimal form");
            None
        }
    };

    Ok(Json(LatestRateResponse {
        synth,
        rate: rate.to_string(),
        rate_decimal,
    }))
}

/// USD value of `amount` base units of `synth` at its latest rate
pub async fn get_usd_value(
    State(state): State<AppState>,
    Path(synth): Path<String>,
    Query(query): Query<UsdValueQuery>,
) -> Result<Json<UsdValueResponse>, ApiError> {
    let amount = parse_u256(&query.amount).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
    })?;

    let rate = latest_rate_or_404(&state, &synth).await?;

    let usd_value = usd_amount_from_asset_amount(amount, rate).map_err(|e| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
    })?;

    Ok(Json(UsdValueResponse {
        synth,
        amount: amount.to_string(),
        rate: rate.to_string(),
        usd_value: usd_value.to_string(),
    }))
}

fn snx_price_response(price: SnxPrice) -> SnxPriceResponse {
    SnxPriceResponse {
        id: price.id,
        granularity: price.granularity.as_str().to_string(),
        count: price.count,
        average_price: price.average_price.to_string(),
    }
}

async fn load_snx_price(
    state: &AppState,
    granularity: Granularity,
    id: &str,
) -> Result<Json<SnxPriceResponse>, ApiError> {
    state
        .store
        .load_snx_price(granularity, id)
        .await
        .map_err(store_error)?
        .map(|price| Json(snx_price_response(price)))
        .ok_or_else(|| not_found(format!("No {} SNX price for bucket {}", granularity.as_str(), id)))
}

pub async fn get_daily_snx_price(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SnxPriceResponse>, ApiError> {
    load_snx_price(&state, Granularity::Daily, &id).await
}

pub async fn get_fifteen_minute_snx_price(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SnxPriceResponse>, ApiError> {
    load_snx_price(&state, Granularity::FifteenMinute, &id).await
}

impl From<RateUpdate> for RateUpdateResponse {
    fn from(record: RateUpdate) -> Self {
        Self {
            id: record.id,
            block: record.block,
            timestamp: record.timestamp,
            currency_key: format!("{:?}", record.currency_key),
            synth: record.synth,
            rate: record.rate.to_string(),
        }
    }
}

impl From<AggregatorAnswer> for AggregatorAnswerResponse {
    fn from(record: AggregatorAnswer) -> Self {
        Self {
            id: record.id,
            block: record.block,
            timestamp: record.timestamp,
            currency_key: format!("{:?}", record.currency_key),
            synth: record.synth,
            rate: record.rate.to_string(),
            round_id: record.round_id.to_string(),
            aggregator: format!("{:?}", record.aggregator),
        }
    }
}

pub async fn get_rate_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RateUpdateResponse>, ApiError> {
    state
        .store
        .load_rate_update(&id)
        .await
        .map_err(store_error)?
        .map(|record| Json(record.into()))
        .ok_or_else(|| not_found(format!("Rate update {} not found", id)))
}

pub async fn get_aggregator_answer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AggregatorAnswerResponse>, ApiError> {
    state
        .store
        .load_aggregator_answer(&id)
        .await
        .map_err(store_error)?
        .map(|record| Json(record.into()))
        .ok_or_else(|| not_found(format!("Aggregator answer {} not found", id)))
}
