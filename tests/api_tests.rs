mod common;

use std::sync::Arc;

use alloy::primitives::U256;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use exchange_rates_indexer::models::event::RateEvent;
use exchange_rates_indexer::models::rate::synth_record_id;
use exchange_rates_indexer::services::rate_store::{InMemoryRateStore, RateStore};
use exchange_rates_indexer::{build_router, AppState};
use serde_json::Value;
use tower::ServiceExt;

use crate::common::{
    answer_updated, build_indexer, rates_updated, tx_hash, units, MockChainReader, AGGREGATOR,
    PROXY,
};

async fn indexed_router() -> Router {
    let chain = MockChainReader::new()
        .with_currencies(PROXY, &["sEUR"])
        .with_rate("sEUR", units(1));
    let (store, _, indexer) = build_indexer(chain);

    indexer
        .index(&RateEvent::RatesUpdated(rates_updated(
            0x40,
            1_000,
            &[("sETH", units(2_000)), ("SNX", units(3))],
        )))
        .await
        .unwrap();
    indexer
        .index(&RateEvent::AnswerUpdated(answer_updated(0x41, AGGREGATOR, 9)))
        .await
        .unwrap();

    build_router(AppState { store })
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health() {
    let app = build_router(AppState {
        store: Arc::new(InMemoryRateStore::new()),
    });

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_get_latest_rate() {
    let (status, json) = get_json(indexed_router().await, "/rates/latest/sETH").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["synth"], "sETH");
    assert_eq!(json["rate"], "2000000000000000000000");
    assert_eq!(json["rateDecimal"], "2000");
}

#[tokio::test]
async fn test_get_latest_rate_seeded_stable_dollar() {
    let (status, json) = get_json(indexed_router().await, "/rates/latest/nUSD").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["rate"], "1000000000000000000");
    assert_eq!(json["rateDecimal"], "1");
}

#[tokio::test]
async fn test_get_latest_rate_without_decimal_form() {
    let store = Arc::new(InMemoryRateStore::new());
    store.upsert_latest_rate("sHUGE", U256::MAX).await.unwrap();
    let app = build_router(AppState { store });

    let (status, json) = get_json(app, "/rates/latest/sHUGE").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["rate"], U256::MAX.to_string());
    assert!(json.get("rateDecimal").is_none());
}

#[tokio::test]
async fn test_get_usd_value_of_large_amount() {
    let uri = format!(
        "/rates/usd-value/nUSD?amount={}",
        U256::from(10u64).pow(U256::from(29u64))
    );
    let (status, json) = get_json(indexed_router().await, &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["usdValue"], "100000000000");
}

#[tokio::test]
async fn test_get_latest_rate_missing_is_404() {
    let (status, json) = get_json(indexed_router().await, "/rates/latest/sXAU").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("sXAU"));
}

#[tokio::test]
async fn test_get_usd_value() {
    let uri = format!("/rates/usd-value/sETH?amount={}", units(1) / 2);
    let (status, json) = get_json(indexed_router().await, &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["usdValue"], "1000");
    assert_eq!(json["amount"], "500000000000000000");
}

#[tokio::test]
async fn test_get_usd_value_rejects_bad_amount() {
    let (status, _) = get_json(indexed_router().await, "/rates/usd-value/sETH?amount=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_snx_prices() {
    let app = indexed_router().await;

    let (status, json) = get_json(app.clone(), "/snx-prices/daily/0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["granularity"], "daily");
    assert_eq!(json["count"], 1);
    assert_eq!(json["averagePrice"], U256::from(units(3)).to_string());

    let (status, json) = get_json(app.clone(), "/snx-prices/fifteen-minute/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], "1");

    let (status, _) = get_json(app, "/snx-prices/fifteen-minute/2").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_rate_update_and_aggregator_answer() {
    let app = indexed_router().await;

    let update_id = synth_record_id(&tx_hash(0x40), "sETH");
    let (status, json) = get_json(app.clone(), &format!("/rate-updates/{}", update_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["synth"], "sETH");
    assert_eq!(json["block"], 100);

    let answer_id = synth_record_id(&tx_hash(0x41), "sEUR");
    let (status, json) = get_json(app.clone(), &format!("/aggregator-answers/{}", answer_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["roundId"], "9");
    assert_eq!(json["aggregator"], format!("{:?}", AGGREGATOR));

    let (status, _) = get_json(app, "/aggregator-answers/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
