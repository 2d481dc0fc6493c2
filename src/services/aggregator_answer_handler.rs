//! Chainlink AnswerUpdated handler
//!
//! An aggregator answer does not say which synths it prices. The handler asks
//! ExchangeRates (found through the AddressResolver) which currency keys use the
//! aggregator's proxy, then reads the rate of each one as of the event's block.

use alloy::primitives::U256;
use tracing::{debug, info};

use crate::config::RatesConfig;
use crate::models::event::AnswerUpdatedEvent;
use crate::models::rate::{synth_record_id, AggregatorAnswer, CurrencyKey, RateUpdate};
use crate::services::aggregation::handle_snx_prices;
use crate::services::contracts::{ChainReader, ContractCallError};
use crate::services::encoding::{currency_key, symbol_to_string};
use crate::services::indexer::IndexerError;
use crate::services::rate_store::RateStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// Synths written for this answer
    Indexed(Vec<String>),
    /// `currenciesUsingAggregator` reverted; nothing was written
    Reverted,
}

pub async fn handle_aggregator_answer_updated(
    store: &dyn RateStore,
    chain: &dyn ChainReader,
    config: &RatesConfig,
    event: &AnswerUpdatedEvent,
) -> Result<AnswerOutcome, IndexerError> {
    let ctx = &event.context;

    let exchange_rates = chain
        .get_address(
            config.resolver_address,
            currency_key(&config.exchange_rates_name),
            ctx.block_number,
        )
        .await?;

    let proxy = config
        .proxy_for(&event.aggregator)
        .ok_or(IndexerError::UnknownAggregator(event.aggregator))?;

    let currency_keys = match chain
        .currencies_using_aggregator(exchange_rates, proxy, ctx.block_number)
        .await
    {
        Ok(keys) => keys,
        Err(ContractCallError::Reverted(reason)) => {
            debug!(
                tx_hash = %ctx.tx_hash_hex(),
                block = ctx.block_number,
                reason = %reason,
                "currenciesUsingAggregator was reverted"
            );
            return Ok(AnswerOutcome::Reverted);
        }
        Err(e) => return Err(e.into()),
    };

    let mut synths = Vec::with_capacity(currency_keys.len());

    for key in currency_keys {
        let synth = symbol_to_string(key.as_slice());
        if synth.is_empty() {
            continue;
        }

        let rate = chain
            .rate_for_currency(exchange_rates, key, ctx.block_number)
            .await?;
        create_rates(store, config, event, key, &synth, rate).await?;
        synths.push(synth);
    }

    info!(
        tx_hash = %ctx.tx_hash_hex(),
        block = ctx.block_number,
        aggregator = %event.aggregator,
        round_id = %event.round_id,
        answer = %event.current,
        updated_at = %event.updated_at,
        synths = ?synths,
        "Indexed AnswerUpdated"
    );

    Ok(AnswerOutcome::Indexed(synths))
}

async fn create_rates(
    store: &dyn RateStore,
    config: &RatesConfig,
    event: &AnswerUpdatedEvent,
    key: CurrencyKey,
    synth: &str,
    rate: U256,
) -> Result<(), IndexerError> {
    let ctx = &event.context;
    let id = synth_record_id(&ctx.tx_hash, synth);

    let answer = AggregatorAnswer {
        id: id.clone(),
        block: ctx.block_number,
        timestamp: ctx.timestamp,
        currency_key: key,
        synth: synth.to_string(),
        rate,
        round_id: event.round_id,
        aggregator: event.aggregator,
    };
    store.insert_aggregator_answer(&answer).await?;

    store.upsert_latest_rate(synth, rate).await?;

    let update = RateUpdate {
        id,
        block: ctx.block_number,
        timestamp: ctx.timestamp,
        currency_key: key,
        synth: synth.to_string(),
        rate,
    };
    store.insert_rate_update(&update).await?;

    if config.is_snx(synth) {
        handle_snx_prices(store, ctx.timestamp, rate).await?;
    }

    Ok(())
}
