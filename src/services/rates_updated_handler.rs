//! RatesUpdated batch handler
//!
//! Stores the raw batch, then one RateUpdate per non-empty symbol. SNX rates
//! also feed the time-bucketed averages.

use tracing::{debug, warn};

use crate::config::RatesConfig;
use crate::models::event::RatesUpdatedEvent;
use crate::models::rate::{batch_id, synth_record_id, RateUpdate, RatesUpdatedRecord};
use crate::services::aggregation::handle_snx_prices;
use crate::services::encoding::symbol_to_string;
use crate::services::indexer::IndexerError;
use crate::services::rate_store::{RateStore, StoreError};
use crate::services::units::one_unit;

/// What a batch produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RatesUpdatedOutcome {
    pub rate_updates: usize,
    pub skipped: usize,
}

/// Give every stable-dollar synth a latest rate of 10^18 unless it already has one
pub async fn seed_stable_rates(store: &dyn RateStore, config: &RatesConfig) -> Result<(), StoreError> {
    for synth in &config.stable_synths {
        if store.load_latest_rate(synth).await?.is_none() {
            store.upsert_latest_rate(synth, one_unit()).await?;
            debug!(synth = %synth, "Seeded stable dollar rate");
        }
    }
    Ok(())
}

pub async fn handle_rates_updated(
    store: &dyn RateStore,
    config: &RatesConfig,
    event: &RatesUpdatedEvent,
) -> Result<RatesUpdatedOutcome, IndexerError> {
    let ctx = &event.context;

    seed_stable_rates(store, config).await?;

    let record = RatesUpdatedRecord {
        id: batch_id(&ctx.tx_hash, ctx.log_index),
        currency_keys: event.currency_keys.clone(),
        new_rates: event.new_rates.clone(),
        timestamp: ctx.timestamp,
        block: ctx.block_number,
        from: ctx.from,
        gas_price: ctx.gas_price,
    };
    store.insert_rates_updated(&record).await?;

    if event.currency_keys.len() != event.new_rates.len() {
        warn!(
            tx_hash = %ctx.tx_hash_hex(),
            keys = event.currency_keys.len(),
            rates = event.new_rates.len(),
            "RatesUpdated arrays differ in length, extra entries ignored"
        );
    }

    let mut outcome = RatesUpdatedOutcome::default();

    for (key, rate) in event.currency_keys.iter().zip(event.new_rates.iter()) {
        let synth = symbol_to_string(key.as_slice());
        if synth.is_empty() {
            outcome.skipped += 1;
            continue;
        }

        let update = RateUpdate {
            id: synth_record_id(&ctx.tx_hash, &synth),
            block: ctx.block_number,
            timestamp: ctx.timestamp,
            currency_key: *key,
            synth,
            rate: *rate,
        };
        store.insert_rate_update(&update).await?;

        if config.is_snx(&update.synth) {
            handle_snx_prices(store, ctx.timestamp, update.rate).await?;
        }

        store.upsert_latest_rate(&update.synth, update.rate).await?;
        outcome.rate_updates += 1;
    }

    debug!(
        tx_hash = %ctx.tx_hash_hex(),
        block = ctx.block_number,
        rate_updates = outcome.rate_updates,
        skipped = outcome.skipped,
        "Indexed RatesUpdated"
    );

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::EventContext;
    use crate::services::encoding::currency_key;
    use crate::services::rate_store::InMemoryRateStore;
    use alloy::primitives::{Address, B256, FixedBytes, U256};

    fn event(keys: &[&str], rates: &[u64]) -> RatesUpdatedEvent {
        RatesUpdatedEvent {
            context: EventContext {
                tx_hash: B256::repeat_byte(0xab),
                log_index: 3,
                block_number: 100,
                timestamp: 1_000,
                from: Address::with_last_byte(1),
                gas_price: U256::from(7u64),
            },
            currency_keys: keys.iter().map(|k| currency_key(k)).collect(),
            new_rates: rates.iter().map(|r| U256::from(*r)).collect(),
        }
    }

    #[tokio::test]
    async fn test_seed_does_not_overwrite() {
        let store = InMemoryRateStore::new();
        let config = RatesConfig::default();
        store.upsert_latest_rate("sUSD", U256::from(5u64)).await.unwrap();

        seed_stable_rates(&store, &config).await.unwrap();

        let susd = store.load_latest_rate("sUSD").await.unwrap().unwrap();
        let nusd = store.load_latest_rate("nUSD").await.unwrap().unwrap();
        assert_eq!(susd.rate, U256::from(5u64));
        assert_eq!(nusd.rate, one_unit());
    }

    #[tokio::test]
    async fn test_unequal_arrays_use_shorter_length() {
        let store = InMemoryRateStore::new();
        let config = RatesConfig::default();

        let outcome = handle_rates_updated(&store, &config, &event(&["sETH", "sBTC"], &[10]))
            .await
            .unwrap();

        assert_eq!(outcome.rate_updates, 1);
        assert_eq!(store.rate_update_count(), 1);
        assert!(store.load_latest_rate("sBTC").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_key_is_skipped() {
        let store = InMemoryRateStore::new();
        let config = RatesConfig::default();
        let mut ev = event(&["sETH"], &[10, 20]);
        ev.currency_keys.push(FixedBytes::ZERO);

        let outcome = handle_rates_updated(&store, &config, &ev).await.unwrap();
        assert_eq!(outcome, RatesUpdatedOutcome { rate_updates: 1, skipped: 1 });
    }
}
