#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::{Address, B256, FixedBytes, I256, U256};
use async_trait::async_trait;
use parking_lot::Mutex;

use exchange_rates_indexer::config::RatesConfig;
use exchange_rates_indexer::models::event::{AnswerUpdatedEvent, EventContext, RatesUpdatedEvent};
use exchange_rates_indexer::models::rate::CurrencyKey;
use exchange_rates_indexer::services::contracts::{ChainReader, ContractCallError};
use exchange_rates_indexer::services::encoding::currency_key;
use exchange_rates_indexer::services::indexer::RatesIndexer;
use exchange_rates_indexer::services::rate_store::InMemoryRateStore;

pub const RESOLVER: Address = Address::new([0x01; 20]);
pub const EXCHANGE_RATES: Address = Address::new([0x02; 20]);
pub const AGGREGATOR: Address = Address::new([0xa1; 20]);
pub const PROXY: Address = Address::new([0xb1; 20]);

/// Scripted [`ChainReader`]
#[derive(Default)]
pub struct MockChainReader {
    pub currencies: HashMap<Address, Vec<CurrencyKey>>,
    pub rates: HashMap<CurrencyKey, U256>,
    /// When set, `currenciesUsingAggregator` reverts for every proxy
    pub revert_currencies: bool,
    /// Number of upcoming `rateForCurrency` calls that fail with a provider error
    pub failing_rate_calls: Mutex<usize>,
    pub calls: Mutex<Vec<String>>,
    /// Block of every call, in call order
    pub blocks: Mutex<Vec<u64>>,
}

impl MockChainReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_currencies(mut self, proxy: Address, synths: &[&str]) -> Self {
        self.currencies
            .insert(proxy, synths.iter().map(|s| currency_key(s)).collect());
        self
    }

    pub fn with_raw_currencies(mut self, proxy: Address, keys: Vec<CurrencyKey>) -> Self {
        self.currencies.insert(proxy, keys);
        self
    }

    pub fn with_rate(mut self, synth: &str, rate: u128) -> Self {
        self.rates.insert(currency_key(synth), U256::from(rate));
        self
    }

    pub fn reverting(mut self) -> Self {
        self.revert_currencies = true;
        self
    }

    pub fn failing_rate_calls(self, count: usize) -> Self {
        *self.failing_rate_calls.lock() = count;
        self
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == name).count()
    }

    pub fn call_blocks(&self) -> Vec<u64> {
        self.blocks.lock().clone()
    }

    fn record(&self, name: &str, block: u64) {
        self.calls.lock().push(name.to_string());
        self.blocks.lock().push(block);
    }
}

#[async_trait]
impl ChainReader for MockChainReader {
    async fn get_address(
        &self,
        resolver: Address,
        _name: FixedBytes<32>,
        block: u64,
    ) -> Result<Address, ContractCallError> {
        self.record("getAddress", block);
        if resolver != RESOLVER {
            return Err(ContractCallError::ProviderError("unknown resolver".to_string()));
        }
        Ok(EXCHANGE_RATES)
    }

    async fn currencies_using_aggregator(
        &self,
        exchange_rates: Address,
        aggregator: Address,
        block: u64,
    ) -> Result<Vec<CurrencyKey>, ContractCallError> {
        self.record("currenciesUsingAggregator", block);
        assert_eq!(exchange_rates, EXCHANGE_RATES);
        if self.revert_currencies {
            return Err(ContractCallError::Reverted("execution reverted".to_string()));
        }
        Ok(self.currencies.get(&aggregator).cloned().unwrap_or_default())
    }

    async fn rate_for_currency(
        &self,
        exchange_rates: Address,
        currency_key: CurrencyKey,
        block: u64,
    ) -> Result<U256, ContractCallError> {
        self.record("rateForCurrency", block);
        assert_eq!(exchange_rates, EXCHANGE_RATES);
        {
            let mut failing = self.failing_rate_calls.lock();
            if *failing > 0 {
                *failing -= 1;
                return Err(ContractCallError::ProviderError("limit exceeded".to_string()));
            }
        }
        Ok(self.rates.get(&currency_key).copied().unwrap_or_default())
    }
}

pub fn test_config() -> RatesConfig {
    RatesConfig::default()
        .with_resolver_address(RESOLVER)
        .with_aggregator_proxies(HashMap::from([(AGGREGATOR, PROXY)]))
}

pub fn build_indexer(chain: MockChainReader) -> (Arc<InMemoryRateStore>, Arc<MockChainReader>, RatesIndexer) {
    let store = Arc::new(InMemoryRateStore::new());
    let chain = Arc::new(chain);
    let indexer = RatesIndexer::new(store.clone(), chain.clone(), Arc::new(test_config()));
    (store, chain, indexer)
}

pub fn tx_hash(byte: u8) -> B256 {
    B256::repeat_byte(byte)
}

pub fn context(tx: u8, block_number: u64, timestamp: u64) -> EventContext {
    EventContext {
        tx_hash: tx_hash(tx),
        log_index: 0,
        block_number,
        timestamp,
        from: Address::with_last_byte(0xee),
        gas_price: U256::from(20_000_000_000u64),
    }
}

pub fn rates_updated(tx: u8, timestamp: u64, entries: &[(&str, u128)]) -> RatesUpdatedEvent {
    RatesUpdatedEvent {
        context: context(tx, 100, timestamp),
        currency_keys: entries.iter().map(|(s, _)| currency_key(s)).collect(),
        new_rates: entries.iter().map(|(_, r)| U256::from(*r)).collect(),
    }
}

/// Block of every [`answer_updated`] fixture
pub const ANSWER_BLOCK: u64 = 200;

pub fn answer_updated(tx: u8, aggregator: Address, round_id: u64) -> AnswerUpdatedEvent {
    AnswerUpdatedEvent {
        context: context(tx, ANSWER_BLOCK, 1_700_000_000),
        aggregator,
        current: I256::ZERO,
        round_id: U256::from(round_id),
        updated_at: U256::from(1_700_000_000u64),
    }
}

/// `n` whole units at 18 decimals
pub fn units(n: u128) -> u128 {
    n * 1_000_000_000_000_000_000
}
