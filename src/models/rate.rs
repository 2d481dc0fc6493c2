use alloy::primitives::{Address, B256, FixedBytes, U256};
use serde::{Deserialize, Serialize};

/// Fixed-length currency key as stored on chain (e.g., "sETH" zero-padded to 32 bytes)
pub type CurrencyKey = FixedBytes<32>;

/// Id of a raw batch: "<tx hash>-<log index>"
pub fn batch_id(tx_hash: &B256, log_index: u64) -> String {
    format!("{:?}-{}", tx_hash, log_index)
}

/// Id of a per-synth record: "<tx hash>-<synth>"
pub fn synth_record_id(tx_hash: &B256, synth: &str) -> String {
    format!("{:?}-{}", tx_hash, synth)
}

/// One RatesUpdated log, kept verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatesUpdatedRecord {
    pub id: String,
    pub currency_keys: Vec<CurrencyKey>,
    pub new_rates: Vec<U256>,
    pub timestamp: u64,
    pub block: u64,
    pub from: Address,
    pub gas_price: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateUpdate {
    pub id: String,
    pub block: u64,
    pub timestamp: u64,
    pub currency_key: CurrencyKey,
    pub synth: String,
    pub rate: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorAnswer {
    pub id: String,
    pub block: u64,
    pub timestamp: u64,
    pub currency_key: CurrencyKey,
    pub synth: String,
    pub rate: U256,
    pub round_id: U256,
    pub aggregator: Address,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestRate {
    pub synth: String,
    pub rate: U256,
}

/// Width of an SNX price bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Granularity {
    Daily,
    FifteenMinute,
}

impl Granularity {
    pub const ALL: [Granularity; 2] = [Granularity::Daily, Granularity::FifteenMinute];

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Daily => "daily",
            Granularity::FifteenMinute => "fifteen-minute",
        }
    }
}

/// Running count and average of SNX rates observed inside one bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnxPrice {
    pub granularity: Granularity,
    pub id: String,
    pub count: u64,
    pub average_price: U256,
}

impl SnxPrice {
    /// Empty bucket, used the first time a bucket id is observed
    pub fn empty(granularity: Granularity, id: impl Into<String>) -> Self {
        Self {
            granularity,
            id: id.into(),
            count: 0,
            average_price: U256::ZERO,
        }
    }
}
