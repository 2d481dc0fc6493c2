//! Rate Store
//!
//! Typed load/upsert access to the indexed entities. Every save is keyed by a
//! deterministic id, so replaying an event overwrites rows in place instead of
//! duplicating them.
//!
//! Two backends implement [`RateStore`]: [`crate::services::db_store::SeaOrmRateStore`]
//! for PostgreSQL and [`InMemoryRateStore`] for tests and dry runs.

use std::collections::HashMap;

use alloy::primitives::U256;
use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::error;

use crate::models::rate::{
    AggregatorAnswer, Granularity, LatestRate, RateUpdate, RatesUpdatedRecord, SnxPrice,
};

#[derive(Debug)]
pub enum StoreError {
    DatabaseError(String),
    /// A stored row could not be decoded back into its typed form
    CorruptRecord(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            StoreError::CorruptRecord(msg) => write!(f, "Corrupt record: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sea_orm::DbErr> for StoreError {
    fn from(err: sea_orm::DbErr) -> Self {
        StoreError::DatabaseError(err.to_string())
    }
}

#[async_trait]
pub trait RateStore: Send + Sync {
    async fn insert_rates_updated(&self, record: &RatesUpdatedRecord) -> Result<(), StoreError>;

    async fn insert_rate_update(&self, record: &RateUpdate) -> Result<(), StoreError>;

    async fn insert_aggregator_answer(&self, record: &AggregatorAnswer) -> Result<(), StoreError>;

    async fn load_latest_rate(&self, synth: &str) -> Result<Option<LatestRate>, StoreError>;

    /// Overwrite the latest rate of `synth`
    async fn upsert_latest_rate(&self, synth: &str, rate: U256) -> Result<(), StoreError>;

    async fn load_snx_price(
        &self,
        granularity: Granularity,
        id: &str,
    ) -> Result<Option<SnxPrice>, StoreError>;

    async fn upsert_snx_price(&self, price: &SnxPrice) -> Result<(), StoreError>;

    async fn load_rates_updated(&self, id: &str)
    -> Result<Option<RatesUpdatedRecord>, StoreError>;

    async fn load_rate_update(&self, id: &str) -> Result<Option<RateUpdate>, StoreError>;

    async fn load_aggregator_answer(&self, id: &str)
    -> Result<Option<AggregatorAnswer>, StoreError>;
}

/// Latest rate of `synth`, or `None` (logged with the requesting transaction, if
/// any) when no rate was ever recorded
pub async fn get_latest_rate(
    store: &dyn RateStore,
    synth: &str,
    tx_hash: Option<&str>,
) -> Result<Option<U256>, StoreError> {
    match store.load_latest_rate(synth).await? {
        Some(latest) => Ok(Some(latest.rate)),
        None => {
            error!(
                synth = %synth,
                tx_hash = tx_hash.unwrap_or("-"),
                "Latest rate missing for synth"
            );
            Ok(None)
        }
    }
}

#[derive(Default)]
struct Tables {
    rates_updated: HashMap<String, RatesUpdatedRecord>,
    rate_updates: HashMap<String, RateUpdate>,
    aggregator_answers: HashMap<String, AggregatorAnswer>,
    latest_rates: HashMap<String, U256>,
    snx_prices: HashMap<(Granularity, String), SnxPrice>,
}

/// Map-backed store with the same overwrite semantics as the database
#[derive(Default)]
pub struct InMemoryRateStore {
    tables: RwLock<Tables>,
}

impl InMemoryRateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rate_update_count(&self) -> usize {
        self.tables.read().rate_updates.len()
    }

    pub fn aggregator_answer_count(&self) -> usize {
        self.tables.read().aggregator_answers.len()
    }

    pub fn rates_updated_count(&self) -> usize {
        self.tables.read().rates_updated.len()
    }

    pub fn snx_price_count(&self) -> usize {
        self.tables.read().snx_prices.len()
    }

    /// All latest rates, sorted by synth
    pub fn latest_rates(&self) -> Vec<LatestRate> {
        let tables = self.tables.read();
        let mut rates: Vec<LatestRate> = tables
            .latest_rates
            .iter()
            .map(|(synth, rate)| LatestRate {
                synth: synth.clone(),
                rate: *rate,
            })
            .collect();
        rates.sort_by(|a, b| a.synth.cmp(&b.synth));
        rates
    }
}

#[async_trait]
impl RateStore for InMemoryRateStore {
    async fn insert_rates_updated(&self, record: &RatesUpdatedRecord) -> Result<(), StoreError> {
        self.tables
            .write()
            .rates_updated
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn insert_rate_update(&self, record: &RateUpdate) -> Result<(), StoreError> {
        self.tables
            .write()
            .rate_updates
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn insert_aggregator_answer(&self, record: &AggregatorAnswer) -> Result<(), StoreError> {
        self.tables
            .write()
            .aggregator_answers
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn load_latest_rate(&self, synth: &str) -> Result<Option<LatestRate>, StoreError> {
        Ok(self
            .tables
            .read()
            .latest_rates
            .get(synth)
            .map(|rate| LatestRate {
                synth: synth.to_string(),
                rate: *rate,
            }))
    }

    async fn upsert_latest_rate(&self, synth: &str, rate: U256) -> Result<(), StoreError> {
        self.tables
            .write()
            .latest_rates
            .insert(synth.to_string(), rate);
        Ok(())
    }

    async fn load_snx_price(
        &self,
        granularity: Granularity,
        id: &str,
    ) -> Result<Option<SnxPrice>, StoreError> {
        Ok(self
            .tables
            .read()
            .snx_prices
            .get(&(granularity, id.to_string()))
            .cloned())
    }

    async fn upsert_snx_price(&self, price: &SnxPrice) -> Result<(), StoreError> {
        self.tables
            .write()
            .snx_prices
            .insert((price.granularity, price.id.clone()), price.clone());
        Ok(())
    }

    async fn load_rates_updated(
        &self,
        id: &str,
    ) -> Result<Option<RatesUpdatedRecord>, StoreError> {
        Ok(self.tables.read().rates_updated.get(id).cloned())
    }

    async fn load_rate_update(&self, id: &str) -> Result<Option<RateUpdate>, StoreError> {
        Ok(self.tables.read().rate_updates.get(id).cloned())
    }

    async fn load_aggregator_answer(
        &self,
        id: &str,
    ) -> Result<Option<AggregatorAnswer>, StoreError> {
        Ok(self.tables.read().aggregator_answers.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_latest_rate_overwrites() {
        let store = InMemoryRateStore::new();
        store.upsert_latest_rate("sETH", U256::from(1u64)).await.unwrap();
        store.upsert_latest_rate("sETH", U256::from(2u64)).await.unwrap();

        let latest = store.load_latest_rate("sETH").await.unwrap().unwrap();
        assert_eq!(latest.rate, U256::from(2u64));
        assert_eq!(store.latest_rates().len(), 1);
    }

    #[tokio::test]
    async fn test_get_latest_rate_missing_is_none() {
        let store = InMemoryRateStore::new();
        let rate = get_latest_rate(&store, "sBTC", Some("0xabc")).await.unwrap();
        assert!(rate.is_none());
    }

    #[tokio::test]
    async fn test_snx_prices_are_keyed_by_granularity() {
        let store = InMemoryRateStore::new();
        let daily = SnxPrice {
            count: 1,
            average_price: U256::from(5u64),
            ..SnxPrice::empty(Granularity::Daily, "7")
        };
        store.upsert_snx_price(&daily).await.unwrap();

        assert!(
            store
                .load_snx_price(Granularity::FifteenMinute, "7")
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(
            store.load_snx_price(Granularity::Daily, "7").await.unwrap(),
            Some(daily)
        );
    }

    #[test]
    fn test_error_display() {
        let err = StoreError::DatabaseError("test".to_string());
        assert!(err.to_string().contains("Database error"));
    }
}
