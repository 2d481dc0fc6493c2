//! PostgreSQL-backed [`RateStore`]
//!
//! uint256 values are stored as canonical decimal text and byte strings as
//! 0x-prefixed hex, so no precision is lost in the database.

use std::str::FromStr;

use alloy::primitives::{Address, FixedBytes, U256};
use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde_json::Value;

use crate::entities::{
    aggregator_answers, daily_snx_prices, fifteen_minute_snx_prices, latest_rates, prelude::*,
    rate_updates, rates_updated,
};
use crate::models::rate::{
    AggregatorAnswer, CurrencyKey, Granularity, LatestRate, RateUpdate, RatesUpdatedRecord,
    SnxPrice,
};
use crate::services::rate_store::{RateStore, StoreError};
use crate::services::units::parse_u256;

pub struct SeaOrmRateStore {
    db: DatabaseConnection,
}

impl SeaOrmRateStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn key_to_hex(key: &CurrencyKey) -> String {
    format!("0x{}", hex::encode(key.as_slice()))
}

fn key_from_hex(text: &str) -> Result<CurrencyKey, StoreError> {
    let raw = hex::decode(text.trim_start_matches("0x"))
        .map_err(|e| StoreError::CorruptRecord(format!("Invalid currency key {}: {}", text, e)))?;
    if raw.len() != 32 {
        return Err(StoreError::CorruptRecord(format!(
            "Currency key {} is {} bytes",
            text,
            raw.len()
        )));
    }
    Ok(FixedBytes::from_slice(&raw))
}

fn u256_from_text(text: &str) -> Result<U256, StoreError> {
    parse_u256(text).map_err(|e| StoreError::CorruptRecord(e.to_string()))
}

fn address_from_text(text: &str) -> Result<Address, StoreError> {
    Address::from_str(text)
        .map_err(|e| StoreError::CorruptRecord(format!("Invalid address {}: {}", text, e)))
}

fn strings_from_json(value: &Value) -> Result<Vec<String>, StoreError> {
    serde_json::from_value(value.clone()).map_err(|e| StoreError::CorruptRecord(e.to_string()))
}

fn rate_update_from_model(model: rate_updates::Model) -> Result<RateUpdate, StoreError> {
    Ok(RateUpdate {
        block: model.block as u64,
        timestamp: model.timestamp as u64,
        currency_key: key_from_hex(&model.currency_key)?,
        rate: u256_from_text(&model.rate)?,
        synth: model.synth,
        id: model.id,
    })
}

fn aggregator_answer_from_model(
    model: aggregator_answers::Model,
) -> Result<AggregatorAnswer, StoreError> {
    Ok(AggregatorAnswer {
        block: model.block as u64,
        timestamp: model.timestamp as u64,
        currency_key: key_from_hex(&model.currency_key)?,
        rate: u256_from_text(&model.rate)?,
        round_id: u256_from_text(&model.round_id)?,
        aggregator: address_from_text(&model.aggregator)?,
        synth: model.synth,
        id: model.id,
    })
}

#[async_trait]
impl RateStore for SeaOrmRateStore {
    async fn insert_rates_updated(&self, record: &RatesUpdatedRecord) -> Result<(), StoreError> {
        let keys: Vec<String> = record.currency_keys.iter().map(key_to_hex).collect();
        let rates: Vec<String> = record.new_rates.iter().map(|r| r.to_string()).collect();

        let model = rates_updated::ActiveModel {
            id: Set(record.id.clone()),
            currency_keys: Set(Value::from(keys)),
            new_rates: Set(Value::from(rates)),
            timestamp: Set(record.timestamp as i64),
            block: Set(record.block as i64),
            from_address: Set(format!("{:?}", record.from)),
            gas_price: Set(record.gas_price.to_string()),
        };

        let existing = RatesUpdated::find_by_id(record.id.clone()).one(&self.db).await?;
        if existing.is_some() {
            model.update(&self.db).await?;
        } else {
            model.insert(&self.db).await?;
        }
        Ok(())
    }

    async fn insert_rate_update(&self, record: &RateUpdate) -> Result<(), StoreError> {
        let model = rate_updates::ActiveModel {
            id: Set(record.id.clone()),
            block: Set(record.block as i64),
            timestamp: Set(record.timestamp as i64),
            currency_key: Set(key_to_hex(&record.currency_key)),
            synth: Set(record.synth.clone()),
            rate: Set(record.rate.to_string()),
        };

        let existing = RateUpdates::find_by_id(record.id.clone()).one(&self.db).await?;
        if existing.is_some() {
            model.update(&self.db).await?;
        } else {
            model.insert(&self.db).await?;
        }
        Ok(())
    }

    async fn insert_aggregator_answer(&self, record: &AggregatorAnswer) -> Result<(), StoreError> {
        let model = aggregator_answers::ActiveModel {
            id: Set(record.id.clone()),
            block: Set(record.block as i64),
            timestamp: Set(record.timestamp as i64),
            currency_key: Set(key_to_hex(&record.currency_key)),
            synth: Set(record.synth.clone()),
            rate: Set(record.rate.to_string()),
            round_id: Set(record.round_id.to_string()),
            aggregator: Set(format!("{:?}", record.aggregator)),
        };

        let existing = AggregatorAnswers::find_by_id(record.id.clone())
            .one(&self.db)
            .await?;
        if existing.is_some() {
            model.update(&self.db).await?;
        } else {
            model.insert(&self.db).await?;
        }
        Ok(())
    }

    async fn load_latest_rate(&self, synth: &str) -> Result<Option<LatestRate>, StoreError> {
        let Some(model) = LatestRates::find_by_id(synth.to_string()).one(&self.db).await? else {
            return Ok(None);
        };
        Ok(Some(LatestRate {
            rate: u256_from_text(&model.rate)?,
            synth: model.id,
        }))
    }

    async fn upsert_latest_rate(&self, synth: &str, rate: U256) -> Result<(), StoreError> {
        let model = latest_rates::ActiveModel {
            id: Set(synth.to_string()),
            rate: Set(rate.to_string()),
        };

        let existing = LatestRates::find_by_id(synth.to_string()).one(&self.db).await?;
        if existing.is_some() {
            model.update(&self.db).await?;
        } else {
            model.insert(&self.db).await?;
        }
        Ok(())
    }

    async fn load_snx_price(
        &self,
        granularity: Granularity,
        id: &str,
    ) -> Result<Option<SnxPrice>, StoreError> {
        let row = match granularity {
            Granularity::Daily => DailySnxPrices::find_by_id(id.to_string())
                .one(&self.db)
                .await?
                .map(|m| (m.id, m.count, m.average_price)),
            Granularity::FifteenMinute => FifteenMinuteSnxPrices::find_by_id(id.to_string())
                .one(&self.db)
                .await?
                .map(|m| (m.id, m.count, m.average_price)),
        };

        row.map(|(id, count, average_price)| {
            Ok(SnxPrice {
                granularity,
                id,
                count: count as u64,
                average_price: u256_from_text(&average_price)?,
            })
        })
        .transpose()
    }

    async fn upsert_snx_price(&self, price: &SnxPrice) -> Result<(), StoreError> {
        match price.granularity {
            Granularity::Daily => {
                let model = daily_snx_prices::ActiveModel {
                    id: Set(price.id.clone()),
                    count: Set(price.count as i64),
                    average_price: Set(price.average_price.to_string()),
                };
                let existing = DailySnxPrices::find_by_id(price.id.clone())
                    .one(&self.db)
                    .await?;
                if existing.is_some() {
                    model.update(&self.db).await?;
                } else {
                    model.insert(&self.db).await?;
                }
            }
            Granularity::FifteenMinute => {
                let model = fifteen_minute_snx_prices::ActiveModel {
                    id: Set(price.id.clone()),
                    count: Set(price.count as i64),
                    average_price: Set(price.average_price.to_string()),
                };
                let existing = FifteenMinuteSnxPrices::find_by_id(price.id.clone())
                    .one(&self.db)
                    .await?;
                if existing.is_some() {
                    model.update(&self.db).await?;
                } else {
                    model.insert(&self.db).await?;
                }
            }
        }
        Ok(())
    }

    async fn load_rates_updated(
        &self,
        id: &str,
    ) -> Result<Option<RatesUpdatedRecord>, StoreError> {
        let Some(model) = RatesUpdated::find_by_id(id.to_string()).one(&self.db).await? else {
            return Ok(None);
        };

        let currency_keys = strings_from_json(&model.currency_keys)?
            .iter()
            .map(|k| key_from_hex(k))
            .collect::<Result<Vec<_>, _>>()?;
        let new_rates = strings_from_json(&model.new_rates)?
            .iter()
            .map(|r| u256_from_text(r))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(RatesUpdatedRecord {
            id: model.id,
            currency_keys,
            new_rates,
            timestamp: model.timestamp as u64,
            block: model.block as u64,
            from: address_from_text(&model.from_address)?,
            gas_price: u256_from_text(&model.gas_price)?,
        }))
    }

    async fn load_rate_update(&self, id: &str) -> Result<Option<RateUpdate>, StoreError> {
        RateUpdates::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .map(rate_update_from_model)
            .transpose()
    }

    async fn load_aggregator_answer(
        &self,
        id: &str,
    ) -> Result<Option<AggregatorAnswer>, StoreError> {
        AggregatorAnswers::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .map(aggregator_answer_from_model)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::encoding::currency_key;

    #[test]
    fn test_currency_key_hex_round_trip() {
        let key = currency_key("sBTC");
        let text = key_to_hex(&key);
        assert!(text.starts_with("0x73425443"));
        assert_eq!(text.len(), 66);
        assert_eq!(key_from_hex(&text).unwrap(), key);
    }

    #[test]
    fn test_key_from_hex_rejects_short_keys() {
        assert!(matches!(
            key_from_hex("0x7342"),
            Err(StoreError::CorruptRecord(_))
        ));
    }

    #[test]
    fn test_rate_update_from_model() {
        let model = rate_updates::Model {
            id: "0x01-sETH".to_string(),
            block: 10,
            timestamp: 1_000,
            currency_key: key_to_hex(&currency_key("sETH")),
            synth: "sETH".to_string(),
            rate: "1500000000000000000000".to_string(),
        };

        let record = rate_update_from_model(model).unwrap();
        assert_eq!(record.synth, "sETH");
        assert_eq!(record.rate, U256::from(1_500_000_000_000_000_000_000u128));
    }
}
