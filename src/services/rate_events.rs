//! Chain log source for the indexer
//!
//! Pulls `RatesUpdated` logs from the ExchangeRates contracts and `AnswerUpdated`
//! logs from the configured aggregators, attaches block and transaction
//! metadata, and returns them as [`RateEvent`]s in (block, log index) order.

use std::collections::HashMap;

use alloy::{
    primitives::{Address, Log as PrimitiveLog, B256, U256},
    providers::{Provider, RootProvider},
    rpc::types::{BlockNumberOrTag, BlockTransactionsKind, Filter, Log},
    sol_types::SolEvent,
    transports::http::{Client, Http},
};
use tracing::{debug, info};

use crate::models::event::{AnswerUpdatedEvent, EventContext, RateEvent, RatesUpdatedEvent};
use crate::services::contracts::{ContractCallError, IAggregator, IExchangeRates};
use crate::services::indexer::IndexerError;

/// Decode a raw log into a [`RateEvent`]
///
/// Returns `Ok(None)` when the first topic matches neither event.
pub fn decode_rate_log(
    log: &PrimitiveLog,
    context: EventContext,
) -> Result<Option<RateEvent>, IndexerError> {
    let Some(topic0) = log.topics().first() else {
        return Ok(None);
    };

    if *topic0 == IExchangeRates::RatesUpdated::SIGNATURE_HASH {
        let decoded = IExchangeRates::RatesUpdated::decode_log(log, true)
            .map_err(|e| IndexerError::InvalidEvent(format!("RatesUpdated: {}", e)))?;
        return Ok(Some(RateEvent::RatesUpdated(RatesUpdatedEvent {
            context,
            currency_keys: decoded.data.currencyKeys,
            new_rates: decoded.data.newRates,
        })));
    }

    if *topic0 == IAggregator::AnswerUpdated::SIGNATURE_HASH {
        let decoded = IAggregator::AnswerUpdated::decode_log(log, true)
            .map_err(|e| IndexerError::InvalidEvent(format!("AnswerUpdated: {}", e)))?;
        return Ok(Some(RateEvent::AnswerUpdated(AnswerUpdatedEvent {
            context,
            aggregator: log.address,
            current: decoded.data.current,
            round_id: decoded.data.roundId,
            updated_at: decoded.data.updatedAt,
        })));
    }

    Ok(None)
}

/// Sender and gas price of a transaction
#[derive(Debug, Clone, Copy)]
struct TxMeta {
    from: Address,
    gas_price: U256,
}

pub struct RateEventSource {
    provider: RootProvider<Http<Client>>,
    exchange_rates: Vec<Address>,
    aggregators: Vec<Address>,
}

impl RateEventSource {
    pub fn new(
        provider: RootProvider<Http<Client>>,
        exchange_rates: Vec<Address>,
        aggregators: Vec<Address>,
    ) -> Self {
        Self {
            provider,
            exchange_rates,
            aggregators,
        }
    }

    pub async fn latest_block(&self) -> Result<u64, ContractCallError> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| ContractCallError::ProviderError(format!("Failed to get block number: {}", e)))
    }

    /// All rate events in `[from_block, to_block]`, sorted by (block, log index)
    pub async fn fetch(&self, from_block: u64, to_block: u64) -> Result<Vec<RateEvent>, IndexerError> {
        let mut logs = Vec::new();

        if !self.exchange_rates.is_empty() {
            let filter = Filter::new()
                .address(self.exchange_rates.clone())
                .event_signature(IExchangeRates::RatesUpdated::SIGNATURE_HASH)
                .from_block(from_block)
                .to_block(to_block);
            logs.extend(self.get_logs(&filter).await?);
        }

        if !self.aggregators.is_empty() {
            let filter = Filter::new()
                .address(self.aggregators.clone())
                .event_signature(IAggregator::AnswerUpdated::SIGNATURE_HASH)
                .from_block(from_block)
                .to_block(to_block);
            logs.extend(self.get_logs(&filter).await?);
        }

        let mut timestamps: HashMap<u64, u64> = HashMap::new();
        let mut transactions: HashMap<B256, TxMeta> = HashMap::new();
        let mut events = Vec::with_capacity(logs.len());

        for log in logs {
            let (Some(block_number), Some(tx_hash), Some(log_index)) =
                (log.block_number, log.transaction_hash, log.log_index)
            else {
                debug!("Skipping pending log");
                continue;
            };

            let timestamp = match timestamps.get(&block_number) {
                Some(ts) => *ts,
                None => {
                    let ts = self.block_timestamp(block_number).await?;
                    timestamps.insert(block_number, ts);
                    ts
                }
            };

            let tx = match transactions.get(&tx_hash) {
                Some(tx) => *tx,
                None => {
                    let tx = self.transaction_meta(tx_hash).await?;
                    transactions.insert(tx_hash, tx);
                    tx
                }
            };

            let context = EventContext {
                tx_hash,
                log_index,
                block_number,
                timestamp,
                from: tx.from,
                gas_price: tx.gas_price,
            };

            if let Some(event) = decode_rate_log(&log.inner, context)? {
                events.push(event);
            }
        }

        sort_events(&mut events);

        info!(
            from_block = from_block,
            to_block = to_block,
            events = events.len(),
            "Fetched rate events"
        );

        Ok(events)
    }

    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, ContractCallError> {
        self.provider
            .get_logs(filter)
            .await
            .map_err(|e| ContractCallError::ProviderError(format!("Failed to get logs: {}", e)))
    }

    async fn block_timestamp(&self, block_number: u64) -> Result<u64, IndexerError> {
        let block = self
            .provider
            .get_block_by_number(
                BlockNumberOrTag::Number(block_number),
                BlockTransactionsKind::Hashes,
            )
            .await
            .map_err(|e| ContractCallError::ProviderError(format!("Failed to get block: {}", e)))?
            .ok_or_else(|| IndexerError::InvalidEvent(format!("Block {} not found", block_number)))?;

        Ok(block.header.timestamp)
    }

    async fn transaction_meta(&self, tx_hash: B256) -> Result<TxMeta, IndexerError> {
        let receipt = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| ContractCallError::ProviderError(format!("Failed to get receipt: {}", e)))?
            .ok_or_else(|| IndexerError::InvalidEvent(format!("Receipt for {:?} not found", tx_hash)))?;

        Ok(TxMeta {
            from: receipt.from,
            gas_price: U256::from(receipt.effective_gas_price),
        })
    }
}

/// Order events the way they were emitted on chain
pub fn sort_events(events: &mut [RateEvent]) {
    events.sort_by_key(|event| event.context().position());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::encoding::currency_key;
    use alloy::primitives::{LogData, I256};

    fn context(block_number: u64, log_index: u64) -> EventContext {
        EventContext {
            tx_hash: B256::repeat_byte(0x11),
            log_index,
            block_number,
            timestamp: 1_700_000_000,
            from: Address::with_last_byte(9),
            gas_price: U256::from(1_000u64),
        }
    }

    fn raw_log(address: Address, data: LogData) -> PrimitiveLog {
        PrimitiveLog { address, data }
    }

    #[test]
    fn test_decode_rates_updated() {
        let event = IExchangeRates::RatesUpdated {
            currencyKeys: vec![currency_key("sETH"), currency_key("SNX")],
            newRates: vec![U256::from(1_500u64), U256::from(3u64)],
        };
        let log = raw_log(Address::with_last_byte(1), event.encode_log_data());

        let decoded = decode_rate_log(&log, context(10, 0)).unwrap().unwrap();
        let RateEvent::RatesUpdated(decoded) = decoded else {
            panic!("expected RatesUpdated");
        };
        assert_eq!(decoded.currency_keys[1], currency_key("SNX"));
        assert_eq!(decoded.new_rates[0], U256::from(1_500u64));
    }

    #[test]
    fn test_decode_answer_updated_keeps_emitter() {
        let aggregator = Address::with_last_byte(0xaa);
        let event = IAggregator::AnswerUpdated {
            current: I256::try_from(42i64).unwrap(),
            roundId: U256::from(7u64),
            updatedAt: U256::from(1_700_000_000u64),
        };
        let log = raw_log(aggregator, event.encode_log_data());

        let decoded = decode_rate_log(&log, context(10, 1)).unwrap().unwrap();
        let RateEvent::AnswerUpdated(decoded) = decoded else {
            panic!("expected AnswerUpdated");
        };
        assert_eq!(decoded.aggregator, aggregator);
        assert_eq!(decoded.round_id, U256::from(7u64));
    }

    #[test]
    fn test_decode_unknown_topic_is_none() {
        let data = LogData::new_unchecked(vec![B256::repeat_byte(0xff)], Default::default());
        let log = raw_log(Address::ZERO, data);
        assert!(decode_rate_log(&log, context(1, 0)).unwrap().is_none());
    }

    #[test]
    fn test_decode_truncated_data_is_invalid() {
        let data = LogData::new_unchecked(
            vec![IExchangeRates::RatesUpdated::SIGNATURE_HASH],
            vec![0u8; 8].into(),
        );
        let log = raw_log(Address::ZERO, data);
        assert!(matches!(
            decode_rate_log(&log, context(1, 0)),
            Err(IndexerError::InvalidEvent(_))
        ));
    }

    #[test]
    fn test_sort_events_by_block_then_log_index() {
        let make = |block, index| {
            RateEvent::RatesUpdated(RatesUpdatedEvent {
                context: context(block, index),
                currency_keys: vec![],
                new_rates: vec![],
            })
        };
        let mut events = vec![make(5, 2), make(4, 9), make(5, 0)];
        sort_events(&mut events);

        let order: Vec<(u64, u64)> = events
            .iter()
            .map(|e| (e.context().block_number, e.context().log_index))
            .collect();
        assert_eq!(order, vec![(4, 9), (5, 0), (5, 2)]);
    }
}
