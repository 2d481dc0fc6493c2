//! Event dispatch
//!
//! [`RatesIndexer`] owns the store, chain reader and configuration and routes
//! each decoded [`RateEvent`] to its handler. Events must be fed in
//! (block, log index) order; every write is awaited before the next event.
//!
//! Handlers are not idempotent for SNX buckets, so a retried block range must
//! resume after the last event that was fully indexed rather than replay it.

use std::future::Future;
use std::sync::Arc;

use alloy::primitives::Address;
use tracing::{debug, error};

use crate::config::RatesConfig;
use crate::models::event::{EventPosition, RateEvent};
use crate::services::aggregator_answer_handler::{handle_aggregator_answer_updated, AnswerOutcome};
use crate::services::contracts::{ChainReader, ContractCallError};
use crate::services::rate_store::{RateStore, StoreError};
use crate::services::rates_updated_handler::{handle_rates_updated, RatesUpdatedOutcome};

#[derive(Debug)]
pub enum IndexerError {
    /// The emitting aggregator has no known proxy
    UnknownAggregator(Address),
    Store(StoreError),
    Contract(ContractCallError),
    InvalidEvent(String),
    /// The next running average of an SNX bucket does not fit in a uint256
    PriceOverflow {
        granularity: &'static str,
        bucket: String,
    },
}

impl std::fmt::Display for IndexerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexerError::UnknownAggregator(address) => {
                write!(f, "No proxy configured for aggregator {}", address)
            }
            IndexerError::Store(e) => write!(f, "Store error: {}", e),
            IndexerError::Contract(e) => write!(f, "Contract error: {}", e),
            IndexerError::InvalidEvent(msg) => write!(f, "Invalid event: {}", msg),
            IndexerError::PriceOverflow {
                granularity,
                bucket,
            } => write!(
                f,
                "SNX {} price average overflows in bucket {}",
                granularity, bucket
            ),
        }
    }
}

impl std::error::Error for IndexerError {}

impl From<StoreError> for IndexerError {
    fn from(err: StoreError) -> Self {
        IndexerError::Store(err)
    }
}

impl From<ContractCallError> for IndexerError {
    fn from(err: ContractCallError) -> Self {
        IndexerError::Contract(err)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOutcome {
    RatesUpdated(RatesUpdatedOutcome),
    AnswerUpdated(AnswerOutcome),
}

#[derive(Clone)]
pub struct RatesIndexer {
    store: Arc<dyn RateStore>,
    chain: Arc<dyn ChainReader>,
    config: Arc<RatesConfig>,
}

impl RatesIndexer {
    pub fn new(
        store: Arc<dyn RateStore>,
        chain: Arc<dyn ChainReader>,
        config: Arc<RatesConfig>,
    ) -> Self {
        Self {
            store,
            chain,
            config,
        }
    }

    pub fn config(&self) -> &RatesConfig {
        &self.config
    }

    pub async fn index(&self, event: &RateEvent) -> Result<IndexOutcome, IndexerError> {
        let ctx = event.context();
        debug!(
            kind = event.kind(),
            tx_hash = %ctx.tx_hash_hex(),
            block = ctx.block_number,
            log_index = ctx.log_index,
            "Indexing event"
        );

        let result = match event {
            RateEvent::RatesUpdated(ev) => {
                handle_rates_updated(self.store.as_ref(), &self.config, ev)
                    .await
                    .map(IndexOutcome::RatesUpdated)
            }
            RateEvent::AnswerUpdated(ev) => handle_aggregator_answer_updated(
                self.store.as_ref(),
                self.chain.as_ref(),
                &self.config,
                ev,
            )
            .await
            .map(IndexOutcome::AnswerUpdated),
        };

        if let Err(e) = &result {
            error!(
                kind = event.kind(),
                tx_hash = %ctx.tx_hash_hex(),
                block = ctx.block_number,
                "Failed to index event: {}",
                e
            );
        }

        result
    }

    /// Index `events` in order, stopping at the first failure
    ///
    /// Events at or before `resume_after` were indexed by an earlier attempt and
    /// are skipped. `checkpoint` is awaited with the position of every event once
    /// its writes are done. Returns the number of events indexed.
    pub async fn index_all<F, Fut>(
        &self,
        events: &[RateEvent],
        resume_after: Option<EventPosition>,
        mut checkpoint: F,
    ) -> Result<usize, IndexerError>
    where
        F: FnMut(EventPosition) -> Fut,
        Fut: Future<Output = Result<(), StoreError>>,
    {
        let mut indexed = 0;

        for event in events {
            let position = event.context().position();
            if resume_after.is_some_and(|after| position <= after) {
                debug!(
                    block = position.block_number,
                    log_index = position.log_index,
                    "Skipping already indexed event"
                );
                continue;
            }

            self.index(event).await?;
            checkpoint(position).await?;
            indexed += 1;
        }

        Ok(indexed)
    }
}
