//! SNX price aggregation
//!
//! Keeps a running count and average of SNX rates per daily and fifteen-minute
//! bucket. The average is re-derived from the previous average on every
//! observation with truncating integer division:
//!
//! ```text
//! avg_k = (avg_{k-1} * (k - 1) + r_k) / k
//! ```
//!
//! Truncation error accumulates, so the stored average drifts from the exact
//! mean of the bucket. Keep the formula as is. An intermediate product that
//! does not fit in a uint256 fails the event instead of storing a clamped value.

use std::num::NonZeroU64;

use alloy::primitives::U256;
use tracing::debug;

use crate::models::rate::{Granularity, SnxPrice};
use crate::services::indexer::IndexerError;
use crate::services::rate_store::RateStore;

/// `(old_average * (new_count - 1) + new_rate) / new_count`, truncating
///
/// `None` when the numerator overflows a uint256.
pub fn calculate_average_price(
    old_average: U256,
    new_rate: U256,
    new_count: NonZeroU64,
) -> Option<U256> {
    let count = U256::from(new_count.get());
    let numerator = old_average
        .checked_mul(count - U256::from(1u64))?
        .checked_add(new_rate)?;
    Some(numerator / count)
}

impl SnxPrice {
    /// Fold one more observation into the bucket
    ///
    /// The bucket is left untouched when the new average cannot be computed.
    pub fn record(&mut self, rate: U256) -> Result<(), IndexerError> {
        let overflow = || IndexerError::PriceOverflow {
            granularity: self.granularity.as_str(),
            bucket: self.id.clone(),
        };

        let new_count = self
            .count
            .checked_add(1)
            .and_then(NonZeroU64::new)
            .ok_or_else(overflow)?;
        let average = calculate_average_price(self.average_price, rate, new_count)
            .ok_or_else(overflow)?;

        self.count = new_count.get();
        self.average_price = average;
        Ok(())
    }
}

/// Fold an SNX rate observed at `timestamp` into its daily and fifteen-minute buckets
pub async fn handle_snx_prices(
    store: &dyn RateStore,
    timestamp: u64,
    rate: U256,
) -> Result<(), IndexerError> {
    let mut buckets = Vec::with_capacity(Granularity::ALL.len());

    for granularity in Granularity::ALL {
        let id = granularity.bucket_id(timestamp);
        let mut price = store
            .load_snx_price(granularity, &id)
            .await?
            .unwrap_or_else(|| SnxPrice::empty(granularity, id));

        price.record(rate)?;
        buckets.push(price);
    }

    for price in &buckets {
        store.upsert_snx_price(price).await?;
        debug!(
            granularity = price.granularity.as_str(),
            bucket = %price.id,
            count = price.count,
            average_price = %price.average_price,
            "Updated SNX price bucket"
        );
    }

    Ok(())
}
