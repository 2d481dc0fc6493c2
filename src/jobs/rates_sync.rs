//! Rates Sync Job
//!
//! Polls the chain for `RatesUpdated` and `AnswerUpdated` logs in bounded block
//! ranges and feeds them to the [`RatesIndexer`] in on-chain order. The cursor
//! lives in `sync_status`; a failed range is retried on the next tick from the
//! event after the last one that was fully indexed.

use std::env;
use std::str::FromStr;

use alloy::primitives::Address;
use sea_orm::DatabaseConnection;
use tokio::time::{interval, Duration as TokioDuration};
use tracing::{error, info, warn};

use crate::services::indexer::RatesIndexer;
use crate::services::rate_events::RateEventSource;
use crate::services::sync_status::{self, jobs};

const ENV_EXCHANGE_RATES_ADDRESSES: &str = "EXCHANGE_RATES_ADDRESSES";
const ENV_START_BLOCK: &str = "RATES_SYNC_START_BLOCK";
const ENV_BATCH_BLOCKS: &str = "RATES_SYNC_BATCH_BLOCKS";
const ENV_SYNC_INTERVAL: &str = "RATES_SYNC_INTERVAL_SECS";
const ENV_DRY_RUN: &str = "RATES_SYNC_DRY_RUN";

const DEFAULT_START_BLOCK: u64 = 0;
const DEFAULT_BATCH_BLOCKS: u64 = 2_000;
const DEFAULT_SYNC_INTERVAL_SECS: u64 = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatesSyncSettings {
    pub exchange_rates: Vec<Address>,
    pub start_block: u64,
    pub batch_blocks: u64,
    pub interval_secs: u64,
    pub dry_run: bool,
}

impl RatesSyncSettings {
    pub fn from_env() -> Self {
        let exchange_rates = env::var(ENV_EXCHANGE_RATES_ADDRESSES)
            .map(|list| parse_address_list(&list))
            .unwrap_or_default();

        Self {
            exchange_rates,
            start_block: env_u64(ENV_START_BLOCK).unwrap_or(DEFAULT_START_BLOCK),
            batch_blocks: env_u64(ENV_BATCH_BLOCKS)
                .filter(|b| *b > 0)
                .unwrap_or(DEFAULT_BATCH_BLOCKS),
            interval_secs: env_u64(ENV_SYNC_INTERVAL).unwrap_or(DEFAULT_SYNC_INTERVAL_SECS),
            dry_run: env::var(ENV_DRY_RUN)
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }
}

fn env_u64(name: &str) -> Option<u64> {
    env::var(name).ok().and_then(|s| s.parse().ok())
}

/// Comma separated addresses; invalid entries are logged and dropped
pub fn parse_address_list(list: &str) -> Vec<Address> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match Address::from_str(s) {
            Ok(address) => Some(address),
            Err(e) => {
                warn!(address = %s, error = %e, "Ignoring invalid address");
                None
            }
        })
        .collect()
}

/// Next inclusive block range to index, or `None` when caught up
pub fn next_range(
    last_indexed: Option<u64>,
    start_block: u64,
    latest_block: u64,
    batch_blocks: u64,
) -> Option<(u64, u64)> {
    let from = match last_indexed {
        Some(last) => last.saturating_add(1).max(start_block),
        None => start_block,
    };
    if from > latest_block {
        return None;
    }
    let to = from
        .saturating_add(batch_blocks.max(1) - 1)
        .min(latest_block);
    Some((from, to))
}

/// Start the rates sync job
pub async fn start_rates_sync_job(
    db: DatabaseConnection,
    indexer: RatesIndexer,
    source: RateEventSource,
    settings: RatesSyncSettings,
) {
    tokio::spawn(async move {
        info!(
            exchange_rates = ?settings.exchange_rates,
            aggregators = indexer.config().aggregators().len(),
            start_block = settings.start_block,
            batch_blocks = settings.batch_blocks,
            interval_secs = settings.interval_secs,
            dry_run = settings.dry_run,
            "Rates sync job started"
        );

        // Dry runs never persist the cursor
        let mut dry_run_cursor: Option<u64> = None;

        let mut interval = interval(TokioDuration::from_secs(settings.interval_secs));

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received, stopping rates sync job");
                    break;
                }
                _ = interval.tick() => {
                    if settings.dry_run {
                        match run_dry_cycle(&source, &settings, dry_run_cursor).await {
                            Ok(Some(last)) => dry_run_cursor = Some(last),
                            Ok(None) => {}
                            Err(e) => error!(error = %e, "Rates dry run cycle failed"),
                        }
                        continue;
                    }

                    if let Err(e) = run_sync_cycle(&db, &indexer, &source, &settings).await {
                        error!(error = %e, "Rates sync cycle failed");
                        if let Err(e) = sync_status::record_failure(&db, jobs::RATES_SYNC, &e.to_string()).await {
                            error!(error = %e, "Failed to record rates sync failure");
                        }
                    }
                }
            }
        }

        info!("Rates sync job stopped");
    });
}

/// Index every range between the cursor and the chain head
async fn run_sync_cycle(
    db: &DatabaseConnection,
    indexer: &RatesIndexer,
    source: &RateEventSource,
    settings: &RatesSyncSettings,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let latest_block = source.latest_block().await?;
    let mut last_indexed = sync_status::last_indexed_block(db, jobs::RATES_SYNC).await?;
    let mut resume_after = sync_status::last_indexed_event(db, jobs::RATES_SYNC).await?;

    while let Some((from, to)) = next_range(
        last_indexed,
        settings.start_block,
        latest_block,
        settings.batch_blocks,
    ) {
        if let Some(position) = resume_after {
            info!(
                block = position.block_number,
                log_index = position.log_index,
                "Resuming partially indexed rates block range"
            );
        }

        let events = source.fetch(from, to).await?;
        let indexed = indexer
            .index_all(&events, resume_after.take(), move |position| {
                sync_status::record_event_progress(db, jobs::RATES_SYNC, position)
            })
            .await?;

        sync_status::record_progress(db, jobs::RATES_SYNC, to).await?;
        last_indexed = Some(to);

        info!(
            from_block = from,
            to_block = to,
            events = indexed,
            "Indexed rates block range"
        );
    }

    Ok(())
}

/// Fetch and log the next range without writing anything
async fn run_dry_cycle(
    source: &RateEventSource,
    settings: &RatesSyncSettings,
    cursor: Option<u64>,
) -> Result<Option<u64>, Box<dyn std::error::Error + Send + Sync>> {
    let latest_block = source.latest_block().await?;
    let Some((from, to)) = next_range(cursor, settings.start_block, latest_block, settings.batch_blocks)
    else {
        return Ok(None);
    };

    for event in source.fetch(from, to).await? {
        let ctx = event.context();
        info!(
            kind = event.kind(),
            tx_hash = %ctx.tx_hash_hex(),
            block = ctx.block_number,
            log_index = ctx.log_index,
            "[dry run] Decoded event"
        );
    }

    Ok(Some(to))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_range_from_start_block() {
        assert_eq!(next_range(None, 100, 5_000, 1_000), Some((100, 1_099)));
    }

    #[test]
    fn test_next_range_resumes_after_cursor() {
        assert_eq!(next_range(Some(1_099), 100, 5_000, 1_000), Some((1_100, 2_099)));
    }

    #[test]
    fn test_next_range_clamps_to_head() {
        assert_eq!(next_range(Some(4_500), 0, 5_000, 1_000), Some((4_501, 5_000)));
        assert_eq!(next_range(Some(5_000), 0, 5_000, 1_000), None);
    }

    #[test]
    fn test_next_range_ignores_cursor_before_start() {
        assert_eq!(next_range(Some(10), 500, 600, 50), Some((500, 549)));
    }

    #[test]
    fn test_parse_address_list_skips_invalid_entries() {
        let list = "0x00000000000000000000000000000000000000aa, nope ,,0x00000000000000000000000000000000000000bb";
        assert_eq!(
            parse_address_list(list),
            vec![Address::with_last_byte(0xaa), Address::with_last_byte(0xbb)]
        );
    }
}
