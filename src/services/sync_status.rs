//! Sync status service for tracking how far each sync job has indexed
//!
//! One row per job name. `last_block` is the last block whose events were all
//! indexed; the next cycle resumes from the block after it. Inside a range the
//! event cursor (`last_event_block`, `last_event_log_index`) marks the last
//! event whose writes completed, so a retried range skips it.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::entities::sync_status::{self, Entity as SyncStatus};
use crate::models::event::EventPosition;
use crate::services::rate_store::StoreError;

/// Job names for tracking sync status
pub mod jobs {
    pub const RATES_SYNC: &str = "rates_sync";
}

/// Last fully indexed block of `job_name`, if the job has ever made progress
pub async fn last_indexed_block(
    db: &DatabaseConnection,
    job_name: &str,
) -> Result<Option<u64>, StoreError> {
    let status = SyncStatus::find()
        .filter(sync_status::Column::JobName.eq(job_name))
        .one(db)
        .await?;

    Ok(status.and_then(|s| s.last_block).map(|b| b as u64))
}

/// Last event indexed by `job_name` inside a block range that has not completed
pub async fn last_indexed_event(
    db: &DatabaseConnection,
    job_name: &str,
) -> Result<Option<EventPosition>, StoreError> {
    let status = SyncStatus::find()
        .filter(sync_status::Column::JobName.eq(job_name))
        .one(db)
        .await?;

    Ok(status.and_then(|s| match (s.last_event_block, s.last_event_log_index) {
        (Some(block), Some(log_index)) => Some(EventPosition {
            block_number: block as u64,
            log_index: log_index as u64,
        }),
        _ => None,
    }))
}

/// Record that every event up to and including `position` was indexed
pub async fn record_event_progress(
    db: &DatabaseConnection,
    job_name: &str,
    position: EventPosition,
) -> Result<(), StoreError> {
    let existing = SyncStatus::find()
        .filter(sync_status::Column::JobName.eq(job_name))
        .one(db)
        .await?;

    match existing {
        Some(record) => {
            let mut active_model: sync_status::ActiveModel = record.into();
            active_model.last_event_block = Set(Some(position.block_number as i64));
            active_model.last_event_log_index = Set(Some(position.log_index as i64));
            active_model.update(db).await?;
        }
        None => {
            let new_record = sync_status::ActiveModel {
                job_name: Set(job_name.to_string()),
                last_block: Set(None),
                last_event_block: Set(Some(position.block_number as i64)),
                last_event_log_index: Set(Some(position.log_index as i64)),
                last_success_at: Set(None),
                last_attempt_at: Set(None),
                last_error: Set(None),
                success_count: Set(0),
                error_count: Set(0),
                ..Default::default()
            };
            new_record.insert(db).await?;
        }
    }

    Ok(())
}

/// Record that every block up to and including `last_block` was indexed
pub async fn record_progress(
    db: &DatabaseConnection,
    job_name: &str,
    last_block: u64,
) -> Result<(), StoreError> {
    let now = Utc::now().naive_utc();

    let existing = SyncStatus::find()
        .filter(sync_status::Column::JobName.eq(job_name))
        .one(db)
        .await?;

    match existing {
        Some(record) => {
            let success_count = record.success_count;
            let mut active_model: sync_status::ActiveModel = record.into();
            active_model.last_block = Set(Some(last_block as i64));
            active_model.last_event_block = Set(None);
            active_model.last_event_log_index = Set(None);
            active_model.last_success_at = Set(Some(now));
            active_model.last_attempt_at = Set(Some(now));
            active_model.last_error = Set(None);
            active_model.success_count = Set(success_count + 1);
            active_model.update(db).await?;
        }
        None => {
            let new_record = sync_status::ActiveModel {
                job_name: Set(job_name.to_string()),
                last_block: Set(Some(last_block as i64)),
                last_event_block: Set(None),
                last_event_log_index: Set(None),
                last_success_at: Set(Some(now)),
                last_attempt_at: Set(Some(now)),
                last_error: Set(None),
                success_count: Set(1),
                error_count: Set(0),
                ..Default::default()
            };
            new_record.insert(db).await?;
        }
    }

    tracing::debug!("[{}] Recorded progress up to block {}", job_name, last_block);
    Ok(())
}

/// Record a failed sync attempt; the cursor is left where it was
pub async fn record_failure(
    db: &DatabaseConnection,
    job_name: &str,
    error: &str,
) -> Result<(), StoreError> {
    let now = Utc::now().naive_utc();

    let existing = SyncStatus::find()
        .filter(sync_status::Column::JobName.eq(job_name))
        .one(db)
        .await?;

    match existing {
        Some(record) => {
            let error_count = record.error_count;
            let mut active_model: sync_status::ActiveModel = record.into();
            active_model.last_attempt_at = Set(Some(now));
            active_model.last_error = Set(Some(error.to_string()));
            active_model.error_count = Set(error_count + 1);
            active_model.update(db).await?;
        }
        None => {
            let new_record = sync_status::ActiveModel {
                job_name: Set(job_name.to_string()),
                last_block: Set(None),
                last_event_block: Set(None),
                last_event_log_index: Set(None),
                last_success_at: Set(None),
                last_attempt_at: Set(Some(now)),
                last_error: Set(Some(error.to_string())),
                success_count: Set(0),
                error_count: Set(1),
                ..Default::default()
            };
            new_record.insert(db).await?;
        }
    }

    tracing::debug!("[{}] Recorded failed sync: {}", job_name, error);
    Ok(())
}
