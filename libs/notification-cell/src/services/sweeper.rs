use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::info;

use crate::error::NotificationError;
use crate::models::RETENTION_DAYS;
use crate::store::NotificationStore;

/// Soft-deletes notification records past the retention horizon. Idempotent:
/// the `deleted_at is null` predicate excludes already-swept rows, so an
/// immediate re-run affects zero records.
pub struct RetentionSweeperService {
    notifications: Arc<dyn NotificationStore>,
}

impl RetentionSweeperService {
    pub fn new(notifications: Arc<dyn NotificationStore>) -> Self {
        Self { notifications }
    }

    pub async fn sweep(&self) -> Result<u64, NotificationError> {
        let now = Utc::now();
        let cutoff = now - Duration::days(RETENTION_DAYS);

        let count = self
            .notifications
            .soft_delete_created_before(cutoff, now)
            .await?;

        info!("Swept {} notification(s) past the retention horizon", count);

        Ok(count)
    }
}
