use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::error::NotificationError;
use crate::models::NotificationStatus;
use crate::store::NotificationStore;

/// Applies Twilio delivery-status callbacks to the matching notification
/// records. The only writer of the DELIVERED and READ states.
pub struct DeliveryStatusIngestorService {
    notifications: Arc<dyn NotificationStore>,
}

impl DeliveryStatusIngestorService {
    pub fn new(notifications: Arc<dyn NotificationStore>) -> Self {
        Self { notifications }
    }

    /// Map the provider's status token onto ours and update every record
    /// carrying `message_sid`. The mapped status is applied as-is, so a
    /// replayed callback is a state-wise no-op. Returns the affected count.
    pub async fn ingest(
        &self,
        message_sid: &str,
        raw_status: &str,
    ) -> Result<u64, NotificationError> {
        let status = NotificationStatus::from_provider_token(raw_status);

        let now = Utc::now();
        let sent_at = (status == NotificationStatus::Delivered).then_some(now);
        let read_at = (status == NotificationStatus::Read).then_some(now);

        let count = self
            .notifications
            .update_by_transport_sid(message_sid, status, sent_at, read_at)
            .await?;

        info!(
            "Delivery status '{}' -> {} applied to {} notification(s) for sid {}",
            raw_status, status, count, message_sid
        );

        Ok(count)
    }
}
