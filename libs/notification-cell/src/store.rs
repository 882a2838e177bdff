use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use uuid::Uuid;

use shared_database::SupabaseClient;

use crate::error::NotificationError;
use crate::models::{NewNotification, Notification, NotificationStatus, MAX_SEND_ATTEMPTS};

/// Dispatch-side port over the record store. Status changes go through the
/// conditional `claim_for_sending` / `mark_*` operations only, so two
/// overlapping dispatch ticks cannot both act on the same record.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create(&self, new: NewNotification) -> Result<Notification, NotificationError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Notification>, NotificationError>;

    /// Bounded batch of records eligible for dispatch at `now`: QUEUED or
    /// retryable FAILED, attempt count below the cap, not soft-deleted, and
    /// past their `send_after` time. Order unspecified.
    async fn find_dispatchable(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Notification>, NotificationError>;

    /// Conditional QUEUED/FAILED → SENDING transition. Returns `None` when
    /// another writer already moved the record; the caller must then skip it.
    async fn claim_for_sending(&self, id: Uuid)
        -> Result<Option<Notification>, NotificationError>;

    /// SENDING → SENT: record the transport message id and the send time.
    async fn mark_sent(
        &self,
        id: Uuid,
        twilio_sid: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<Notification, NotificationError>;

    /// SENDING → FAILED: `retry_count` is the new attempt total.
    async fn mark_failed(
        &self,
        id: Uuid,
        retry_count: u32,
        failure_reason: &str,
    ) -> Result<Notification, NotificationError>;

    /// Apply a delivery-status update to every record carrying the transport
    /// message id; returns the affected count.
    async fn update_by_transport_sid(
        &self,
        twilio_sid: &str,
        status: NotificationStatus,
        sent_at: Option<DateTime<Utc>>,
        read_at: Option<DateTime<Utc>>,
    ) -> Result<u64, NotificationError>;

    /// Soft-delete every non-deleted record created before `cutoff`;
    /// returns the affected count.
    async fn soft_delete_created_before(
        &self,
        cutoff: DateTime<Utc>,
        deleted_at: DateTime<Utc>,
    ) -> Result<u64, NotificationError>;
}

pub struct SupabaseNotificationStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseNotificationStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn patch(
        &self,
        path: &str,
        body: Value,
    ) -> Result<Vec<Notification>, NotificationError> {
        self.supabase
            .request(Method::PATCH, path, Some(body))
            .await
            .map_err(|e| NotificationError::Database(e.to_string()))
    }
}

#[async_trait]
impl NotificationStore for SupabaseNotificationStore {
    async fn create(&self, new: NewNotification) -> Result<Notification, NotificationError> {
        let body = json!({
            "appointment_id": new.appointment_id,
            "provider_id": new.provider_id,
            "client_id": new.client_id,
            "type": new.notification_type,
            "message": new.message,
            "status": NotificationStatus::Queued,
            "retry_count": 0,
            "send_after": new.send_after,
        });

        let created: Vec<Notification> = self
            .supabase
            .request(Method::POST, "/rest/v1/notifications", Some(body))
            .await
            .map_err(|e| NotificationError::Database(e.to_string()))?;

        created
            .into_iter()
            .next()
            .ok_or_else(|| NotificationError::Database("insert returned no row".to_string()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Notification>, NotificationError> {
        let path = format!("/rest/v1/notifications?id=eq.{}&limit=1", id);

        let result: Vec<Notification> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| NotificationError::Database(e.to_string()))?;

        Ok(result.into_iter().next())
    }

    async fn find_dispatchable(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Notification>, NotificationError> {
        let path = format!(
            "/rest/v1/notifications?status=in.(QUEUED,FAILED)&retry_count=lt.{}&deleted_at=is.null&or=(send_after.is.null,send_after.lte.{})&limit={}",
            MAX_SEND_ATTEMPTS,
            now.to_rfc3339(),
            limit
        );

        self.supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| NotificationError::Database(e.to_string()))
    }

    async fn claim_for_sending(
        &self,
        id: Uuid,
    ) -> Result<Option<Notification>, NotificationError> {
        // The status filter makes this a compare-and-set: the PATCH matches
        // zero rows when another tick already claimed the record.
        let path = format!(
            "/rest/v1/notifications?id=eq.{}&status=in.(QUEUED,FAILED)",
            id
        );

        let claimed = self
            .patch(&path, json!({ "status": NotificationStatus::Sending }))
            .await?;

        Ok(claimed.into_iter().next())
    }

    async fn mark_sent(
        &self,
        id: Uuid,
        twilio_sid: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<Notification, NotificationError> {
        let path = format!("/rest/v1/notifications?id=eq.{}", id);

        let updated = self
            .patch(
                &path,
                json!({
                    "status": NotificationStatus::Sent,
                    "twilio_sid": twilio_sid,
                    "sent_at": sent_at,
                }),
            )
            .await?;

        updated
            .into_iter()
            .next()
            .ok_or(NotificationError::NotFound(id))
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        retry_count: u32,
        failure_reason: &str,
    ) -> Result<Notification, NotificationError> {
        let path = format!("/rest/v1/notifications?id=eq.{}", id);

        let updated = self
            .patch(
                &path,
                json!({
                    "status": NotificationStatus::Failed,
                    "retry_count": retry_count,
                    "failure_reason": failure_reason,
                }),
            )
            .await?;

        updated
            .into_iter()
            .next()
            .ok_or(NotificationError::NotFound(id))
    }

    async fn update_by_transport_sid(
        &self,
        twilio_sid: &str,
        status: NotificationStatus,
        sent_at: Option<DateTime<Utc>>,
        read_at: Option<DateTime<Utc>>,
    ) -> Result<u64, NotificationError> {
        let path = format!("/rest/v1/notifications?twilio_sid=eq.{}", twilio_sid);

        let mut fields = Map::new();
        fields.insert("status".to_string(), json!(status));
        if let Some(at) = sent_at {
            fields.insert("sent_at".to_string(), json!(at));
        }
        if let Some(at) = read_at {
            fields.insert("read_at".to_string(), json!(at));
        }

        let updated = self.patch(&path, Value::Object(fields)).await?;

        Ok(updated.len() as u64)
    }

    async fn soft_delete_created_before(
        &self,
        cutoff: DateTime<Utc>,
        deleted_at: DateTime<Utc>,
    ) -> Result<u64, NotificationError> {
        let path = format!(
            "/rest/v1/notifications?created_at=lt.{}&deleted_at=is.null",
            cutoff.to_rfc3339()
        );

        let swept = self.patch(&path, json!({ "deleted_at": deleted_at })).await?;

        Ok(swept.len() as u64)
    }
}
