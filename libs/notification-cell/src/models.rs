use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A message is attempted at most this many times before its FAILED state
/// becomes terminal. Fixed policy, not per-message configurable.
pub const MAX_SEND_ATTEMPTS: u32 = 3;

/// Upper bound on records claimed by one dispatch tick. Bounds per-tick work
/// and caps outbound call concurrency.
pub const DISPATCH_BATCH_SIZE: usize = 10;

/// Age after which notification records become eligible for soft-deletion.
pub const RETENTION_DAYS: i64 = 90;

/// Reminders fire this long before the appointment starts.
pub const REMINDER_LEAD_HOURS: i64 = 24;

/// One outbound reminder/confirmation message. Exclusively owned by the
/// dispatch subsystem; the appointment is referenced by id only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub provider_id: Uuid,
    pub client_id: Uuid,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub message: String,
    pub status: NotificationStatus,
    pub retry_count: u32,
    /// Persisted fire time; dispatch only picks the record up once this has
    /// passed. Survives process restarts, unlike an in-memory timer.
    #[serde(default)]
    pub send_after: Option<DateTime<Utc>>,
    #[serde(default)]
    pub twilio_sid: Option<String>,
    #[serde(default)]
    pub failure_reason: Option<String>,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn is_dispatchable(&self, now: DateTime<Utc>) -> bool {
        self.status.awaits_dispatch()
            && self.retry_count < MAX_SEND_ATTEMPTS
            && self.deleted_at.is_none()
            && self.send_after.map_or(true, |due| due <= now)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationStatus {
    Queued,
    Sending,
    Sent,
    Delivered,
    Read,
    Failed,
}

impl NotificationStatus {
    /// QUEUED records and FAILED records below the attempt cap go back into
    /// the dispatch selection.
    pub fn awaits_dispatch(&self) -> bool {
        matches!(self, NotificationStatus::Queued | NotificationStatus::Failed)
    }

    /// Twilio's status vocabulary mapped onto ours. Unrecognized tokens fall
    /// back to SENT; the callback is never rejected over an unknown token.
    pub fn from_provider_token(token: &str) -> Self {
        match token {
            "sent" => NotificationStatus::Sent,
            "delivered" => NotificationStatus::Delivered,
            "read" => NotificationStatus::Read,
            "failed" | "undelivered" => NotificationStatus::Failed,
            _ => NotificationStatus::Sent,
        }
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationStatus::Queued => write!(f, "QUEUED"),
            NotificationStatus::Sending => write!(f, "SENDING"),
            NotificationStatus::Sent => write!(f, "SENT"),
            NotificationStatus::Delivered => write!(f, "DELIVERED"),
            NotificationStatus::Read => write!(f, "READ"),
            NotificationStatus::Failed => write!(f, "FAILED"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NotificationType {
    #[serde(rename = "REMINDER_24H")]
    Reminder24h,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewNotification {
    pub appointment_id: Uuid,
    pub provider_id: Uuid,
    pub client_id: Uuid,
    pub notification_type: NotificationType,
    pub message: String,
    pub send_after: Option<DateTime<Utc>>,
}

/// Outcome of one dispatch tick, reported by the manual trigger endpoint.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DispatchSummary {
    pub selected: usize,
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
}
