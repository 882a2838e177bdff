use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use appointment_cell::store::AppointmentStore;

use crate::error::NotificationError;
use crate::models::{DispatchSummary, Notification, DISPATCH_BATCH_SIZE, MAX_SEND_ATTEMPTS};
use crate::store::NotificationStore;
use crate::transport::TransportClient;

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub batch_size: usize,
    /// Per-record send timeout; one stuck transport call must not stall the
    /// rest of the batch indefinitely.
    pub send_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_size: DISPATCH_BATCH_SIZE,
            send_timeout: Duration::from_secs(30),
        }
    }
}

enum DispatchOutcome {
    Sent,
    Failed,
    Skipped,
}

/// Drives queued notifications through SENDING → SENT/FAILED. Stateless
/// across invocations: everything lives in the record store, so any tick on
/// any process can pick up where another left off.
pub struct NotificationDispatchService {
    notifications: Arc<dyn NotificationStore>,
    appointments: Arc<dyn AppointmentStore>,
    transport: Arc<dyn TransportClient>,
    config: DispatchConfig,
}

impl NotificationDispatchService {
    pub fn new(
        notifications: Arc<dyn NotificationStore>,
        appointments: Arc<dyn AppointmentStore>,
        transport: Arc<dyn TransportClient>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            notifications,
            appointments,
            transport,
            config,
        }
    }

    /// One dispatch tick: select a bounded batch of due records and process
    /// each independently. A failure on one record never aborts the rest.
    pub async fn process_queue(&self) -> Result<DispatchSummary, NotificationError> {
        let batch = self
            .notifications
            .find_dispatchable(Utc::now(), self.config.batch_size)
            .await?;

        debug!("Dispatch tick selected {} notification(s)", batch.len());

        let mut summary = DispatchSummary {
            selected: batch.len(),
            ..Default::default()
        };

        for notification in batch {
            let id = notification.id;
            match self.dispatch_one(notification).await {
                Ok(DispatchOutcome::Sent) => summary.sent += 1,
                Ok(DispatchOutcome::Failed) => summary.failed += 1,
                Ok(DispatchOutcome::Skipped) => summary.skipped += 1,
                Err(e) => {
                    summary.failed += 1;
                    error!("Notification {} processing failed: {}", id, e);
                }
            }
        }

        info!(
            "Dispatch tick complete: {} sent, {} failed, {} skipped",
            summary.sent, summary.failed, summary.skipped
        );

        Ok(summary)
    }

    async fn dispatch_one(
        &self,
        notification: Notification,
    ) -> Result<DispatchOutcome, NotificationError> {
        // Compare-and-set claim: a record re-selected by an overlapping tick
        // fails the claim there and is skipped, never double-sent.
        let Some(claimed) = self.notifications.claim_for_sending(notification.id).await? else {
            debug!(
                "Notification {} already claimed by another tick",
                notification.id
            );
            return Ok(DispatchOutcome::Skipped);
        };

        match self.send_claimed(&claimed).await {
            Ok(twilio_sid) => {
                self.notifications
                    .mark_sent(claimed.id, &twilio_sid, Utc::now())
                    .await?;
                info!("Notification {} sent (sid {})", claimed.id, twilio_sid);
                Ok(DispatchOutcome::Sent)
            }
            Err(reason) => {
                let attempts = claimed.retry_count + 1;
                self.notifications
                    .mark_failed(claimed.id, attempts, &reason)
                    .await?;
                warn!(
                    "Notification {} failed (attempt {}/{}): {}",
                    claimed.id, attempts, MAX_SEND_ATTEMPTS, reason
                );
                Ok(DispatchOutcome::Failed)
            }
        }
    }

    /// Resolve the destination through the appointment's client and run the
    /// transport call under the per-record timeout. Any failure becomes the
    /// stored failure reason.
    async fn send_claimed(&self, notification: &Notification) -> Result<String, String> {
        let details = self
            .appointments
            .find_details(notification.appointment_id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("appointment {} not found", notification.appointment_id))?;

        let send = self
            .transport
            .send(&details.client.whatsapp_number, &notification.message);

        match timeout(self.config.send_timeout, send).await {
            Ok(Ok(twilio_sid)) => Ok(twilio_sid),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "transport send timed out after {}s",
                self.config.send_timeout.as_secs()
            )),
        }
    }
}
