use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use appointment_cell::services::booking::ReminderScheduling;
use appointment_cell::store::AppointmentStore;

use crate::error::NotificationError;
use crate::models::{Notification, REMINDER_LEAD_HOURS};
use crate::services::composer::ReminderComposerService;

/// Computes a reminder's fire time and queues it through the composer. The
/// fire time is persisted on the notification (`send_after`) and honored by
/// the dispatch worker's selection query, so scheduled reminders survive a
/// process restart.
pub struct ReminderSchedulerService {
    appointments: Arc<dyn AppointmentStore>,
    composer: Arc<ReminderComposerService>,
}

impl ReminderSchedulerService {
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        composer: Arc<ReminderComposerService>,
    ) -> Self {
        Self {
            appointments,
            composer,
        }
    }

    /// Queue the 24h reminder for an appointment. A booking made with under
    /// 24h notice gets no reminder; that is a silent no-op, not an error.
    pub async fn schedule(
        &self,
        appointment_id: Uuid,
    ) -> Result<Option<Notification>, NotificationError> {
        let appointment = self
            .appointments
            .find_by_id(appointment_id)
            .await?
            .ok_or(NotificationError::AppointmentNotFound(appointment_id))?;

        let fire_at = appointment.start_time - Duration::hours(REMINDER_LEAD_HOURS);

        if fire_at <= Utc::now() {
            debug!(
                "Appointment {} starts in under {}h, no reminder scheduled",
                appointment_id, REMINDER_LEAD_HOURS
            );
            return Ok(None);
        }

        let notification = self
            .composer
            .compose_reminder(appointment_id, Some(fire_at))
            .await?;

        Ok(Some(notification))
    }
}

#[async_trait]
impl ReminderScheduling for ReminderSchedulerService {
    async fn schedule_for(&self, appointment_id: Uuid) -> anyhow::Result<()> {
        self.schedule(appointment_id).await?;
        Ok(())
    }
}
