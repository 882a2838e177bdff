use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use appointment_cell::models::AppointmentDetails;
use appointment_cell::store::AppointmentStore;

use crate::error::NotificationError;
use crate::models::{NewNotification, Notification, NotificationType};
use crate::store::NotificationStore;

/// Builds reminder notifications. The single place where message content is
/// rendered; everything downstream treats the body as opaque text.
pub struct ReminderComposerService {
    appointments: Arc<dyn AppointmentStore>,
    notifications: Arc<dyn NotificationStore>,
}

impl ReminderComposerService {
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        notifications: Arc<dyn NotificationStore>,
    ) -> Self {
        Self {
            appointments,
            notifications,
        }
    }

    /// Render the reminder for an appointment and queue it, due at
    /// `send_after` (immediately dispatchable when `None`).
    pub async fn compose_reminder(
        &self,
        appointment_id: Uuid,
        send_after: Option<DateTime<Utc>>,
    ) -> Result<Notification, NotificationError> {
        let details = self
            .appointments
            .find_details(appointment_id)
            .await?
            .ok_or(NotificationError::AppointmentNotFound(appointment_id))?;

        let message = Self::render_message(&details);

        let notification = self
            .notifications
            .create(NewNotification {
                appointment_id,
                provider_id: details.appointment.provider_id,
                client_id: details.appointment.client_id,
                notification_type: NotificationType::Reminder24h,
                message,
                send_after,
            })
            .await?;

        info!(
            "Reminder {} queued for appointment {}",
            notification.id, appointment_id
        );

        Ok(notification)
    }

    fn render_message(details: &AppointmentDetails) -> String {
        format!(
            "Hi {}! Just a reminder: your {} appointment is tomorrow at {}. See you soon!",
            details.client.first_name,
            details.service.name,
            details.appointment.start_time.format("%H:%M")
        )
    }
}
