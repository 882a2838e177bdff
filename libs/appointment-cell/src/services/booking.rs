use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, CreateAppointmentRequest, NewAppointment,
    UpdateAppointmentRequest,
};
use crate::services::conflict::ConflictDetectionService;
use crate::store::AppointmentStore;

/// Booking-side port for arranging appointment reminders. Implemented by the
/// notification subsystem; booking never fails on a reminder problem.
#[async_trait]
pub trait ReminderScheduling: Send + Sync {
    async fn schedule_for(&self, appointment_id: Uuid) -> anyhow::Result<()>;
}

/// Creates and moves appointments. Every write that creates or moves an
/// interval runs the conflict check first and re-checks right after the
/// write: two concurrent requests can both pass the first check before
/// either row is visible, so the loser is rolled back.
pub struct BookingService {
    store: Arc<dyn AppointmentStore>,
    conflicts: ConflictDetectionService,
    reminders: Arc<dyn ReminderScheduling>,
}

impl BookingService {
    pub fn new(store: Arc<dyn AppointmentStore>, reminders: Arc<dyn ReminderScheduling>) -> Self {
        Self {
            conflicts: ConflictDetectionService::new(store.clone()),
            store,
            reminders,
        }
    }

    pub fn conflicts(&self) -> &ConflictDetectionService {
        &self.conflicts
    }

    fn validate_interval(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), AppointmentError> {
        if start >= end {
            return Err(AppointmentError::invalid_time(
                "end_time",
                "end_time must be after start_time",
            ));
        }
        Ok(())
    }

    pub async fn create_appointment(
        &self,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        Self::validate_interval(request.start_time, request.end_time)?;

        self.conflicts
            .ensure_slot_free(request.provider_id, request.start_time, request.end_time, None)
            .await?;

        let appointment = self
            .store
            .create(NewAppointment {
                provider_id: request.provider_id,
                client_id: request.client_id,
                service_id: request.service_id,
                start_time: request.start_time,
                end_time: request.end_time,
                notes: request.notes,
            })
            .await?;

        // Close the check-then-act window: if a concurrent booking slipped in
        // between check and insert, the later row loses and is removed.
        let recheck = self
            .conflicts
            .check_conflict(
                appointment.provider_id,
                appointment.start_time,
                appointment.end_time,
                Some(appointment.id),
            )
            .await?;

        if recheck.has_conflict {
            self.store.soft_delete(appointment.id).await?;
            return Err(AppointmentError::Conflict);
        }

        if let Err(e) = self.reminders.schedule_for(appointment.id).await {
            warn!(
                "Reminder scheduling failed for appointment {}: {}",
                appointment.id, e
            );
        }

        info!(
            "Appointment {} booked for provider {} from {} to {}",
            appointment.id, appointment.provider_id, appointment.start_time, appointment.end_time
        );

        Ok(appointment)
    }

    pub async fn update_appointment(
        &self,
        id: Uuid,
        request: UpdateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let current = self
            .store
            .find_by_id(id)
            .await?
            .filter(|apt| apt.deleted_at.is_none())
            .ok_or(AppointmentError::NotFound)?;

        let mut appointment = current.clone();

        if request.start_time.is_some() || request.end_time.is_some() {
            let start = request.start_time.unwrap_or(current.start_time);
            let end = request.end_time.unwrap_or(current.end_time);

            Self::validate_interval(start, end)?;

            self.conflicts
                .ensure_slot_free(current.provider_id, start, end, Some(id))
                .await?;

            appointment = self.store.update_times(id, start, end).await?;

            let recheck = self
                .conflicts
                .check_conflict(current.provider_id, start, end, Some(id))
                .await?;

            if recheck.has_conflict {
                // Lost the race to a concurrent writer; restore the old slot.
                self.store
                    .update_times(id, current.start_time, current.end_time)
                    .await?;
                return Err(AppointmentError::Conflict);
            }
        }

        if let Some(status) = request.status {
            appointment = self.store.update_status(id, status).await?;
        }

        info!("Appointment {} updated", id);

        Ok(appointment)
    }

    pub async fn cancel_appointment(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        self.store
            .find_by_id(id)
            .await?
            .filter(|apt| apt.deleted_at.is_none())
            .ok_or(AppointmentError::NotFound)?;

        let cancelled = self
            .store
            .update_status(id, AppointmentStatus::Cancelled)
            .await?;

        info!("Appointment {} cancelled", id);

        Ok(cancelled)
    }

    pub async fn delete_appointment(&self, id: Uuid) -> Result<(), AppointmentError> {
        self.store
            .find_by_id(id)
            .await?
            .filter(|apt| apt.deleted_at.is_none())
            .ok_or(AppointmentError::NotFound)?;

        self.store.soft_delete(id).await?;

        info!("Appointment {} soft-deleted", id);

        Ok(())
    }
}
