use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{AppointmentError, ConflictCheck};
use crate::store::AppointmentStore;

/// Interval-conflict detection over a provider's existing bookings.
///
/// Intervals are half-open: `[10:00, 11:00)` and `[11:00, 12:00)` do not
/// conflict. Cancelled and soft-deleted appointments never conflict.
pub struct ConflictDetectionService {
    store: Arc<dyn AppointmentStore>,
}

impl ConflictDetectionService {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self { store }
    }

    /// Two half-open intervals overlap iff each starts before the other ends.
    pub fn intervals_overlap(
        start1: DateTime<Utc>,
        end1: DateTime<Utc>,
        start2: DateTime<Utc>,
        end2: DateTime<Utc>,
    ) -> bool {
        start1 < end2 && start2 < end1
    }

    /// Check whether `[start, end)` collides with an active booking for the
    /// provider. `exclude_appointment_id` lets an in-place update compare
    /// against everything except itself. Pure predicate, no side effects.
    pub async fn check_conflict(
        &self,
        provider_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<ConflictCheck, AppointmentError> {
        debug!(
            "Checking conflicts for provider {} from {} to {}",
            provider_id, start, end
        );

        let existing = self
            .store
            .find_overlapping(provider_id, start, end, exclude_appointment_id)
            .await?;

        let conflicting_appointments: Vec<_> = existing
            .into_iter()
            .filter(|apt| apt.is_active())
            .filter(|apt| Some(apt.id) != exclude_appointment_id)
            .filter(|apt| Self::intervals_overlap(start, end, apt.start_time, apt.end_time))
            .collect();

        let has_conflict = !conflicting_appointments.is_empty();

        if has_conflict {
            warn!(
                "Conflict detected for provider {} - {} overlapping appointments",
                provider_id,
                conflicting_appointments.len()
            );
        }

        Ok(ConflictCheck {
            has_conflict,
            conflicting_appointments,
        })
    }

    /// Like `check_conflict`, but collapses the answer into an error.
    pub async fn ensure_slot_free(
        &self,
        provider_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<(), AppointmentError> {
        let check = self
            .check_conflict(provider_id, start, end, exclude_appointment_id)
            .await?;

        if check.has_conflict {
            return Err(AppointmentError::Conflict);
        }

        Ok(())
    }
}
