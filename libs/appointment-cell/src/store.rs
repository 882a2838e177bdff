use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use shared_database::SupabaseClient;

use crate::models::{
    Appointment, AppointmentDetails, AppointmentError, AppointmentStatus, NewAppointment,
};

/// Booking-side port over the record store. The dispatch subsystem reads
/// appointments through this interface as well, always by id.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, AppointmentError>;

    /// Appointment joined with its client and service rows.
    async fn find_details(&self, id: Uuid)
        -> Result<Option<AppointmentDetails>, AppointmentError>;

    /// Non-deleted appointments of one provider whose stored interval
    /// intersects `[start, end)`. Status filtering is the caller's concern.
    async fn find_overlapping(
        &self,
        provider_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>, AppointmentError>;

    async fn create(&self, new: NewAppointment) -> Result<Appointment, AppointmentError>;

    async fn update_times(
        &self,
        id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError>;

    async fn update_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError>;

    async fn soft_delete(&self, id: Uuid) -> Result<(), AppointmentError>;
}

pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn patch(&self, id: Uuid, body: serde_json::Value) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", id);

        let updated: Vec<Appointment> = self
            .supabase
            .request(Method::PATCH, &path, Some(body))
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        updated.into_iter().next().ok_or(AppointmentError::NotFound)
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}&limit=1", id);

        let result: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        Ok(result.into_iter().next())
    }

    async fn find_details(
        &self,
        id: Uuid,
    ) -> Result<Option<AppointmentDetails>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&select=*,client:clients(*),service:services(*)&limit=1",
            id
        );

        let result: Vec<AppointmentDetails> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        Ok(result.into_iter().next())
    }

    async fn find_overlapping(
        &self,
        provider_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        // Half-open intervals: a row intersects [start, end) iff its start is
        // before `end` and its end is after `start`.
        let mut query_parts = vec![
            format!("provider_id=eq.{}", provider_id),
            format!("start_time=lt.{}", end.to_rfc3339()),
            format!("end_time=gt.{}", start.to_rfc3339()),
            "deleted_at=is.null".to_string(),
        ];

        if let Some(exclude_id) = exclude_appointment_id {
            query_parts.push(format!("id=neq.{}", exclude_id));
        }

        let path = format!(
            "/rest/v1/appointments?{}&order=start_time.asc",
            query_parts.join("&")
        );

        let result: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        Ok(result)
    }

    async fn create(&self, new: NewAppointment) -> Result<Appointment, AppointmentError> {
        let body = json!({
            "provider_id": new.provider_id,
            "client_id": new.client_id,
            "service_id": new.service_id,
            "start_time": new.start_time,
            "end_time": new.end_time,
            "notes": new.notes,
            "status": AppointmentStatus::Scheduled,
        });

        let created: Vec<Appointment> = self
            .supabase
            .request(Method::POST, "/rest/v1/appointments", Some(body))
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        created
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::Database("insert returned no row".to_string()))
    }

    async fn update_times(
        &self,
        id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        self.patch(
            id,
            json!({
                "start_time": start,
                "end_time": end,
                "updated_at": Utc::now(),
            }),
        )
        .await
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        self.patch(
            id,
            json!({
                "status": status,
                "updated_at": Utc::now(),
            }),
        )
        .await
    }

    async fn soft_delete(&self, id: Uuid) -> Result<(), AppointmentError> {
        self.patch(
            id,
            json!({
                "deleted_at": Utc::now(),
                "updated_at": Utc::now(),
            }),
        )
        .await?;

        Ok(())
    }
}
