use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use shared_models::AppError;

use crate::models::{CreateAppointmentRequest, UpdateAppointmentRequest};
use crate::services::booking::BookingService;

/// Book a new appointment. Overlapping slots come back as 409.
pub async fn create_appointment(
    State(booking): State<Arc<BookingService>>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    info!(
        "Booking request for provider {} at {}",
        request.provider_id, request.start_time
    );

    let appointment = booking.create_appointment(request).await?;

    Ok((StatusCode::CREATED, Json(json!(appointment))))
}

/// Partially update an appointment; moving its interval re-runs the
/// conflict check against everything except the appointment itself.
pub async fn update_appointment(
    State(booking): State<Arc<BookingService>>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = booking.update_appointment(id, request).await?;

    Ok(Json(json!(appointment)))
}

pub async fn cancel_appointment(
    State(booking): State<Arc<BookingService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = booking.cancel_appointment(id).await?;

    Ok(Json(json!(appointment)))
}

pub async fn delete_appointment(
    State(booking): State<Arc<BookingService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    booking.delete_appointment(id).await?;

    Ok(Json(json!({ "success": true })))
}
