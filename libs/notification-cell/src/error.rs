use thiserror::Error;
use uuid::Uuid;

use appointment_cell::AppointmentError;
use shared_models::AppError;

use crate::transport::TransportError;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Notification not found: {0}")]
    NotFound(Uuid),

    #[error("Appointment not found: {0}")]
    AppointmentNotFound(Uuid),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<AppointmentError> for NotificationError {
    fn from(err: AppointmentError) -> Self {
        NotificationError::Database(err.to_string())
    }
}

impl From<NotificationError> for AppError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::NotFound(id) => {
                AppError::NotFound(format!("Notification not found: {}", id))
            }
            NotificationError::AppointmentNotFound(id) => {
                AppError::NotFound(format!("Appointment not found: {}", id))
            }
            NotificationError::Validation(msg) => AppError::BadRequest(msg),
            NotificationError::Database(msg) => AppError::Database(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}
