use std::sync::Arc;

use axum::{
    routing::{patch, post},
    Router,
};

use crate::handlers::{
    cancel_appointment, create_appointment, delete_appointment, update_appointment,
};
use crate::services::booking::BookingService;

pub fn create_appointment_router(booking: Arc<BookingService>) -> Router {
    Router::new()
        .route("/", post(create_appointment))
        .route("/{id}", patch(update_appointment).delete(delete_appointment))
        .route("/{id}/cancel", post(cancel_appointment))
        .with_state(booking)
}
