use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::router::create_appointment_router;
use appointment_cell::services::booking::BookingService;
use notification_cell::router::create_notification_router;
use notification_cell::NotificationState;

pub fn create_router(
    booking: Arc<BookingService>,
    notifications: Arc<NotificationState>,
) -> Router {
    Router::new()
        .route("/", get(|| async { "Studio Booking API is running!" }))
        .nest("/appointments", create_appointment_router(booking))
        .merge(create_notification_router(notifications))
}
