use std::sync::Arc;

use axum::{routing::post, Router};

use crate::handlers::{process_queue, twilio_status_webhook, NotificationState};

pub fn create_notification_router(state: Arc<NotificationState>) -> Router {
    Router::new()
        .route("/webhooks/twilio", post(twilio_status_webhook))
        .route("/notifications/process-queue", post(process_queue))
        .with_state(state)
}
