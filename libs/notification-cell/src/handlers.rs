use std::sync::Arc;

use axum::{extract::State, response::Json, Form};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use shared_config::AppConfig;
use shared_models::AppError;

use crate::services::dispatcher::NotificationDispatchService;
use crate::services::ingestor::DeliveryStatusIngestorService;

/// Injected dependencies for the notification endpoints.
pub struct NotificationState {
    pub config: Arc<AppConfig>,
    pub dispatcher: Arc<NotificationDispatchService>,
    pub ingestor: Arc<DeliveryStatusIngestorService>,
}

#[derive(Debug, Deserialize)]
pub struct TwilioStatusCallback {
    #[serde(rename = "MessageSid", default)]
    pub message_sid: Option<String>,
    #[serde(rename = "MessageStatus", default)]
    pub message_status: Option<String>,
}

/// Delivery-status callback from Twilio; configure the URL in the Twilio
/// console. Succeeds unconditionally once the update is applied.
pub async fn twilio_status_webhook(
    State(state): State<Arc<NotificationState>>,
    Form(payload): Form<TwilioStatusCallback>,
) -> Result<Json<Value>, AppError> {
    let (Some(message_sid), Some(message_status)) =
        (payload.message_sid, payload.message_status)
    else {
        return Err(AppError::BadRequest(
            "Missing MessageSid or MessageStatus".to_string(),
        ));
    };

    state.ingestor.ingest(&message_sid, &message_status).await?;

    info!("Status callback applied: {} -> {}", message_sid, message_status);

    Ok(Json(json!({ "success": true })))
}

/// Run one dispatch tick synchronously. Meant for operational use and
/// external cron services; guarded by the shared-secret bearer credential
/// when one is configured.
pub async fn process_queue(
    State(state): State<Arc<NotificationState>>,
    authorization: Option<TypedHeader<Authorization<Bearer>>>,
) -> Result<Json<Value>, AppError> {
    if let Some(secret) = &state.config.cron_secret {
        let presented = authorization
            .as_ref()
            .map(|TypedHeader(bearer)| bearer.token());

        if presented != Some(secret.as_str()) {
            return Err(AppError::Auth(
                "Invalid or missing bearer credential".to_string(),
            ));
        }
    }

    let summary = state.dispatcher.process_queue().await?;

    Ok(Json(json!({ "success": true, "summary": summary })))
}
