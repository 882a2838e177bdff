use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use shared_config::AppConfig;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("transport request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("transport rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("transport response missing message sid")]
    MissingSid,
}

/// Outbound messaging channel: sends one message, returns the
/// provider-assigned message identifier.
#[async_trait]
pub trait TransportClient: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> Result<String, TransportError>;
}

/// Twilio WhatsApp messaging API. `to` is a bare E.164 number; the
/// `whatsapp:` prefix is added here, while the configured sender number
/// already carries it.
pub struct TwilioWhatsAppClient {
    client: Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
    base_url: String,
}

impl TwilioWhatsAppClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            account_sid: config.twilio_account_sid.clone(),
            auth_token: config.twilio_auth_token.clone(),
            from_number: config.twilio_whatsapp_number.clone(),
            base_url: config.twilio_base_url.clone(),
        }
    }
}

#[async_trait]
impl TransportClient for TwilioWhatsAppClient {
    async fn send(&self, to: &str, body: &str) -> Result<String, TransportError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        );
        debug!("Sending WhatsApp message via {}", url);

        let params = [
            ("From", self.from_number.clone()),
            ("To", format!("whatsapp:{}", to)),
            ("Body", body.to_string()),
        ];

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response.json().await?;

        payload
            .get("sid")
            .and_then(|sid| sid.as_str())
            .map(str::to_string)
            .ok_or(TransportError::MissingSid)
    }
}
