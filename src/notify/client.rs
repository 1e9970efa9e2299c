//! Pushover message client.

use crate::config::NotifySettings;
use crate::error::TransportError;
use crate::models::NotificationRequest;
use crate::retry::HttpReply;
use std::time::Duration;
use tracing::debug;

/// Per-request timeout for deliveries; shorter than the query timeout.
pub const PUSH_TIMEOUT: Duration = Duration::from_secs(15);

/// Something that accepts push notifications.
#[allow(async_fn_in_trait)]
pub trait PushGateway {
    async fn push(&self, request: &NotificationRequest) -> Result<HttpReply, TransportError>;
}

/// Posts form-encoded messages to the Pushover API.
pub struct PushoverClient {
    http_client: reqwest::Client,
    api_url: String,
    token: String,
    user: String,
}

impl PushoverClient {
    pub fn new(settings: &NotifySettings) -> Result<Self, TransportError> {
        let http_client = reqwest::Client::builder()
            .timeout(PUSH_TIMEOUT)
            .build()?;

        Ok(Self {
            http_client,
            api_url: settings.api_url.clone(),
            token: settings.token.clone(),
            user: settings.user.clone(),
        })
    }

    /// Credentials first, then the message fields.
    fn form(&self, request: &NotificationRequest) -> Vec<(&'static str, String)> {
        let mut form = vec![("token", self.token.clone()), ("user", self.user.clone())];
        form.extend(request.form_fields());
        form
    }
}

impl PushGateway for PushoverClient {
    async fn push(&self, request: &NotificationRequest) -> Result<HttpReply, TransportError> {
        debug!("POST {}", self.api_url);

        let response = self
            .http_client
            .post(&self.api_url)
            .form(&self.form(request))
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpReply::new(status, body))
    }
}
