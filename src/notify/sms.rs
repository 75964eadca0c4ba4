//! SMS gateway client.
//!
//! Speaks the form-encoded HTTP API of a Twilio-style SMS provider. One
//! shared `reqwest::Client` with a bounded request timeout; the coordinator
//! decides whether delivery failures matter.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{NotificationDispatcher, NotifyError};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// SMS gateway configuration.
#[derive(Debug, Clone)]
pub struct SmsConfig {
    /// Base URL of the gateway API, e.g. `https://api.twilio.com/2010-04-01`.
    pub api_url: String,
    /// Account identifier, also the basic-auth username.
    pub account_sid: String,
    /// API token, the basic-auth password.
    pub auth_token: String,
    /// Sender phone number.
    pub from_number: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl SmsConfig {
    /// Load configuration from environment variables. Returns `None` when the
    /// gateway is not configured.
    pub fn from_env() -> Option<Self> {
        let api_url = std::env::var("SMS_API_URL").ok()?;
        let account_sid = std::env::var("SMS_ACCOUNT_SID").ok()?;
        let auth_token = std::env::var("SMS_AUTH_TOKEN").ok()?;
        let from_number = std::env::var("SMS_FROM_NUMBER").ok()?;
        let request_timeout = std::env::var("SMS_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        Some(Self {
            api_url,
            account_sid,
            auth_token,
            from_number,
            request_timeout,
        })
    }
}

/// Dispatcher backed by an SMS HTTP gateway.
pub struct SmsGateway {
    config: SmsConfig,
    http_client: reqwest::Client,
}

impl SmsGateway {
    pub fn new(config: SmsConfig) -> Result<Self, NotifyError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/Accounts/{}/Messages.json",
            self.config.api_url.trim_end_matches('/'),
            self.config.account_sid
        )
    }
}

#[async_trait]
impl NotificationDispatcher for SmsGateway {
    async fn notify(&self, destination: &str, message: &str) -> Result<(), NotifyError> {
        debug!(destination, "sending SMS notification");

        let response = self
            .http_client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[
                ("To", destination),
                ("From", self.config.from_number.as_str()),
                ("Body", message),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Gateway { status, body });
        }

        Ok(())
    }
}
