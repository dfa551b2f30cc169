//! Outbound mail transport
//!
//! Thin client for an HTTP mail API, used to deliver password-reset links.
//! Configured entirely from the environment; when unconfigured, sends are
//! skipped with a warning so local development works without a mail
//! provider.

use std::time::Duration;

use serde_json::json;

/// Bound on the mail API round trip; a hung provider must not hold a
/// request handler open.
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail transport not configured")]
    NotConfigured,
    #[error("mail API request failed: {0}")]
    Transport(String),
    #[error("mail API returned status {0}")]
    Rejected(u16),
    #[error("mail API timed out")]
    Timeout,
}

#[derive(Clone)]
pub struct MailService {
    api_url: Option<String>,
    api_key: Option<String>,
    from: String,
    client: reqwest::Client,
}

impl MailService {
    /// Build from MAIL_API_URL / MAIL_API_KEY / MAIL_FROM.
    pub fn from_env() -> Self {
        Self {
            api_url: std::env::var("MAIL_API_URL").ok(),
            api_key: std::env::var("MAIL_API_KEY").ok(),
            from: std::env::var("MAIL_FROM")
                .unwrap_or_else(|_| "no-reply@imagestore.local".to_string()),
            client: reqwest::Client::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.api_url.is_some() && self.api_key.is_some()
    }

    /// Send a plain-text mail. The body may contain a reset link but never
    /// ends up in logs.
    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let (Some(api_url), Some(api_key)) = (&self.api_url, &self.api_key) else {
            return Err(MailError::NotConfigured);
        };

        let request = self
            .client
            .post(api_url)
            .bearer_auth(api_key)
            .json(&json!({
                "from": self.from,
                "to": [to],
                "subject": subject,
                "text": body,
            }))
            .send();

        let response = tokio::time::timeout(SEND_TIMEOUT, request)
            .await
            .map_err(|_| MailError::Timeout)?
            .map_err(|e| MailError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(MailError::Rejected(response.status().as_u16()));
        }

        tracing::info!(to = %to, subject = %subject, "Mail sent");
        Ok(())
    }
}
