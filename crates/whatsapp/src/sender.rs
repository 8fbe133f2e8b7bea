//! Outbound text delivery through the Graph API.

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    tracing::debug,
};

use charla_common::Outbound;

/// Errors from the Graph send path.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Graph API returned HTTP {status}: {body}")]
    Api { status: u16, body: String },
}

/// WhatsApp Cloud API sender.
///
/// POSTs text messages to `/{version}/{phone_number_id}/messages` with a
/// bearer token. One instance serves one phone number.
pub struct MetaSender {
    base_url: String,
    api_version: String,
    phone_number_id: String,
    access_token: Secret<String>,
    client: reqwest::Client,
}

impl MetaSender {
    pub fn new(
        phone_number_id: String,
        access_token: Secret<String>,
        api_version: String,
    ) -> Result<Self, SendError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self {
            base_url: "https://graph.facebook.com".to_string(),
            api_version,
            phone_number_id,
            access_token,
            client,
        })
    }

    /// Point the sender at a different Graph host. Test hook.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn deliver(&self, to: &str, body: &str) -> Result<(), SendError> {
        let url = format!(
            "{}/{}/{}/messages",
            self.base_url, self.api_version, self.phone_number_id
        );
        let resp = self
            .client
            .post(url)
            .bearer_auth(self.access_token.expose_secret())
            .json(&serde_json::json!({
                "messaging_product": "whatsapp",
                "to": to,
                "type": "text",
                "text": { "body": body },
            }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SendError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Outbound for MetaSender {
    async fn send_text(&self, to: &str, body: &str) -> anyhow::Result<()> {
        self.deliver(to, body).await?;
        debug!(to, "whatsapp message sent");
        Ok(())
    }

    fn name(&self) -> &str {
        "whatsapp"
    }
}
