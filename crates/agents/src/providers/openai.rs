use std::time::Duration;

use {async_trait::async_trait, secrecy::ExposeSecret};

use tracing::{debug, trace, warn};

use crate::model::{ChatMessage, ChatModel, GenerationError};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible chat-completions provider.
///
/// Works against any endpoint speaking the Chat Completions API. The request
/// timeout is baked into the client so every call is bounded.
pub struct OpenAiChat {
    api_key: secrecy::Secret<String>,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiChat {
    pub fn new(
        api_key: secrecy::Secret<String>,
        model: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    fn name(&self) -> &str {
        "openai"
    }

    async fn create_chat(
        &self,
        messages: &[ChatMessage],
        model: Option<&str>,
    ) -> Result<String, GenerationError> {
        let model = model.unwrap_or(&self.model);
        let openai_messages: Vec<serde_json::Value> =
            messages.iter().map(ChatMessage::to_openai_value).collect();
        let body = serde_json::json!({
            "model": model,
            "messages": openai_messages,
        });

        debug!(
            model,
            messages_count = messages.len(),
            "chat completion request"
        );
        trace!(body = %serde_json::to_string(&body).unwrap_or_default(), "request body");

        let http_resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = http_resp.status();
        if !status.is_success() {
            let body_text = http_resp.text().await.unwrap_or_default();
            warn!(status = %status, model, body = %body_text, "chat completion API error");
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let resp = http_resp.json::<serde_json::Value>().await?;
        trace!(response = %resp, "raw response");

        let text = resp["choices"][0]["message"]["content"]
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        text.ok_or(GenerationError::EmptyCompletion)
    }
}
