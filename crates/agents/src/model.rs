use {async_trait::async_trait, thiserror::Error};

// ── Typed chat messages ─────────────────────────────────────────────────────

/// Typed chat message for the generation interface.
///
/// Only contains generation-relevant fields; session metadata like
/// timestamps or channel ids cannot exist here, so they can never leak into
/// provider API requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatMessage {
    System { content: String },
    User { content: String },
    Assistant { content: String },
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: content.into(),
        }
    }

    /// Convert to OpenAI Chat Completions JSON format.
    #[must_use]
    pub fn to_openai_value(&self) -> serde_json::Value {
        match self {
            ChatMessage::System { content } => {
                serde_json::json!({ "role": "system", "content": content })
            },
            ChatMessage::User { content } => {
                serde_json::json!({ "role": "user", "content": content })
            },
            ChatMessage::Assistant { content } => {
                serde_json::json!({ "role": "assistant", "content": content })
            },
        }
    }
}

// ── Generation errors ───────────────────────────────────────────────────────

/// Why a generation call failed.
///
/// Callers log these and degrade to silence; no generation failure may
/// surface to the end user as an exception.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("provider returned an empty completion")]
    EmptyCompletion,
}

// ── Provider trait ──────────────────────────────────────────────────────────

/// Text-generation collaborator.
///
/// One blocking-style call: messages in, completion text out. `model`
/// overrides the provider's configured default for this call only (the
/// classifier runs on a cheaper model than the conversational replies).
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn name(&self) -> &str;

    async fn create_chat(
        &self,
        messages: &[ChatMessage],
        model: Option<&str>,
    ) -> Result<String, GenerationError>;
}
