//! Retrying structured extraction.
//!
//! The extractor asks the model for strict JSON and parses the response into
//! a typed record. Model output is unreliable, so parse failures retry up to
//! a bounded attempt count; exhaustion is an ordinary outcome the caller
//! treats as "no new fields this turn", never a crash.

use {serde::de::DeserializeOwned, thiserror::Error, tracing::debug};

use crate::model::{ChatMessage, ChatModel, GenerationError};

/// Why extraction produced no record.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The generation call itself failed; retrying would hit the same wall.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Every attempt returned unparseable output.
    #[error("no parseable JSON after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

/// Ask the model for JSON and parse it into `T`, retrying on parse failure.
///
/// `max_attempts` bounds the loop (values below 1 are treated as 1). There
/// is no added backoff beyond what the provider itself imposes.
pub async fn extract_json<T: DeserializeOwned>(
    model: &dyn ChatModel,
    prompt: &str,
    max_attempts: u32,
) -> Result<T, ExtractError> {
    let attempts = max_attempts.max(1);
    let messages = [ChatMessage::user(prompt)];
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        let raw = model.create_chat(&messages, None).await?;
        match parse_json_payload(&raw) {
            Ok(value) => return Ok(value),
            Err(err) => {
                debug!(attempt, error = %err, "extraction parse failed");
                last_error = err;
            },
        }
    }

    Err(ExtractError::Exhausted {
        attempts,
        last_error,
    })
}

/// Parse model output as JSON, tolerating code fences and surrounding prose
/// by falling back to the outermost `{…}` span.
fn parse_json_payload<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    let trimmed = raw.trim();
    match serde_json::from_str(trimmed) {
        Ok(value) => Ok(value),
        Err(direct_err) => {
            let start = trimmed.find('{');
            let end = trimmed.rfind('}');
            if let (Some(start), Some(end)) = (start, end)
                && start < end
            {
                serde_json::from_str(&trimmed[start..=end]).map_err(|e| e.to_string())
            } else {
                Err(direct_err.to_string())
            }
        },
    }
}
