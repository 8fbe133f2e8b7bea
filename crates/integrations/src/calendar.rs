//! Calendar webhook sink.
//!
//! Confirmed service data is flattened into a [`CalendarRecord`] and posted
//! to a spreadsheet-backed webhook. Empty and null fields are normalized to
//! `"-"` so the receiving sheet never shows blank cells.

use {
    async_trait::async_trait,
    serde::Serialize,
    thiserror::Error,
    tracing::{debug, warn},
};

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("calendar request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("calendar endpoint returned {status}: {body}")]
    Api { status: u16, body: String },
}

/// One confirmed service, ready for the scheduling sheet.
#[derive(Debug, Clone, Serialize)]
pub struct CalendarRecord {
    /// Record family, e.g. `"lead"` or `"quote"`.
    pub kind: String,
    pub service_id: String,
    pub fields: serde_json::Map<String, serde_json::Value>,
    /// Local capture time, `dd/mm/yyyy HH:MM`.
    pub captured_at: String,
}

impl CalendarRecord {
    pub fn new(kind: &str, service_id: &str, data: &serde_json::Value) -> Self {
        let mut fields = serde_json::Map::new();
        if let Some(map) = data.as_object() {
            flatten_into(&mut fields, None, map);
        }
        Self {
            kind: kind.to_string(),
            service_id: service_id.to_string(),
            fields,
            captured_at: chrono::Local::now().format("%d/%m/%Y %H:%M").to_string(),
        }
    }
}

/// Flattens nested objects into `parent_child` keys and rewrites null or
/// empty leaves as `"-"`.
fn flatten_into(
    out: &mut serde_json::Map<String, serde_json::Value>,
    prefix: Option<&str>,
    map: &serde_json::Map<String, serde_json::Value>,
) {
    for (key, value) in map {
        let name = match prefix {
            Some(p) => format!("{p}_{key}"),
            None => key.clone(),
        };
        match value {
            serde_json::Value::Object(nested) => flatten_into(out, Some(&name), nested),
            serde_json::Value::Null => {
                out.insert(name, serde_json::Value::String("-".to_string()));
            },
            serde_json::Value::String(s) if s.trim().is_empty() => {
                out.insert(name, serde_json::Value::String("-".to_string()));
            },
            other => {
                out.insert(name, other.clone());
            },
        }
    }
}

#[async_trait]
pub trait Calendar: Send + Sync {
    async fn app_to_calendar(&self, record: &CalendarRecord) -> Result<(), CalendarError>;
}

/// Posts records as JSON to a configured webhook URL.
pub struct WebhookCalendar {
    url: String,
    client: reqwest::Client,
}

impl WebhookCalendar {
    pub fn new(url: String) -> Result<Self, CalendarError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self { url, client })
    }
}

#[async_trait]
impl Calendar for WebhookCalendar {
    async fn app_to_calendar(&self, record: &CalendarRecord) -> Result<(), CalendarError> {
        let resp = self.client.post(&self.url).json(record).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "calendar webhook rejected record");
            return Err(CalendarError::Api {
                status: status.as_u16(),
                body,
            });
        }
        debug!(service = %record.service_id, "calendar record delivered");
        Ok(())
    }
}
