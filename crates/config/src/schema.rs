/// Config schema types (server, generation, queue, reminders, pacing,
/// takeover, sessions, channels, CRM, calendar, known users).
use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CharlaConfig {
    pub server: ServerConfig,
    pub generation: GenerationConfig,
    pub queue: QueueConfig,
    pub reminders: RemindersConfig,
    pub pacing: PacingConfig,
    pub takeover: TakeoverConfig,
    pub sessions: SessionsConfig,
    pub whatsapp: WhatsappConfig,
    pub crm: CrmConfig,
    pub calendar: CalendarConfig,
    /// Contacts the classifier should treat as internal staff.
    #[serde(default)]
    pub known_users: Vec<KnownUser>,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "0.0.0.0".
    pub bind: String,
    /// Port to listen on. Defaults to 3008.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 3008,
        }
    }
}

/// Chat-completion provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Base URL of an OpenAI-compatible API.
    pub base_url: String,
    /// API key (overrides `OPENAI_API_KEY` env var).
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_key: Option<Secret<String>>,
    /// Model used for full replies. Defaults to "gpt-4o".
    pub model: String,
    /// Cheaper model used for intent classification. Defaults to "gpt-4.1-nano".
    pub classifier_model: String,
    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,
    /// Parse attempts per structured extraction before giving up.
    pub extract_max_attempts: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            api_key: None,
            model: "gpt-4o".into(),
            classifier_model: "gpt-4.1-nano".into(),
            timeout_secs: 20,
            extract_max_attempts: 3,
        }
    }
}

impl GenerationConfig {
    /// Config key, then environment. `None` means the provider cannot start.
    pub fn resolve_api_key(&self) -> Option<Secret<String>> {
        if let Some(key) = &self.api_key {
            return Some(key.clone());
        }
        std::env::var("OPENAI_API_KEY").ok().map(Secret::new)
    }
}

/// Inbound work queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Turns processed concurrently. Defaults to 1 (strict FIFO).
    pub concurrency: usize,
    /// Minimum gap between consecutive turn starts, in milliseconds.
    pub interval_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            interval_ms: 500,
        }
    }
}

/// Idle-nudge reminder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemindersConfig {
    /// Silence before the nudge fires, in seconds. Defaults to 300.
    pub delay_secs: u64,
    /// Text sent when the nudge fires.
    pub nudge: String,
}

impl Default for RemindersConfig {
    fn default() -> Self {
        Self {
            delay_secs: 300,
            nudge: "¿Sigues ahí? 😊 Si necesitas más información sobre nuestros \
                    servicios, no dudes en escribirme."
                .into(),
        }
    }
}

/// Outbound chunk pacing, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_ms: 150,
            max_ms: 250,
        }
    }
}

/// Human-takeover suppression window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TakeoverConfig {
    /// How long automated replies stay suppressed after an agent message,
    /// in seconds. Defaults to 60.
    pub window_secs: u64,
}

impl Default for TakeoverConfig {
    fn default() -> Self {
        Self { window_secs: 60 }
    }
}

/// Session retention configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    /// Idle hours before a session is evicted. Defaults to 168 (one week).
    pub max_idle_hours: u64,
    /// Sweep interval in seconds. Defaults to 3600.
    pub sweep_interval_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            max_idle_hours: 168,
            sweep_interval_secs: 3600,
        }
    }
}

/// WhatsApp Cloud API channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WhatsappConfig {
    /// Token echoed back during webhook verification.
    pub verify_token: String,
    /// Graph API bearer token.
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub access_token: Option<Secret<String>>,
    /// App secret used to check `X-Hub-Signature-256` on deliveries.
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub app_secret: Option<Secret<String>>,
    pub phone_number_id: String,
    /// Graph API version segment. Defaults to "v24.0".
    pub api_version: String,
}

impl Default for WhatsappConfig {
    fn default() -> Self {
        Self {
            verify_token: String::new(),
            access_token: None,
            app_secret: None,
            phone_number_id: String::new(),
            api_version: "v24.0".into(),
        }
    }
}

/// CRM mirroring configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrmConfig {
    /// Base URL of the CRM instance. Empty disables mirroring.
    pub endpoint: String,
    pub account_id: u64,
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub token: Option<Secret<String>>,
    /// Inbox conversations are filed under. Defaults to "Charla".
    pub inbox_name: String,
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            account_id: 0,
            token: None,
            inbox_name: "Charla".into(),
        }
    }
}

/// Scheduling-sheet webhook configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// Webhook URL confirmed records are posted to. Empty disables posting.
    pub webhook_url: String,
}

/// A phone number the bot should recognize by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KnownUser {
    pub phone: String,
    pub name: String,
    pub company: Option<String>,
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}
