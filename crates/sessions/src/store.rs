use {
    chrono::{DateTime, Utc},
    dashmap::DashMap,
    serde::{Deserialize, Serialize, de::DeserializeOwned},
    serde_json::Value,
    tracing::debug,
};

/// Upper bound on retained history entries per session. Appends beyond this
/// evict the oldest entries (sliding window).
pub const MAX_HISTORY_ENTRIES: usize = 100;

/// Who produced a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Label used when rendering history into prompts.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Role::User => "Usuario",
            Role::Assistant => "Asistente",
        }
    }
}

/// One conversational turn as stored in the session buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl HistoryEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Per-user conversational state.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub history: Vec<HistoryEntry>,
    /// Flow-scratch key/value state. Confirmed-data records serialize here.
    pub fields: serde_json::Map<String, Value>,
    /// Terminal flag; a finished session ignores all further input.
    pub finished: bool,
    /// One-shot completion flag guarding the downstream side effect.
    pub data_logged: bool,
    pub last_activity: Option<DateTime<Utc>>,
}

/// Concurrent session store keyed by channel user id.
///
/// Sessions are created lazily on first touch. Per-key mutations run under
/// the map's entry lock, so closures passed to [`SessionStore::with_session`]
/// observe and produce consistent state even with concurrent turns.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<String, Session>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomic read-modify-write on one session, creating it if needed.
    pub fn with_session<T>(&self, key: &str, f: impl FnOnce(&mut Session) -> T) -> T {
        let mut entry = self.sessions.entry(key.to_string()).or_default();
        f(entry.value_mut())
    }

    /// Read a single field, deserialized. Returns `None` for missing
    /// sessions, missing fields, and type mismatches.
    pub fn get<T: DeserializeOwned>(&self, key: &str, field: &str) -> Option<T> {
        let value = {
            let session = self.sessions.get(key)?;
            session.fields.get(field)?.clone()
        };
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(err) => {
                debug!(session = key, field, error = %err, "session field type mismatch");
                None
            },
        }
    }

    /// Shallow merge into the field bag; the last write per field wins.
    pub fn update(&self, key: &str, patch: serde_json::Map<String, Value>) {
        self.with_session(key, |session| {
            for (field, value) in patch {
                session.fields.insert(field, value);
            }
        });
    }

    /// Store one field, serialized.
    pub fn set<T: Serialize>(&self, key: &str, field: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(v) => {
                self.with_session(key, |session| {
                    session.fields.insert(field.to_string(), v);
                });
            },
            Err(err) => debug!(session = key, field, error = %err, "unserializable session field"),
        }
    }

    /// Append to the history buffer, evicting oldest entries past the cap.
    pub fn push_history(&self, key: &str, entry: HistoryEntry) {
        self.with_session(key, |session| {
            session.history.push(entry);
            if session.history.len() > MAX_HISTORY_ENTRIES {
                let overflow = session.history.len() - MAX_HISTORY_ENTRIES;
                session.history.drain(..overflow);
            }
        });
    }

    /// Clone of the most recent `limit` history entries, in order.
    #[must_use]
    pub fn recent_history(&self, key: &str, limit: usize) -> Vec<HistoryEntry> {
        self.sessions
            .get(key)
            .map(|session| {
                let history = &session.history;
                let start = history.len().saturating_sub(limit);
                history[start..].to_vec()
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn history_len(&self, key: &str) -> usize {
        self.sessions
            .get(key)
            .map(|session| session.history.len())
            .unwrap_or(0)
    }

    /// Record activity now. Creates the session if needed.
    pub fn touch(&self, key: &str) {
        let now = Utc::now();
        self.with_session(key, |session| session.last_activity = Some(now));
    }

    /// Whether the session exists and is finished. Does not create.
    #[must_use]
    pub fn is_finished(&self, key: &str) -> bool {
        self.sessions
            .get(key)
            .map(|session| session.finished)
            .unwrap_or(false)
    }

    pub fn finish(&self, key: &str) {
        self.with_session(key, |session| session.finished = true);
    }

    /// One-shot completion gate. Returns true exactly once per session
    /// (until the flag is explicitly reset).
    pub fn try_mark_logged(&self, key: &str) -> bool {
        self.with_session(key, |session| {
            if session.data_logged {
                false
            } else {
                session.data_logged = true;
                true
            }
        })
    }

    pub fn remove(&self, key: &str) {
        self.sessions.remove(key);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Evict sessions idle longer than `max_idle`. Sessions that never
    /// recorded activity are evicted too. Returns the eviction count.
    pub fn evict_idle(&self, max_idle: chrono::Duration) -> usize {
        self.evict_idle_at(max_idle, Utc::now())
    }

    pub fn evict_idle_at(&self, max_idle: chrono::Duration, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| {
            session
                .last_activity
                .map(|at| now - at < max_idle)
                .unwrap_or(false)
        });
        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            debug!(
                evicted,
                remaining = self.sessions.len(),
                "evicted idle sessions"
            );
        }
        evicted
    }
}
