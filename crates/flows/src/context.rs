//! Shared collaborators and tuning every flow handler runs with.

use std::{sync::Arc, time::Duration};

use {
    charla_agents::{ChatMessage, ChatModel},
    charla_common::{OpsFlags, Outbound},
    charla_config::{CharlaConfig, KnownUser},
    charla_integrations::{Calendar, CrmSync, MessageDirection, MirrorMessage, sync_message},
    charla_reminders::ReminderScheduler,
    charla_sessions::{
        HistoryEntry, MAX_HISTORY_ENTRIES, MAX_RENDER_CHARS, MAX_RENDER_MESSAGES, Role,
        SessionStore, render_history,
    },
    tracing::warn,
};

use crate::dispatch::{Chunker, Pacing, dispatch_reply, plan_chunks};

/// Flow tuning lifted out of the full config at startup.
#[derive(Debug, Clone)]
pub struct FlowSettings {
    /// Model override for classification turns.
    pub classifier_model: String,
    pub extract_max_attempts: u32,
    pub pacing: Pacing,
    pub reminder_delay: Duration,
    pub nudge_text: String,
    pub crm_inbox: String,
    pub known_users: Vec<KnownUser>,
}

impl FlowSettings {
    #[must_use]
    pub fn from_config(config: &CharlaConfig) -> Self {
        Self {
            classifier_model: config.generation.classifier_model.clone(),
            extract_max_attempts: config.generation.extract_max_attempts,
            pacing: Pacing {
                min_ms: config.pacing.min_ms,
                max_ms: config.pacing.max_ms,
            },
            reminder_delay: Duration::from_secs(config.reminders.delay_secs),
            nudge_text: config.reminders.nudge.clone(),
            crm_inbox: config.crm.inbox_name.clone(),
            known_users: config.known_users.clone(),
        }
    }
}

/// Everything a flow handler needs for one turn.
///
/// Cheap to clone; reminder callbacks capture a clone so they can replay the
/// reply pipeline later without borrowing the live turn.
#[derive(Clone)]
pub struct FlowContext {
    pub store: Arc<SessionStore>,
    pub model: Arc<dyn ChatModel>,
    pub reminders: Arc<ReminderScheduler>,
    pub outbound: Arc<dyn Outbound>,
    /// CRM mirror. `None` disables mirroring without touching the flows.
    pub crm: Option<Arc<dyn CrmSync>>,
    /// Scheduling webhook. `None` drops completed records after logging.
    pub calendar: Option<Arc<dyn Calendar>>,
    pub ops: Arc<OpsFlags>,
    pub chunker: Chunker,
    pub settings: FlowSettings,
}

impl FlowContext {
    /// Registered user matching this channel id, if any.
    #[must_use]
    pub fn known_user(&self, phone: &str) -> Option<&KnownUser> {
        self.settings.known_users.iter().find(|u| u.phone == phone)
    }

    /// Capped, label-formatted history projection for prompt embedding.
    #[must_use]
    pub fn rendered_history(&self, key: &str) -> String {
        let entries = self.store.recent_history(key, MAX_HISTORY_ENTRIES);
        render_history(&entries, MAX_RENDER_MESSAGES, MAX_RENDER_CHARS)
    }

    /// Full session history as typed chat messages for generation.
    #[must_use]
    pub fn history_messages(&self, key: &str) -> Vec<ChatMessage> {
        self.store
            .recent_history(key, MAX_HISTORY_ENTRIES)
            .into_iter()
            .map(|entry| match entry.role {
                Role::User => ChatMessage::user(entry.content),
                Role::Assistant => ChatMessage::assistant(entry.content),
            })
            .collect()
    }

    /// Session history serialized as a JSON array for extraction prompts.
    #[must_use]
    pub fn history_json(&self, key: &str) -> String {
        let entries = self.store.recent_history(key, MAX_HISTORY_ENTRIES);
        serde_json::to_string(&entries).unwrap_or_default()
    }

    /// Chunk a reply and deliver it with humanized pacing.
    ///
    /// A fully delivered reply is mirrored to the CRM as one outgoing
    /// message, off the turn's critical path.
    pub async fn send_reply(&self, to: &str, reply: &str) {
        let messages = plan_chunks(&self.chunker, reply, self.settings.pacing);
        if !dispatch_reply(self.outbound.as_ref(), to, &messages).await {
            return;
        }

        if let Some(crm) = &self.crm {
            let crm = Arc::clone(crm);
            let inbox = self.settings.crm_inbox.clone();
            let message = MirrorMessage {
                phone: to.to_string(),
                name: self
                    .known_user(to)
                    .map_or_else(|| to.to_string(), |user| user.name.clone()),
                content: reply.to_string(),
                direction: MessageDirection::Outgoing,
                attachment: None,
            };
            tokio::spawn(async move {
                if let Err(error) = sync_message(crm.as_ref(), &inbox, &message).await {
                    warn!(phone = %message.phone, error = %error, "outgoing CRM mirror failed");
                }
            });
        }
    }

    /// Arm the inactivity nudge for this session, replacing any pending one.
    ///
    /// When it fires, the nudge text joins the history and goes out through
    /// the same chunked pipeline as a regular reply.
    pub fn schedule_nudge(&self, key: &str) {
        let ctx = self.clone();
        let session = key.to_string();
        self.reminders.schedule(
            key,
            self.settings.reminder_delay,
            Arc::new(move || {
                let ctx = ctx.clone();
                let session = session.clone();
                Box::pin(async move {
                    let nudge = ctx.settings.nudge_text.clone();
                    ctx.store
                        .push_history(&session, HistoryEntry::assistant(nudge.as_str()));
                    ctx.send_reply(&session, &nudge).await;
                })
            }),
        );
    }
}

// ── Test doubles ────────────────────────────────────────────────────────────


#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn settings_lift_the_relevant_sections() {
        let mut config = CharlaConfig::default();
        config.reminders.delay_secs = 120;
        config.pacing.min_ms = 10;
        config.pacing.max_ms = 20;
        config.known_users.push(KnownUser {
            phone: "51999000111".into(),
            name: "Ana".into(),
            company: Some("Altiva".into()),
        });

        let settings = FlowSettings::from_config(&config);
        assert_eq!(settings.reminder_delay, Duration::from_secs(120));
        assert_eq!(settings.pacing.min_ms, 10);
        assert_eq!(settings.known_users.len(), 1);
        assert_eq!(settings.classifier_model, "gpt-4.1-nano");
    }

    #[test]
    fn history_entries_serialize_with_lowercase_roles() {
        let entries = vec![
            HistoryEntry::user("hola"),
            HistoryEntry::assistant("buenas"),
        ];
        let json = serde_json::to_string(&entries).unwrap();
        assert!(json.contains(r#""role":"user""#));
        assert!(json.contains(r#""role":"assistant""#));
    }

    #[test]
    fn known_user_lookup_matches_on_phone() {
        let ctx = testing::test_context(
            testing::ScriptedModel::with_replies(&[]),
            Arc::new(testing::RecordingOutbound::default()),
        );
        assert_eq!(
            ctx.known_user("51999000111").map(|u| u.name.as_str()),
            Some("Ana")
        );
        assert!(ctx.known_user("51111111111").is_none());
    }

    #[tokio::test]
    async fn send_reply_delivers_sentence_chunks() {
        let outbound = Arc::new(testing::RecordingOutbound::default());
        let ctx = testing::test_context(
            testing::ScriptedModel::with_replies(&[]),
            Arc::clone(&outbound),
        );
        ctx.send_reply("51999000111", "Hola. Bienvenido a Altiva.")
            .await;
        assert_eq!(outbound.bodies(), vec!["Hola.", "Bienvenido a Altiva."]);
    }

    #[tokio::test]
    async fn delivered_reply_mirrors_whole_to_the_crm() {
        let crm = Arc::new(testing::MirroringCrm::default());
        let mut ctx = testing::test_context(
            testing::ScriptedModel::with_replies(&[]),
            Arc::new(testing::RecordingOutbound::default()),
        );
        ctx.crm = Some(Arc::clone(&crm) as Arc<dyn CrmSync>);

        ctx.send_reply("51999000111", "Hola. Bienvenido a Altiva.")
            .await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        let mirrors = crm.mirrors.lock().unwrap();
        assert_eq!(
            *mirrors,
            vec![(
                "outgoing".to_string(),
                "Hola. Bienvenido a Altiva.".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn failed_delivery_skips_the_mirror() {
        let crm = Arc::new(testing::MirroringCrm::default());
        let outbound = Arc::new(testing::RecordingOutbound::default());
        outbound.fail.store(true, std::sync::atomic::Ordering::SeqCst);
        let mut ctx =
            testing::test_context(testing::ScriptedModel::with_replies(&[]), outbound);
        ctx.crm = Some(Arc::clone(&crm) as Arc<dyn CrmSync>);

        ctx.send_reply("51999000111", "Hola.").await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(crm.mirrors.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn nudge_joins_history_and_goes_out() {
        let outbound = Arc::new(testing::RecordingOutbound::default());
        let mut ctx = testing::test_context(
            testing::ScriptedModel::with_replies(&[]),
            Arc::clone(&outbound),
        );
        ctx.settings.reminder_delay = Duration::from_millis(20);

        ctx.schedule_nudge("51999000111");
        tokio::time::sleep(Duration::from_millis(100)).await;

        let history = ctx.store.recent_history("51999000111", 10);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, Role::Assistant);
        assert!(!outbound.bodies().is_empty());
    }
}
