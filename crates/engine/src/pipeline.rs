//! The engine: admission, blacklist, takeover notice, idle sweep.
//!
//! Transports hand decoded events to [`Engine::handle_event`]; everything
//! after that point runs inside a queue task so turn handling stays ordered
//! and paced. The control API talks to the same engine for the blacklist
//! and the human-takeover notice.

use std::{sync::Arc, time::Duration};

use {
    charla_common::{InboundEvent, MessageParts},
    charla_config::CharlaConfig,
    charla_flows::{FlowContext, route_turn},
    charla_integrations::{MessageDirection, MirrorMessage, sync_message},
    dashmap::DashSet,
    tracing::{debug, info, warn},
};

use crate::queue::{QueueSettings, TaskQueue};

/// Sent when a number is taken off the blacklist.
const THANK_YOU_REPLY: &str =
    "¡Gracias por escribirnos! 🙌 Quedamos atentos a cualquier otra consulta.";

/// Engine tuning lifted out of the full config at startup.
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub queue: QueueSettings,
    /// How long automated replies stay suppressed after an agent message.
    pub takeover_window: Duration,
    pub max_idle: chrono::Duration,
    pub sweep_interval: Duration,
}

impl EngineSettings {
    #[must_use]
    pub fn from_config(config: &CharlaConfig) -> Self {
        Self {
            queue: QueueSettings::from_config(config),
            takeover_window: Duration::from_secs(config.takeover.window_secs),
            max_idle: chrono::Duration::hours(config.sessions.max_idle_hours as i64),
            sweep_interval: Duration::from_secs(config.sessions.sweep_interval_secs),
        }
    }
}

/// Front door for inbound events and the operational surface around them.
pub struct Engine {
    ctx: FlowContext,
    queue: TaskQueue,
    blacklist: DashSet<String>,
    settings: EngineSettings,
}

impl Engine {
    #[must_use]
    pub fn new(ctx: FlowContext, settings: EngineSettings) -> Arc<Self> {
        Arc::new(Self {
            queue: TaskQueue::new(settings.queue),
            ctx,
            blacklist: DashSet::new(),
            settings,
        })
    }

    /// Admit one inbound event into the global queue.
    ///
    /// Blacklisted senders and events with no routable content are dropped
    /// here, before anything touches session state.
    pub fn handle_event(&self, event: InboundEvent) {
        if self.blacklist.contains(&event.from) {
            debug!(from = %event.from, "sender blacklisted, dropping event");
            return;
        }
        let parts = MessageParts::from_event(&event);
        if parts.is_empty() {
            debug!(from = %event.from, kind = ?event.kind, "no routable content, skipping");
            return;
        }

        let ctx = self.ctx.clone();
        let session = event.from.clone();
        self.queue.enqueue(
            &session,
            Box::pin(async move {
                mirror_incoming(&ctx, &event, &parts).await;
                route_turn(&ctx, &event, &parts.text).await;
                Ok(())
            }),
        );
    }

    /// A human agent wrote to a customer: suppress automated replies for
    /// the configured window. The router finishes any session that writes
    /// in while the window is open.
    pub fn notice_agent_activity(&self) {
        self.ctx.ops.set_takeover(self.settings.takeover_window);
        info!(
            window_secs = self.settings.takeover_window.as_secs(),
            "human agent active, bot standing down"
        );
    }

    pub fn blacklist_add(&self, number: &str) {
        self.blacklist.insert(number.to_string());
        self.ctx.reminders.cancel(number);
        info!(number, "number blacklisted");
    }

    /// Take a number off the blacklist and thank it for coming back.
    /// Returns whether the number was actually listed.
    pub async fn blacklist_remove(&self, number: &str) -> bool {
        let removed = self.blacklist.remove(number).is_some();
        info!(number, removed, "number removed from blacklist");
        self.ctx.send_reply(number, THANK_YOU_REPLY).await;
        removed
    }

    #[must_use]
    pub fn is_blacklisted(&self, number: &str) -> bool {
        self.blacklist.contains(number)
    }

    /// Start the periodic idle-session sweep.
    pub fn start_idle_sweep(self: &Arc<Self>) {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(engine.settings.sweep_interval).await;
                let evicted = engine.ctx.store.evict_idle(engine.settings.max_idle);
                if evicted > 0 {
                    info!(evicted, "evicted idle sessions");
                }
            }
        });
    }

    /// Stop admitting turns and drop every pending reminder. In-flight
    /// turns finish on their own.
    pub fn shutdown(&self) {
        self.queue.close();
        self.ctx.reminders.cancel_all();
        info!("engine shut down");
    }
}

/// Mirror the inbound message into the CRM before the turn runs, so a human
/// agent reading along sees the conversation in order.
async fn mirror_incoming(ctx: &FlowContext, event: &InboundEvent, parts: &MessageParts) {
    let Some(crm) = &ctx.crm else {
        return;
    };
    let message = MirrorMessage {
        phone: event.from.clone(),
        name: event.display_name().to_string(),
        content: parts.text.clone(),
        direction: MessageDirection::Incoming,
        attachment: parts.attachment.clone(),
    };
    if let Err(error) = sync_message(crm.as_ref(), &ctx.settings.crm_inbox, &message).await {
        warn!(phone = %event.from, error = %error, "incoming CRM mirror failed");
    }
}
