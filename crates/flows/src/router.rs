//! Classifier-driven turn router.
//!
//! There is no persisted "current flow": every turn re-classifies from the
//! full history, so a conversation can move between flows as its topic
//! shifts. The router is also the takeover gate and the one place a turn's
//! failure is allowed to end; nothing below it lets an error escape to the
//! queue.

use {
    charla_agents::ChatMessage,
    charla_common::InboundEvent,
    charla_sessions::HistoryEntry,
    tracing::{debug, info, warn},
};

use crate::{context::FlowContext, lead, prompts, quote, seller, talk};

/// Reply for turns the classifier could not place. Deliberately kept out of
/// history so it never pollutes later classification.
const PLACEHOLDER_REPLY: &str = "🤖 Estoy revisando tu mensaje, en breve te respondo...";

/// The flows a turn can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    Talk,
    Lead,
    Quote,
    Seller,
}

impl FlowKind {
    /// Parse a classifier completion, tolerating case and padding.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_uppercase().as_str() {
            "TALK" => Some(FlowKind::Talk),
            "LEAD" => Some(FlowKind::Lead),
            "QUOTE" => Some(FlowKind::Quote),
            "SELLER" => Some(FlowKind::Seller),
            _ => None,
        }
    }
}

/// Route one inbound turn end to end.
///
/// `text` is the normalized message body (media events arrive as placeholder
/// descriptions). Never returns an error: every failure is logged here or
/// below and the turn ends silently.
pub async fn route_turn(ctx: &FlowContext, event: &InboundEvent, text: &str) {
    let session = event.from.as_str();

    if ctx.store.is_finished(session) {
        debug!(session, "session finished, ignoring turn");
        return;
    }

    if ctx.ops.takeover_active() {
        ctx.reminders.cancel(session);
        ctx.store.finish(session);
        info!(session, "human takeover active, closing session");
        return;
    }

    ctx.store.touch(session);
    ctx.reminders.cancel(session);
    ctx.store.push_history(session, HistoryEntry::user(text));

    let prompt = prompts::classifier_prompt(
        &ctx.rendered_history(session),
        ctx.known_user(session).is_some(),
    );
    let kind = match ctx
        .model
        .create_chat(
            &[ChatMessage::system(prompt)],
            Some(&ctx.settings.classifier_model),
        )
        .await
    {
        Ok(label) => {
            let kind = FlowKind::from_label(&label);
            if kind.is_none() {
                warn!(session, label = label.trim(), "unknown classifier label");
            }
            kind
        },
        Err(error) => {
            warn!(session, error = %error, "classification failed");
            None
        },
    };

    match kind {
        Some(kind) => {
            info!(session, flow = ?kind, "dispatching turn");
            let result = match kind {
                FlowKind::Talk => talk::run(ctx, event).await,
                FlowKind::Lead => lead::run(ctx, event).await,
                FlowKind::Quote => quote::run(ctx, event).await,
                FlowKind::Seller => seller::run(ctx, event).await,
            };
            if let Err(error) = result {
                warn!(session, flow = ?kind, error = %error, "flow failed, turn ends silently");
            }
        },
        None => {
            ctx.schedule_nudge(session);
            ctx.send_reply(session, PLACEHOLDER_REPLY).await;
        },
    }
}
