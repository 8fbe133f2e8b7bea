//! Reply flow for registered users. No data capture, no records.

use {
    anyhow::Result, charla_agents::ChatMessage, charla_common::InboundEvent,
    charla_sessions::HistoryEntry, tracing::debug,
};

use crate::{context::FlowContext, prompts};

pub async fn run(ctx: &FlowContext, event: &InboundEvent) -> Result<()> {
    let session = event.from.as_str();
    let prompt = prompts::talk_prompt(&ctx.rendered_history(session), ctx.known_user(session));

    let mut messages = vec![ChatMessage::system(prompt)];
    messages.extend(ctx.history_messages(session));
    let reply = ctx.model.create_chat(&messages, None).await?;

    ctx.store
        .push_history(session, HistoryEntry::assistant(reply.as_str()));
    ctx.schedule_nudge(session);
    ctx.send_reply(session, &reply).await;
    debug!(session, "talk reply dispatched");
    Ok(())
}
