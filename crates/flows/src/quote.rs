//! Personnel-transfer request flow.
//!
//! The prompt walks the user through the transfer form; extraction fills the
//! nested record turn by turn. The moment every required field is filled the
//! record goes to the scheduling sheet, exactly once per session.

use {
    anyhow::Result,
    charla_agents::{ChatMessage, extract_json},
    charla_common::InboundEvent,
    charla_integrations::CalendarRecord,
    charla_sessions::HistoryEntry,
    tracing::{debug, info, warn},
};

use crate::{
    context::FlowContext,
    prompts,
    records::{TransferRecord, new_service_id},
};

/// Session field the transfer record lives under.
const RECORD_FIELD: &str = "quote";

pub async fn run(ctx: &FlowContext, event: &InboundEvent) -> Result<()> {
    let session = event.from.as_str();

    let current = ctx
        .store
        .get::<TransferRecord>(session, RECORD_FIELD)
        .unwrap_or_default();

    let extraction = prompts::quote_extraction_prompt(&ctx.history_json(session));
    let parsed: TransferRecord = extract_json(
        ctx.model.as_ref(),
        &extraction,
        ctx.settings.extract_max_attempts,
    )
    .await?;

    let mut merged = current;
    merged.merge_missing(&parsed);
    ctx.store.set(session, RECORD_FIELD, &merged);

    if merged.is_complete() && ctx.store.try_mark_logged(session) {
        log_transfer(ctx, session, &merged).await;
    }

    let prompt = prompts::quote_prompt(&ctx.rendered_history(session));
    let mut messages = vec![ChatMessage::system(prompt)];
    messages.extend(ctx.history_messages(session));
    let reply = ctx.model.create_chat(&messages, None).await?;

    ctx.store
        .push_history(session, HistoryEntry::assistant(reply.as_str()));
    ctx.schedule_nudge(session);
    ctx.send_reply(session, &reply).await;
    debug!(session, "quote reply dispatched");
    Ok(())
}

/// One-shot scheduling-sheet write for a completed transfer request.
async fn log_transfer(ctx: &FlowContext, session: &str, record: &TransferRecord) {
    let service_id = new_service_id();
    info!(session, id = %service_id, "transfer request complete");

    let Some(calendar) = &ctx.calendar else {
        return;
    };
    match serde_json::to_value(record) {
        Ok(data) => {
            let entry = CalendarRecord::new("quote", &service_id, &data);
            if let Err(error) = calendar.app_to_calendar(&entry).await {
                warn!(session, error = %error, "calendar log failed");
            }
        },
        Err(error) => warn!(session, error = %error, "unserializable transfer record"),
    }
}
