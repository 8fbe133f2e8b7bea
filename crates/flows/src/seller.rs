//! Services and pricing information flow.

use {
    anyhow::Result, charla_agents::ChatMessage, charla_common::InboundEvent,
    charla_sessions::HistoryEntry, tracing::debug,
};

use crate::{context::FlowContext, prompts};

pub async fn run(ctx: &FlowContext, event: &InboundEvent) -> Result<()> {
    let session = event.from.as_str();
    let prompt = prompts::seller_prompt(&ctx.rendered_history(session));

    let mut messages = vec![ChatMessage::system(prompt)];
    messages.extend(ctx.history_messages(session));
    let reply = ctx.model.create_chat(&messages, None).await?;

    ctx.store
        .push_history(session, HistoryEntry::assistant(reply.as_str()));
    ctx.schedule_nudge(session);
    ctx.send_reply(session, &reply).await;
    debug!(session, "seller reply dispatched");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Arc;

    use {
        super::*,
        crate::context::testing::{RecordingOutbound, ScriptedModel, test_context},
    };

    #[tokio::test]
    async fn answers_service_questions() {
        let model = ScriptedModel::with_replies(&["Ofrecemos agentes de IA y traslados 🚐"]);
        let outbound = Arc::new(RecordingOutbound::default());
        let ctx = test_context(Arc::clone(&model), Arc::clone(&outbound));
        ctx.store
            .push_history("51988000222", HistoryEntry::user("¿qué servicios tienen?"));

        run(&ctx, &InboundEvent::text("51988000222", "¿qué servicios tienen?"))
            .await
            .unwrap();

        let calls = model.calls.lock().unwrap();
        assert!(calls[0].contents[0].contains("SOBRE ALTIVA"));
        assert!(!outbound.bodies().is_empty());
        assert!(ctx.reminders.is_pending("51988000222"));
    }

    #[tokio::test]
    async fn failure_leaves_no_reply_behind() {
        let outbound = Arc::new(RecordingOutbound::default());
        let ctx = test_context(ScriptedModel::failing(), Arc::clone(&outbound));

        let result = run(&ctx, &InboundEvent::text("51988000222", "precios")).await;

        assert!(result.is_err());
        assert!(outbound.bodies().is_empty());
    }
}
