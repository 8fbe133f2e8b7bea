//! Appointment-booking flow for new contacts.
//!
//! Each turn re-extracts the appointment fields from the full history and
//! merges them into the stored record without overwriting anything already
//! captured. A fresh "si" on a complete record fires the one-shot downstream
//! log; a "no" throws the record away and starts over.

use {
    anyhow::Result,
    charla_agents::{ChatMessage, extract_json},
    charla_common::InboundEvent,
    charla_integrations::{CalendarRecord, stamp_contact},
    charla_sessions::HistoryEntry,
    tracing::{debug, info, warn},
};

use crate::{context::FlowContext, dates, prompts, records::LeadRecord};

/// Session field the appointment record lives under.
const RECORD_FIELD: &str = "lead";

pub async fn run(ctx: &FlowContext, event: &InboundEvent) -> Result<()> {
    let session = event.from.as_str();

    let current = ctx
        .store
        .get::<LeadRecord>(session, RECORD_FIELD)
        .unwrap_or_else(|| LeadRecord::for_phone(session));

    let extraction = prompts::lead_extraction_prompt(&ctx.history_json(session));
    let mut parsed: LeadRecord = extract_json(
        ctx.model.as_ref(),
        &extraction,
        ctx.settings.extract_max_attempts,
    )
    .await?;

    // The extraction prompt demands DD/MM/YYYY, but models still echo the
    // user's relative wording at times. Resolve those locally.
    if let Some(resolved) = parsed
        .appointment_date
        .as_deref()
        .and_then(dates::parse_relative_date)
    {
        parsed.appointment_date = Some(resolved);
    }

    let mut merged = current;
    merged.merge_missing(&parsed);

    // Only a confirmation given THIS turn counts; the merged copy keeps the
    // answer from earlier turns and must not re-trigger anything.
    if let Some(answer) = parsed.confirmation.as_deref() {
        match answer.trim().to_lowercase().as_str() {
            "si" | "sí" if merged.is_complete() => {
                merged.confirmed = true;
                if ctx.store.try_mark_logged(session) {
                    log_confirmed(ctx, event, &merged).await;
                }
            },
            "no" => {
                info!(session, "appointment declined, restarting capture");
                merged = LeadRecord::for_phone(session);
                ctx.store.with_session(session, |s| s.data_logged = false);
            },
            _ => {},
        }
    }

    ctx.store.set(session, RECORD_FIELD, &merged);

    let prompt = prompts::lead_prompt(&ctx.rendered_history(session), &merged);
    let mut messages = vec![ChatMessage::system(prompt)];
    messages.extend(ctx.history_messages(session));
    let reply = ctx.model.create_chat(&messages, None).await?;

    ctx.store
        .push_history(session, HistoryEntry::assistant(reply.as_str()));
    ctx.schedule_nudge(session);
    ctx.send_reply(session, &reply).await;
    debug!(session, "lead reply dispatched");
    Ok(())
}

/// Downstream effects for a confirmed appointment. Best-effort: a failure
/// here is logged and never reopens the completion gate.
async fn log_confirmed(ctx: &FlowContext, event: &InboundEvent, record: &LeadRecord) {
    info!(session = %event.from, id = %record.id, "appointment confirmed");

    if let Some(calendar) = &ctx.calendar {
        match serde_json::to_value(record) {
            Ok(data) => {
                let entry = CalendarRecord::new("lead", &record.id, &data);
                if let Err(error) = calendar.app_to_calendar(&entry).await {
                    warn!(session = %event.from, error = %error, "calendar log failed");
                }
            },
            Err(error) => {
                warn!(session = %event.from, error = %error, "unserializable appointment record");
            },
        }
    }

    if let Some(crm) = &ctx.crm {
        let attrs = serde_json::json!({ "custom_attributes": record });
        if let Err(error) = stamp_contact(
            crm.as_ref(),
            &ctx.settings.crm_inbox,
            &event.from,
            event.display_name(),
            attrs,
        )
        .await
        {
            warn!(session = %event.from, error = %error, "crm contact update failed");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Arc;

    use {
        super::*,
        crate::context::testing::{
            CapturingCalendar, RecordingOutbound, ScriptedModel, test_context,
        },
    };

    const SESSION: &str = "51999000333";

    #[tokio::test]
    async fn merges_without_overwriting_earlier_fields() {
        let model = ScriptedModel::with_replies(&[
            r#"{"nombre_completo":"Otro Nombre","correo":"ana@mail.com"}"#,
            "Perfecto, anoté tu correo 📧",
        ]);
        let ctx = test_context(Arc::clone(&model), Arc::new(RecordingOutbound::default()));

        let mut seeded = LeadRecord::for_phone(SESSION);
        seeded.full_name = Some("Ana Torres".into());
        ctx.store.set(SESSION, RECORD_FIELD, &seeded);
        ctx.store
            .push_history(SESSION, HistoryEntry::user("mi correo es ana@mail.com"));

        run(&ctx, &InboundEvent::text(SESSION, "mi correo es ana@mail.com"))
            .await
            .unwrap();

        let stored: LeadRecord = ctx.store.get(SESSION, RECORD_FIELD).unwrap();
        assert_eq!(stored.full_name.as_deref(), Some("Ana Torres"));
        assert_eq!(stored.email.as_deref(), Some("ana@mail.com"));
        assert_eq!(stored.id, seeded.id);
    }

    #[tokio::test]
    async fn relative_dates_from_extraction_are_resolved() {
        let model =
            ScriptedModel::with_replies(&[r#"{"fecha_cita":"mañana"}"#, "Anoté la fecha 📅"]);
        let ctx = test_context(Arc::clone(&model), Arc::new(RecordingOutbound::default()));
        ctx.store
            .push_history(SESSION, HistoryEntry::user("para mañana por favor"));

        run(&ctx, &InboundEvent::text(SESSION, "para mañana por favor"))
            .await
            .unwrap();

        let stored: LeadRecord = ctx.store.get(SESSION, RECORD_FIELD).unwrap();
        let date = stored.appointment_date.unwrap();
        assert_ne!(date, "mañana");
        assert_eq!(date.len(), 10);
        assert_eq!(date.matches('/').count(), 2);
    }

    #[tokio::test]
    async fn fresh_si_on_complete_record_logs_once() {
        let confirmation =
            r#"{"nombre_completo":null,"fecha_cita":null,"hora_cita":null,"correo":null,"confirmacion":"si"}"#;
        let model = ScriptedModel::with_replies(&[
            confirmation,
            "¡Perfecto! 🎉 Tu cita quedó registrada.",
            confirmation,
            "Tu cita ya estaba registrada 😊",
        ]);
        let outbound = Arc::new(RecordingOutbound::default());
        let mut ctx = test_context(Arc::clone(&model), Arc::clone(&outbound));
        let calendar = Arc::new(CapturingCalendar::default());
        ctx.calendar = Some(calendar.clone());

        let mut seeded = LeadRecord::for_phone(SESSION);
        seeded.full_name = Some("Ana Torres".into());
        seeded.appointment_date = Some("20/10/2025".into());
        seeded.appointment_time = Some("15:00".into());
        seeded.email = Some("ana@mail.com".into());
        ctx.store.set(SESSION, RECORD_FIELD, &seeded);

        ctx.store.push_history(SESSION, HistoryEntry::user("si"));
        run(&ctx, &InboundEvent::text(SESSION, "si")).await.unwrap();
        ctx.store.push_history(SESSION, HistoryEntry::user("si"));
        run(&ctx, &InboundEvent::text(SESSION, "si")).await.unwrap();

        // The downstream log fired exactly once despite two confirmations.
        let records = calendar.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, "lead");
        assert_eq!(records[0].service_id, seeded.id);

        let stored: LeadRecord = ctx.store.get(SESSION, RECORD_FIELD).unwrap();
        assert!(stored.confirmed);
    }

    #[tokio::test]
    async fn si_on_incomplete_record_does_not_log() {
        let model = ScriptedModel::with_replies(&[
            r#"{"confirmacion":"si"}"#,
            "Aún me faltan algunos datos 😊",
        ]);
        let mut ctx = test_context(Arc::clone(&model), Arc::new(RecordingOutbound::default()));
        let calendar = Arc::new(CapturingCalendar::default());
        ctx.calendar = Some(calendar.clone());
        ctx.store.push_history(SESSION, HistoryEntry::user("si"));

        run(&ctx, &InboundEvent::text(SESSION, "si")).await.unwrap();

        assert!(calendar.records.lock().unwrap().is_empty());
        let stored: LeadRecord = ctx.store.get(SESSION, RECORD_FIELD).unwrap();
        assert!(!stored.confirmed);
    }

    #[tokio::test]
    async fn no_resets_the_record_and_the_gate() {
        let model = ScriptedModel::with_replies(&[
            r#"{"confirmacion":"no"}"#,
            "Entiendo 😊, empecemos de nuevo.",
        ]);
        let ctx = test_context(Arc::clone(&model), Arc::new(RecordingOutbound::default()));

        let mut seeded = LeadRecord::for_phone(SESSION);
        seeded.full_name = Some("Ana Torres".into());
        seeded.email = Some("ana@mail.com".into());
        ctx.store.set(SESSION, RECORD_FIELD, &seeded);
        assert!(ctx.store.try_mark_logged(SESSION));
        ctx.store.push_history(SESSION, HistoryEntry::user("no"));

        run(&ctx, &InboundEvent::text(SESSION, "no")).await.unwrap();

        let stored: LeadRecord = ctx.store.get(SESSION, RECORD_FIELD).unwrap();
        assert!(stored.full_name.is_none());
        assert_ne!(stored.id, seeded.id);
        // The gate reopened, so a later confirmation can log again.
        assert!(ctx.store.try_mark_logged(SESSION));
    }

    #[tokio::test]
    async fn extraction_failure_aborts_the_turn_silently() {
        let outbound = Arc::new(RecordingOutbound::default());
        let ctx = test_context(ScriptedModel::failing(), Arc::clone(&outbound));
        ctx.store.push_history(SESSION, HistoryEntry::user("hola"));

        let result = run(&ctx, &InboundEvent::text(SESSION, "hola")).await;

        assert!(result.is_err());
        assert!(outbound.bodies().is_empty());
        assert!(ctx.store.get::<LeadRecord>(SESSION, RECORD_FIELD).is_none());
    }

    #[tokio::test]
    async fn unparseable_extraction_retries_then_aborts() {
        let model = ScriptedModel::with_replies(&["no json", "tampoco", "nada"]);
        let outbound = Arc::new(RecordingOutbound::default());
        let ctx = test_context(Arc::clone(&model), Arc::clone(&outbound));
        ctx.store.push_history(SESSION, HistoryEntry::user("hola"));

        let result = run(&ctx, &InboundEvent::text(SESSION, "hola")).await;

        assert!(result.is_err());
        assert_eq!(model.call_count(), 3);
        assert!(outbound.bodies().is_empty());
    }
}
