//! Downstream collaborators: the CRM mirror and the scheduling webhook.
//!
//! Everything here is best-effort from the engine's point of view. Failures
//! are logged by callers and never abort a conversational turn.

pub mod calendar;
pub mod chatwoot;
pub mod crm;

pub use {
    calendar::{Calendar, CalendarError, CalendarRecord, WebhookCalendar},
    chatwoot::ChatwootClient,
    crm::{CrmError, CrmSync, MessageDirection, MirrorMessage, stamp_contact, sync_message},
};
