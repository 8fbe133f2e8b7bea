//! In-memory conversational session state.
//!
//! Sessions are keyed by channel user id and hold a bounded history buffer,
//! a flow-scratch field bag, and the lifecycle flags the router and flows
//! coordinate on. Nothing here persists across restarts.

pub mod history;
pub mod store;

pub use {
    history::{MAX_RENDER_CHARS, MAX_RENDER_MESSAGES, render_history},
    store::{HistoryEntry, MAX_HISTORY_ENTRIES, Role, Session, SessionStore},
};
