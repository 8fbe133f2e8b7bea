//! Conversation flows: classifier routing, structured capture, paced replies.
//!
//! Every inbound turn runs [`router::route_turn`], which re-classifies the
//! conversation and hands it to one of the flow handlers (`talk`, `lead`,
//! `quote`, `seller`). Handlers share one contract: generate a reply over the
//! session history, append it to history, then dispatch it in humanized
//! chunks. A handler that fails logs and stays silent for the turn.

pub mod context;
pub mod dates;
pub mod dispatch;
pub mod lead;
pub mod prompts;
pub mod quote;
pub mod records;
pub mod router;
pub mod seller;
pub mod talk;

pub use {
    context::{FlowContext, FlowSettings},
    dispatch::{Chunker, Pacing},
    records::{LeadRecord, TransferRecord},
    router::{FlowKind, route_turn},
};
