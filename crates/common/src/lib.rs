//! Shared types and the channel-facing message model used across all
//! charla crates.

pub mod ops;
pub mod outbound;
pub mod types;

pub use {
    ops::OpsFlags,
    outbound::{Outbound, OutboundMessage},
    types::{Attachment, InboundEvent, MessageKind, MessageParts},
};
