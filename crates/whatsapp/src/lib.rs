//! WhatsApp Cloud API channel: webhook decoding and the Graph text sender.
//!
//! The gateway hands raw deliveries to [`webhook`] after checking the
//! `X-Hub-Signature-256` header; [`sender::MetaSender`] is the transport the
//! engine replies through.

pub mod sender;
pub mod webhook;

pub use {
    sender::{MetaSender, SendError},
    webhook::{
        WebhookDelivery, WebhookPayload, decode_payload, verify_signature,
        verify_webhook_subscription,
    },
};
