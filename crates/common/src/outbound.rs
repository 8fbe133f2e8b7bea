//! Outbound port the engine sends replies through.

use std::time::Duration;

use async_trait::async_trait;

/// A reply chunk scheduled for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub body: String,
    /// Pause applied before this chunk is handed to the transport.
    pub delay: Duration,
}

/// Outbound side of a messaging channel.
///
/// Implementations deliver one text message to one channel user. Delivery is
/// at-most-once: callers treat an error as "stop sending the rest of this
/// reply" and never re-send.
#[async_trait]
pub trait Outbound: Send + Sync {
    async fn send_text(&self, to: &str, body: &str) -> anyhow::Result<()>;

    /// Best-effort typing indicator. Default is a no-op.
    async fn send_typing(&self, _to: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn name(&self) -> &str;
}
