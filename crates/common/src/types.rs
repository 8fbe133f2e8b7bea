//! Channel-facing message model: the inbound event a transport hands the
//! engine and its normalized, routable form.

use serde::{Deserialize, Serialize};

/// Payload kind of an inbound channel event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Image,
    Video,
    Audio,
    Document,
    Unknown,
}

/// A single inbound event after transport decoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Channel user id (phone number for WhatsApp-style transports).
    pub from: String,
    /// Display name advertised by the channel, when present.
    #[serde(default)]
    pub push_name: Option<String>,
    pub kind: MessageKind,
    /// Raw text payload. Empty for pure media events.
    #[serde(default)]
    pub body: String,
    /// Media caption, when the channel carries one.
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub media_name: Option<String>,
}

impl InboundEvent {
    /// Plain text event, the common case.
    pub fn text(from: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            push_name: None,
            kind: MessageKind::Text,
            body: body.into(),
            caption: None,
            media_url: None,
            media_name: None,
        }
    }

    /// Sender display name, falling back to a generic label.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.push_name.as_deref().unwrap_or("Cliente")
    }
}

/// Attachment descriptor forwarded to the CRM mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub file_type: String,
    pub file_url: String,
    pub file_name: String,
}

/// An inbound event reduced to the text the engine routes on, plus an
/// optional attachment for the CRM mirror.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageParts {
    pub text: String,
    pub attachment: Option<Attachment>,
}

impl MessageParts {
    /// Normalize a channel event into routable text.
    ///
    /// Media events degrade to a fixed placeholder so flows always see text;
    /// images keep their caption when one is present. Unknown kinds come back
    /// empty and the engine skips them.
    #[must_use]
    pub fn from_event(event: &InboundEvent) -> Self {
        match event.kind {
            MessageKind::Text => Self {
                text: event.body.trim().to_string(),
                attachment: None,
            },
            MessageKind::Image => {
                let caption = event
                    .caption
                    .as_deref()
                    .map(str::trim)
                    .filter(|c| !c.is_empty());
                Self {
                    text: caption.unwrap_or("📷 Imagen").to_string(),
                    attachment: image_attachment(event),
                }
            },
            MessageKind::Video => Self {
                text: "🎥 Video recibido".to_string(),
                attachment: None,
            },
            MessageKind::Audio => Self {
                text: "🎵 Audio recibido".to_string(),
                attachment: None,
            },
            MessageKind::Document => Self {
                text: "📄 Documento recibido".to_string(),
                attachment: None,
            },
            MessageKind::Unknown => Self::default(),
        }
    }

    /// True when there is nothing to route on.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.attachment.is_none()
    }
}

fn image_attachment(event: &InboundEvent) -> Option<Attachment> {
    let file_url = event.media_url.clone()?;
    let file_name = event
        .media_name
        .clone()
        .or_else(|| {
            file_url
                .rsplit('/')
                .next()
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "imagen.jpg".to_string());
    Some(Attachment {
        file_type: "image".to_string(),
        file_url,
        file_name,
    })
}
