//! Meta webhook decoding: signature check, subscription handshake, and
//! normalization of deliveries into [`InboundEvent`]s.

use std::collections::HashMap;

use {
    hmac::{Hmac, Mac},
    serde::Deserialize,
    sha2::Sha256,
    tracing::{debug, warn},
};

use charla_common::{InboundEvent, MessageKind};

type HmacSha256 = Hmac<Sha256>;

/// Check the `X-Hub-Signature-256` header against the raw request body.
///
/// The header value is `sha256=<hex>` where the digest is HMAC-SHA256 of the
/// body keyed with the app secret.
pub fn verify_signature(body: &[u8], signature_header: &str, app_secret: &str) -> bool {
    let expected = match signature_header.strip_prefix("sha256=") {
        Some(hex) => hex,
        None => {
            warn!("signature header missing sha256= prefix");
            return false;
        },
    };

    let mut mac = match HmacSha256::new_from_slice(app_secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => {
            warn!("failed to set up HMAC");
            return false;
        },
    };

    mac.update(body);
    let computed = hex::encode(mac.finalize().into_bytes());

    // Constant-time comparison.
    constant_time_eq(&computed, expected)
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Answer the `GET /webhook` subscription handshake.
///
/// Meta sends `hub.mode=subscribe`, `hub.verify_token` and `hub.challenge`;
/// the challenge is echoed back only when the token matches.
pub fn verify_webhook_subscription(
    mode: Option<&str>,
    token: Option<&str>,
    challenge: Option<&str>,
    verify_token: &str,
) -> Option<String> {
    let mode = mode?;
    let token = token?;
    let challenge = challenge?;

    if mode == "subscribe" && token == verify_token {
        Some(challenge.to_string())
    } else {
        None
    }
}

/// One webhook delivery, as POSTed to `/webhook`.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub value: ChangeValue,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChangeValue {
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub contacts: Vec<WebhookContact>,
    #[serde(default)]
    pub messages: Vec<WebhookMessage>,
}

#[derive(Debug, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub phone_number_id: String,
}

#[derive(Debug, Deserialize)]
pub struct WebhookContact {
    pub wa_id: String,
    pub profile: Option<Profile>,
}

#[derive(Debug, Deserialize)]
pub struct Profile {
    pub name: String,
}

/// A single message inside a `messages` change. Exactly one of the typed
/// payload fields is populated, matching `type`.
#[derive(Debug, Deserialize)]
pub struct WebhookMessage {
    pub from: String,
    #[serde(rename = "type", default)]
    pub message_type: String,
    pub text: Option<TextBody>,
    pub image: Option<Media>,
    pub video: Option<Media>,
    pub audio: Option<Media>,
    pub document: Option<Media>,
}

#[derive(Debug, Deserialize)]
pub struct TextBody {
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct Media {
    #[serde(default)]
    pub caption: Option<String>,
    /// Direct URL, when the delivery carries one. Cloud API payloads usually
    /// hold only a media id that needs a separate lookup, so this stays
    /// `None` for them.
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

/// The routable outcome of one webhook delivery.
#[derive(Debug, Default)]
pub struct WebhookDelivery {
    /// User messages, in payload order.
    pub events: Vec<InboundEvent>,
    /// A human answered from the Business app or an attached inbox.
    pub agent_activity: bool,
}

/// Walk a payload into routable events.
///
/// Only `messages` changes addressed to `phone_number_id` are kept. Echo
/// fields are never turned into events; they flag agent activity instead.
/// Status receipts carry no `messages` array and fall through harmlessly.
pub fn decode_payload(payload: WebhookPayload, phone_number_id: &str) -> WebhookDelivery {
    let mut delivery = WebhookDelivery::default();

    for entry in payload.entry {
        for change in entry.changes {
            // Covers both "message_echoes" and "smb_message_echoes".
            if change.field.ends_with("message_echoes") {
                delivery.agent_activity = true;
                continue;
            }
            if change.field != "messages" {
                debug!(field = %change.field, "ignoring webhook field");
                continue;
            }

            let value = change.value;
            if let Some(metadata) = &value.metadata
                && metadata.phone_number_id != phone_number_id
            {
                warn!(
                    expected = %phone_number_id,
                    received = %metadata.phone_number_id,
                    "phone number id mismatch"
                );
                continue;
            }

            let names: HashMap<String, String> = value
                .contacts
                .iter()
                .filter_map(|c| c.profile.as_ref().map(|p| (c.wa_id.clone(), p.name.clone())))
                .collect();

            for message in value.messages {
                delivery.events.push(into_event(message, &names));
            }
        }
    }

    delivery
}

fn into_event(message: WebhookMessage, names: &HashMap<String, String>) -> InboundEvent {
    let push_name = names.get(&message.from).cloned();
    let kind = match message.message_type.as_str() {
        "text" => MessageKind::Text,
        "image" => MessageKind::Image,
        "video" => MessageKind::Video,
        "audio" => MessageKind::Audio,
        "document" => MessageKind::Document,
        other => {
            debug!(message_type = other, "unmapped message type");
            MessageKind::Unknown
        },
    };

    let media = match kind {
        MessageKind::Image => message.image,
        MessageKind::Video => message.video,
        MessageKind::Audio => message.audio,
        MessageKind::Document => message.document,
        MessageKind::Text | MessageKind::Unknown => None,
    };

    InboundEvent {
        from: message.from,
        push_name,
        kind,
        body: message.text.map(|t| t.body).unwrap_or_default(),
        caption: media.as_ref().and_then(|m| m.caption.clone()),
        media_url: media.as_ref().and_then(|m| m.link.clone()),
        media_name: media.and_then(|m| m.filename),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const PHONE_NUMBER_ID: &str = "106540352242922";

    fn sign(body: &[u8], secret: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn signed_body_passes_verification() {
        let body = br#"{"object":"whatsapp_business_account"}"#;
        let header = sign(body, "app-secret");
        assert!(verify_signature(body, &header, "app-secret"));
    }

    #[test]
    fn wrong_signature_is_rejected() {
        let body = b"cuerpo";
        let header = "sha256=0000000000000000000000000000000000000000000000000000000000000000";
        assert!(!verify_signature(body, header, "app-secret"));
    }

    #[test]
    fn missing_prefix_is_rejected() {
        assert!(!verify_signature(b"cuerpo", "md5=abcdef", "app-secret"));
    }

    #[test]
    fn tampered_body_fails_verification() {
        let header = sign(b"original", "app-secret");
        assert!(!verify_signature(b"alterado", &header, "app-secret"));
    }

    #[test]
    fn subscription_handshake_echoes_the_challenge() {
        let challenge = verify_webhook_subscription(
            Some("subscribe"),
            Some("mi-token"),
            Some("challenge_123"),
            "mi-token",
        );
        assert_eq!(challenge, Some("challenge_123".to_string()));
    }

    #[test]
    fn subscription_with_wrong_token_is_refused() {
        let challenge = verify_webhook_subscription(
            Some("subscribe"),
            Some("otro-token"),
            Some("challenge_123"),
            "mi-token",
        );
        assert_eq!(challenge, None);
    }

    #[test]
    fn subscription_with_wrong_mode_is_refused() {
        let challenge = verify_webhook_subscription(
            Some("unsubscribe"),
            Some("mi-token"),
            Some("challenge_123"),
            "mi-token",
        );
        assert_eq!(challenge, None);
    }

    fn payload(json: serde_json::Value) -> WebhookPayload {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn text_delivery_decodes_to_an_event() {
        let payload = payload(serde_json::json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "0",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messaging_product": "whatsapp",
                        "metadata": {
                            "display_phone_number": "51987654321",
                            "phone_number_id": PHONE_NUMBER_ID,
                        },
                        "contacts": [{
                            "wa_id": "51999000111",
                            "profile": { "name": "Rosa Quispe" },
                        }],
                        "messages": [{
                            "id": "wamid.abc",
                            "from": "51999000111",
                            "timestamp": "1755862800",
                            "type": "text",
                            "text": { "body": "Hola, necesito una cotización" },
                        }],
                    },
                }],
            }],
        }));

        let delivery = decode_payload(payload, PHONE_NUMBER_ID);
        assert!(!delivery.agent_activity);
        assert_eq!(delivery.events.len(), 1);
        let event = &delivery.events[0];
        assert_eq!(event.from, "51999000111");
        assert_eq!(event.push_name.as_deref(), Some("Rosa Quispe"));
        assert_eq!(event.kind, MessageKind::Text);
        assert_eq!(event.body, "Hola, necesito una cotización");
    }

    #[test]
    fn image_caption_and_link_carry_through() {
        let payload = payload(serde_json::json!({
            "entry": [{
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messages": [{
                            "from": "51999000111",
                            "type": "image",
                            "image": {
                                "caption": "mi comprobante",
                                "link": "https://cdn.example.com/media/abc123.jpg",
                                "mime_type": "image/jpeg",
                            },
                        }],
                    },
                }],
            }],
        }));

        let event = &decode_payload(payload, PHONE_NUMBER_ID).events[0];
        assert_eq!(event.kind, MessageKind::Image);
        assert_eq!(event.caption.as_deref(), Some("mi comprobante"));
        assert_eq!(
            event.media_url.as_deref(),
            Some("https://cdn.example.com/media/abc123.jpg")
        );
        assert!(event.push_name.is_none());
    }

    #[test]
    fn document_filename_becomes_media_name() {
        let payload = payload(serde_json::json!({
            "entry": [{
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messages": [{
                            "from": "51999000111",
                            "type": "document",
                            "document": { "filename": "factura.pdf" },
                        }],
                    },
                }],
            }],
        }));

        let event = &decode_payload(payload, PHONE_NUMBER_ID).events[0];
        assert_eq!(event.kind, MessageKind::Document);
        assert_eq!(event.media_name.as_deref(), Some("factura.pdf"));
    }

    #[test]
    fn unmapped_type_decodes_as_unknown() {
        let payload = payload(serde_json::json!({
            "entry": [{
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messages": [{ "from": "51999000111", "type": "sticker" }],
                    },
                }],
            }],
        }));

        let event = &decode_payload(payload, PHONE_NUMBER_ID).events[0];
        assert_eq!(event.kind, MessageKind::Unknown);
        assert!(event.body.is_empty());
    }

    #[test]
    fn echo_fields_flag_agent_activity() {
        let payload = payload(serde_json::json!({
            "entry": [{
                "changes": [{
                    "field": "smb_message_echoes",
                    "value": {
                        "message_echoes": [{
                            "from": "51987654321",
                            "to": "51999000111",
                            "type": "text",
                            "text": { "body": "Le atiende Carlos" },
                        }],
                    },
                }],
            }],
        }));

        let delivery = decode_payload(payload, PHONE_NUMBER_ID);
        assert!(delivery.agent_activity);
        assert!(delivery.events.is_empty());
    }

    #[test]
    fn status_receipts_produce_no_events() {
        let payload = payload(serde_json::json!({
            "entry": [{
                "changes": [{
                    "field": "messages",
                    "value": {
                        "metadata": { "phone_number_id": PHONE_NUMBER_ID },
                        "statuses": [{
                            "id": "wamid.abc",
                            "status": "delivered",
                            "recipient_id": "51999000111",
                        }],
                    },
                }],
            }],
        }));

        let delivery = decode_payload(payload, PHONE_NUMBER_ID);
        assert!(delivery.events.is_empty());
        assert!(!delivery.agent_activity);
    }

    #[test]
    fn mismatched_phone_number_id_drops_the_change() {
        let payload = payload(serde_json::json!({
            "entry": [{
                "changes": [{
                    "field": "messages",
                    "value": {
                        "metadata": { "phone_number_id": "999999999" },
                        "messages": [{
                            "from": "51999000111",
                            "type": "text",
                            "text": { "body": "hola" },
                        }],
                    },
                }],
            }],
        }));

        assert!(decode_payload(payload, PHONE_NUMBER_ID).events.is_empty());
    }
}
