//! Meta webhook endpoints: the subscription handshake and deliveries.

use {
    axum::{
        body::Bytes,
        extract::{Query, State},
        http::{HeaderMap, StatusCode},
        response::IntoResponse,
    },
    secrecy::ExposeSecret,
    serde::Deserialize,
    tracing::{debug, warn},
};

use charla_whatsapp::{WebhookPayload, decode_payload, verify_signature, verify_webhook_subscription};

use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

/// `GET /webhook`: echo the challenge when the verify token matches.
pub async fn verify_webhook(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> impl IntoResponse {
    match verify_webhook_subscription(
        params.mode.as_deref(),
        params.verify_token.as_deref(),
        params.challenge.as_deref(),
        &state.whatsapp.verify_token,
    ) {
        Some(challenge) => (StatusCode::OK, challenge).into_response(),
        None => {
            warn!("webhook subscription refused");
            StatusCode::FORBIDDEN.into_response()
        },
    }
}

/// `POST /webhook`: check the signature over the raw body, then admit.
///
/// User messages go into the engine queue; echo changes stand the bot down.
/// Deliveries are acknowledged even when undecodable, so Meta stops
/// retrying them.
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    if let Some(secret) = &state.whatsapp.app_secret {
        let header = headers
            .get("x-hub-signature-256")
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");
        if !verify_signature(&body, header, secret.expose_secret()) {
            warn!("webhook signature check failed");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    } else {
        debug!("no app secret configured, accepting unsigned delivery");
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(error) => {
            warn!(%error, "undecodable webhook payload");
            return (StatusCode::OK, "EVENT_RECEIVED").into_response();
        },
    };

    let delivery = decode_payload(payload, &state.whatsapp.phone_number_id);
    if delivery.agent_activity {
        state.engine.notice_agent_activity();
    }
    for event in delivery.events {
        state.engine.handle_event(event);
    }

    (StatusCode::OK, "EVENT_RECEIVED").into_response()
}
