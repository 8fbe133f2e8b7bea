//! Operational blacklist endpoint.

use {
    axum::{
        Json,
        extract::State,
        http::StatusCode,
        response::IntoResponse,
    },
    serde::Deserialize,
};

use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct BlacklistRequest {
    number: String,
    intent: String,
}

/// `POST /v1/blacklist`: suppress or re-enable a number.
///
/// Removal also sends the number a short thank-you through the regular
/// paced dispatcher.
pub async fn blacklist_update(
    State(state): State<AppState>,
    Json(body): Json<BlacklistRequest>,
) -> impl IntoResponse {
    match body.intent.as_str() {
        "add" => {
            state.engine.blacklist_add(&body.number);
            Json(serde_json::json!({
                "status": "ok",
                "number": body.number,
                "intent": "add",
            }))
            .into_response()
        },
        "remove" => {
            let removed = state.engine.blacklist_remove(&body.number).await;
            Json(serde_json::json!({
                "status": "ok",
                "number": body.number,
                "intent": "remove",
                "removed": removed,
            }))
            .into_response()
        },
        other => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": format!("unknown intent: {other}") })),
        )
            .into_response(),
    }
}
