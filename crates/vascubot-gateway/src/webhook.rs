//! WhatsApp Cloud API webhook: GET verification handshake and POST events.
//!
//! The POST handler always acknowledges with `200 EVENT_RECEIVED`. Events
//! without a text message, processing failures, and delivery failures are
//! logged and dropped; the platform retries on non-2xx, so a failed event
//! must never surface as an error response.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::AppState;

/// Query params for the verification handshake.
#[derive(Debug, Deserialize)]
pub(crate) struct VerifyParams {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

/// GET /webhook – subscription verification. Echoes the challenge when the
/// mode is "subscribe" and the token matches the configured one.
pub(crate) async fn verify(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> (StatusCode, String) {
    match (params.mode.as_deref(), params.verify_token.as_deref()) {
        (Some(mode), Some(token)) => {
            if mode == "subscribe" && state.verify_token.as_deref() == Some(token) {
                tracing::info!("Webhook verified");
                (StatusCode::OK, params.challenge.unwrap_or_default())
            } else {
                tracing::warn!("Webhook verification rejected");
                (StatusCode::FORBIDDEN, "Verification failed".to_string())
            }
        }
        _ => (StatusCode::NOT_FOUND, "Nothing to process".to_string()),
    }
}

/// Inbound event payload. Every level is defaulted/optional so unexpected
/// shapes (status updates, media messages) deserialize instead of being
/// rejected before the handler runs.
#[derive(Debug, Deserialize)]
pub(crate) struct WebhookPayload {
    #[serde(default)]
    entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(default)]
    changes: Vec<Change>,
}

#[derive(Debug, Deserialize)]
struct Change {
    #[serde(default)]
    value: ChangeValue,
}

#[derive(Debug, Default, Deserialize)]
struct ChangeValue {
    #[serde(default)]
    messages: Vec<InboundMessage>,
}

#[derive(Debug, Deserialize)]
struct InboundMessage {
    from: Option<String>,
    text: Option<MessageText>,
}

#[derive(Debug, Deserialize)]
struct MessageText {
    body: Option<String>,
}

/// Pulls the sender id and text body out of `entry[0].changes[0].value.messages[0]`.
fn extract_message(payload: &WebhookPayload) -> Option<(String, String)> {
    let message = payload
        .entry
        .first()?
        .changes
        .first()?
        .value
        .messages
        .first()?;
    let sender_id = message.from.clone()?;
    let body = message.text.as_ref()?.body.clone()?;
    Some((sender_id, body))
}

/// POST /webhook – inbound message event. Looks the text up in the knowledge
/// base, falls back to the completion provider, and delivers the reply to
/// the sender through the outbound channel.
pub(crate) async fn receive(
    State(state): State<AppState>,
    Json(payload): Json<WebhookPayload>,
) -> (StatusCode, &'static str) {
    match extract_message(&payload) {
        Some((sender_id, user_message)) => {
            tracing::info!(from = %sender_id, chars = user_message.len(), "Webhook message received");
            let reply = state.responder.respond(&user_message).await;
            match &state.sender {
                Some(sender) => {
                    if let Err(e) = sender.send_text(&sender_id, &reply.text).await {
                        tracing::error!(to = %sender_id, error = %e, "Outbound delivery failed");
                    }
                }
                None => tracing::warn!(
                    to = %sender_id,
                    "Outbound delivery disabled; dropping reply ({} chars)",
                    reply.text.len()
                ),
            }
        }
        None => tracing::debug!("Webhook event carried no text message"),
    }

    (StatusCode::OK, "EVENT_RECEIVED")
}
