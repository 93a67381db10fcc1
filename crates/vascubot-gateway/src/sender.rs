//! Outbound delivery of replies through the WhatsApp Cloud API.

use async_trait::async_trait;

const GRAPH_API_BASE: &str = "https://graph.facebook.com/v16.0";

/// Errors delivering an outbound message.
#[derive(Debug, thiserror::Error)]
pub(crate) enum SendError {
    #[error("message delivery failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("messaging API returned status {status}: {message}")]
    Api { status: u16, message: String },
}

/// Receipt returned by the messaging API on success.
#[derive(Debug, Clone)]
pub(crate) struct DeliveryReceipt {
    pub(crate) raw: serde_json::Value,
}

/// Boundary for outbound message delivery. Handlers talk to this trait so
/// the webhook flow can be tested without the third-party messaging API.
#[async_trait]
pub(crate) trait MessageSender: Send + Sync {
    async fn send_text(
        &self,
        recipient_id: &str,
        body: &str,
    ) -> Result<DeliveryReceipt, SendError>;
}

/// WhatsApp Cloud API sender.
pub(crate) struct WhatsAppSender {
    http_client: reqwest::Client,
    access_token: String,
    phone_number_id: String,
    base_url: String,
}

impl WhatsAppSender {
    pub(crate) fn new(access_token: impl Into<String>, phone_number_id: impl Into<String>) -> Self {
        Self::with_base_url(access_token, phone_number_id, GRAPH_API_BASE)
    }

    pub(crate) fn with_base_url(
        access_token: impl Into<String>,
        phone_number_id: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            access_token: access_token.into(),
            phone_number_id: phone_number_id.into(),
            base_url: base_url.into(),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/{}/messages",
            self.base_url.trim_end_matches('/'),
            self.phone_number_id
        )
    }
}

#[async_trait]
impl MessageSender for WhatsAppSender {
    async fn send_text(
        &self,
        recipient_id: &str,
        body: &str,
    ) -> Result<DeliveryReceipt, SendError> {
        let payload = serde_json::json!({
            "messaging_product": "whatsapp",
            "to": recipient_id,
            "type": "text",
            "text": { "body": body },
        });

        let response = self
            .http_client
            .post(self.messages_url())
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SendError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let raw = response.json().await?;
        Ok(DeliveryReceipt { raw })
    }
}

/// Records outbound messages instead of delivering them. Test double.
#[cfg(test)]
pub(crate) struct RecordingSender {
    pub(crate) sent: std::sync::Mutex<Vec<(String, String)>>,
}

#[cfg(test)]
impl RecordingSender {
    pub(crate) fn new() -> Self {
        Self {
            sent: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl MessageSender for RecordingSender {
    async fn send_text(
        &self,
        recipient_id: &str,
        body: &str,
    ) -> Result<DeliveryReceipt, SendError> {
        self.sent
            .lock()
            .expect("sender mutex")
            .push((recipient_id.to_string(), body.to_string()));
        Ok(DeliveryReceipt {
            raw: serde_json::json!({ "messages": [{ "id": "wamid.test" }] }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::routing::post;
    use axum::{Json, Router};

    #[test]
    fn messages_url_targets_phone_number_id() {
        let sender = WhatsAppSender::new("token", "123456789");
        assert_eq!(
            sender.messages_url(),
            "https://graph.facebook.com/v16.0/123456789/messages"
        );
    }

    #[tokio::test]
    async fn send_text_posts_whatsapp_payload_and_returns_receipt() {
        // Local stand-in for the Graph API: echoes the recipient back.
        let app = Router::new().route(
            "/:phone_id/messages",
            post(
                |Path(phone_id): Path<String>, Json(body): Json<serde_json::Value>| async move {
                    assert_eq!(body["messaging_product"], "whatsapp");
                    assert_eq!(body["type"], "text");
                    Json(serde_json::json!({
                        "messaging_product": "whatsapp",
                        "contacts": [{ "wa_id": body["to"] }],
                        "messages": [{ "id": format!("wamid.{}", phone_id) }]
                    }))
                },
            ),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let sender = WhatsAppSender::with_base_url("token", "123", format!("http://{}", addr));
        let receipt = sender
            .send_text("5215550001111", "Hola desde el bot")
            .await
            .expect("delivery");
        assert_eq!(receipt.raw["messages"][0]["id"], "wamid.123");
        assert_eq!(receipt.raw["contacts"][0]["wa_id"], "5215550001111");
    }

    #[tokio::test]
    async fn send_text_maps_error_status_to_api_error() {
        let app = Router::new().route(
            "/:phone_id/messages",
            post(|| async {
                (
                    axum::http::StatusCode::UNAUTHORIZED,
                    Json(serde_json::json!({ "error": { "message": "bad token" } })),
                )
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let sender = WhatsAppSender::with_base_url("bad", "123", format!("http://{}", addr));
        let err = sender.send_text("52155", "hola").await.unwrap_err();
        match err {
            SendError::Api { status, .. } => assert_eq!(status, 401),
            other => panic!("expected Api error, got: {}", other),
        }
    }
}
