//! Axum-based chatbot gateway: HTTP chat endpoint plus WhatsApp webhook.
//! Config-driven via GatewayConfig; secrets come from the environment.

mod responder;
mod sender;
mod webhook;

use axum::extract::{Json, State};
use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use responder::Responder;
use sender::{MessageSender, WhatsAppSender};
use vascubot_core::{GatewayConfig, KnowledgeBase};
use vascubot_llm::{CompletionClient, FallbackResponder, LlmMode};

const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
const ENV_WHATSAPP_ACCESS_TOKEN: &str = "WHATSAPP_ACCESS_TOKEN";
const ENV_PHONE_NUMBER_ID: &str = "PHONE_NUMBER_ID";
const ENV_VERIFY_TOKEN: &str = "WHATSAPP_VERIFY_TOKEN";

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) responder: Arc<Responder>,
    /// Outbound channel for webhook replies. None when the messaging
    /// credentials are not configured; replies are then logged and dropped.
    pub(crate) sender: Option<Arc<dyn MessageSender>>,
    pub(crate) verify_token: Option<String>,
}

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env::var calls)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!(
            "[vascubot-gateway] .env not loaded: {} (using system environment)",
            e
        );
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = GatewayConfig::load().expect("load GatewayConfig");

    let knowledge = Arc::new(
        KnowledgeBase::load_path(&config.knowledge_path).expect("load knowledge base"),
    );

    let llm_mode = LlmMode::parse(&config.llm_mode);
    let api_key = std::env::var(ENV_OPENAI_API_KEY).ok().filter(|k| !k.is_empty());
    if llm_mode == LlmMode::Live && api_key.is_none() {
        eprintln!("❌ OPENAI_API_KEY is required when llm_mode is \"live\"");
        std::process::exit(1);
    }
    let client = CompletionClient::new(
        config.completion_base_url.clone(),
        api_key,
        config.model.clone(),
    );
    let responder = Arc::new(Responder::new(
        knowledge,
        FallbackResponder::new(llm_mode, client),
    ));

    let sender = whatsapp_sender_from_env();
    if sender.is_none() {
        tracing::warn!(
            "WhatsApp credentials not set; webhook replies will be logged and dropped"
        );
    }
    let verify_token = std::env::var(ENV_VERIFY_TOKEN).ok().filter(|t| !t.is_empty());
    if verify_token.is_none() {
        tracing::warn!("WHATSAPP_VERIFY_TOKEN not set; webhook verification will be rejected");
    }

    let app = build_app(AppState {
        responder,
        sender,
        verify_token,
    });

    let port = config.port;
    let app_name = config.app_name.clone();
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("{} listening on {}", app_name, addr);
    axum::serve(
        tokio::net::TcpListener::bind(addr).await.expect("bind gateway port"),
        app,
    )
    .await
    .expect("serve gateway");
}

/// Builds the WhatsApp sender when both credentials are present.
fn whatsapp_sender_from_env() -> Option<Arc<dyn MessageSender>> {
    let access_token = std::env::var(ENV_WHATSAPP_ACCESS_TOKEN)
        .ok()
        .filter(|t| !t.is_empty())?;
    let phone_number_id = std::env::var(ENV_PHONE_NUMBER_ID)
        .ok()
        .filter(|p| !p.is_empty())?;
    let sender: Arc<dyn MessageSender> =
        Arc::new(WhatsAppSender::new(access_token, phone_number_id));
    Some(sender)
}

fn build_app(state: AppState) -> Router {
    // The original deployment sat behind permissive CORS for a browser
    // frontend; keep any-origin for GET/POST.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/chat", post(chat))
        .route("/webhook", get(webhook::verify).post(webhook::receive))
        .with_state(state)
        .layer(cors)
}

/// GET /api/v1/health – liveness check.
async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

/// Chat request from the frontend.
#[derive(serde::Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: String,
}

/// POST /api/v1/chat – answers from the knowledge base when possible,
/// otherwise from the completion fallback. A knowledge-base hit carries the
/// entry's classification as `metadata`.
async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> axum::Json<serde_json::Value> {
    tracing::info!("Chat request received: {} chars", req.message.len());
    let reply = state.responder.respond(&req.message).await;
    match reply.metadata {
        Some(metadata) => axum::Json(serde_json::json!({
            "response": reply.text,
            "metadata": metadata,
        })),
        None => axum::Json(serde_json::json!({ "response": reply.text })),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_support::test_state;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn post_chat(message: &str) -> serde_json::Value {
        let app = build_app(test_state());
        let body = serde_json::json!({ "message": message });
        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let app = build_app(test_state());
        let req = Request::builder()
            .uri("/api/v1/health")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn chat_knowledge_hit_returns_answer_with_metadata() {
        let json = post_chat("doctor, ¿qué son las varices?").await;
        assert_eq!(json["response"], "Las varices son venas dilatadas.");
        assert_eq!(json["metadata"]["category"], "patología");
        assert_eq!(json["metadata"]["subcategory"], "venosa");
        assert_eq!(json["metadata"]["tags"][0], "venas");
    }

    #[tokio::test]
    async fn chat_first_entry_wins_over_longer_match() {
        // Both "varices" and "varices en el embarazo" match; list order decides.
        let json = post_chat("tengo varices en el embarazo").await;
        assert_eq!(json["response"], "Las varices son venas dilatadas.");
    }

    #[tokio::test]
    async fn chat_miss_falls_back_without_metadata() {
        let json = post_chat("hola, ¿atienden los sábados?").await;
        let response = json["response"].as_str().expect("response text");
        assert!(response.contains("Mock LLM"));
        assert!(json.get("metadata").is_none());
    }

    #[tokio::test]
    async fn chat_input_is_trimmed_before_lookup() {
        let json = post_chat("   varices   ").await;
        assert_eq!(json["response"], "Las varices son venas dilatadas.");
    }
}
