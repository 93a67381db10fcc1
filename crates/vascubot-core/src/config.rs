//! Gateway configuration. Load from TOML or env.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Global application configuration. Load from TOML or env.
///
/// Secrets (provider API key, messaging credentials, webhook verify token)
/// are deliberately not part of this struct; they are read from the
/// environment by the components that need them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Application identity used in logs and startup banner.
    pub app_name: String,
    /// HTTP port for the gateway.
    pub port: u16,
    /// Path to the knowledge base JSON file, loaded in full at startup.
    pub knowledge_path: String,
    /// LLM mode ("mock" or "live").
    pub llm_mode: String,
    /// Model identifier sent with every completion request.
    pub model: String,
    /// Base URL of the OpenAI-compatible completion provider.
    pub completion_base_url: String,
}

impl GatewayConfig {
    /// Load config from file and environment.
    /// Precedence: env `VASCUBOT_CONFIG` path > `config/gateway.toml` > defaults,
    /// with `VASCUBOT`-prefixed environment variables overriding everything.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("VASCUBOT_CONFIG").unwrap_or_else(|_| "config/gateway".to_string());
        let builder = config::Config::builder()
            .set_default("app_name", "Vascubot Gateway")?
            .set_default("port", 5000_i64)?
            .set_default("knowledge_path", "knowledge_base.json")?
            .set_default("llm_mode", "mock")?
            .set_default("model", "gpt-4o-mini")?
            .set_default("completion_base_url", "https://api.openai.com")?;

        let path = Path::new(&config_path);
        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        let built = builder
            .add_source(config::Environment::with_prefix("VASCUBOT").separator("__"))
            .build()?;

        built.try_deserialize()
    }
}
