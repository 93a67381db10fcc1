//! Fallback reply generation: mock or live completion, apology on failure.

use crate::client::{CompletionClient, CompletionError};

/// System persona sent with every completion request.
pub const PERSONA: &str = "Eres un asistente médico experto en cirugía vascular.";

/// User-facing apology returned whenever the completion call fails.
/// Degraded service is always preferred over a failed request, so this is
/// the only failure surface an end user ever sees.
pub const APOLOGY: &str =
    "Lo siento, hubo un problema al procesar tu solicitud. Por favor, intenta nuevamente.";

/// Mode for LLM invocation: mock (deterministic, no network) or live
/// (calls the configured completion provider).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LlmMode {
    #[default]
    Mock,
    Live,
}

impl LlmMode {
    /// Parses a mode string from config; anything other than "live" is mock.
    pub fn parse(mode: &str) -> Self {
        match mode {
            "live" => LlmMode::Live,
            _ => LlmMode::Mock,
        }
    }
}

/// Generates a dynamic reply when the knowledge base has no answer.
///
/// `generate_reply` is total: every provider failure is caught here, logged,
/// and replaced with [`APOLOGY`]. No error crosses this boundary.
pub struct FallbackResponder {
    mode: LlmMode,
    client: CompletionClient,
}

impl FallbackResponder {
    pub fn new(mode: LlmMode, client: CompletionClient) -> Self {
        Self { mode, client }
    }

    /// Mock LLM: deterministic "generated" response based on the user text,
    /// so the whole chain can be exercised without API keys.
    fn mock_generate(&self, user_text: &str) -> String {
        let preview = user_text
            .chars()
            .take(80)
            .chain(if user_text.chars().count() > 80 { "…" } else { "" }.chars())
            .collect::<String>();
        format!(
            "[Generated – Mock LLM]\n\nConsulta recibida: \"{}\". No dispongo de una respuesta \
             preparada para este tema; para una orientación precisa sobre tu caso, consulta a un \
             especialista en cirugía vascular.",
            preview
        )
    }

    async fn live_generate(&self, user_text: &str) -> Result<String, CompletionError> {
        self.client.complete(PERSONA, user_text).await
    }

    /// Returns the generated text, or the fixed apology string when the
    /// provider call fails for any reason. Never returns an error.
    pub async fn generate_reply(&self, user_text: &str) -> String {
        match self.mode {
            LlmMode::Mock => self.mock_generate(user_text),
            LlmMode::Live => match self.live_generate(user_text).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(
                        model = %self.client.model(),
                        error = %e,
                        "Completion provider call failed; returning apology"
                    );
                    APOLOGY.to_string()
                }
            },
        }
    }
}
