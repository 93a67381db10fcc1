//! vascubot-llm: OpenAI-compatible completion client and the fallback
//! reply generator used when the knowledge base has no answer.

mod client;
mod responder;

pub use client::{CompletionClient, CompletionError};
pub use responder::{FallbackResponder, LlmMode, APOLOGY, PERSONA};
