//! vascubot-core: shared configuration and the static knowledge base.
//!
//! The knowledge base is loaded once at startup and never mutated; the
//! gateway shares it by reference. Configuration follows the usual
//! defaults -> TOML file -> environment layering.

mod config;
mod knowledge;

pub use config::GatewayConfig;
pub use knowledge::{AnswerResult, KnowledgeBase, KnowledgeEntry, KnowledgeError};
