//! Unified reply flow: knowledge base lookup first, completion fallback on
//! a miss. Both the chat endpoint and the webhook route through this, so
//! the two entry points can never diverge in behavior.

use serde::Serialize;
use std::sync::Arc;
use vascubot_core::KnowledgeBase;
use vascubot_llm::FallbackResponder;

/// Classification of a knowledge-base hit, echoed to API clients.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct AnswerMetadata {
    pub(crate) category: String,
    pub(crate) subcategory: String,
    pub(crate) tags: Vec<String>,
}

/// Final reply for one inbound message.
#[derive(Debug)]
pub(crate) struct Reply {
    pub(crate) text: String,
    /// Present only when the reply came from the knowledge base.
    pub(crate) metadata: Option<AnswerMetadata>,
}

pub(crate) struct Responder {
    knowledge: Arc<KnowledgeBase>,
    fallback: FallbackResponder,
}

impl Responder {
    pub(crate) fn new(knowledge: Arc<KnowledgeBase>, fallback: FallbackResponder) -> Self {
        Self { knowledge, fallback }
    }

    /// Answers one user message. Total: lookup has no failure mode and the
    /// fallback swallows provider errors, so this always produces a reply.
    pub(crate) async fn respond(&self, user_text: &str) -> Reply {
        let text = user_text.trim();

        if let Some(hit) = self.knowledge.find_answer(text) {
            tracing::info!(category = %hit.category, "Knowledge base hit");
            return Reply {
                text: hit.answer,
                metadata: Some(AnswerMetadata {
                    category: hit.category,
                    subcategory: hit.subcategory,
                    tags: hit.tags,
                }),
            };
        }

        tracing::info!("No knowledge base match; falling back to completion");
        Reply {
            text: self.fallback.generate_reply(text).await,
            metadata: None,
        }
    }
}
