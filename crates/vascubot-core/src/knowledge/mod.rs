//! Static question/answer knowledge base.
//!
//! An ordered list of entries loaded once from JSON. Lookup is a linear
//! scan with case-insensitive substring matching; the first entry whose
//! question appears inside the user's text wins, so list order is the
//! tie-break policy.

mod store;

pub use store::{AnswerResult, KnowledgeBase, KnowledgeEntry, KnowledgeError};
