//! In-memory store for the knowledge file: load at startup, substring lookup.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One question/answer record from the knowledge file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub question: String,
    pub answer: String,
    pub category: String,
    pub subcategory: String,
    pub tags: Vec<String>,
}

/// Successful lookup result: the matched answer plus its classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: String,
    pub category: String,
    pub subcategory: String,
    pub tags: Vec<String>,
}

/// Errors loading the knowledge file.
#[derive(Debug, thiserror::Error)]
pub enum KnowledgeError {
    #[error("failed to read knowledge file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse knowledge file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Ordered, immutable list of question/answer entries.
///
/// Built once at startup and shared by reference; no mutation after load.
/// In-memory order equals file order, and order is significant: it decides
/// which entry wins when several questions match the same input.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    entries: Vec<KnowledgeEntry>,
}

impl KnowledgeBase {
    /// Loads the knowledge base from a JSON array file.
    pub fn load_path<P: AsRef<Path>>(path: P) -> Result<Self, KnowledgeError> {
        let path_str = path.as_ref().display().to_string();
        let raw = fs::read_to_string(&path).map_err(|source| KnowledgeError::Io {
            path: path_str.clone(),
            source,
        })?;
        let entries: Vec<KnowledgeEntry> =
            serde_json::from_str(&raw).map_err(|source| KnowledgeError::Parse {
                path: path_str.clone(),
                source,
            })?;
        tracing::info!(path = %path_str, entries = entries.len(), "Knowledge base loaded");
        Ok(Self { entries })
    }

    /// Builds a knowledge base from entries already in memory.
    pub fn from_entries(entries: Vec<KnowledgeEntry>) -> Self {
        Self { entries }
    }

    /// Number of loaded entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries are loaded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the first entry whose question (lower-cased) appears anywhere
    /// inside `user_text` (lower-cased), or `None` when nothing matches.
    ///
    /// Matching is substring-based, not whole-word: a short stored question
    /// can match inside a longer unrelated input. That is accepted behavior
    /// inherited from the deployed knowledge file, so keep it exact.
    pub fn find_answer(&self, user_text: &str) -> Option<AnswerResult> {
        let haystack = user_text.to_lowercase();
        self.entries
            .iter()
            .find(|entry| haystack.contains(&entry.question.to_lowercase()))
            .map(|entry| AnswerResult {
                answer: entry.answer.clone(),
                category: entry.category.clone(),
                subcategory: entry.subcategory.clone(),
                tags: entry.tags.clone(),
            })
    }
}
