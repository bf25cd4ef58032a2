// Environment-driven settings for the assistant binary.
//
// **Environment Variables:**
// - `OPENAI_API_KEY` - blank or missing runs the deterministic keyword/canned mode
// - `OPENAI_BASE_URL` - OpenAI-compatible API root
// - `OPENAI_EMBEDDING_MODEL` / `OPENAI_COMPLETION_MODEL`
// - `KNOWLEDGE_DIR` - directory holding the knowledge documents (default `knowledge`)
// - `KNOWLEDGE_BASE_URL` - when set, documents are fetched over HTTP instead
// - `ASSISTANT_TOP_K` / `ASSISTANT_MAX_CHUNK_CHARS`
// - `ASSISTANT_PROVIDER_TIMEOUT_SECS` / `ASSISTANT_REQUEST_TIMEOUT_SECS`

use crate::core::assistant::models::{GenerationConfig, RetrievalConfig};
use crate::core::assistant::AssistantOptions;
use crate::infra::ai::openai_client::{DEFAULT_BASE_URL, DEFAULT_EMBEDDING_MODEL};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_KNOWLEDGE_DIR: &str = "knowledge";

/// Where the knowledge documents are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KnowledgeLocation {
    Directory(PathBuf),
    Url(String),
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub embedding_model: String,
    pub knowledge: KnowledgeLocation,
    pub options: AssistantOptions,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from any key lookup. Unparseable numbers fall back to
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let parsed = |key: &str| non_blank(key).and_then(|v| v.parse::<u64>().ok());

        let retrieval_defaults = RetrievalConfig::default();
        let generation_defaults = GenerationConfig::default();
        let option_defaults = AssistantOptions::default();

        let knowledge = match non_blank("KNOWLEDGE_BASE_URL") {
            Some(url) => KnowledgeLocation::Url(url),
            None => KnowledgeLocation::Directory(PathBuf::from(
                non_blank("KNOWLEDGE_DIR").unwrap_or_else(|| DEFAULT_KNOWLEDGE_DIR.to_string()),
            )),
        };

        let options = AssistantOptions {
            retrieval: RetrievalConfig {
                top_k: positive(parsed("ASSISTANT_TOP_K"), retrieval_defaults.top_k),
                max_chunk_chars: positive(
                    parsed("ASSISTANT_MAX_CHUNK_CHARS"),
                    retrieval_defaults.max_chunk_chars,
                ),
            },
            generation: GenerationConfig {
                model: non_blank("OPENAI_COMPLETION_MODEL").unwrap_or(generation_defaults.model),
                ..generation_defaults
            },
            provider_timeout: parsed("ASSISTANT_PROVIDER_TIMEOUT_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(option_defaults.provider_timeout),
            request_timeout: parsed("ASSISTANT_REQUEST_TIMEOUT_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(option_defaults.request_timeout),
            ..option_defaults
        };

        Self {
            api_key: non_blank("OPENAI_API_KEY"),
            base_url: non_blank("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            embedding_model: non_blank("OPENAI_EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            knowledge,
            options,
        }
    }
}

fn positive(value: Option<u64>, default: usize) -> usize {
    value
        .filter(|v| *v > 0)
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or(default)
}
