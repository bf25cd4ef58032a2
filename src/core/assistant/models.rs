use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A bounded, sentence-aligned span of knowledge text used as the unit of retrieval.
///
/// The text is fixed once the knowledge base is built. The embedding is attached
/// during initialization, before the knowledge base is published to readers.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeChunk {
    pub content: String,
    pub embedding: Option<Vec<f32>>,
}

impl KnowledgeChunk {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            embedding: None,
        }
    }

    /// Returns the embedding only when it is present and non-empty.
    pub fn usable_embedding(&self) -> Option<&[f32]> {
        self.embedding
            .as_deref()
            .filter(|embedding| !embedding.is_empty())
    }
}

/// Lifecycle of the knowledge/embedding pipeline.
///
/// Moves from `Initializing` to exactly one of the terminal states and never leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Initializing,
    Ready,
    Error,
}

impl ServiceStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ServiceStatus::Initializing)
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ServiceStatus::Initializing => "initializing",
            ServiceStatus::Ready => "ready",
            ServiceStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// Which path produced the answer text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    /// Hosted completion API, conditioned on retrieved context.
    Completion,
    /// Deterministic keyword-triggered answer.
    Canned,
    /// Fixed apology returned at the outer boundary.
    Apology,
}

/// What the caller gets back for every question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantReply {
    pub answer: String,
    /// Advisory: the conversation surface should offer call/quote actions.
    pub suggest_contact: bool,
    pub source: AnswerSource,
}

/// Fixed facts about the business. Prompts, canned answers and the fallback
/// corpus are all rendered from this so they cannot disagree.
#[derive(Debug, Clone)]
pub struct BusinessProfile {
    pub name: String,
    pub city: String,
    pub phone: String,
    pub address: String,
    pub hours: String,
}

impl Default for BusinessProfile {
    fn default() -> Self {
        Self {
            name: "TintLab".to_string(),
            city: "Fredericksburg, VA".to_string(),
            phone: "(540) 891-0696".to_string(),
            address: "10928 Patriot Hwy, Fredericksburg, VA 22408".to_string(),
            hours: "Monday-Friday 9:00 AM - 5:30 PM, Saturday by appointment, and closed Sunday"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Maximum number of chunks handed to the generator.
    pub top_k: usize,
    /// Packing threshold for the chunker, in characters.
    pub max_chunk_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            max_chunk_chars: 500,
        }
    }
}

/// Parameters sent with every completion request.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub stop: Vec<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo-instruct".to_string(),
            max_tokens: 200,
            temperature: 0.2,
            stop: vec!["\n\n".to_string()],
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssistantOptions {
    pub profile: BusinessProfile,
    pub retrieval: RetrievalConfig,
    pub generation: GenerationConfig,
    /// Upper bound for a single embedding or completion call.
    pub provider_timeout: Duration,
    /// Upper bound for the retrieve-then-generate phase of one question.
    pub request_timeout: Duration,
}

impl Default for AssistantOptions {
    fn default() -> Self {
        Self {
            profile: BusinessProfile::default(),
            retrieval: RetrievalConfig::default(),
            generation: GenerationConfig::default(),
            provider_timeout: Duration::from_secs(15),
            request_timeout: Duration::from_secs(45),
        }
    }
}
