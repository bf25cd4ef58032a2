pub mod assistant_service;
pub mod chunking;
pub mod conversation;
pub mod diagnostics;
pub mod fallback;
pub mod generation;
pub mod knowledge;
pub mod models;
pub mod providers;
pub mod retrieval;

pub use assistant_service::AssistantService;
pub use knowledge::KnowledgeSource;
pub use models::{AssistantOptions, GenerationConfig, ServiceStatus};
pub use providers::{AiProviders, CompletionProvider, EmbeddingProvider};
