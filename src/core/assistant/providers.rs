use super::models::GenerationConfig;
use async_trait::async_trait;
use std::error::Error;
use std::sync::Arc;

/// Turns text into a fixed-dimension vector for similarity search.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the embedding for `text`. An empty vector is treated by callers
    /// the same as a failure.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, Box<dyn Error + Send + Sync>>;
}

/// Produces free text from a prompt.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, Box<dyn Error + Send + Sync>>;
}

/// The hosted-API backends available to the assistant.
///
/// Both are `None` when no API key is configured, which selects the
/// deterministic keyword/canned mode.
#[derive(Clone, Default)]
pub struct AiProviders {
    pub embedder: Option<Arc<dyn EmbeddingProvider>>,
    pub completer: Option<Arc<dyn CompletionProvider>>,
}

impl AiProviders {
    pub fn none() -> Self {
        Self::default()
    }

    /// Uses one client for both embeddings and completions.
    pub fn shared<T>(client: Arc<T>) -> Self
    where
        T: EmbeddingProvider + CompletionProvider + 'static,
    {
        Self {
            embedder: Some(client.clone() as Arc<dyn EmbeddingProvider>),
            completer: Some(client as Arc<dyn CompletionProvider>),
        }
    }
}
