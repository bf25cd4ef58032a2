use super::chunking::split_into_chunks;
use super::models::{BusinessProfile, KnowledgeChunk};
use super::providers::EmbeddingProvider;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Static document with the short business facts (address, hours, phone).
pub const BUSINESS_INFO_DOC: &str = "business_info.txt";
/// Static document with the long-form service knowledge.
pub const BUSINESS_KNOWLEDGE_DOC: &str = "business_knowledge.md";

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("Failed to read knowledge document {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Knowledge document {name} returned HTTP {status}")]
    Status { name: String, status: u16 },

    #[error("Failed to fetch knowledge document {name}: {message}")]
    Transport { name: String, message: String },

    #[error("Timed out after {timeout:?} fetching knowledge document {name}")]
    Timeout { name: String, timeout: Duration },

    #[error("Knowledge corpus produced no chunks")]
    Empty,
}

// ============================================================================
// SOURCE TRAIT (PORT)
// ============================================================================

/// Where the raw knowledge documents come from.
///
/// The infra layer provides a filesystem and an HTTP implementation; the core
/// only asks for a document by name.
#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    async fn fetch_document(&self, name: &str) -> Result<String, KnowledgeError>;
}

/// Degraded-mode corpus used when the static documents are unreachable.
pub fn fallback_corpus(profile: &BusinessProfile) -> String {
    format!(
        "{name} Business Information:\n\
         - Location: {address}\n\
         - Phone: {phone}\n\
         - Hours: Mon-Fri 9AM-5:30PM, Sat by appointment\n\
         - Services: Window tinting, Paint protection film, Vinyl wrapping\n\
         - Films: SunTek Premium Films (High Performance, Carbon, CXP, Ceramic)\n\
         - Warranty: 100% lifetime manufacturer's warranty\n\
         - Experience: 25+ years in business\n\
         - Installation: 2-4 hours typical\n",
        name = profile.name,
        address = profile.address,
        phone = profile.phone,
    )
}

async fn fetch_bounded(
    source: &dyn KnowledgeSource,
    name: &str,
    timeout: Duration,
) -> Result<String, KnowledgeError> {
    tokio::time::timeout(timeout, source.fetch_document(name))
        .await
        .map_err(|_| KnowledgeError::Timeout {
            name: name.to_string(),
            timeout,
        })?
}

/// Fetches both knowledge documents and joins them with a blank line.
///
/// Any fetch failure or timeout, or a corpus that is blank, substitutes the
/// fallback corpus so the generator always has some context.
pub async fn load_corpus(
    source: &dyn KnowledgeSource,
    profile: &BusinessProfile,
    timeout: Duration,
) -> String {
    let fetched = async {
        let info = fetch_bounded(source, BUSINESS_INFO_DOC, timeout).await?;
        let knowledge = fetch_bounded(source, BUSINESS_KNOWLEDGE_DOC, timeout).await?;
        Ok::<_, KnowledgeError>(format!("{}\n\n{}", info, knowledge))
    }
    .await;

    match fetched {
        Ok(corpus) if !corpus.trim().is_empty() => corpus,
        Ok(_) => {
            tracing::warn!("Knowledge documents are empty, using fallback corpus");
            fallback_corpus(profile)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load knowledge documents, using fallback corpus");
            fallback_corpus(profile)
        }
    }
}

// ============================================================================
// KNOWLEDGE BASE
// ============================================================================

/// The chunk store shared read-only by every question after initialization.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    chunks: Vec<KnowledgeChunk>,
}

impl KnowledgeBase {
    pub fn from_corpus(corpus: &str, max_chunk_chars: usize) -> Result<Self, KnowledgeError> {
        let kb = Self {
            chunks: split_into_chunks(corpus, max_chunk_chars),
        };
        if kb.is_empty() {
            return Err(KnowledgeError::Empty);
        }
        Ok(kb)
    }

    pub fn chunks(&self) -> &[KnowledgeChunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn embedded_count(&self) -> usize {
        self.chunks
            .iter()
            .filter(|c| c.usable_embedding().is_some())
            .count()
    }

    /// Embeds every chunk one at a time. A failed or timed-out call leaves that
    /// chunk without an embedding; it stays reachable through keyword search.
    pub async fn attach_embeddings(&mut self, embedder: &dyn EmbeddingProvider, timeout: Duration) {
        for (index, chunk) in self.chunks.iter_mut().enumerate() {
            match tokio::time::timeout(timeout, embedder.embed(&chunk.content)).await {
                Ok(Ok(embedding)) if !embedding.is_empty() => chunk.embedding = Some(embedding),
                Ok(Ok(_)) => tracing::warn!(chunk = index, "Embedding API returned an empty vector"),
                Ok(Err(e)) => tracing::warn!(chunk = index, error = %e, "Failed to embed chunk"),
                Err(_) => tracing::warn!(chunk = index, "Embedding chunk timed out"),
            }
        }
    }
}
