// =============================================================================
// RELEVANCE RETRIEVAL
// =============================================================================
//
// Picks the chunks handed to the generator. Strategies are tried in order:
// 1. Embedding: cosine similarity between the query and every embedded chunk
// 2. Keyword: case-insensitive substring match of any query token
//
// A strategy that cannot run, fails, or finds nothing hands over to the next
// one. Nothing is retried.

use super::models::KnowledgeChunk;
use super::providers::EmbeddingProvider;
use std::time::Duration;

/// Which strategy produced a retrieval result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalStrategy {
    Embedding,
    Keyword,
}

impl RetrievalStrategy {
    /// Priority order used by [`Retriever::retrieve`].
    pub const ORDER: [RetrievalStrategy; 2] =
        [RetrievalStrategy::Embedding, RetrievalStrategy::Keyword];
}

#[derive(Debug, Clone, PartialEq)]
pub struct Retrieval {
    pub chunks: Vec<String>,
    /// `None` when every strategy came back empty.
    pub strategy: Option<RetrievalStrategy>,
}

/// Cosine similarity of two vectors.
///
/// Returns `None` for empty vectors, mismatched lengths or a zero norm so the
/// chunk can be left out of the ranking.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.is_empty() || a.len() != b.len() {
        return None;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f64::EPSILON {
        return None;
    }
    let score = (dot / denom) as f32;
    score.is_finite().then_some(score)
}

/// Chunks whose lowercased text contains any whitespace-separated query token,
/// in corpus order, capped at `limit`.
pub fn keyword_search(chunks: &[KnowledgeChunk], query: &str, limit: usize) -> Vec<String> {
    let query = query.to_lowercase();
    let keywords: Vec<&str> = query.split_whitespace().collect();
    if keywords.is_empty() {
        return Vec::new();
    }

    chunks
        .iter()
        .filter(|chunk| {
            let content = chunk.content.to_lowercase();
            keywords.iter().any(|keyword| content.contains(keyword))
        })
        .take(limit)
        .map(|chunk| chunk.content.clone())
        .collect()
}

/// Ranks embedded chunks by similarity to `query_embedding`.
///
/// The sort is stable so equal scores keep corpus order.
pub fn rank_by_similarity(
    chunks: &[KnowledgeChunk],
    query_embedding: &[f32],
    limit: usize,
) -> Vec<String> {
    let mut scored: Vec<(f32, &KnowledgeChunk)> = chunks
        .iter()
        .filter_map(|chunk| {
            let embedding = chunk.usable_embedding()?;
            cosine_similarity(query_embedding, embedding).map(|score| (score, chunk))
        })
        .collect();

    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    scored
        .into_iter()
        .take(limit)
        .map(|(_, chunk)| chunk.content.clone())
        .collect()
}

pub struct Retriever<'a> {
    chunks: &'a [KnowledgeChunk],
    embedder: Option<&'a dyn EmbeddingProvider>,
    top_k: usize,
    timeout: Duration,
}

impl<'a> Retriever<'a> {
    pub fn new(
        chunks: &'a [KnowledgeChunk],
        embedder: Option<&'a dyn EmbeddingProvider>,
        top_k: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            chunks,
            embedder,
            top_k,
            timeout,
        }
    }

    fn can_attempt(&self, strategy: RetrievalStrategy) -> bool {
        match strategy {
            RetrievalStrategy::Embedding => {
                self.embedder.is_some()
                    && self.chunks.iter().any(|c| c.usable_embedding().is_some())
            }
            RetrievalStrategy::Keyword => true,
        }
    }

    async fn attempt(&self, strategy: RetrievalStrategy, query: &str) -> Vec<String> {
        match strategy {
            RetrievalStrategy::Embedding => {
                let Some(embedder) = self.embedder else {
                    return Vec::new();
                };
                match tokio::time::timeout(self.timeout, embedder.embed(query)).await {
                    Ok(Ok(query_embedding)) => {
                        rank_by_similarity(self.chunks, &query_embedding, self.top_k)
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(error = %e, "Query embedding failed, falling back to keywords");
                        Vec::new()
                    }
                    Err(_) => {
                        tracing::warn!("Query embedding timed out, falling back to keywords");
                        Vec::new()
                    }
                }
            }
            RetrievalStrategy::Keyword => keyword_search(self.chunks, query, self.top_k),
        }
    }

    /// Returns up to `top_k` chunk texts for `query` from the first strategy
    /// that can run and finds something.
    pub async fn retrieve(&self, query: &str) -> Retrieval {
        for strategy in RetrievalStrategy::ORDER {
            if !self.can_attempt(strategy) {
                continue;
            }

            let chunks = self.attempt(strategy, query).await;
            if !chunks.is_empty() {
                tracing::debug!(?strategy, chunks = chunks.len(), "Retrieved knowledge chunks");
                return Retrieval {
                    chunks,
                    strategy: Some(strategy),
                };
            }
        }

        Retrieval {
            chunks: Vec::new(),
            strategy: None,
        }
    }
}
