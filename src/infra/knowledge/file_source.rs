// Knowledge documents served from a local directory.

use crate::core::assistant::knowledge::{KnowledgeError, KnowledgeSource};
use async_trait::async_trait;
use std::path::PathBuf;

pub struct FileKnowledgeSource {
    root: PathBuf,
}

impl FileKnowledgeSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl KnowledgeSource for FileKnowledgeSource {
    async fn fetch_document(&self, name: &str) -> Result<String, KnowledgeError> {
        let path = self.root.join(name);
        tracing::debug!(path = %path.display(), "Reading knowledge document");

        tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| KnowledgeError::Io {
                name: name.to_string(),
                source,
            })
    }
}
