// Knowledge documents served as static files over HTTP, e.g. the site's
// public directory: `GET {base_url}/{name}`.

use crate::core::assistant::knowledge::{KnowledgeError, KnowledgeSource};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub struct HttpKnowledgeSource {
    client: Client,
    base_url: String,
}

impl HttpKnowledgeSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn document_url(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name.trim_start_matches('/'))
    }
}

#[async_trait]
impl KnowledgeSource for HttpKnowledgeSource {
    async fn fetch_document(&self, name: &str) -> Result<String, KnowledgeError> {
        let url = self.document_url(name);
        tracing::debug!(url = %url, "Fetching knowledge document");

        let transport = |e: reqwest::Error| KnowledgeError::Transport {
            name: name.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(&url).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(KnowledgeError::Status {
                name: name.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(transport)
    }
}
