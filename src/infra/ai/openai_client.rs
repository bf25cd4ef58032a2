// =============================================================================
// OPENAI CLIENT - embeddings + legacy completions
// =============================================================================
//
// Implements both AI ports against an OpenAI-compatible API:
// - `POST {base}/embeddings`  -> `data[0].embedding`
// - `POST {base}/completions` -> `choices[0].text`
//
// Every request is bounded by the client-wide timeout. Non-2xx responses and
// bodies that don't match the expected shape are returned as errors; the core
// turns those into its fallback paths.
//
// **Environment Variables:**
// - `OPENAI_API_KEY` - bearer token (required to build the client)
// - `OPENAI_BASE_URL` - defaults to https://api.openai.com/v1

use crate::core::assistant::{CompletionProvider, EmbeddingProvider, GenerationConfig};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "no_stop_sequences")]
    stop: &'a [String],
}

fn no_stop_sequences(stop: &&[String]) -> bool {
    stop.is_empty()
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    text: String,
}

pub struct OpenAiClient {
    client: Client,
    base_url: String,
    embedding_model: String,
}

impl OpenAiClient {
    pub fn new(
        api_key: &str,
        base_url: &str,
        embedding_model: String,
        timeout: Duration,
    ) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err("missing OpenAI API key".into());
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            embedding_model,
        })
    }

    async fn post_json<Req, Resp>(
        &self,
        path: &str,
        body: &Req,
    ) -> Result<Resp, Box<dyn Error + Send + Sync>>
    where
        Req: Serialize + ?Sized,
        Resp: for<'de> Deserialize<'de>,
    {
        let url = format!("{}/{}", self.base_url, path);
        let response = self.client.post(&url).json(body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(format!("OpenAI API error: {} - {}", status, text).into());
        }

        Ok(response.json::<Resp>().await?)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, Box<dyn Error + Send + Sync>> {
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: text,
        };
        let response: EmbeddingResponse = self.post_json("embeddings", &request).await?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .ok_or("Embedding response contained no data")?
            .embedding;
        Ok(embedding)
    }
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    async fn complete(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, Box<dyn Error + Send + Sync>> {
        let request = CompletionRequest {
            model: &config.model,
            prompt,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            stop: &config.stop,
        };
        let response: CompletionResponse = self.post_json("completions", &request).await?;

        let text = response
            .choices
            .into_iter()
            .next()
            .ok_or("Completion response contained no choices")?
            .text;
        Ok(text)
    }
}
