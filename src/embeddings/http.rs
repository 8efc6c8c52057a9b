//! REST-backed embedding provider.
//!
//! Speaks the widely adopted `/v1/embeddings` wire shape: the request posts
//! a model name and a list of input texts, the response carries one
//! `{index, embedding}` entry per input.

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::types::RagError;

use super::EmbeddingProvider;

/// Embedding service reached over HTTP.
#[derive(Clone, Debug)]
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    endpoint: Url,
    model: String,
    dimensions: usize,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingEntry>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingEntry {
    index: usize,
    embedding: Vec<f32>,
}

impl HttpEmbeddingProvider {
    pub fn new(endpoint: Url, model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            model: model.into(),
            dimensions,
            api_key: None,
        }
    }

    /// Sends `Authorization: Bearer <key>` with every call.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Reuses an existing client (connection pooling, TLS settings).
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let mut request = self.client.post(self.endpoint.clone()).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response: EmbeddingResponse = request
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut entries = response.data;
        entries.sort_by_key(|entry| entry.index);

        if entries.len() != texts.len() {
            return Err(RagError::EmbeddingService(format!(
                "embedding service returned {} vectors for {} inputs",
                entries.len(),
                texts.len()
            )));
        }
        for entry in &entries {
            if entry.embedding.len() != self.dimensions {
                return Err(RagError::EmbeddingService(format!(
                    "embedding service returned dimension {}, expected {}",
                    entry.embedding.len(),
                    self.dimensions
                )));
            }
        }

        Ok(entries.into_iter().map(|entry| entry.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
