use async_trait::async_trait;
use common::error::AppError;
use serde::{Deserialize, Serialize};

use crate::{check_dimension, Embedder};

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}

/// Ollama-compatible embedder. No batch endpoint: `embed_batch` iterates
/// and calls `embed_text` one request at a time, short-circuiting to an
/// empty result for an empty batch without issuing any HTTP call.
pub struct OllamaEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimension: usize,
}

impl OllamaEmbedder {
    #[must_use]
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, dimension: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            dimension,
        }
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, AppError> {
        let url = format!("{}/api/embeddings", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&EmbeddingsRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::TransientTransport(format!(
                "ollama embeddings request failed with status {}",
                response.status()
            )));
        }

        let parsed: EmbeddingsResponse = response.json().await?;
        check_dimension(&parsed.embedding, self.dimension)?;
        Ok(parsed.embedding)
    }

    // embed_batch intentionally left as the default sequential
    // implementation from `Embedder` -- there is no Ollama batch
    // endpoint to call instead.
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_batch_short_circuits_without_any_request() {
        let embedder = OllamaEmbedder::new("http://127.0.0.1:1", "nomic-embed-text", 768);
        let result = embedder.embed_batch(&[]).await.unwrap();
        assert!(result.is_empty());
    }
}
