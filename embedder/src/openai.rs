use async_openai::config::OpenAIConfig;
use async_openai::types::CreateEmbeddingRequestArgs;
use async_openai::Client;
use async_trait::async_trait;
use common::error::AppError;

use crate::{check_dimension, Embedder};

/// OpenAI-compatible embedder: one HTTP request for the whole batch,
/// reading vectors from `data[]` in input order.
pub struct OpenAiEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
    dimension: usize,
}

impl OpenAiEmbedder {
    #[must_use]
    pub fn new(base_url: &str, api_key: Option<&str>, model: impl Into<String>, dimension: usize) -> Self {
        let mut config = OpenAIConfig::new().with_api_base(base_url);
        if let Some(api_key) = api_key {
            config = config.with_api_key(api_key);
        }
        Self {
            client: Client::with_config(config),
            model: model.into(),
            dimension,
        }
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(texts.to_vec())
            .build()
            .map_err(|e| AppError::Invalid(e.to_string()))?;

        let response = self.client.embeddings().create(request).await?;
        let mut vectors = vec![Vec::new(); texts.len()];
        for item in response.data {
            let index = item.index as usize;
            if let Some(slot) = vectors.get_mut(index) {
                *slot = item.embedding;
            }
        }

        for vector in &vectors {
            check_dimension(vector, self.dimension)?;
        }

        Ok(vectors)
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, AppError> {
        let mut vectors = self.embed_many(std::slice::from_ref(&text.to_string())).await?;
        vectors.pop().ok_or_else(|| AppError::Internal("no embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        self.embed_many(texts).await
    }
}
