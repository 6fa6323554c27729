//! Turns text into fixed-dimension vectors via a pluggable provider (C6).

mod ollama;
mod openai;

pub use ollama::OllamaEmbedder;
pub use openai::OpenAiEmbedder;

use async_trait::async_trait;
use common::error::AppError;

/// A provider adapter producing fixed-dimension vectors. All
/// implementations MUST return the same dimension for every input; a
/// response vector of unexpected length is an error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimension(&self) -> usize;

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, AppError>;

    /// Default implementation iterates `embed_text`; batch-capable
    /// providers override this with a single request.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed_text(text).await?);
        }
        Ok(out)
    }
}

pub(crate) fn check_dimension(vector: &[f32], expected: usize) -> Result<(), AppError> {
    if vector.len() == expected {
        Ok(())
    } else {
        Err(AppError::Invalid(format!(
            "embedding response had {} dimensions, expected {}",
            vector.len(),
            expected
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_embedder_reports_its_configured_dimension() {
        let mut mock = MockEmbedder::new();
        mock.expect_dimension().return_const(4_usize);
        mock.expect_embed_text()
            .times(1)
            .returning(|_| Ok(vec![0.0, 0.0, 0.0, 1.0]));

        assert_eq!(mock.dimension(), 4);
        let vector = mock.embed_text("hello").await.unwrap();
        assert_eq!(vector.len(), 4);
    }
}
