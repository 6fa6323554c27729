use async_trait::async_trait;
use common::error::AppError;
use serde::{Deserialize, Serialize};
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::Provider;

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
    #[serde(rename = "finishReason", default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

/// HTTP adapter for the Gemini `generateContent` endpoint. The only
/// concrete `Provider` shipped here; used to back the optional
/// summary-generation step.
pub struct GeminiProvider {
    name: String,
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiProvider {
    #[must_use]
    pub fn new(name: impl Into<String>, model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            client: reqwest::Client::new(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Returns the generated text alongside the candidate's `finishReason`,
    /// so callers can decide whether a non-`STOP` reason warrants a retry.
    async fn call_once(&self, prompt: &str) -> Result<(String, Option<String>), AppError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::TransientTransport(format!(
                "gemini request failed with status {status}: {body}"
            )));
        }

        let parsed: GenerateContentResponse = response.json().await?;
        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Internal("gemini response had no candidates".to_string()))?;

        let text = candidate
            .content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect::<String>())
            .unwrap_or_default();
        Ok((text, candidate.finish_reason))
    }
}

fn is_transient(err: &AppError) -> bool {
    matches!(err, AppError::TransientTransport(_))
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, cancel: &CancellationToken, prompt: &str) -> Result<String, AppError> {
        if cancel.is_cancelled() {
            return Err(AppError::Internal("request cancelled".to_string()));
        }

        // 500ms, 1s, 2s: base^n * factor with base=2, factor=250.
        let retry_strategy = ExponentialBackoff::from_millis(2).factor(250).map(jitter).take(3);
        let (mut text, finish_reason) =
            RetryIf::spawn(retry_strategy, || self.call_once(prompt), is_transient).await?;

        if finish_reason.as_deref() != Some("STOP") {
            warn!(finish_reason = ?finish_reason, "gemini candidate did not finish normally, retrying once");
            match self.call_once(prompt).await {
                Ok((retry_text, retry_reason)) => {
                    if !retry_text.is_empty() {
                        text = retry_text;
                    }
                    if retry_reason.as_deref() != Some("STOP") && !text.is_empty() {
                        warn!(finish_reason = ?retry_reason, "returning partial gemini text after a second non-STOP finish reason");
                    }
                }
                Err(err) => {
                    warn!(error = %err, "gemini retry after a bad finish reason failed, returning the first partial text");
                }
            }
        }

        Ok(text)
    }
}
