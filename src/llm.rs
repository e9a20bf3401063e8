//! Completion provider abstraction
//!
//! Both debate participants sit behind the same "send a request, get one
//! reply" interface.

mod error;
mod gemini;
mod openai;
mod types;

pub use error::{ProviderError, ProviderErrorKind};
pub use gemini::{GeminiService, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};
pub use openai::{OpenAIService, DEFAULT_DEEPSEEK_MODEL, DEFAULT_OPENROUTER_BASE_URL};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// HTTP timeout for provider calls
pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(300);

/// Common interface for completion providers
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Make a completion request
    async fn complete(&self, request: &CompletionRequest)
        -> Result<CompletionResponse, ProviderError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

#[async_trait]
impl<T: CompletionService + ?Sized> CompletionService for Arc<T> {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        (**self).complete(request).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

/// Logging wrapper for completion services
pub struct LoggingService {
    inner: Arc<dyn CompletionService>,
    label: &'static str,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn CompletionService>, label: &'static str) -> Self {
        let model_id = inner.model_id().to_string();
        Self {
            inner,
            label,
            model_id,
        }
    }
}

#[async_trait]
impl CompletionService for LoggingService {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                tracing::info!(
                    participant = self.label,
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    messages = request.messages.len(),
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    "Completion request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    participant = self.label,
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = e.kind.as_str(),
                    "Completion request failed"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Build the shared reqwest client used by both providers
pub(crate) fn http_client() -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(PROVIDER_TIMEOUT)
        .build()
        .map_err(|e| ProviderError::unknown(format!("Failed to create HTTP client: {e}")))
}
