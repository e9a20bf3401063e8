//! Mock completion service for orchestrator and API tests

use super::{DebateOrchestrator, DebateSettings, ProviderAdapter, Sampling};
use crate::debate::prompts::system_prompt;
use crate::llm::{CompletionRequest, CompletionResponse, CompletionService, ProviderError};
use crate::participant::Participant;
use crate::session::SessionStore;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Completion service that returns queued replies, or numbered automatic
/// replies once the queue is empty (if enabled)
pub struct MockCompletionService {
    model_id: String,
    responses: Mutex<VecDeque<Result<CompletionResponse, ProviderError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    auto_reply: bool,
    /// Notified when a request starts (for test synchronization)
    pub request_started: Arc<Notify>,
    /// When set, each request waits for a notification before replying
    hold: Option<Arc<Notify>>,
}

impl MockCompletionService {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            auto_reply: false,
            request_started: Arc::new(Notify::new()),
            hold: None,
        }
    }

    pub fn auto_reply(mut self) -> Self {
        self.auto_reply = true;
        self
    }

    pub fn with_hold(mut self, hold: Arc<Notify>) -> Self {
        self.hold = Some(hold);
        self
    }

    pub fn queue_text(&self, text: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(CompletionResponse::text(text)));
    }

    pub fn queue_error(&self, error: ProviderError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionService for MockCompletionService {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let n = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len()
        };
        self.request_started.notify_one();

        if let Some(hold) = &self.hold {
            hold.notified().await;
        }

        let queued = self.responses.lock().unwrap().pop_front();
        match queued {
            Some(result) => result,
            None if self.auto_reply => Ok(CompletionResponse::text(format!(
                " {} reply {n} ",
                self.model_id
            ))),
            None => Err(ProviderError::network("No mock response queued")),
        }
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Orchestrator wired to two mocks with a 50-entry cap
pub fn orchestrator(
    gemini: Arc<MockCompletionService>,
    deepseek: Arc<MockCompletionService>,
    settings: DebateSettings,
) -> DebateOrchestrator {
    orchestrator_with_cap(gemini, deepseek, settings, 50)
}

pub fn orchestrator_with_cap(
    gemini: Arc<MockCompletionService>,
    deepseek: Arc<MockCompletionService>,
    settings: DebateSettings,
    cap: usize,
) -> DebateOrchestrator {
    DebateOrchestrator::new(
        ProviderAdapter::new(Participant::Gemini, gemini, Sampling::default()),
        ProviderAdapter::new(Participant::DeepSeek, deepseek, Sampling::default()),
        SessionStore::new(cap, system_prompt),
        settings,
    )
}

/// Settings with no pacing delay and no turn limit
pub fn fast_settings() -> DebateSettings {
    DebateSettings {
        turn_delay: Duration::ZERO,
        max_turns: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;

    #[tokio::test]
    async fn test_mock_queue_then_error() {
        let mock = MockCompletionService::new("mock");
        mock.queue_text("Hello");
        let request = CompletionRequest {
            messages: vec![ChatMessage::user("hi")],
            ..Default::default()
        };

        assert_eq!(mock.complete(&request).await.unwrap().text, "Hello");
        assert!(mock.complete(&request).await.is_err());
        assert_eq!(mock.request_count(), 2);
    }

    #[tokio::test]
    async fn test_auto_reply_numbers_requests() {
        let mock = MockCompletionService::new("mock").auto_reply();
        let request = CompletionRequest::default();
        mock.complete(&request).await.unwrap();
        let second = mock.complete(&request).await.unwrap();
        assert_eq!(second.text.trim(), "mock reply 2");
    }
}
