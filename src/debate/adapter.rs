//! Provider adapter: one prompt in, one trimmed reply out

use crate::llm::{CompletionRequest, CompletionService, ProviderError};
use crate::participant::Participant;
use crate::session::{CallTicket, SessionStore};
use std::sync::Arc;

/// Sampling parameters sent with every request
#[derive(Debug, Clone, Copy, Default)]
pub struct Sampling {
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
}

/// Binds a participant to its completion service
pub struct ProviderAdapter {
    participant: Participant,
    service: Arc<dyn CompletionService>,
    sampling: Sampling,
}

impl ProviderAdapter {
    pub fn new(
        participant: Participant,
        service: Arc<dyn CompletionService>,
        sampling: Sampling,
    ) -> Self {
        Self {
            participant,
            service,
            sampling,
        }
    }

    pub fn participant(&self) -> Participant {
        self.participant
    }

    pub fn model_id(&self) -> &str {
        self.service.model_id()
    }

    /// Send the call described by `ticket` and record the exchange. The
    /// ticket's turn gate is released when this returns.
    pub async fn send_turn(
        &self,
        sessions: &SessionStore,
        mut ticket: CallTicket,
    ) -> Result<String, ProviderError> {
        debug_assert_eq!(ticket.participant, self.participant);
        let request = CompletionRequest {
            system: ticket.system.take(),
            messages: std::mem::take(&mut ticket.messages),
            temperature: self.sampling.temperature,
            top_p: self.sampling.top_p,
        };

        let response = self.service.complete(&request).await?;
        let reply = response.text.trim();
        if reply.is_empty() {
            return Err(ProviderError::unknown(format!(
                "{} returned an empty reply",
                self.participant
            )));
        }

        sessions.finish_call(&ticket, reply);
        Ok(reply.to_string())
    }
}
