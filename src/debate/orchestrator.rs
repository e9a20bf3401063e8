//! Turn orchestrator and reset controller

use super::adapter::ProviderAdapter;
use super::prompts::{opening_prompt, rebuttal_prompt};
use crate::llm::ProviderError;
use crate::participant::Participant;
use crate::session::{SessionSnapshot, SessionStore};
use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Run-level settings
#[derive(Debug, Clone, Copy)]
pub struct DebateSettings {
    /// Wait between one reply and the next request
    pub turn_delay: Duration,
    /// Participant turns after which a server-driven run stops
    pub max_turns: Option<usize>,
}

/// Result of one participant turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnOutcome {
    pub speaker: Participant,
    pub response: String,
    pub next: Participant,
}

/// Errors from a debate turn
#[derive(Debug, Error)]
pub enum DebateError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("{0} must not be empty")]
    EmptyPrompt(&'static str),
    #[error("{0} is still answering the previous turn")]
    ParticipantBusy(Participant),
}

struct ActiveRun {
    id: Uuid,
    cancel: CancellationToken,
}

/// Owns both sessions and adapters for the lifetime of the process.
///
/// One pair of sessions is shared by every caller: two humans debating at
/// once would see each other's context. Turns for the same participant are
/// serialized by the session's turn gate, not isolated.
pub struct DebateOrchestrator {
    sessions: SessionStore,
    gemini: ProviderAdapter,
    deepseek: ProviderAdapter,
    settings: DebateSettings,
    active_run: Mutex<Option<ActiveRun>>,
}

impl DebateOrchestrator {
    pub fn new(
        gemini: ProviderAdapter,
        deepseek: ProviderAdapter,
        sessions: SessionStore,
        settings: DebateSettings,
    ) -> Self {
        debug_assert_eq!(gemini.participant(), Participant::Gemini);
        debug_assert_eq!(deepseek.participant(), Participant::DeepSeek);
        Self {
            sessions,
            gemini,
            deepseek,
            settings,
            active_run: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> DebateSettings {
        self.settings
    }

    pub fn history_cap(&self) -> usize {
        self.sessions.cap()
    }

    pub fn model_id(&self, participant: Participant) -> &str {
        self.adapter(participant).model_id()
    }

    fn adapter(&self, participant: Participant) -> &ProviderAdapter {
        match participant {
            Participant::Gemini => &self.gemini,
            Participant::DeepSeek => &self.deepseek,
        }
    }

    /// Run one turn for `speaker`, failing fast if a call of the current
    /// generation is still in flight for it
    pub(crate) async fn take_turn(
        &self,
        speaker: Participant,
        prompt: &str,
    ) -> Result<String, DebateError> {
        let ticket = self
            .sessions
            .begin_call(speaker, prompt)
            .ok_or(DebateError::ParticipantBusy(speaker))?;

        let reply = self
            .adapter(speaker)
            .send_turn(&self.sessions, ticket)
            .await?;
        Ok(reply)
    }

    /// Like [`take_turn`](Self::take_turn), but queues behind an earlier
    /// call for `speaker` instead of failing. Gives up with
    /// `ParticipantBusy` once `cancel` fires.
    pub(crate) async fn take_turn_when_free(
        &self,
        speaker: Participant,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, DebateError> {
        let ticket = loop {
            if let Some(ticket) = self.sessions.begin_call(speaker, prompt) {
                break ticket;
            }
            tracing::debug!(%speaker, "Waiting for the previous call to finish");
            let gate = self.sessions.gate(speaker);
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(DebateError::ParticipantBusy(speaker)),
                _free = gate.lock_owned() => {}
            }
        };

        let reply = self
            .adapter(speaker)
            .send_turn(&self.sessions, ticket)
            .await?;
        Ok(reply)
    }

    /// Open a debate on `topic` with a randomly chosen first speaker
    pub async fn start(&self, topic: &str) -> Result<TurnOutcome, DebateError> {
        let starter = Participant::pick_opening(&mut rand::thread_rng());
        self.open_with(topic, starter).await
    }

    /// Open a debate on `topic` with `starter` speaking first
    pub async fn open_with(
        &self,
        topic: &str,
        starter: Participant,
    ) -> Result<TurnOutcome, DebateError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(DebateError::EmptyPrompt("topic"));
        }

        tracing::info!(%starter, "Opening debate");
        let response = self.take_turn(starter, &opening_prompt(topic)).await?;
        Ok(TurnOutcome {
            speaker: starter,
            response,
            next: starter.other(),
        })
    }

    /// Have `current` answer the opponent's `message`
    pub async fn respond(
        &self,
        current: Participant,
        message: &str,
    ) -> Result<TurnOutcome, DebateError> {
        if message.trim().is_empty() {
            return Err(DebateError::EmptyPrompt("message"));
        }

        let response = self
            .take_turn(current, &rebuttal_prompt(current, message))
            .await?;
        Ok(TurnOutcome {
            speaker: current,
            response,
            next: current.other(),
        })
    }

    /// Cancel the active run and invalidate both sessions. Calls in flight
    /// still complete but leave no trace in the fresh sessions.
    pub fn reset(&self) {
        self.cancel_run();
        self.sessions.invalidate_all();
        tracing::info!("Conversation history reset");
    }

    /// Signal the active server-driven run to stop at its next turn
    /// boundary. Sessions are left as they are.
    pub fn cancel_run(&self) -> bool {
        let active = self
            .active_run
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match active {
            Some(run) => {
                tracing::info!(run_id = %run.id, "Cancelling debate run");
                run.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Register a new server-driven run, cancelling any previous one
    pub fn begin_run(&self) -> (Uuid, CancellationToken) {
        let id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        let previous = self
            .active_run
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(ActiveRun {
                id,
                cancel: cancel.clone(),
            });
        if let Some(previous) = previous {
            tracing::info!(run_id = %previous.id, "Superseding active debate run");
            previous.cancel.cancel();
        }
        (id, cancel)
    }

    /// Forget `id` if it is still the active run
    pub fn end_run(&self, id: Uuid) {
        let mut active = self
            .active_run
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if active.as_ref().is_some_and(|run| run.id == id) {
            *active = None;
        }
    }

    pub fn has_active_run(&self) -> bool {
        self.active_run
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn snapshot(&self) -> Vec<SessionSnapshot> {
        Participant::ALL
            .iter()
            .map(|p| self.sessions.snapshot(*p))
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}
