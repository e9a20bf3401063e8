//! API request and response types

use crate::debate::TurnOutcome;
use crate::participant::Participant;
use crate::session::SessionSnapshot;
use serde::{Deserialize, Serialize};

/// Request to open a debate
#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub topic: String,
}

/// Request for the next rebuttal
#[derive(Debug, Deserialize)]
pub struct ConversationRequest {
    /// Opponent's last reply, quoted verbatim in the prompt
    pub message: String,
    /// Participant expected to answer
    pub current: Participant,
}

/// One completed turn.
///
/// `speaker` is the display label, `next` the key the client sends back
/// as `current`.
#[derive(Debug, Serialize)]
pub struct TurnResponse {
    pub speaker: &'static str,
    pub response: String,
    pub next: Participant,
}

impl From<TurnOutcome> for TurnResponse {
    fn from(outcome: TurnOutcome) -> Self {
        Self {
            speaker: outcome.speaker.display_label(),
            response: outcome.response,
            next: outcome.next,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

/// Diagnostics for both sessions
#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub sessions: Vec<SessionSnapshot>,
    pub history_cap: usize,
    pub active_run: bool,
}

/// Query for a server-driven run
#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    pub topic: String,
    /// Opening speaker; chosen at random when absent
    pub starter: Option<Participant>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
