//! The two debate participants

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two AI participants. Doubles as speaker label and routing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Participant {
    Gemini,
    DeepSeek,
}

impl Participant {
    pub const ALL: [Participant; 2] = [Participant::Gemini, Participant::DeepSeek];

    /// Wire key used by the turn API (`"gemini"` / `"deepseek"`)
    pub fn key(self) -> &'static str {
        match self {
            Participant::Gemini => "gemini",
            Participant::DeepSeek => "deepseek",
        }
    }

    /// Name used inside prompts
    pub fn name(self) -> &'static str {
        match self {
            Participant::Gemini => "Gemini",
            Participant::DeepSeek => "DeepSeek",
        }
    }

    /// Label shown by the chat UI
    pub fn display_label(self) -> &'static str {
        match self {
            Participant::Gemini => "🔵 Gemini",
            Participant::DeepSeek => "🔴 DeepSeek",
        }
    }

    pub fn other(self) -> Participant {
        match self {
            Participant::Gemini => Participant::DeepSeek,
            Participant::DeepSeek => Participant::Gemini,
        }
    }

    /// Fair coin between the two participants
    pub fn pick_opening<R: Rng + ?Sized>(rng: &mut R) -> Participant {
        if rng.gen_bool(0.5) {
            Participant::Gemini
        } else {
            Participant::DeepSeek
        }
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
