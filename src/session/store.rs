//! Session store with generation tokens
//!
//! Each participant has one slot. A provider call takes a [`CallTicket`]
//! that records the slot generation at call start; [`SessionStore::finish_call`]
//! only applies the post-call bookkeeping while that generation is current.
//! A reset bumps the generation, so a call that was in flight during the
//! reset leaves the fresh session untouched.
//!
//! The slot also owns the turn gate that keeps one call per participant in
//! flight. The gate belongs to a generation: invalidation swaps in a fresh
//! one, so a call stranded by a reset never blocks the next conversation.

use super::memory::{enforce_cap, ConversationMemory, HandleMemory, TranscriptMemory};
use crate::llm::ChatMessage;
use crate::participant::Participant;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OwnedMutexGuard;

type TurnGate = Arc<tokio::sync::Mutex<()>>;

/// How a participant's provider remembers the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryModel {
    /// Provider-owned handle: created lazily, discarded on reset, prompt and
    /// reply recorded together once the call succeeds
    Handle,
    /// Caller-owned history: created at startup, truncated to its system
    /// message on reset, prompt recorded before the call
    Transcript,
}

impl MemoryModel {
    pub fn for_participant(participant: Participant) -> Self {
        match participant {
            Participant::Gemini => MemoryModel::Handle,
            Participant::DeepSeek => MemoryModel::Transcript,
        }
    }
}

struct SessionSlot {
    model: MemoryModel,
    system_prompt: String,
    memory: Option<Box<dyn ConversationMemory>>,
    generation: u64,
    gate: TurnGate,
}

impl SessionSlot {
    fn new(model: MemoryModel, system_prompt: String) -> Self {
        let memory = match model {
            MemoryModel::Handle => None,
            MemoryModel::Transcript => Some(build_memory(model, &system_prompt)),
        };
        Self {
            model,
            system_prompt,
            memory,
            generation: 0,
            gate: TurnGate::default(),
        }
    }

    fn memory_mut(&mut self) -> &mut Box<dyn ConversationMemory> {
        let model = self.model;
        let system_prompt = &self.system_prompt;
        self.memory
            .get_or_insert_with(|| build_memory(model, system_prompt))
    }
}

fn build_memory(model: MemoryModel, system_prompt: &str) -> Box<dyn ConversationMemory> {
    match model {
        MemoryModel::Handle => Box::new(HandleMemory::new(system_prompt)),
        MemoryModel::Transcript => Box::new(TranscriptMemory::new(system_prompt)),
    }
}

/// Everything an in-flight call needs, captured at call start. Holds the
/// participant's turn gate until dropped.
#[derive(Debug)]
pub struct CallTicket {
    pub participant: Participant,
    pub generation: u64,
    pub prompt: String,
    /// System instruction to send beside the messages (handle model only)
    pub system: Option<String>,
    /// Full context to send, ending with the prompt
    pub messages: Vec<ChatMessage>,
    _turn: OwnedMutexGuard<()>,
}

/// Observable state of one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub participant: Participant,
    pub initialized: bool,
    pub history_length: usize,
}

/// Owns both participants' sessions
pub struct SessionStore {
    gemini: Mutex<SessionSlot>,
    deepseek: Mutex<SessionSlot>,
    cap: usize,
}

impl SessionStore {
    /// `cap` must be at least 2 so a transcript can hold its system message
    /// and one turn.
    pub fn new(cap: usize, system_prompt: impl Fn(Participant) -> String) -> Self {
        let slot = |p: Participant| {
            Mutex::new(SessionSlot::new(
                MemoryModel::for_participant(p),
                system_prompt(p),
            ))
        };
        Self {
            gemini: slot(Participant::Gemini),
            deepseek: slot(Participant::DeepSeek),
            cap: cap.max(2),
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    fn lock(&self, participant: Participant) -> MutexGuard<'_, SessionSlot> {
        let slot = match participant {
            Participant::Gemini => &self.gemini,
            Participant::DeepSeek => &self.deepseek,
        };
        slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Prepare a call: claim the turn gate, build the context to send and
    /// capture the generation. Transcript sessions record the prompt here.
    ///
    /// Returns `None` without touching the session while another call of
    /// the current generation holds the gate.
    pub fn begin_call(&self, participant: Participant, prompt: &str) -> Option<CallTicket> {
        let mut guard = self.lock(participant);
        let slot = &mut *guard;
        let turn = slot.gate.clone().try_lock_owned().ok()?;
        let generation = slot.generation;
        let model = slot.model;

        if slot.memory.is_none() {
            tracing::info!(%participant, "Initializing chat session");
        }
        let memory = slot.memory_mut();

        let messages = match model {
            MemoryModel::Handle => {
                let mut messages = memory.messages().to_vec();
                messages.push(ChatMessage::user(prompt));
                messages
            }
            MemoryModel::Transcript => {
                memory.append(ChatMessage::user(prompt));
                enforce_cap(&mut **memory, self.cap);
                memory.messages().to_vec()
            }
        };

        Some(CallTicket {
            participant,
            generation,
            prompt: prompt.to_string(),
            system: memory.system_instruction().map(str::to_string),
            messages,
            _turn: turn,
        })
    }

    /// Current turn gate, for callers that would rather wait than fail
    pub fn gate(&self, participant: Participant) -> TurnGate {
        self.lock(participant).gate.clone()
    }

    /// Record a successful reply. Returns false when the session was reset
    /// while the call was in flight; nothing is recorded in that case.
    pub fn finish_call(&self, ticket: &CallTicket, reply: &str) -> bool {
        let mut guard = self.lock(ticket.participant);
        let slot = &mut *guard;

        if slot.generation != ticket.generation {
            tracing::debug!(
                participant = %ticket.participant,
                started = ticket.generation,
                current = slot.generation,
                "Session reset during call, skipping history update"
            );
            return false;
        }
        let model = slot.model;
        let Some(memory) = slot.memory.as_mut() else {
            return false;
        };

        if model == MemoryModel::Handle {
            memory.append(ChatMessage::user(ticket.prompt.as_str()));
        }
        memory.append(ChatMessage::assistant(reply));

        let evicted = enforce_cap(&mut **memory, self.cap);
        if evicted > 0 {
            tracing::debug!(participant = %ticket.participant, evicted, "Trimmed session history");
        }
        true
    }

    /// Invalidate one session: the handle is discarded, the transcript is
    /// cut back to its system message.
    pub fn invalidate(&self, participant: Participant) {
        let mut guard = self.lock(participant);
        let slot = &mut *guard;
        slot.generation = slot.generation.wrapping_add(1);
        slot.gate = TurnGate::default();
        match slot.model {
            MemoryModel::Handle => slot.memory = None,
            MemoryModel::Transcript => {
                if let Some(memory) = slot.memory.as_mut() {
                    let len = memory.history_length();
                    memory.truncate(len);
                }
            }
        }
    }

    pub fn invalidate_all(&self) {
        for participant in Participant::ALL {
            self.invalidate(participant);
        }
    }

    pub fn snapshot(&self, participant: Participant) -> SessionSnapshot {
        let slot = self.lock(participant);
        SessionSnapshot {
            participant,
            initialized: slot.memory.is_some(),
            history_length: slot.memory.as_ref().map_or(0, |m| m.history_length()),
        }
    }

    /// Copy of the retained history, empty when the session is absent
    pub fn messages(&self, participant: Participant) -> Vec<ChatMessage> {
        self.lock(participant)
            .memory
            .as_ref()
            .map(|m| m.messages().to_vec())
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn generation(&self, participant: Participant) -> u64 {
        self.lock(participant).generation
    }
}
