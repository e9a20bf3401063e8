//! Memory variants

use crate::llm::ChatMessage;

/// Capability shared by both memory models
pub trait ConversationMemory: Send {
    /// Append one turn at the end of the history
    fn append(&mut self, turn: ChatMessage);

    /// Number of retained entries, pinned ones included
    fn history_length(&self) -> usize;

    /// Drop unpinned entries before `keep_from`. Indices below
    /// [`pinned_len`](Self::pinned_len) are never removed.
    fn truncate(&mut self, keep_from: usize);

    /// Leading entries that eviction must keep
    fn pinned_len(&self) -> usize {
        0
    }

    /// Entries in conversation order
    fn messages(&self) -> &[ChatMessage];

    /// System instruction carried outside the history, if this model uses one
    fn system_instruction(&self) -> Option<&str> {
        None
    }
}

/// Evict the oldest unpinned entries until `cap` holds. Returns how many
/// entries were dropped.
pub fn enforce_cap<M: ConversationMemory + ?Sized>(memory: &mut M, cap: usize) -> usize {
    let len = memory.history_length();
    if len <= cap {
        return 0;
    }
    let excess = len - cap;
    memory.truncate(memory.pinned_len() + excess);
    len - memory.history_length()
}

/// Chat-handle memory: turns only, the system instruction travels on the side.
///
/// Turns are recorded as user/model exchanges and evicted as whole
/// exchanges, so the history always opens with a user turn. With an odd cap
/// this keeps one entry fewer than the cap.
#[derive(Debug, Clone)]
pub struct HandleMemory {
    system_instruction: String,
    turns: Vec<ChatMessage>,
}

impl HandleMemory {
    pub fn new(system_instruction: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            turns: Vec::new(),
        }
    }
}

impl ConversationMemory for HandleMemory {
    fn append(&mut self, turn: ChatMessage) {
        self.turns.push(turn);
    }

    fn history_length(&self) -> usize {
        self.turns.len()
    }

    fn truncate(&mut self, keep_from: usize) {
        let end = keep_from.next_multiple_of(2).min(self.turns.len());
        self.turns.drain(..end);
    }

    fn messages(&self) -> &[ChatMessage] {
        &self.turns
    }

    fn system_instruction(&self) -> Option<&str> {
        Some(&self.system_instruction)
    }
}

/// Explicit history whose first entry is the pinned system message
#[derive(Debug, Clone)]
pub struct TranscriptMemory {
    messages: Vec<ChatMessage>,
}

impl TranscriptMemory {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt)],
        }
    }
}

impl ConversationMemory for TranscriptMemory {
    fn append(&mut self, turn: ChatMessage) {
        self.messages.push(turn);
    }

    fn history_length(&self) -> usize {
        self.messages.len()
    }

    fn truncate(&mut self, keep_from: usize) {
        let pinned = self.pinned_len();
        let end = keep_from.min(self.messages.len());
        if end > pinned {
            self.messages.drain(pinned..end);
        }
    }

    fn pinned_len(&self) -> usize {
        1
    }

    fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }
}
