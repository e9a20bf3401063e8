//! Per-participant conversation memory
//!
//! The two providers remember conversations differently: Gemini is driven
//! like an evolving chat handle, `DeepSeek` needs the full role-tagged
//! history resent on every call. Both sit behind [`ConversationMemory`] and
//! are owned by a single [`SessionStore`].

mod memory;
mod store;

#[cfg(test)]
mod proptests;

#[allow(unused_imports)] // Public API re-exports
pub use memory::{enforce_cap, ConversationMemory, HandleMemory, TranscriptMemory};
#[allow(unused_imports)]
pub use store::{CallTicket, MemoryModel, SessionSnapshot, SessionStore};

/// Retention cap used when none is configured
pub const DEFAULT_HISTORY_CAP: usize = 50;
