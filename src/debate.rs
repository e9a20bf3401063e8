//! Debate relay: provider adapters, turn orchestration and server-driven runs

mod adapter;
mod orchestrator;
pub mod prompts;
mod run;

#[cfg(test)]
pub mod testing;

pub use adapter::{ProviderAdapter, Sampling};
pub use orchestrator::{DebateError, DebateOrchestrator, DebateSettings, TurnOutcome};
#[allow(unused_imports)] // Public API re-exports
pub use run::{run_debate, spawn_run, DialogueTurn, RunEnd, RunEvent, Speaker, TurnCursor};
