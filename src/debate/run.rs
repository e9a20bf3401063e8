//! Server-driven debate runs
//!
//! A run alternates the two participants until it is cancelled, a turn
//! fails, or the turn limit is reached. Cancellation is observed only at
//! turn boundaries: a call that is already in flight finishes, and its
//! reply is dropped if the run was cancelled in the meantime.
//!
//! A run that supersedes another queues behind the old run's in-flight call
//! for the same participant rather than failing.

use super::orchestrator::DebateOrchestrator;
use super::prompts::{opening_prompt, rebuttal_prompt};
use crate::participant::Participant;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

const EVENT_BUFFER: usize = 16;

/// Who produced a dialogue turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Participant(Participant),
}

impl Speaker {
    pub fn display_label(self) -> &'static str {
        match self {
            Speaker::User => "🟢 User",
            Speaker::Participant(p) => p.display_label(),
        }
    }
}

impl Serialize for Speaker {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.display_label())
    }
}

/// One line of the visible dialogue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DialogueTurn {
    pub speaker: Speaker,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl DialogueTurn {
    fn now(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
            at: Utc::now(),
        }
    }
}

/// Whose turn it is and what they will be asked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnCursor {
    pub current: Participant,
    pub next_prompt: String,
}

impl TurnCursor {
    fn opening(starter: Participant, topic: &str) -> Self {
        Self {
            current: starter,
            next_prompt: opening_prompt(topic),
        }
    }

    /// Hand the floor to the other participant, quoting `reply`
    fn advance(&mut self, reply: &str) {
        let next = self.current.other();
        self.next_prompt = rebuttal_prompt(next, reply);
        self.current = next;
    }
}

/// Why a run stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEnd {
    Cancelled,
    TurnLimit,
    Failed(String),
}

impl RunEnd {
    pub fn reason(&self) -> &'static str {
        match self {
            RunEnd::Cancelled => "cancelled",
            RunEnd::TurnLimit => "turn_limit",
            RunEnd::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    Turn(DialogueTurn),
    Finished(RunEnd),
}

/// Drive a debate until it ends, sending each turn to `events`.
///
/// The user's topic is emitted first, then the opening turn, then strictly
/// alternating rebuttals. A closed `events` channel counts as cancellation.
/// Sessions are left as they are when the run ends.
pub async fn run_debate(
    orchestrator: &DebateOrchestrator,
    topic: &str,
    starter: Participant,
    cancel: &CancellationToken,
    events: &mpsc::Sender<RunEvent>,
) -> RunEnd {
    let topic = topic.trim();
    if topic.is_empty() {
        return RunEnd::Failed("topic must not be empty".to_string());
    }

    let settings = orchestrator.settings();
    let stopped = || cancel.is_cancelled() || events.is_closed();

    if events
        .send(RunEvent::Turn(DialogueTurn::now(Speaker::User, topic)))
        .await
        .is_err()
    {
        return RunEnd::Cancelled;
    }

    let mut cursor = TurnCursor::opening(starter, topic);
    let mut turns = 0usize;

    loop {
        if stopped() {
            return RunEnd::Cancelled;
        }
        if settings.max_turns.is_some_and(|max| turns >= max) {
            return RunEnd::TurnLimit;
        }
        if turns > 0 && !settings.turn_delay.is_zero() {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return RunEnd::Cancelled,
                () = tokio::time::sleep(settings.turn_delay) => {}
            }
        }

        let reply = match orchestrator
            .take_turn_when_free(cursor.current, &cursor.next_prompt, cancel)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                if stopped() {
                    return RunEnd::Cancelled;
                }
                tracing::warn!(speaker = %cursor.current, error = %e, "Debate turn failed");
                return RunEnd::Failed(e.to_string());
            }
        };

        if stopped() {
            tracing::debug!(speaker = %cursor.current, "Discarding reply received after cancellation");
            return RunEnd::Cancelled;
        }

        let turn = DialogueTurn::now(Speaker::Participant(cursor.current), reply.as_str());
        if events.send(RunEvent::Turn(turn)).await.is_err() {
            return RunEnd::Cancelled;
        }
        turns += 1;
        cursor.advance(&reply);
    }
}

/// Start a run in the background, superseding any active run.
///
/// The returned receiver yields every turn and finally one
/// [`RunEvent::Finished`]. Dropping it cancels the run.
pub fn spawn_run(
    orchestrator: Arc<DebateOrchestrator>,
    topic: String,
    starter: Option<Participant>,
) -> mpsc::Receiver<RunEvent> {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let starter = starter.unwrap_or_else(|| Participant::pick_opening(&mut rand::thread_rng()));
    let (run_id, cancel) = orchestrator.begin_run();
    let span = tracing::info_span!("debate_run", %run_id, %starter);

    tokio::spawn(
        async move {
            tracing::info!("Debate run started");
            let end = run_debate(&orchestrator, &topic, starter, &cancel, &tx).await;
            orchestrator.end_run(run_id);
            tracing::info!(reason = end.reason(), "Debate run finished");
            let _ = tx.send(RunEvent::Finished(end)).await;
        }
        .instrument(span),
    );

    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debate::orchestrator::DebateSettings;
    use crate::debate::testing::{fast_settings, orchestrator, MockCompletionService};
    use std::time::Duration;
    use tokio::sync::Notify;

    fn limited(max_turns: usize) -> DebateSettings {
        DebateSettings {
            max_turns: Some(max_turns),
            ..fast_settings()
        }
    }

    async fn collect(mut rx: mpsc::Receiver<RunEvent>) -> (Vec<DialogueTurn>, RunEnd) {
        let mut turns = Vec::new();
        while let Some(event) = rx.recv().await {
            match event {
                RunEvent::Turn(turn) => turns.push(turn),
                RunEvent::Finished(end) => return (turns, end),
            }
        }
        panic!("run ended without a Finished event");
    }

    fn auto(model: &str) -> Arc<MockCompletionService> {
        Arc::new(MockCompletionService::new(model).auto_reply())
    }

    #[tokio::test]
    async fn test_run_alternates_until_turn_limit() {
        let gemini = auto("gemini-mock");
        let deepseek = auto("deepseek-mock");
        let orch = Arc::new(orchestrator(gemini.clone(), deepseek.clone(), limited(5)));

        let rx = spawn_run(orch.clone(), "Cats or dogs?".to_string(), Some(Participant::DeepSeek));
        let (turns, end) = collect(rx).await;

        assert_eq!(end, RunEnd::TurnLimit);
        assert_eq!(turns.len(), 6);
        assert_eq!(turns[0].speaker, Speaker::User);
        assert_eq!(turns[0].text, "Cats or dogs?");

        let speakers: Vec<_> = turns[1..].iter().map(|t| t.speaker).collect();
        let expected: Vec<_> = [
            Participant::DeepSeek,
            Participant::Gemini,
            Participant::DeepSeek,
            Participant::Gemini,
            Participant::DeepSeek,
        ]
        .into_iter()
        .map(Speaker::Participant)
        .collect();
        assert_eq!(speakers, expected);

        // Each rebuttal quotes the previous reply
        let gemini_first = &gemini.recorded_requests()[0];
        assert_eq!(
            gemini_first.last_user_text().unwrap(),
            rebuttal_prompt(Participant::Gemini, &turns[1].text)
        );
        assert_eq!(deepseek.request_count(), 3);
        assert!(!orch.has_active_run());
    }

    #[tokio::test]
    async fn test_run_failure_stops_run_and_keeps_sessions() {
        let gemini = auto("gemini-mock");
        let deepseek = Arc::new(MockCompletionService::new("deepseek-mock"));
        deepseek.queue_error(crate::llm::ProviderError::server_error("Server error: upstream"));
        let orch = Arc::new(orchestrator(gemini, deepseek, fast_settings()));

        let rx = spawn_run(orch.clone(), "topic".to_string(), Some(Participant::Gemini));
        let (turns, end) = collect(rx).await;

        assert_eq!(end, RunEnd::Failed("Server error: upstream".to_string()));
        assert_eq!(turns.len(), 2);
        // Ending a run is not a reset
        assert_eq!(orch.sessions().snapshot(Participant::Gemini).history_length, 2);
    }

    #[tokio::test]
    async fn test_cancel_at_turn_boundary() {
        let settings = DebateSettings {
            turn_delay: Duration::from_millis(500),
            max_turns: None,
        };
        let orch = Arc::new(orchestrator(auto("g"), auto("d"), settings));

        let mut rx = spawn_run(orch.clone(), "topic".to_string(), Some(Participant::Gemini));
        assert!(matches!(rx.recv().await, Some(RunEvent::Turn(t)) if t.speaker == Speaker::User));
        assert!(matches!(
            rx.recv().await,
            Some(RunEvent::Turn(t)) if t.speaker == Speaker::Participant(Participant::Gemini)
        ));

        assert!(orch.cancel_run());
        let (turns, end) = collect(rx).await;
        assert!(turns.is_empty());
        assert_eq!(end, RunEnd::Cancelled);
    }

    #[tokio::test]
    async fn test_reply_after_cancel_is_discarded() {
        let hold = Arc::new(Notify::new());
        let gemini = Arc::new(
            MockCompletionService::new("gemini-mock")
                .auto_reply()
                .with_hold(hold.clone()),
        );
        let orch = Arc::new(orchestrator(gemini.clone(), auto("d"), fast_settings()));

        let rx = spawn_run(orch.clone(), "topic".to_string(), Some(Participant::Gemini));
        gemini.request_started.notified().await;
        orch.cancel_run();
        hold.notify_one();

        let (turns, end) = collect(rx).await;
        assert_eq!(end, RunEnd::Cancelled);
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].speaker, Speaker::User);
    }

    #[tokio::test]
    async fn test_new_run_supersedes_active_run() {
        let hold = Arc::new(Notify::new());
        let gemini = Arc::new(
            MockCompletionService::new("gemini-mock")
                .auto_reply()
                .with_hold(hold.clone()),
        );
        let orch = Arc::new(orchestrator(gemini.clone(), auto("d"), limited(1)));

        let first = spawn_run(orch.clone(), "first".to_string(), Some(Participant::Gemini));
        gemini.request_started.notified().await;

        // Same starter as the call still in flight
        let second = spawn_run(orch.clone(), "second".to_string(), Some(Participant::Gemini));
        hold.notify_one();
        gemini.request_started.notified().await;
        hold.notify_one();

        let (turns, end) = collect(second).await;
        assert_eq!(end, RunEnd::TurnLimit);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].speaker, Speaker::Participant(Participant::Gemini));

        let (turns, end) = collect(first).await;
        assert_eq!(end, RunEnd::Cancelled);
        assert_eq!(turns.len(), 1);
        assert_eq!(gemini.request_count(), 2);
    }

    #[tokio::test]
    async fn test_run_after_reset_reuses_busy_participant() {
        let hold = Arc::new(Notify::new());
        let gemini = Arc::new(
            MockCompletionService::new("gemini-mock")
                .auto_reply()
                .with_hold(hold.clone()),
        );
        let orch = Arc::new(orchestrator(gemini.clone(), auto("d"), limited(1)));

        let first = spawn_run(orch.clone(), "first topic".to_string(), Some(Participant::Gemini));
        gemini.request_started.notified().await;
        orch.reset();

        // The stranded call is still held; the new run must not wait for it
        let second =
            spawn_run(orch.clone(), "second topic".to_string(), Some(Participant::Gemini));
        gemini.request_started.notified().await;
        hold.notify_waiters();

        let (turns, end) = collect(second).await;
        assert_eq!(end, RunEnd::TurnLimit);
        assert_eq!(turns[1].speaker, Speaker::Participant(Participant::Gemini));
        let (_, end) = collect(first).await;
        assert_eq!(end, RunEnd::Cancelled);

        let history = orch.sessions().messages(Participant::Gemini);
        assert_eq!(history.len(), 2);
        assert!(history[0].content.contains("second topic"));
        assert!(history.iter().all(|m| !m.content.contains("first topic")));
    }

    #[tokio::test]
    async fn test_reset_cancels_run_and_drops_late_reply() {
        let hold = Arc::new(Notify::new());
        let gemini = Arc::new(
            MockCompletionService::new("gemini-mock")
                .auto_reply()
                .with_hold(hold.clone()),
        );
        let orch = Arc::new(orchestrator(gemini.clone(), auto("d"), fast_settings()));

        let rx = spawn_run(orch.clone(), "topic".to_string(), Some(Participant::Gemini));
        gemini.request_started.notified().await;
        orch.reset();
        hold.notify_one();

        let (_, end) = collect(rx).await;
        assert_eq!(end, RunEnd::Cancelled);
        assert!(!orch.sessions().snapshot(Participant::Gemini).initialized);
    }

    #[tokio::test]
    async fn test_dropped_receiver_cancels_run() {
        let orch = Arc::new(orchestrator(auto("g"), auto("d"), fast_settings()));
        let rx = spawn_run(orch.clone(), "topic".to_string(), None);
        drop(rx);

        tokio::time::timeout(Duration::from_secs(5), async {
            while orch.has_active_run() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("run should stop once nobody listens");
    }

    #[tokio::test]
    async fn test_empty_topic_fails_run() {
        let orch = orchestrator(auto("g"), auto("d"), fast_settings());
        let (tx, _rx) = mpsc::channel(4);
        let end = run_debate(&orch, "  ", Participant::Gemini, &CancellationToken::new(), &tx).await;
        assert_eq!(end, RunEnd::Failed("topic must not be empty".to_string()));
    }

    #[test]
    fn test_cursor_advances_to_other_side() {
        let mut cursor = TurnCursor::opening(Participant::Gemini, "topic");
        cursor.advance("first point");
        assert_eq!(cursor.current, Participant::DeepSeek);
        assert!(cursor.next_prompt.starts_with("Gemini's argument is: \"first point\""));
    }

    #[test]
    fn test_speaker_serializes_as_label() {
        let json = serde_json::to_string(&Speaker::Participant(Participant::DeepSeek)).unwrap();
        assert_eq!(json, "\"🔴 DeepSeek\"");
        assert_eq!(Speaker::User.display_label(), "🟢 User");
    }
}
