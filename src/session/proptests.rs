//! Property-based tests for the session store
//!
//! Arbitrary interleavings of calls, failures and resets must keep:
//! - every session within the retention cap after a successful turn
//! - the transcript's system message first and unchanged
//! - reset-interrupted calls from touching the fresh session
//! - the handle history opening with a user turn, whatever the cap

use super::*;
use crate::llm::{ChatMessage, MessageRole};
use crate::participant::Participant;
use proptest::prelude::*;

const SYSTEM: &str = "You are a debater.";

#[derive(Debug, Clone)]
enum Op {
    /// Call that completes with a reply
    Succeed(Participant, String),
    /// Call that fails after the ticket was issued
    Fail(Participant, String),
    /// Call interrupted by a reset before it completes
    ResetMidCall(Participant, String),
    Reset,
}

fn arb_participant() -> impl Strategy<Value = Participant> {
    prop_oneof![Just(Participant::Gemini), Just(Participant::DeepSeek)]
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (arb_participant(), "[a-z ]{1,20}").prop_map(|(p, t)| Op::Succeed(p, t)),
        1 => (arb_participant(), "[a-z ]{1,20}").prop_map(|(p, t)| Op::Fail(p, t)),
        1 => (arb_participant(), "[a-z ]{1,20}").prop_map(|(p, t)| Op::ResetMidCall(p, t)),
        1 => Just(Op::Reset),
    ]
}

fn assert_transcript_head(store: &SessionStore) {
    let messages = store.messages(Participant::DeepSeek);
    assert!(!messages.is_empty());
    assert_eq!(messages[0], ChatMessage::system(SYSTEM));
    assert!(messages[1..].iter().all(|m| m.role != MessageRole::System));
}

fn assert_handle_opens_with_user(store: &SessionStore) {
    let messages = store.messages(Participant::Gemini);
    assert!(messages.len() % 2 == 0);
    if let Some(first) = messages.first() {
        assert_eq!(first.role, MessageRole::User);
    }
}

proptest! {
    #[test]
    fn prop_cap_and_system_message_hold(
        cap in 2usize..12,
        ops in proptest::collection::vec(arb_op(), 0..80),
    ) {
        let store = SessionStore::new(cap, |_| SYSTEM.to_string());

        for op in ops {
            match op {
                Op::Succeed(p, text) => {
                    let ticket = store.begin_call(p, &text).unwrap();
                    prop_assert!(store.finish_call(&ticket, &text));
                    prop_assert!(store.snapshot(p).history_length <= cap);
                }
                Op::Fail(p, text) => {
                    let before = store.messages(p);
                    let _ticket = store.begin_call(p, &text).unwrap();
                    let after = store.messages(p);
                    // Only a transcript's user prompt may have been recorded
                    prop_assert!(after.last().map(|m| m.role) != Some(MessageRole::Assistant)
                        || after == before);
                }
                Op::ResetMidCall(p, text) => {
                    let ticket = store.begin_call(p, &text).unwrap();
                    store.invalidate_all();
                    prop_assert!(!store.finish_call(&ticket, "late"));
                    prop_assert!(store.messages(p).iter().all(|m| m.content != "late"));
                }
                Op::Reset => store.invalidate_all(),
            }
            assert_transcript_head(&store);
            assert_handle_opens_with_user(&store);
        }
    }

    #[test]
    fn prop_alternating_turns_stay_paired(
        cap in 2usize..10,
        turns in 1usize..40,
    ) {
        let store = SessionStore::new(cap, |_| SYSTEM.to_string());
        for i in 0..turns {
            let ticket = store.begin_call(Participant::Gemini, &format!("p{i}")).unwrap();
            store.finish_call(&ticket, &format!("r{i}"));
        }
        let messages = store.messages(Participant::Gemini);
        prop_assert!(messages.len() <= cap);
        // Newest entry is always the latest reply
        prop_assert_eq!(messages.last().map(|m| m.content.clone()), Some(format!("r{}", turns - 1)));
    }
}
