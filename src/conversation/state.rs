//! Per-session conversation log.

use std::collections::HashSet;

use thiserror::Error;

use super::message::{Message, Source};

/// Referential-integrity violations in a conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("tool message at index {index} has no preceding assistant message")]
    Orphaned { index: usize },

    #[error("tool message at index {index} has no tool_call_id")]
    MissingCallId { index: usize },

    #[error("tool message at index {index} answers unknown call '{call_id}' for tool '{tool_name}'")]
    UnmatchedCall {
        index: usize,
        call_id: String,
        tool_name: String,
    },

    #[error("tool message at index {index} answers call '{call_id}' a second time")]
    DuplicateResult { index: usize, call_id: String },
}

/// Ordered message log owned by one chat session.
///
/// Append-only while a turn runs. `rollback` exists only to discard a turn that
/// failed before finalizing.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    messages: Vec<Message>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub(crate) fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Position to hand back to `rollback` if the upcoming turn fails.
    pub(crate) fn mark(&self) -> usize {
        self.messages.len()
    }

    pub(crate) fn rollback(&mut self, mark: usize) {
        self.messages.truncate(mark);
    }

    /// Drop the whole history (explicit reset from the UI).
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Messages appended since `mark`.
    pub fn since(&self, mark: usize) -> &[Message] {
        &self.messages[mark.min(self.messages.len())..]
    }

    /// Check that every tool message answers exactly one call of the nearest
    /// preceding assistant message, with a matching tool name.
    pub fn check_integrity(&self) -> Result<(), IntegrityError> {
        let mut current: Option<&Message> = None;
        let mut answered: HashSet<&str> = HashSet::new();

        for (index, message) in self.messages.iter().enumerate() {
            match &message.source {
                Source::Assistant => {
                    current = Some(message);
                    answered.clear();
                }
                Source::User => {}
                Source::Tool(tool_name) => {
                    let assistant = current.ok_or(IntegrityError::Orphaned { index })?;
                    let call_id = message
                        .tool_call_id
                        .as_deref()
                        .ok_or(IntegrityError::MissingCallId { index })?;
                    let matched = assistant
                        .tool_calls
                        .iter()
                        .any(|c| c.call_id == call_id && &c.tool_name == tool_name);
                    if !matched {
                        return Err(IntegrityError::UnmatchedCall {
                            index,
                            call_id: call_id.to_string(),
                            tool_name: tool_name.clone(),
                        });
                    }
                    if !answered.insert(call_id) {
                        return Err(IntegrityError::DuplicateResult {
                            index,
                            call_id: call_id.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::message::ToolCall;
    use serde_json::Map;

    fn call(id: &str, name: &str) -> ToolCall {
        ToolCall::new(id, name, Map::new())
    }

    #[test]
    fn rollback_discards_a_failed_turn() {
        let mut state = ConversationState::new();
        state.push(Message::user("first"));
        state.push(Message::assistant("answer"));
        let mark = state.mark();
        state.push(Message::user("second"));
        assert_eq!(state.since(mark).len(), 1);

        state.rollback(mark);
        assert_eq!(state.len(), 2);
        assert_eq!(state.last().map(|m| m.content.as_str()), Some("answer"));
    }

    #[test]
    fn integrity_accepts_multiple_results_for_one_round() {
        let mut state = ConversationState::new();
        let calls = vec![call("a", "wikipedia"), call("b", "arxiv")];
        state.push(Message::user("q"));
        state.push(Message::assistant_with_calls("", calls.clone()));
        state.push(Message::tool_result(&calls[0], "wiki"));
        state.push(Message::tool_result(&calls[1], "paper"));
        state.push(Message::assistant("done"));
        assert_eq!(state.check_integrity(), Ok(()));
    }

    #[test]
    fn integrity_rejects_orphans_and_mismatches() {
        let mut state = ConversationState::new();
        state.push(Message::tool_result(&call("a", "wikipedia"), "x"));
        assert_eq!(
            state.check_integrity(),
            Err(IntegrityError::Orphaned { index: 0 })
        );

        let mut state = ConversationState::new();
        state.push(Message::assistant_with_calls("", vec![call("a", "wikipedia")]));
        state.push(Message::tool_result(&call("a", "arxiv"), "x"));
        assert!(matches!(
            state.check_integrity(),
            Err(IntegrityError::UnmatchedCall { index: 1, .. })
        ));
    }

    #[test]
    fn integrity_rejects_second_answer_to_same_call() {
        let mut state = ConversationState::new();
        let c = call("a", "arxiv");
        state.push(Message::assistant_with_calls("", vec![c.clone()]));
        state.push(Message::tool_result(&c, "one"));
        state.push(Message::tool_result(&c, "two"));
        assert_eq!(
            state.check_integrity(),
            Err(IntegrityError::DuplicateResult {
                index: 2,
                call_id: "a".to_string()
            })
        );
    }

    #[test]
    fn results_cannot_refer_to_an_older_round() {
        let mut state = ConversationState::new();
        let old = call("a", "arxiv");
        state.push(Message::assistant_with_calls("", vec![old.clone()]));
        state.push(Message::tool_result(&old, "one"));
        state.push(Message::assistant("final"));
        state.push(Message::tool_result(&old, "late"));
        assert!(matches!(
            state.check_integrity(),
            Err(IntegrityError::UnmatchedCall { index: 3, .. })
        ));
    }
}
