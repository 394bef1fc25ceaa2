//! Deterministic scripted implementation of the shared `agent_provider` contract.
//!
//! This crate contains no model or transport logic and is intended for local
//! development and contract-level integration testing. Each call to
//! [`Agent::stream`] consumes the next queued [`ScriptedResponse`] and
//! persists the turns the scripted events would have produced.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use agent_provider::{
    Agent, AgentContext, AgentError, ContentBlock, ConversationId, EventStream, Role,
    StreamEvent, TokenChannel, Turn,
};

/// One queued agent response.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedResponse {
    events: Vec<StreamEvent>,
    failure: Option<(usize, AgentError)>,
    start_error: Option<AgentError>,
}

impl ScriptedResponse {
    /// Creates a response that emits `events` in order and then ends cleanly.
    #[must_use]
    pub fn new(events: Vec<StreamEvent>) -> Self {
        Self {
            events,
            failure: None,
            start_error: None,
        }
    }

    /// Creates a response whose answer text is streamed in word-sized tokens.
    #[must_use]
    pub fn streamed_answer(text: &str) -> Self {
        Self::new(
            split_into_tokens(text)
                .into_iter()
                .map(StreamEvent::answer)
                .collect(),
        )
    }

    /// Emits the first `emitted` events, then yields `error` and stops.
    #[must_use]
    pub fn fail_after(mut self, emitted: usize, error: AgentError) -> Self {
        self.failure = Some((emitted.min(self.events.len()), error));
        self
    }

    /// Rejects the stream request before any event is emitted.
    #[must_use]
    pub fn fail_to_start(mut self, error: AgentError) -> Self {
        self.start_error = Some(error);
        self
    }

    fn emitted_events(&self) -> &[StreamEvent] {
        match &self.failure {
            Some((emitted, _)) => &self.events[..*emitted],
            None => &self.events,
        }
    }
}

/// Recorded inputs of one `stream` call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub conversation: ConversationId,
    pub new_turns: Vec<Turn>,
    pub context: AgentContext,
}

#[derive(Debug, Default)]
struct AgentState {
    histories: HashMap<ConversationId, Vec<Turn>>,
    scripts: VecDeque<ScriptedResponse>,
    requests: Vec<RecordedRequest>,
}

/// Scripted agent used by `turn_stream` tests and local runs.
#[derive(Debug, Default)]
pub struct ScriptedAgent {
    state: Mutex<AgentState>,
}

impl ScriptedAgent {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response for the next `stream` call.
    pub fn push_response(&self, response: ScriptedResponse) {
        lock_unpoisoned(&self.state).scripts.push_back(response);
    }

    /// Replaces the persisted history of one conversation.
    pub fn seed_history(&self, conversation: &ConversationId, turns: Vec<Turn>) {
        lock_unpoisoned(&self.state)
            .histories
            .insert(conversation.clone(), turns);
    }

    /// Seeds history from provider-shaped messages, one content-block list per turn.
    pub fn seed_content_history(
        &self,
        conversation: &ConversationId,
        messages: Vec<(Role, Vec<ContentBlock>)>,
    ) {
        let turns = messages
            .iter()
            .map(|(role, blocks)| Turn::from_content(*role, blocks))
            .collect();
        self.seed_history(conversation, turns);
    }

    /// Returns every `stream` call seen so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock_unpoisoned(&self.state).requests.clone()
    }

    #[must_use]
    pub fn pending_responses(&self) -> usize {
        lock_unpoisoned(&self.state).scripts.len()
    }
}

impl Agent for ScriptedAgent {
    fn stream(
        &self,
        new_turns: &[Turn],
        conversation: &ConversationId,
        context: &AgentContext,
    ) -> Result<EventStream<'_>, AgentError> {
        let mut state = lock_unpoisoned(&self.state);
        state.requests.push(RecordedRequest {
            conversation: conversation.clone(),
            new_turns: new_turns.to_vec(),
            context: context.clone(),
        });

        let mut response = state
            .scripts
            .pop_front()
            .ok_or_else(|| AgentError::Rejected("no scripted response queued".to_string()))?;
        if let Some(error) = response.start_error.take() {
            return Err(error);
        }

        let produced = turns_from_events(response.emitted_events());
        let history = state.histories.entry(conversation.clone()).or_default();
        history.extend(new_turns.iter().cloned());
        history.extend(produced);

        let ScriptedResponse {
            mut events,
            failure,
            ..
        } = response;
        let tail_error = failure.map(|(emitted, error)| {
            events.truncate(emitted);
            error
        });

        Ok(Box::new(
            events
                .into_iter()
                .map(Ok)
                .chain(tail_error.into_iter().map(Err)),
        ))
    }

    fn get_state(&self, conversation: &ConversationId) -> Result<Vec<Turn>, AgentError> {
        Ok(lock_unpoisoned(&self.state)
            .histories
            .get(conversation)
            .cloned()
            .unwrap_or_default())
    }
}

/// Folds a stream into the turns a checkpointing agent would persist.
///
/// Text and reasoning accumulated before a tool-call batch belong to the
/// assistant turn that issued those calls.
#[must_use]
pub fn turns_from_events(events: &[StreamEvent]) -> Vec<Turn> {
    let mut turns = Vec::new();
    let mut text = String::new();
    let mut reasoning = String::new();

    for event in events {
        match event {
            StreamEvent::Token {
                channel: TokenChannel::Answer,
                text: token,
            } => text.push_str(token),
            StreamEvent::Token {
                channel: TokenChannel::Reasoning,
                text: token,
            } => reasoning.push_str(token),
            StreamEvent::ToolCalls { calls } => {
                let mut turn = Turn::tool_calls(calls.clone());
                turn.text = std::mem::take(&mut text);
                turn.reasoning = take_non_empty(&mut reasoning);
                turns.push(turn);
            }
            StreamEvent::ToolResults { results } => {
                flush_assistant(&mut turns, &mut text, &mut reasoning);
                turns.extend(results.iter().cloned().map(Turn::tool_result));
            }
        }
    }

    flush_assistant(&mut turns, &mut text, &mut reasoning);
    turns
}

fn flush_assistant(turns: &mut Vec<Turn>, text: &mut String, reasoning: &mut String) {
    if text.is_empty() && reasoning.is_empty() {
        return;
    }

    let mut turn = Turn::assistant(std::mem::take(text));
    turn.reasoning = take_non_empty(reasoning);
    turns.push(turn);
}

fn take_non_empty(buffer: &mut String) -> Option<String> {
    if buffer.is_empty() {
        None
    } else {
        Some(std::mem::take(buffer))
    }
}

/// Splits text into tokens that each end at a space or newline.
#[must_use]
pub fn split_into_tokens(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut pending_token = String::new();

    for ch in text.chars() {
        pending_token.push(ch);
        if matches!(ch, ' ' | '\n') {
            tokens.push(std::mem::take(&mut pending_token));
        }
    }

    if !pending_token.is_empty() {
        tokens.push(pending_token);
    }

    tokens
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use agent_provider::{Role, ToolCall, ToolResult};
    use serde_json::json;

    use super::*;

    fn collect(
        agent: &ScriptedAgent,
        conversation: &ConversationId,
    ) -> Vec<Result<StreamEvent, AgentError>> {
        agent
            .stream(&[Turn::user("hi")], conversation, &AgentContext::default())
            .expect("scripted stream should start")
            .collect()
    }

    #[test]
    fn split_into_tokens_keeps_trailing_separators() {
        assert_eq!(
            split_into_tokens("one two\nthree"),
            vec!["one ".to_string(), "two\n".to_string(), "three".to_string()]
        );
        assert!(split_into_tokens("").is_empty());
    }

    #[test]
    fn stream_emits_scripted_events_and_persists_turns() {
        let agent = ScriptedAgent::new();
        let conversation = ConversationId::new("c-1");
        agent.push_response(ScriptedResponse::new(vec![
            StreamEvent::reasoning("plan"),
            StreamEvent::ToolCalls {
                calls: vec![ToolCall::new("call-1", "read", json!({"path": "a"}))],
            },
            StreamEvent::ToolResults {
                results: vec![ToolResult::success("call-1", "read", "contents")],
            },
            StreamEvent::answer("done"),
        ]));

        let events = collect(&agent, &conversation);
        assert_eq!(events.len(), 4);
        assert!(events.iter().all(Result::is_ok));

        let history = agent.get_state(&conversation).expect("history should load");
        let roles: Vec<Role> = history.iter().map(|turn| turn.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]
        );
        assert_eq!(history[1].reasoning.as_deref(), Some("plan"));
        assert_eq!(history[1].tool_calls.len(), 1);
        assert_eq!(history[3].text, "done");
    }

    #[test]
    fn failure_truncates_events_and_history() {
        let agent = ScriptedAgent::new();
        let conversation = ConversationId::new("c-2");
        agent.push_response(
            ScriptedResponse::new(vec![
                StreamEvent::answer("partial "),
                StreamEvent::answer("never sent"),
            ])
            .fail_after(1, AgentError::transport("connection reset")),
        );

        let events = collect(&agent, &conversation);
        assert_eq!(
            events,
            vec![
                Ok(StreamEvent::answer("partial ")),
                Err(AgentError::transport("connection reset")),
            ]
        );

        let history = agent.get_state(&conversation).expect("history should load");
        assert_eq!(history.last().map(|turn| turn.text.as_str()), Some("partial "));
    }

    #[test]
    fn start_failure_and_missing_script_are_errors() {
        let agent = ScriptedAgent::new();
        let conversation = ConversationId::new("c-3");
        agent.push_response(
            ScriptedResponse::new(Vec::new()).fail_to_start(AgentError::transport("offline")),
        );

        let first = agent.stream(&[], &conversation, &AgentContext::default());
        assert!(matches!(first, Err(AgentError::Transport(message)) if message == "offline"));

        let second = agent.stream(&[], &conversation, &AgentContext::default());
        assert!(matches!(second, Err(AgentError::Rejected(_))));
        assert_eq!(agent.requests().len(), 2);
    }

    #[test]
    fn unknown_conversation_has_empty_history() {
        let agent = ScriptedAgent::new();
        assert!(agent
            .get_state(&ConversationId::new("missing"))
            .expect("empty history")
            .is_empty());
    }
}
