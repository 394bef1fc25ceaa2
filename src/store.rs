//! Per-conversation session bookkeeping, owned by the controller.

use std::collections::HashMap;
use std::time::Duration;

use agent_provider::ConversationId;

use crate::interaction::NextInteraction;

/// Latency record of one streamed turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnTiming {
    /// 1-based turn counter within the conversation.
    pub invocation: u32,
    /// Time from request start to the first non-empty token.
    pub ttft: Option<Duration>,
    pub total: Duration,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct ConversationState {
    pending_interaction: Option<NextInteraction>,
    pending_prefill: Option<String>,
    stream_error: Option<String>,
    timings: Vec<TurnTiming>,
    streaming: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    conversations: HashMap<ConversationId, ConversationState>,
}

impl ConversationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, conversation: &ConversationId) -> &mut ConversationState {
        self.conversations.entry(conversation.clone()).or_default()
    }

    /// Marks a stream as running and clears the directive it answers.
    ///
    /// A non-blank `prefill` becomes the pending prefill; otherwise any
    /// earlier one is dropped.
    pub fn begin_turn(&mut self, conversation: &ConversationId, prefill: Option<&str>) {
        let state = self.entry(conversation);
        state.streaming = true;
        state.pending_interaction = None;
        state.pending_prefill = prefill
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string);
    }

    pub fn end_turn(&mut self, conversation: &ConversationId) {
        self.entry(conversation).streaming = false;
    }

    #[must_use]
    pub fn is_streaming(&self, conversation: &ConversationId) -> bool {
        self.conversations
            .get(conversation)
            .is_some_and(|state| state.streaming)
    }

    pub fn set_pending_interaction(
        &mut self,
        conversation: &ConversationId,
        interaction: NextInteraction,
    ) {
        self.entry(conversation).pending_interaction = Some(interaction);
    }

    #[must_use]
    pub fn pending_interaction(&self, conversation: &ConversationId) -> Option<&NextInteraction> {
        self.conversations
            .get(conversation)
            .and_then(|state| state.pending_interaction.as_ref())
    }

    #[must_use]
    pub fn pending_prefill(&self, conversation: &ConversationId) -> Option<&str> {
        self.conversations
            .get(conversation)
            .and_then(|state| state.pending_prefill.as_deref())
    }

    /// Consumes the pending prefill; it is used by a single replay.
    pub fn take_pending_prefill(&mut self, conversation: &ConversationId) -> Option<String> {
        self.conversations
            .get_mut(conversation)
            .and_then(|state| state.pending_prefill.take())
    }

    pub fn set_stream_error(&mut self, conversation: &ConversationId, message: String) {
        self.entry(conversation).stream_error = Some(message);
    }

    pub fn take_stream_error(&mut self, conversation: &ConversationId) -> Option<String> {
        self.conversations
            .get_mut(conversation)
            .and_then(|state| state.stream_error.take())
    }

    /// Appends a timing record and returns it with its invocation number.
    pub fn record_timing(
        &mut self,
        conversation: &ConversationId,
        ttft: Option<Duration>,
        total: Duration,
    ) -> TurnTiming {
        let timings = &mut self.entry(conversation).timings;
        let timing = TurnTiming {
            invocation: u32::try_from(timings.len() + 1).unwrap_or(u32::MAX),
            ttft,
            total,
        };
        timings.push(timing);
        timing
    }

    #[must_use]
    pub fn timings(&self, conversation: &ConversationId) -> &[TurnTiming] {
        self.conversations
            .get(conversation)
            .map(|state| state.timings.as_slice())
            .unwrap_or_default()
    }

    /// Drops everything recorded for `conversation`.
    pub fn forget(&mut self, conversation: &ConversationId) {
        self.conversations.remove(conversation);
    }
}
