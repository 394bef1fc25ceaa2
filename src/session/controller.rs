use std::time::{Duration, Instant};

use agent_provider::{
    Agent, AgentContext, AgentError, ConversationId, MediaRef, StreamEvent, Turn,
};
use tracing::{debug, info, warn};

use crate::config::EnvConfig;
use crate::error::SessionError;
use crate::prompt::{InputPrompt, PromptConfig};
use crate::replay::{replay_conversation, ReplayedConversation};
use crate::section::{RenderEffect, RenderSurface};
use crate::session::state::{FinalizedTurn, TurnState};
use crate::store::{ConversationStore, TurnTiming};

/// One user message, optionally followed by an assistant prefill the agent
/// should continue from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserSubmission {
    pub text: String,
    pub media: Vec<MediaRef>,
    pub prefill: Option<String>,
}

impl UserSubmission {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_media(mut self, media: MediaRef) -> Self {
        self.media.push(media);
        self
    }

    #[must_use]
    pub fn with_prefill(mut self, prefill: impl Into<String>) -> Self {
        self.prefill = Some(prefill.into());
        self
    }

    fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.media.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnSummary {
    pub turn: FinalizedTurn,
    pub timing: TurnTiming,
}

/// Drives streamed turns against an agent and keeps per-conversation state.
pub struct StreamingSessionController<A: Agent> {
    agent: A,
    store: ConversationStore,
    prompt_config: PromptConfig,
    context: AgentContext,
}

impl<A: Agent> StreamingSessionController<A> {
    pub fn new(agent: A, config: &EnvConfig) -> Self {
        Self {
            agent,
            store: ConversationStore::new(),
            prompt_config: config.prompt_config(),
            context: AgentContext::default(),
        }
    }

    /// Replaces the context sent with every stream request.
    #[must_use]
    pub fn with_context(mut self, context: AgentContext) -> Self {
        self.context = context;
        self
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ConversationStore {
        &mut self.store
    }

    pub fn prompt_config(&self) -> &PromptConfig {
        &self.prompt_config
    }

    #[must_use]
    pub fn new_conversation(&self) -> ConversationId {
        ConversationId::generate()
    }

    /// Streams one turn to `surface`.
    ///
    /// The turn is finalized on every path, so no section stays open after an
    /// agent failure. The failure is returned and also kept for
    /// [`Self::take_stream_error`].
    pub fn submit(
        &mut self,
        conversation: &ConversationId,
        submission: UserSubmission,
        surface: &mut dyn RenderSurface,
    ) -> Result<TurnSummary, SessionError> {
        if submission.is_empty() {
            return Err(SessionError::EmptySubmission);
        }
        if self.store.is_streaming(conversation) {
            return Err(SessionError::already_streaming(conversation));
        }

        let prefill = submission
            .prefill
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty());
        let mut user = Turn::user(submission.text.clone());
        user.media = submission.media.clone();
        let mut new_turns = vec![user];
        if let Some(prefill) = prefill {
            new_turns.push(Turn::assistant(prefill));
        }

        self.store.begin_turn(conversation, prefill);
        info!(conversation = %conversation, prefilled = prefill.is_some(), "turn started");

        let started = Instant::now();
        let (mut state, effects) = TurnState::with_prefill(prefill.unwrap_or_default());
        apply_effects(&effects, surface);

        let mut first_token = None;
        let outcome = stream_turn(
            &self.agent,
            &new_turns,
            conversation,
            &self.context,
            &mut state,
            surface,
            (started, &mut first_token),
        );

        let (turn, effects) = state.finalize();
        apply_effects(&effects, surface);
        let total = started.elapsed();
        let timing = self.store.record_timing(conversation, first_token, total);
        if let Some(next) = &turn.next_interaction {
            self.store.set_pending_interaction(conversation, next.clone());
        }
        self.store.end_turn(conversation);

        match outcome {
            Ok(()) => {
                info!(
                    conversation = %conversation,
                    invocation = timing.invocation,
                    total = ?total,
                    tools = turn.tool_count,
                    "turn finished"
                );
                Ok(TurnSummary { turn, timing })
            }
            Err(source) => {
                let error = SessionError::Streaming(source);
                warn!(conversation = %conversation, error = %error, "turn ended by stream error");
                self.store.set_stream_error(conversation, error.to_string());
                Err(error)
            }
        }
    }

    /// Replays persisted history for display.
    ///
    /// Outside an active stream the pending prefill is consumed here.
    pub fn display_history(
        &mut self,
        conversation: &ConversationId,
    ) -> Result<ReplayedConversation, SessionError> {
        let turns = self
            .agent
            .get_state(conversation)
            .map_err(|source| SessionError::history(conversation, source))?;

        let prefill = if self.store.is_streaming(conversation) {
            self.store.pending_prefill(conversation).map(str::to_string)
        } else {
            self.store.take_pending_prefill(conversation)
        };
        let replayed = replay_conversation(&turns, prefill.as_deref());
        debug!(
            conversation = %conversation,
            turns = replayed.turn_count,
            items = replayed.items.len(),
            "history replayed"
        );
        Ok(replayed)
    }

    /// Input area for the conversation, preferring the directive cached by the
    /// last live turn over the replayed one.
    #[must_use]
    pub fn input_prompt(
        &self,
        conversation: &ConversationId,
        replayed: &ReplayedConversation,
    ) -> InputPrompt {
        let interaction = self
            .store
            .pending_interaction(conversation)
            .unwrap_or(&replayed.next_interaction);
        let mut prompt = InputPrompt::for_interaction(interaction, &self.prompt_config);
        prompt.disabled = self.store.is_streaming(conversation);
        prompt
    }

    pub fn take_stream_error(&mut self, conversation: &ConversationId) -> Option<String> {
        self.store.take_stream_error(conversation)
    }

    #[must_use]
    pub fn timings(&self, conversation: &ConversationId) -> &[TurnTiming] {
        self.store.timings(conversation)
    }
}

fn stream_turn<A: Agent>(
    agent: &A,
    new_turns: &[Turn],
    conversation: &ConversationId,
    context: &AgentContext,
    state: &mut TurnState,
    surface: &mut dyn RenderSurface,
    (started, first_token): (Instant, &mut Option<Duration>),
) -> Result<(), AgentError> {
    let events = agent.stream(new_turns, conversation, context)?;
    for event in events {
        let event = event?;
        if first_token.is_none() && is_visible_token(&event) {
            *first_token = Some(started.elapsed());
        }
        apply_effects(&state.apply(&event), surface);
    }
    Ok(())
}

fn is_visible_token(event: &StreamEvent) -> bool {
    matches!(event, StreamEvent::Token { text, .. } if !text.is_empty())
}

fn apply_effects(effects: &[RenderEffect], surface: &mut dyn RenderSurface) {
    for effect in effects {
        effect.apply(surface);
    }
}
