//! Pure section state machine for one streaming turn.
//!
//! Every transition returns the render effects it implies; nothing here
//! touches a surface, the agent, or the conversation store.

use agent_provider::{MediaRef, StreamEvent, TokenChannel, ToolCall, ToolResult};
use tracing::{debug, warn};

use crate::frame::StreamFrameParser;
use crate::interaction::{parse_response, NextInteraction};
use crate::section::{
    tools_label, RenderEffect, SectionId, SectionKind, SectionLine, SectionState,
    SUGGESTIONS_PENDING_LABEL, SUGGESTIONS_READY_LABEL, THINKING_COMPLETE_LABEL,
    THINKING_OPEN_LABEL, TOOLS_OPEN_LABEL,
};
use crate::tools::{RecordOutcome, ToolLedger};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Section {
    state: SectionState,
    round: u32,
}

impl Section {
    fn is_open(&self) -> bool {
        self.state == SectionState::Open
    }

    /// Starts a new round and returns its id.
    fn open(&mut self, kind: SectionKind) -> SectionId {
        self.round += 1;
        self.state = SectionState::Open;
        SectionId::new(kind, self.round)
    }

    fn id(&self, kind: SectionKind) -> Option<SectionId> {
        (self.round > 0).then(|| SectionId::new(kind, self.round))
    }
}

/// What a finalized turn left behind.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FinalizedTurn {
    /// Answer text with the control block removed; `None` when no answer was opened.
    pub clean_text: Option<String>,
    /// Directive parsed from the answer; `None` when no answer was opened.
    pub next_interaction: Option<NextInteraction>,
    pub reasoning: String,
    pub tool_count: usize,
    pub media: Vec<MediaRef>,
}

#[derive(Debug, Clone, Default)]
pub struct TurnState {
    thinking: Section,
    tools: Section,
    answer: Section,
    suggestions: Section,
    thinking_text: String,
    reasoning: String,
    answer_frame: StreamFrameParser,
    answer_opened: bool,
    ledger: ToolLedger,
    round_tool_ids: Vec<String>,
    pending_media: Vec<MediaRef>,
    finalized: Option<FinalizedTurn>,
}

impl TurnState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a turn whose answer continues from `prefill`.
    #[must_use]
    pub fn with_prefill(prefill: &str) -> (Self, Vec<RenderEffect>) {
        let mut state = Self::new();
        let mut effects = Vec::new();
        if prefill.is_empty() {
            return (state, effects);
        }

        state.answer_frame.push(prefill);
        let display = state.answer_frame.display().to_string();
        if !display.is_empty() {
            let id = state.open_answer(&mut effects);
            effects.push(RenderEffect::SetText { id, text: display });
        }
        (state, effects)
    }

    #[must_use]
    pub fn section_state(&self, kind: SectionKind) -> SectionState {
        match kind {
            SectionKind::Thinking => self.thinking.state,
            SectionKind::Tools => self.tools.state,
            SectionKind::Answer => self.answer.state,
            SectionKind::Suggestions => self.suggestions.state,
        }
    }

    /// Reasoning shown in the latest thinking round.
    #[must_use]
    pub fn thinking_text(&self) -> &str {
        &self.thinking_text
    }

    /// Reasoning accumulated over every round of the turn.
    #[must_use]
    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    #[must_use]
    pub fn answer_display(&self) -> &str {
        self.answer_frame.display()
    }

    #[must_use]
    pub fn answer_raw(&self) -> &str {
        self.answer_frame.raw()
    }

    #[must_use]
    pub fn ledger(&self) -> &ToolLedger {
        &self.ledger
    }

    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.finalized.is_some()
    }

    /// Advances the turn by one stream event. Events after finalize are ignored.
    pub fn apply(&mut self, event: &StreamEvent) -> Vec<RenderEffect> {
        let mut effects = Vec::new();
        if self.finalized.is_some() {
            warn!("stream event after finalize ignored");
            return effects;
        }

        match event {
            StreamEvent::Token {
                channel: TokenChannel::Reasoning,
                text,
            } => self.on_reasoning(text, &mut effects),
            StreamEvent::Token {
                channel: TokenChannel::Answer,
                text,
            } => self.on_answer(text, &mut effects),
            StreamEvent::ToolCalls { calls } => self.on_tool_calls(calls, &mut effects),
            StreamEvent::ToolResults { results } => self.on_tool_results(results, &mut effects),
        }
        effects
    }

    fn on_reasoning(&mut self, text: &str, effects: &mut Vec<RenderEffect>) {
        if text.is_empty() {
            return;
        }
        if self.tools.is_open() {
            self.complete_tools(effects);
        }
        self.reasoning.push_str(text);

        if self.answer.is_open() {
            // Late reasoning lands in the latest thinking round without reopening it.
            let id = match self.thinking.id(SectionKind::Thinking) {
                Some(id) => id,
                None => {
                    self.thinking_text.clear();
                    let id = self.open_thinking(effects);
                    self.thinking_text.push_str(text);
                    effects.push(RenderEffect::SetText {
                        id,
                        text: self.thinking_text.clone(),
                    });
                    self.complete_thinking(effects);
                    return;
                }
            };
            self.thinking_text.push_str(text);
            effects.push(RenderEffect::SetText {
                id,
                text: self.thinking_text.clone(),
            });
            return;
        }

        let id = if self.thinking.is_open() {
            SectionId::new(SectionKind::Thinking, self.thinking.round)
        } else {
            self.thinking_text.clear();
            self.open_thinking(effects)
        };

        self.thinking_text.push_str(text);
        effects.push(RenderEffect::SetText {
            id,
            text: self.thinking_text.clone(),
        });
    }

    fn open_thinking(&mut self, effects: &mut Vec<RenderEffect>) -> SectionId {
        let id = self.thinking.open(SectionKind::Thinking);
        debug!(round = id.round, "thinking section opened");
        effects.push(RenderEffect::Open {
            id,
            label: Some(THINKING_OPEN_LABEL.to_string()),
            expanded: true,
        });
        id
    }

    fn on_answer(&mut self, text: &str, effects: &mut Vec<RenderEffect>) {
        if text.is_empty() {
            return;
        }
        if self.thinking.is_open() {
            self.complete_thinking(effects);
        }
        if self.tools.is_open() {
            self.complete_tools(effects);
        }

        let id = if self.answer.is_open() {
            SectionId::new(SectionKind::Answer, self.answer.round)
        } else {
            self.open_answer(effects)
        };

        if let Some(display) = self.answer_frame.push(text) {
            effects.push(RenderEffect::SetText {
                id,
                text: display.to_string(),
            });
        }

        if self.answer_frame.has_hidden_tail() && self.suggestions.state == SectionState::Closed {
            let id = self.suggestions.open(SectionKind::Suggestions);
            debug!("control block streaming, suggestions status opened");
            effects.push(RenderEffect::Open {
                id,
                label: Some(SUGGESTIONS_PENDING_LABEL.to_string()),
                expanded: false,
            });
        }
    }

    fn on_tool_calls(&mut self, calls: &[ToolCall], effects: &mut Vec<RenderEffect>) {
        if calls.is_empty() {
            return;
        }
        let id = self.begin_tool_activity(effects);

        for call in calls {
            if self.ledger.record_call(call) == RecordOutcome::Duplicate {
                warn!(call_id = %call.call_id, "duplicate tool call ignored");
                continue;
            }
            self.note_round_tool(&call.call_id);
            let arguments_json = serde_json::to_string_pretty(&call.arguments)
                .unwrap_or_else(|_| call.arguments.to_string());
            effects.push(RenderEffect::AppendLine {
                id,
                line: SectionLine::Invocation {
                    call_id: call.call_id.clone(),
                    name: call.name.clone(),
                    arguments_json,
                },
            });
        }
    }

    fn on_tool_results(&mut self, results: &[ToolResult], effects: &mut Vec<RenderEffect>) {
        if results.is_empty() {
            return;
        }
        let id = self.begin_tool_activity(effects);

        for result in results {
            match self.ledger.record_result(result) {
                RecordOutcome::Duplicate => {
                    warn!(call_id = %result.call_id, "duplicate tool result ignored");
                    continue;
                }
                RecordOutcome::Orphan => {
                    warn!(call_id = %result.call_id, "tool result without a matching call");
                }
                RecordOutcome::Recorded => {}
            }
            self.note_round_tool(&result.call_id);

            let Some(exchange) = self.ledger.get(&result.call_id) else {
                continue;
            };
            if let Some(media) = &exchange.media {
                debug!(call_id = %result.call_id, kind = media.kind.as_str(), "tool media deferred");
                self.pending_media.push(media.clone());
                continue;
            }
            effects.push(RenderEffect::AppendLine {
                id,
                line: SectionLine::Result {
                    call_id: result.call_id.clone(),
                    name: exchange.name().to_string(),
                    content: result.content_text(),
                },
            });
        }
    }

    /// Leaves any interim answer, closes thinking, and returns the open tools round.
    fn begin_tool_activity(&mut self, effects: &mut Vec<RenderEffect>) -> SectionId {
        if self.answer.is_open() {
            self.discard_answer(effects);
        }
        if self.thinking.is_open() {
            self.complete_thinking(effects);
        }
        if self.tools.is_open() {
            return SectionId::new(SectionKind::Tools, self.tools.round);
        }

        self.round_tool_ids.clear();
        let id = self.tools.open(SectionKind::Tools);
        debug!(round = id.round, "tools section opened");
        effects.push(RenderEffect::Open {
            id,
            label: Some(TOOLS_OPEN_LABEL.to_string()),
            expanded: true,
        });
        id
    }

    fn note_round_tool(&mut self, call_id: &str) {
        if !self.round_tool_ids.iter().any(|id| id == call_id) {
            self.round_tool_ids.push(call_id.to_string());
        }
    }

    fn open_answer(&mut self, effects: &mut Vec<RenderEffect>) -> SectionId {
        let id = self.answer.open(SectionKind::Answer);
        self.answer_opened = true;
        debug!(round = id.round, "answer section opened");
        effects.push(RenderEffect::Open {
            id,
            label: None,
            expanded: true,
        });
        id
    }

    fn discard_answer(&mut self, effects: &mut Vec<RenderEffect>) {
        if self.suggestions.is_open() {
            if let Some(id) = self.suggestions.id(SectionKind::Suggestions) {
                effects.push(RenderEffect::Discard { id });
            }
        }
        self.suggestions.state = SectionState::Closed;

        if let Some(id) = self.answer.id(SectionKind::Answer) {
            debug!(round = id.round, "interim answer discarded for tool calls");
            effects.push(RenderEffect::Discard { id });
        }
        self.answer.state = SectionState::Closed;
        self.answer_frame.reset();
    }

    fn complete_thinking(&mut self, effects: &mut Vec<RenderEffect>) {
        self.thinking.state = SectionState::Complete;
        if let Some(id) = self.thinking.id(SectionKind::Thinking) {
            effects.push(RenderEffect::Update {
                id,
                label: Some(THINKING_COMPLETE_LABEL.to_string()),
                state: SectionState::Complete,
                expanded: false,
            });
        }
    }

    fn complete_tools(&mut self, effects: &mut Vec<RenderEffect>) {
        self.tools.state = SectionState::Complete;
        if let Some(id) = self.tools.id(SectionKind::Tools) {
            effects.push(RenderEffect::Update {
                id,
                label: Some(tools_label(self.round_tool_ids.len())),
                state: SectionState::Complete,
                expanded: false,
            });
        }
    }

    /// Ends the turn. Safe to call more than once; later calls emit nothing.
    pub fn finalize(&mut self) -> (FinalizedTurn, Vec<RenderEffect>) {
        if let Some(finalized) = &self.finalized {
            return (finalized.clone(), Vec::new());
        }

        let mut effects = Vec::new();
        if self.thinking.is_open() {
            self.complete_thinking(&mut effects);
        }
        if self.tools.is_open() {
            self.complete_tools(&mut effects);
        }

        let mut clean_text = None;
        let mut next_interaction = None;
        if self.answer_opened {
            let parsed = parse_response(self.answer_frame.raw());
            if let NextInteraction::Failed(error) = &parsed.next_interaction {
                warn!(code = error.code(), "next_interaction block rejected");
            }
            if self.answer.is_open() && parsed.clean_text != self.answer_frame.display() {
                effects.push(RenderEffect::SetText {
                    id: SectionId::new(SectionKind::Answer, self.answer.round),
                    text: parsed.clean_text.clone(),
                });
            }
            clean_text = Some(parsed.clean_text);
            next_interaction = Some(parsed.next_interaction);
        }

        if self.suggestions.is_open() {
            let id = SectionId::new(SectionKind::Suggestions, self.suggestions.round);
            if matches!(next_interaction, Some(NextInteraction::Absent) | None) {
                // The withheld tail was not a control block after all.
                self.suggestions.state = SectionState::Closed;
                effects.push(RenderEffect::Discard { id });
            } else {
                self.suggestions.state = SectionState::Complete;
                effects.push(RenderEffect::Update {
                    id,
                    label: Some(SUGGESTIONS_READY_LABEL.to_string()),
                    state: SectionState::Complete,
                    expanded: false,
                });
            }
        }

        let media = std::mem::take(&mut self.pending_media);
        if !media.is_empty() {
            let id = if self.answer.is_open() {
                SectionId::new(SectionKind::Answer, self.answer.round)
            } else {
                debug!(count = media.len(), "answer synthesized for tool media");
                let round = self.answer.round + 1;
                self.answer = Section {
                    state: SectionState::Open,
                    round,
                };
                let id = SectionId::new(SectionKind::Answer, round);
                effects.push(RenderEffect::Open {
                    id,
                    label: None,
                    expanded: true,
                });
                id
            };
            effects.extend(media.iter().cloned().map(|media| RenderEffect::ShowMedia { id, media }));
        }

        if self.answer.is_open() {
            self.answer.state = SectionState::Complete;
            effects.push(RenderEffect::Update {
                id: SectionId::new(SectionKind::Answer, self.answer.round),
                label: None,
                state: SectionState::Complete,
                expanded: true,
            });
        }

        let finalized = FinalizedTurn {
            clean_text,
            next_interaction,
            reasoning: self.reasoning.clone(),
            tool_count: self.ledger.len(),
            media,
        };
        self.finalized = Some(finalized.clone());
        (finalized, effects)
    }
}
