//! Collapsible sections of one rendered turn.

use agent_provider::MediaRef;

pub const THINKING_OPEN_LABEL: &str = "Thinking...";
pub const THINKING_COMPLETE_LABEL: &str = "Thinking complete";
pub const TOOLS_OPEN_LABEL: &str = "Using tools...";
pub const SUGGESTIONS_PENDING_LABEL: &str = "Generating suggestions...";
pub const SUGGESTIONS_READY_LABEL: &str = "Suggestions ready";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SectionKind {
    Thinking,
    Tools,
    Answer,
    /// Status line nested in the answer while the control block streams in.
    Suggestions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SectionState {
    #[default]
    Closed,
    Open,
    Complete,
}

/// One visual instance of a section kind. Rounds start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionId {
    pub kind: SectionKind,
    pub round: u32,
}

impl SectionId {
    #[must_use]
    pub fn new(kind: SectionKind, round: u32) -> Self {
        Self { kind, round }
    }
}

/// Label of a completed tools section, e.g. `Used 2 tools`.
#[must_use]
pub fn tools_label(count: usize) -> String {
    if count == 1 {
        "Used 1 tool".to_string()
    } else {
        format!("Used {count} tools")
    }
}

/// Entry rendered inside a tools section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionLine {
    Invocation {
        call_id: String,
        name: String,
        arguments_json: String,
    },
    Result {
        call_id: String,
        name: String,
        content: String,
    },
}

/// Instruction for a rendering surface, produced by the turn state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderEffect {
    Open {
        id: SectionId,
        label: Option<String>,
        expanded: bool,
    },
    Update {
        id: SectionId,
        label: Option<String>,
        state: SectionState,
        expanded: bool,
    },
    SetText {
        id: SectionId,
        text: String,
    },
    AppendLine {
        id: SectionId,
        line: SectionLine,
    },
    ShowMedia {
        id: SectionId,
        media: MediaRef,
    },
    Discard {
        id: SectionId,
    },
}

impl RenderEffect {
    #[must_use]
    pub fn id(&self) -> SectionId {
        match self {
            Self::Open { id, .. }
            | Self::Update { id, .. }
            | Self::SetText { id, .. }
            | Self::AppendLine { id, .. }
            | Self::ShowMedia { id, .. }
            | Self::Discard { id } => *id,
        }
    }

    pub fn apply(&self, surface: &mut dyn RenderSurface) {
        match self {
            Self::Open {
                id,
                label,
                expanded,
            } => surface.open_section(*id, label.as_deref(), *expanded),
            Self::Update {
                id,
                label,
                state,
                expanded,
            } => surface.update_section(*id, label.as_deref(), *state, *expanded),
            Self::SetText { id, text } => surface.set_text(*id, text),
            Self::AppendLine { id, line } => surface.append_line(*id, line),
            Self::ShowMedia { id, media } => surface.show_media(*id, media),
            Self::Discard { id } => surface.discard_section(*id),
        }
    }
}

/// Output side of a live session: whatever draws sections on screen.
pub trait RenderSurface {
    fn open_section(&mut self, id: SectionId, label: Option<&str>, expanded: bool);
    fn update_section(
        &mut self,
        id: SectionId,
        label: Option<&str>,
        state: SectionState,
        expanded: bool,
    );
    fn set_text(&mut self, id: SectionId, text: &str);
    fn append_line(&mut self, id: SectionId, line: &SectionLine);
    fn show_media(&mut self, id: SectionId, media: &MediaRef);
    fn discard_section(&mut self, id: SectionId);
}

/// Surface that only records what it was asked to draw.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordingSurface {
    effects: Vec<RenderEffect>,
}

impl RecordingSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn effects(&self) -> &[RenderEffect] {
        &self.effects
    }

    /// Last text set on `id`, ignoring later discards.
    #[must_use]
    pub fn text_of(&self, id: SectionId) -> Option<&str> {
        self.effects.iter().rev().find_map(|effect| match effect {
            RenderEffect::SetText { id: target, text } if *target == id => Some(text.as_str()),
            _ => None,
        })
    }

    /// State of `id` after replaying every recorded effect.
    #[must_use]
    pub fn state_of(&self, id: SectionId) -> SectionState {
        self.effects
            .iter()
            .fold(SectionState::Closed, |state, effect| match effect {
                RenderEffect::Open { id: target, .. } if *target == id => SectionState::Open,
                RenderEffect::Update {
                    id: target,
                    state: next,
                    ..
                } if *target == id => *next,
                RenderEffect::Discard { id: target } if *target == id => SectionState::Closed,
                _ => state,
            })
    }

    /// Every section that was opened, in opening order.
    #[must_use]
    pub fn opened(&self) -> Vec<SectionId> {
        self.effects
            .iter()
            .filter_map(|effect| match effect {
                RenderEffect::Open { id, .. } => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.effects.clear();
    }
}

impl RenderSurface for RecordingSurface {
    fn open_section(&mut self, id: SectionId, label: Option<&str>, expanded: bool) {
        self.effects.push(RenderEffect::Open {
            id,
            label: label.map(str::to_string),
            expanded,
        });
    }

    fn update_section(
        &mut self,
        id: SectionId,
        label: Option<&str>,
        state: SectionState,
        expanded: bool,
    ) {
        self.effects.push(RenderEffect::Update {
            id,
            label: label.map(str::to_string),
            state,
            expanded,
        });
    }

    fn set_text(&mut self, id: SectionId, text: &str) {
        self.effects.push(RenderEffect::SetText {
            id,
            text: text.to_string(),
        });
    }

    fn append_line(&mut self, id: SectionId, line: &SectionLine) {
        self.effects.push(RenderEffect::AppendLine {
            id,
            line: line.clone(),
        });
    }

    fn show_media(&mut self, id: SectionId, media: &MediaRef) {
        self.effects.push(RenderEffect::ShowMedia {
            id,
            media: media.clone(),
        });
    }

    fn discard_section(&mut self, id: SectionId) {
        self.effects.push(RenderEffect::Discard { id });
    }
}
