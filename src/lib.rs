//! Streaming turn core for agent chats.
//!
//! Invariant: control-block text is never rendered. Only the display part of
//! an assistant message reaches a [`RenderSurface`], both while streaming and
//! after a reload.
//!
//! # Public API Overview
//! - Split display text from a trailing `<next_interaction>` block with
//!   [`StreamFrameParser`] and [`split_frame`].
//! - Validate the block into a typed [`Directive`] with [`parse_response`].
//! - Stream a turn through [`StreamingSessionController::submit`], which
//!   drives the pure [`TurnState`] machine and applies its [`RenderEffect`]s.
//! - Rebuild the visible history with [`replay_conversation`].
//! - Derive the input area from [`InputPrompt`] and turn widget answers into
//!   messages with [`Directive::submit`].

pub mod config;
pub mod error;
pub mod frame;
pub mod interaction;
pub mod logging;
pub mod media;
pub mod prompt;
pub mod replay;
pub mod section;
pub mod session;
pub mod store;
pub mod submission;
pub mod tools;

/// Environment configuration and tracing bootstrap.
pub use crate::config::EnvConfig;
pub use crate::logging::init_tracing;

/// Crate errors.
pub use crate::error::SessionError;
pub use crate::interaction::InteractionError;
pub use crate::submission::SubmissionError;

/// Control-block framing over streaming and complete text.
pub use crate::frame::{split_frame, streaming_display, Frame, StreamFrameParser};

/// Directive parsing and widget specs.
pub use crate::interaction::{
    parse_block, parse_response, DataEditorSpec, DateBounds, DateTimeBounds, Directive,
    InputSpec, NextInteraction, ParsedResponse, PresentationMode,
};

/// Section model and the rendering seam.
pub use crate::section::{
    RecordingSurface, RenderEffect, RenderSurface, SectionId, SectionKind, SectionLine,
    SectionState,
};

/// Live streaming and per-conversation bookkeeping.
pub use crate::session::{
    FinalizedTurn, StreamingSessionController, TurnState, TurnSummary, UserSubmission,
};
pub use crate::store::{ConversationStore, TurnTiming};

/// History replay.
pub use crate::replay::{replay_conversation, ReplayItem, ReplayedConversation};

/// Input area shaping and widget submissions.
pub use crate::prompt::{InputPrompt, PromptConfig, PromptHint};
pub use crate::submission::WidgetResponse;

/// Tool exchange pairing and media detection.
pub use crate::media::media_from_tool_result;
pub use crate::tools::{ToolExchange, ToolLedger};
