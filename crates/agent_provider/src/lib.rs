//! Provider-neutral contract between the conversation core and an agent.
//!
//! This crate defines only the persisted turn shape, the streamed event shape,
//! and the pull-based [`Agent`] interface. It excludes model construction,
//! transport details, and persistence mechanics, which belong to concrete
//! agent implementations.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Stable identifier of one conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConversationId(String);

impl ConversationId {
    /// Wraps an existing identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Author of a persisted turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

/// Media kinds the rendering surface knows how to display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Audio,
    Video,
}

impl MediaKind {
    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "image" => Self::Image,
            "audio" => Self::Audio,
            "video" => Self::Video,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }
}

/// Where the bytes of a media item live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum MediaSource {
    Url { url: String },
    Inline { base64: String, mime_type: String },
}

/// Reference to an image, audio clip, or video attached to a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub kind: MediaKind,
    #[serde(flatten)]
    pub source: MediaSource,
}

impl MediaRef {
    #[must_use]
    pub fn url(kind: MediaKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            source: MediaSource::Url { url: url.into() },
        }
    }

    #[must_use]
    pub fn inline_image(base64: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Image,
            source: MediaSource::Inline {
                base64: base64.into(),
                mime_type: mime_type.into(),
            },
        }
    }
}

/// Tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub call_id: String,
    pub name: String,
    pub arguments: Value,
}

impl ToolCall {
    #[must_use]
    pub fn new(call_id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            call_id: call_id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Result of one tool invocation, matched to its call by `call_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: String,
    pub name: String,
    pub content: Value,
    pub is_error: bool,
}

impl ToolResult {
    /// Constructs a successful tool result.
    #[must_use]
    pub fn success(
        call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<Value>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            name: name.into(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Constructs a tool error result.
    #[must_use]
    pub fn error(
        call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<Value>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            name: name.into(),
            content: content.into(),
            is_error: true,
        }
    }

    /// Returns the result content as display text: strings verbatim, other JSON compact.
    #[must_use]
    pub fn content_text(&self) -> String {
        match &self.content {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

/// One persisted conversation message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_results: Vec<ToolResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<MediaRef>,
}

impl Turn {
    fn with_role(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            reasoning: None,
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
            media: Vec::new(),
        }
    }

    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::with_role(Role::User, text)
    }

    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, text)
    }

    /// Assistant turn that issued tool calls.
    #[must_use]
    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        let mut turn = Self::with_role(Role::Assistant, String::new());
        turn.tool_calls = calls;
        turn
    }

    /// Tool turn holding one result.
    #[must_use]
    pub fn tool_result(result: ToolResult) -> Self {
        let mut turn = Self::with_role(Role::Tool, String::new());
        turn.tool_results = vec![result];
        turn
    }

    /// Builds a turn from provider content blocks, keeping tags split across
    /// text blocks intact.
    #[must_use]
    pub fn from_content(role: Role, blocks: &[ContentBlock]) -> Self {
        let (text, media) = extract_text_and_media(blocks);
        let mut turn = Self::with_role(role, text);
        turn.media = media;
        turn
    }

    #[must_use]
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    #[must_use]
    pub fn with_media(mut self, media: MediaRef) -> Self {
        self.media.push(media);
        self
    }

    /// Returns true when the turn carries only tool traffic (calls or results).
    #[must_use]
    pub fn is_tool_traffic(&self) -> bool {
        self.role == Role::Tool || !self.tool_calls.is_empty()
    }

    /// Returns the non-empty reasoning text, if any.
    #[must_use]
    pub fn reasoning_text(&self) -> Option<&str> {
        self.reasoning.as_deref().filter(|text| !text.is_empty())
    }
}

/// Multimodal content block as produced by model providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Image {
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        base64: Option<String>,
        #[serde(default)]
        mime_type: Option<String>,
    },
    ImageUrl {
        image_url: ImageUrl,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Flattens content blocks into display text plus image references.
///
/// Text blocks are joined without separators so a tag split across blocks
/// stays intact for downstream parsing.
#[must_use]
pub fn extract_text_and_media(blocks: &[ContentBlock]) -> (String, Vec<MediaRef>) {
    let mut text = String::new();
    let mut media = Vec::new();

    for block in blocks {
        match block {
            ContentBlock::Text { text: part } => text.push_str(part),
            ContentBlock::Image {
                url,
                base64,
                mime_type,
            } => {
                if let Some(url) = url.as_deref().filter(|url| !url.is_empty()) {
                    media.push(MediaRef::url(MediaKind::Image, url));
                } else if let Some(base64) = base64.as_deref().filter(|data| !data.is_empty()) {
                    media.push(MediaRef::inline_image(
                        base64,
                        mime_type.as_deref().unwrap_or("image/png"),
                    ));
                }
            }
            ContentBlock::ImageUrl { image_url } => {
                if !image_url.url.is_empty() {
                    media.push(MediaRef::url(MediaKind::Image, image_url.url.clone()));
                }
            }
        }
    }

    (text.trim().to_string(), media)
}

/// Sub-stream classification of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenChannel {
    Reasoning,
    Answer,
}

/// Agent-emitted event for one streaming turn.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Token-level increment.
    Token { channel: TokenChannel, text: String },
    /// Node-level update carrying one or more tool invocations.
    ToolCalls { calls: Vec<ToolCall> },
    /// Node-level update carrying one or more tool results.
    ToolResults { results: Vec<ToolResult> },
}

impl StreamEvent {
    #[must_use]
    pub fn reasoning(text: impl Into<String>) -> Self {
        Self::Token {
            channel: TokenChannel::Reasoning,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn answer(text: impl Into<String>) -> Self {
        Self::Token {
            channel: TokenChannel::Answer,
            text: text.into(),
        }
    }
}

/// Error raised by an agent while starting or consuming a stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    #[error("{0}")]
    Transport(String),

    #[error("unknown conversation '{0}'")]
    UnknownConversation(ConversationId),

    #[error("request rejected: {0}")]
    Rejected(String),
}

impl AgentError {
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }
}

/// Per-request context handed to the agent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentContext {
    /// Placeholder → replacement pairs applied to the system prompt.
    pub prompt_replacements: BTreeMap<String, String>,
}

/// Ordered, pull-based event sequence for one turn.
pub type EventStream<'a> = Box<dyn Iterator<Item = Result<StreamEvent, AgentError>> + 'a>;

/// Agent interface consumed by the conversation core.
pub trait Agent {
    /// Appends `new_turns` to the conversation and streams the agent's response.
    ///
    /// Events are produced lazily; the caller pulls them one at a time.
    fn stream(
        &self,
        new_turns: &[Turn],
        conversation: &ConversationId,
        context: &AgentContext,
    ) -> Result<EventStream<'_>, AgentError>;

    /// Returns a snapshot of the persisted turn list in order.
    fn get_state(&self, conversation: &ConversationId) -> Result<Vec<Turn>, AgentError>;
}
