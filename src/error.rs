use agent_provider::{AgentError, ConversationId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Starting or consuming the stream failed. The turn was still finalized.
    #[error("Streaming error: {0}")]
    Streaming(#[source] AgentError),

    #[error("conversation '{conversation}' already has a stream in progress")]
    AlreadyStreaming { conversation: ConversationId },

    #[error("failed to load history for '{conversation}': {source}")]
    History {
        conversation: ConversationId,
        #[source]
        source: AgentError,
    },

    #[error("submission has neither text nor media")]
    EmptySubmission,
}

impl SessionError {
    #[must_use]
    pub fn history(conversation: &ConversationId, source: AgentError) -> Self {
        Self::History {
            conversation: conversation.clone(),
            source,
        }
    }

    #[must_use]
    pub fn already_streaming(conversation: &ConversationId) -> Self {
        Self::AlreadyStreaming {
            conversation: conversation.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streaming_errors_read_as_one_line() {
        let error = SessionError::Streaming(AgentError::transport("connection reset"));
        assert_eq!(error.to_string(), "Streaming error: connection reset");
    }

    #[test]
    fn history_error_names_the_conversation() {
        let error = SessionError::history(
            &ConversationId::new("c-9"),
            AgentError::Rejected("locked".to_string()),
        );
        assert_eq!(
            error.to_string(),
            "failed to load history for 'c-9': request rejected: locked"
        );
    }
}
