//! What the input area should offer after a turn.

use crate::interaction::{Directive, NextInteraction, PresentationMode};

pub const DEFAULT_PLACEHOLDER: &str = "Ask away";
pub const SUGGESTIONS_UNAVAILABLE_HINT: &str =
    "Suggestions could not be loaded this time. You can still reply below.";
pub const FREE_TEXT_FALLBACK_HINT: &str = "You can also type your own response below.";
pub const WHY_THESE_OPTIONS_HINT: &str =
    "Why these options? They are suggested next steps based on the conversation.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptConfig {
    pub placeholder: String,
    pub debug_interaction: bool,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            debug_interaction: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptHint {
    /// The control block was rejected. `debug_code` is only filled in debug mode.
    SuggestionsUnavailable { debug_code: Option<&'static str> },
    FreeTextFallback,
    WhyTheseOptions,
}

impl PromptHint {
    #[must_use]
    pub fn text(&self) -> &'static str {
        match self {
            Self::SuggestionsUnavailable { .. } => SUGGESTIONS_UNAVAILABLE_HINT,
            Self::FreeTextFallback => FREE_TEXT_FALLBACK_HINT,
            Self::WhyTheseOptions => WHY_THESE_OPTIONS_HINT,
        }
    }

    /// Extra caption naming the parse error, shown in debug mode.
    #[must_use]
    pub fn debug_text(&self) -> Option<String> {
        match self {
            Self::SuggestionsUnavailable {
                debug_code: Some(code),
            } => Some(format!("Debug: next_interaction parse error ({code}).")),
            _ => None,
        }
    }
}

/// Input area description. The free-text box is always available; `widget`
/// is shown alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct InputPrompt {
    pub widget: Option<Directive>,
    pub label: Option<&'static str>,
    pub placeholder: String,
    pub hints: Vec<PromptHint>,
    /// Set while a stream is running for the conversation.
    pub disabled: bool,
}

impl InputPrompt {
    #[must_use]
    pub fn for_interaction(interaction: &NextInteraction, config: &PromptConfig) -> Self {
        let mut prompt = Self {
            widget: None,
            label: None,
            placeholder: config.placeholder.clone(),
            hints: Vec::new(),
            disabled: false,
        };

        match interaction {
            NextInteraction::Absent => {}
            NextInteraction::Failed(error) => {
                prompt.hints.push(PromptHint::SuggestionsUnavailable {
                    debug_code: config.debug_interaction.then(|| error.code()),
                });
                prompt.hints.push(PromptHint::FreeTextFallback);
            }
            NextInteraction::Ready(directive) => {
                let mode = directive.mode();
                if mode != PresentationMode::FreeText {
                    if mode.is_choice() {
                        prompt.hints.push(PromptHint::WhyTheseOptions);
                    }
                    prompt.hints.push(PromptHint::FreeTextFallback);
                    prompt.label = mode.label();
                    prompt.widget = Some(directive.clone());
                }
            }
        }
        prompt
    }

    /// Widget identity for a conversation with `turn_count` persisted turns.
    #[must_use]
    pub fn widget_key(&self, turn_count: usize) -> Option<String> {
        self.widget
            .as_ref()
            .map(|directive| directive.widget_key(turn_count))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::interaction::{parse_response, InteractionError};

    fn interaction(body: &str) -> NextInteraction {
        parse_response(&format!("Text<next_interaction>{body}</next_interaction>")).next_interaction
    }

    #[test]
    fn absent_and_free_text_show_plain_input() {
        for next in [
            NextInteraction::Absent,
            interaction("<presentation_mode>free_text</presentation_mode>"),
        ] {
            let prompt = InputPrompt::for_interaction(&next, &PromptConfig::default());
            assert_eq!(prompt.widget, None);
            assert!(prompt.hints.is_empty());
            assert_eq!(prompt.placeholder, "Ask away");
        }
    }

    #[test]
    fn failures_degrade_with_hints() {
        let next = NextInteraction::Failed(InteractionError::MissingSuggestions);
        let prompt = InputPrompt::for_interaction(&next, &PromptConfig::default());
        assert_eq!(
            prompt.hints,
            vec![
                PromptHint::SuggestionsUnavailable { debug_code: None },
                PromptHint::FreeTextFallback,
            ]
        );
        assert_eq!(prompt.hints[0].text(), SUGGESTIONS_UNAVAILABLE_HINT);
        assert_eq!(prompt.hints[0].debug_text(), None);

        let debug = PromptConfig {
            debug_interaction: true,
            ..PromptConfig::default()
        };
        let prompt = InputPrompt::for_interaction(&next, &debug);
        assert_eq!(
            prompt.hints[0],
            PromptHint::SuggestionsUnavailable {
                debug_code: Some("missing_suggestions")
            }
        );
        assert_eq!(
            prompt.hints[0].debug_text().as_deref(),
            Some("Debug: next_interaction parse error (missing_suggestions).")
        );
    }

    #[test]
    fn choice_widgets_explain_their_options() {
        let next = interaction(
            "<presentation_mode>multi_select_checkbox</presentation_mode><suggested_user_follow_ups><q>A</q></suggested_user_follow_ups>",
        );
        let prompt = InputPrompt::for_interaction(&next, &PromptConfig::default());
        assert_eq!(prompt.label, Some("Pick one or more"));
        assert_eq!(
            prompt.hints,
            vec![PromptHint::WhyTheseOptions, PromptHint::FreeTextFallback]
        );
        assert!(prompt.widget_key(2).is_some());
    }

    #[test]
    fn date_widget_has_fallback_hint_only() {
        let next = interaction("<presentation_mode>date_input</presentation_mode>");
        let prompt = InputPrompt::for_interaction(&next, &PromptConfig::default());
        assert_eq!(prompt.label, Some("Pick a date"));
        assert_eq!(prompt.hints, vec![PromptHint::FreeTextFallback]);
    }
}
