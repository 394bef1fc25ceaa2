//! Turns the trailing `<next_interaction>` block of an assistant message into
//! a typed input directive.
//!
//! Parsing never fails the turn: a malformed block yields
//! [`NextInteraction::Failed`] and the prompt degrades to free text.

mod data_editor;
mod directive;
mod error;
mod mode;
mod signature;
mod temporal;
pub mod xml;

use std::collections::BTreeMap;

use tracing::debug;

use crate::frame::{split_frame, Frame};

pub use data_editor::DataEditorSpec;
pub use directive::{Directive, InputSpec};
pub use error::InteractionError;
pub use mode::PresentationMode;
pub use temporal::{
    iso_date, iso_datetime, parse_iso_date, parse_iso_datetime, Bounds, DateBounds,
    DateTimeBounds,
};

const ROOT_TAG: &str = "next_interaction";

/// Outcome of looking for a control block at the end of a message.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum NextInteraction {
    /// No block: an ordinary free-text turn.
    #[default]
    Absent,
    Ready(Directive),
    Failed(InteractionError),
}

impl NextInteraction {
    #[must_use]
    pub fn directive(&self) -> Option<&Directive> {
        match self {
            Self::Ready(directive) => Some(directive),
            _ => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<InteractionError> {
        match self {
            Self::Failed(error) => Some(*error),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// Display text and directive extracted from one assistant message.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    pub clean_text: String,
    pub next_interaction: NextInteraction,
}

/// Splits `raw_text` into the text to show and the directive it ends with.
#[must_use]
pub fn parse_response(raw_text: &str) -> ParsedResponse {
    match split_frame(raw_text) {
        Frame::Plain(text) => ParsedResponse {
            clean_text: text.to_string(),
            next_interaction: NextInteraction::Absent,
        },
        Frame::Incomplete { display } => ParsedResponse {
            clean_text: display.to_string(),
            next_interaction: NextInteraction::Failed(InteractionError::Incomplete),
        },
        Frame::Complete { display, block } => ParsedResponse {
            clean_text: display.to_string(),
            next_interaction: match parse_block(block) {
                Ok(directive) => NextInteraction::Ready(directive),
                Err(error) => NextInteraction::Failed(error),
            },
        },
    }
}

/// Validates one raw block, markers included.
pub fn parse_block(block: &str) -> Result<Directive, InteractionError> {
    let root = xml::parse_document(block).map_err(|err| {
        debug!(error = %err, "control block is not well-formed");
        InteractionError::InvalidXml
    })?;
    if root.name != ROOT_TAG {
        return Err(InteractionError::UnexpectedRoot);
    }

    let mode_text = root
        .child("presentation_mode")
        .map(|element| element.text.as_str())
        .filter(|text| !text.is_empty())
        .ok_or(InteractionError::MissingPresentationMode)?;
    let mode = PresentationMode::parse(mode_text.trim())
        .ok_or(InteractionError::InvalidPresentationMode)?;

    let suggestions: Vec<String> = root
        .child("suggested_user_follow_ups")
        .map(|list| {
            list.children_named("q")
                .map(|item| item.text.trim())
                .filter(|text| !text.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let params: BTreeMap<String, String> = root
        .child("params")
        .map(|params| {
            params
                .children
                .iter()
                .map(|child| (child.name.clone(), child.text.trim().to_string()))
                .collect()
        })
        .unwrap_or_default();

    let data = root
        .child("data")
        .map(|element| element.text.trim())
        .filter(|text| !text.is_empty());

    let spec = match mode {
        PresentationMode::FreeText => InputSpec::FreeText,
        PresentationMode::YesNo => InputSpec::YesNo,
        PresentationMode::RadioBox | PresentationMode::MultiSelectCheckbox => {
            if suggestions.is_empty() {
                return Err(InteractionError::MissingSuggestions);
            }
            let options = suggestions.clone();
            if mode == PresentationMode::RadioBox {
                InputSpec::RadioBox { options }
            } else {
                InputSpec::MultiSelect { options }
            }
        }
        PresentationMode::DateInput => InputSpec::Date(temporal::parse_bounds(
            &params,
            parse_iso_date,
            &temporal::DATE_ERRORS,
        )?),
        PresentationMode::DatetimeInput => InputSpec::DateTime(temporal::parse_bounds(
            &params,
            parse_iso_datetime,
            &temporal::DATETIME_ERRORS,
        )?),
        PresentationMode::DataEditor => {
            InputSpec::DataEditor(data_editor::parse_data_editor(&params, data)?)
        }
    };

    let signed_suggestions: &[String] = match mode {
        PresentationMode::FreeText | PresentationMode::YesNo => &[],
        _ => &suggestions,
    };
    let signature = signature::directive_signature(mode, signed_suggestions, &params, data);
    Ok(Directive::new(spec, signature))
}
