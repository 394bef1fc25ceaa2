//! Converts widget input into the user message that is sent to the agent.

use std::io;

use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;
use time::{Date, PrimitiveDateTime};

use crate::interaction::{iso_date, iso_datetime, Directive, InputSpec};

pub const DATA_EDITOR_PREFIX: &str = "data_editor: ";
pub const YES: &str = "Yes";
pub const NO: &str = "No";

/// Raw value collected by one input widget.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetResponse {
    FreeText(String),
    YesNo(bool),
    Choice(String),
    Choices(Vec<String>),
    Date(Date),
    DateTime(PrimitiveDateTime),
    Rows(Vec<Map<String, Value>>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("{response} input does not fit a {mode} widget")]
    ModeMismatch {
        mode: &'static str,
        response: &'static str,
    },
    #[error("'{0}' is not one of the offered options")]
    UnknownOption(String),
    #[error("nothing to send")]
    Empty,
    #[error("value is outside the allowed range")]
    OutOfRange,
    #[error("rows cannot be added to this table")]
    RowsAdded,
}

impl WidgetResponse {
    fn kind(&self) -> &'static str {
        match self {
            Self::FreeText(_) => "free text",
            Self::YesNo(_) => "yes/no",
            Self::Choice(_) => "single choice",
            Self::Choices(_) => "multiple choice",
            Self::Date(_) => "date",
            Self::DateTime(_) => "date-time",
            Self::Rows(_) => "table",
        }
    }

    /// Message text for this response; `None` when there is nothing to send.
    #[must_use]
    pub fn into_submission(self) -> Option<String> {
        match self {
            Self::FreeText(text) => (!text.trim().is_empty()).then_some(text),
            Self::YesNo(answer) => Some(if answer { YES } else { NO }.to_string()),
            Self::Choice(choice) => Some(choice),
            Self::Choices(mut choices) => match choices.len() {
                0 => None,
                1 => choices.pop(),
                _ => Some(choices.join(", ")),
            },
            Self::Date(date) => Some(iso_date(date)),
            Self::DateTime(value) => Some(iso_datetime(value)),
            Self::Rows(rows) => {
                let rows = Value::Array(rows.into_iter().map(Value::Object).collect());
                ascii_json(&rows).map(|json| format!("{DATA_EDITOR_PREFIX}{json}"))
            }
        }
    }
}

impl Directive {
    /// Checks `response` against this widget and builds the message to send.
    ///
    /// Free text is accepted for every widget.
    pub fn submit(&self, response: WidgetResponse) -> Result<String, SubmissionError> {
        match (self.spec(), &response) {
            (_, WidgetResponse::FreeText(_)) => {}
            (InputSpec::YesNo, WidgetResponse::YesNo(_)) => {}
            (InputSpec::RadioBox { options }, WidgetResponse::Choice(choice)) => {
                if !options.contains(choice) {
                    return Err(SubmissionError::UnknownOption(choice.clone()));
                }
            }
            (InputSpec::MultiSelect { options }, WidgetResponse::Choices(choices)) => {
                if let Some(unknown) = choices.iter().find(|choice| !options.contains(choice)) {
                    return Err(SubmissionError::UnknownOption(unknown.clone()));
                }
            }
            (InputSpec::Date(bounds), WidgetResponse::Date(date)) => {
                if !bounds.contains(*date) {
                    return Err(SubmissionError::OutOfRange);
                }
            }
            (InputSpec::DateTime(bounds), WidgetResponse::DateTime(value)) => {
                if !bounds.contains(*value) {
                    return Err(SubmissionError::OutOfRange);
                }
            }
            (InputSpec::DataEditor(editor), WidgetResponse::Rows(rows)) => {
                if !editor.allow_add_rows && rows.len() > editor.rows.len() {
                    return Err(SubmissionError::RowsAdded);
                }
            }
            (spec, response) => {
                return Err(SubmissionError::ModeMismatch {
                    mode: spec.mode().as_str(),
                    response: response.kind(),
                })
            }
        }
        response.into_submission().ok_or(SubmissionError::Empty)
    }
}

/// Writes `", "` and `": "` separators and escapes everything outside
/// printable ASCII as `\uXXXX`.
struct AsciiFormatter;

impl Formatter for AsciiFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        for ch in fragment.chars() {
            if matches!(ch, ' '..='~') {
                writer.write_all(&[ch as u8])?;
                continue;
            }
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
        }
        Ok(())
    }
}

fn ascii_json(value: &Value) -> Option<String> {
    let mut out = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut out, AsciiFormatter);
    value.serialize(&mut serializer).ok()?;
    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use time::macros::{date, datetime};

    use super::*;
    use crate::interaction::parse_block;

    fn directive(body: &str) -> Directive {
        parse_block(&format!("<next_interaction>{body}</next_interaction>"))
            .expect("valid block")
    }

    fn rows(value: Value) -> Vec<Map<String, Value>> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(row) => Some(row),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    #[test]
    fn submission_shapes() {
        assert_eq!(WidgetResponse::YesNo(true).into_submission().as_deref(), Some("Yes"));
        assert_eq!(WidgetResponse::YesNo(false).into_submission().as_deref(), Some("No"));
        assert_eq!(
            WidgetResponse::Choices(vec!["A".to_string()]).into_submission().as_deref(),
            Some("A")
        );
        assert_eq!(
            WidgetResponse::Choices(vec!["A".to_string(), "B".to_string()])
                .into_submission()
                .as_deref(),
            Some("A, B")
        );
        assert_eq!(WidgetResponse::Choices(Vec::new()).into_submission(), None);
        assert_eq!(WidgetResponse::FreeText("  ".to_string()).into_submission(), None);
        assert_eq!(
            WidgetResponse::Date(date!(2026 - 03 - 01)).into_submission().as_deref(),
            Some("2026-03-01")
        );
        assert_eq!(
            WidgetResponse::DateTime(datetime!(2026-03-01 14:30))
                .into_submission()
                .as_deref(),
            Some("2026-03-01T14:30:00")
        );
    }

    #[test]
    fn data_editor_submission_is_prefixed_ascii_json() {
        let submission = WidgetResponse::Rows(rows(json!([{"city": "Zürich", "n": 2}])))
            .into_submission();
        assert_eq!(
            submission.as_deref(),
            Some(r#"data_editor: [{"city": "Z\u00fcrich", "n": 2}]"#)
        );
        assert_eq!(ascii_json(&json!("😀")).as_deref(), Some(r#""\ud83d\ude00""#));
        assert_eq!(
            ascii_json(&json!({"k": ["a\u{7f}", "line\nbreak", 1.5, null]})).as_deref(),
            Some(r#"{"k": ["a\u007f", "line\nbreak", 1.5, null]}"#)
        );
    }

    #[test]
    fn directive_validates_responses() {
        let radio = directive(
            "<presentation_mode>radio_box</presentation_mode><suggested_user_follow_ups><q>A</q><q>B</q></suggested_user_follow_ups>",
        );
        assert_eq!(radio.submit(WidgetResponse::Choice("B".to_string())), Ok("B".to_string()));
        assert_eq!(
            radio.submit(WidgetResponse::Choice("C".to_string())),
            Err(SubmissionError::UnknownOption("C".to_string()))
        );
        assert_eq!(
            radio.submit(WidgetResponse::FreeText("something else".to_string())),
            Ok("something else".to_string())
        );
        assert!(matches!(
            radio.submit(WidgetResponse::YesNo(true)),
            Err(SubmissionError::ModeMismatch { mode: "radio_box", .. })
        ));

        let date = directive(
            "<presentation_mode>date_input</presentation_mode><params><max>2026-01-31</max></params>",
        );
        assert_eq!(
            date.submit(WidgetResponse::Date(date!(2026 - 02 - 01))),
            Err(SubmissionError::OutOfRange)
        );

        let table = directive(
            r#"<presentation_mode>data_editor</presentation_mode><data>[{"a":1}]</data>"#,
        );
        assert_eq!(
            table.submit(WidgetResponse::Rows(rows(json!([{"a": 1}, {"a": 2}])))),
            Err(SubmissionError::RowsAdded)
        );
        assert_eq!(
            table.submit(WidgetResponse::Rows(rows(json!([{"a": 5}])))),
            Ok(r#"data_editor: [{"a": 5}]"#.to_string())
        );

        let multi = directive(
            "<presentation_mode>multi_select_checkbox</presentation_mode><suggested_user_follow_ups><q>A</q></suggested_user_follow_ups>",
        );
        assert_eq!(
            multi.submit(WidgetResponse::Choices(Vec::new())),
            Err(SubmissionError::Empty)
        );
    }
}
