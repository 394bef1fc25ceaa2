use std::collections::BTreeMap;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use time::{Date, PrimitiveDateTime};

use super::temporal::{iso_date, iso_datetime, Bounds, DateBounds, DateTimeBounds};
use super::{DataEditorSpec, PresentationMode};

/// Validated widget specification, one variant per presentation mode.
#[derive(Debug, Clone, PartialEq)]
pub enum InputSpec {
    FreeText,
    YesNo,
    RadioBox { options: Vec<String> },
    MultiSelect { options: Vec<String> },
    Date(DateBounds),
    DateTime(DateTimeBounds),
    DataEditor(DataEditorSpec),
}

impl InputSpec {
    #[must_use]
    pub fn mode(&self) -> PresentationMode {
        match self {
            Self::FreeText => PresentationMode::FreeText,
            Self::YesNo => PresentationMode::YesNo,
            Self::RadioBox { .. } => PresentationMode::RadioBox,
            Self::MultiSelect { .. } => PresentationMode::MultiSelectCheckbox,
            Self::Date(_) => PresentationMode::DateInput,
            Self::DateTime(_) => PresentationMode::DatetimeInput,
            Self::DataEditor(_) => PresentationMode::DataEditor,
        }
    }
}

/// Input widget the assistant asked for at the end of its turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    spec: InputSpec,
    signature: String,
}

impl Directive {
    pub(crate) fn new(spec: InputSpec, signature: String) -> Self {
        Self { spec, signature }
    }

    #[must_use]
    pub fn mode(&self) -> PresentationMode {
        self.spec.mode()
    }

    #[must_use]
    pub fn spec(&self) -> &InputSpec {
        &self.spec
    }

    /// Suggested follow-ups. Only choice modes carry any.
    #[must_use]
    pub fn suggestions(&self) -> &[String] {
        match &self.spec {
            InputSpec::RadioBox { options } | InputSpec::MultiSelect { options } => options,
            _ => &[],
        }
    }

    /// Normalized parameters as JSON values.
    #[must_use]
    pub fn params(&self) -> BTreeMap<String, Value> {
        match &self.spec {
            InputSpec::Date(bounds) => bound_params(bounds, iso_date),
            InputSpec::DateTime(bounds) => bound_params(bounds, iso_datetime),
            InputSpec::DataEditor(editor) => BTreeMap::from([
                (
                    "allow_add_rows".to_string(),
                    Value::Bool(editor.allow_add_rows),
                ),
                (
                    "columns".to_string(),
                    Value::from(editor.columns.clone()),
                ),
            ]),
            _ => BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn data(&self) -> Option<&[Map<String, Value>]> {
        match &self.spec {
            InputSpec::DataEditor(editor) => Some(&editor.rows),
            _ => None,
        }
    }

    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Surface key for this directive shown after `turn_count` persisted turns.
    #[must_use]
    pub fn widget_key(&self, turn_count: usize) -> String {
        let digest = Sha256::digest(format!("{turn_count}|{}", self.signature).as_bytes());
        let hex: String = digest
            .iter()
            .take(5)
            .map(|byte| format!("{byte:02x}"))
            .collect();
        format!("next_interaction_{hex}")
    }

    /// Starting value for a date widget; `today` stands in for a missing default.
    #[must_use]
    pub fn initial_date(&self, today: Date) -> Option<Date> {
        match &self.spec {
            InputSpec::Date(bounds) => Some(bounds.initial_value(today)),
            _ => None,
        }
    }

    #[must_use]
    pub fn initial_datetime(&self, now: PrimitiveDateTime) -> Option<PrimitiveDateTime> {
        match &self.spec {
            InputSpec::DateTime(bounds) => Some(bounds.initial_value(now)),
            _ => None,
        }
    }
}

fn bound_params<T: Copy>(bounds: &Bounds<T>, format: fn(T) -> String) -> BTreeMap<String, Value> {
    [
        ("default", bounds.default),
        ("min", bounds.min),
        ("max", bounds.max),
    ]
    .into_iter()
    .filter_map(|(key, value)| value.map(|value| (key.to_string(), Value::String(format(value)))))
    .collect()
}
