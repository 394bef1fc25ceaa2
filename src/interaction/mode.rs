use serde::{Deserialize, Serialize};

/// Input widget requested by a control block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentationMode {
    FreeText,
    YesNo,
    RadioBox,
    MultiSelectCheckbox,
    DateInput,
    DatetimeInput,
    DataEditor,
}

impl PresentationMode {
    pub const ALL: [Self; 7] = [
        Self::FreeText,
        Self::YesNo,
        Self::RadioBox,
        Self::MultiSelectCheckbox,
        Self::DateInput,
        Self::DatetimeInput,
        Self::DataEditor,
    ];

    /// Parses a wire name. `dropdown_box` is accepted as a legacy alias of `radio_box`.
    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "free_text" => Self::FreeText,
            "yes_no" => Self::YesNo,
            "radio_box" | "dropdown_box" => Self::RadioBox,
            "multi_select_checkbox" => Self::MultiSelectCheckbox,
            "date_input" => Self::DateInput,
            "datetime_input" => Self::DatetimeInput,
            "data_editor" => Self::DataEditor,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FreeText => "free_text",
            Self::YesNo => "yes_no",
            Self::RadioBox => "radio_box",
            Self::MultiSelectCheckbox => "multi_select_checkbox",
            Self::DateInput => "date_input",
            Self::DatetimeInput => "datetime_input",
            Self::DataEditor => "data_editor",
        }
    }

    /// Short instruction shown above the widget.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Self::YesNo | Self::RadioBox => Some("Pick one"),
            Self::MultiSelectCheckbox => Some("Pick one or more"),
            Self::DateInput => Some("Pick a date"),
            Self::DatetimeInput => Some("Pick a date and time"),
            Self::FreeText | Self::DataEditor => None,
        }
    }

    /// Modes whose widget offers the suggestion list as choices.
    pub fn is_choice(&self) -> bool {
        matches!(self, Self::RadioBox | Self::MultiSelectCheckbox)
    }
}

#[cfg(test)]
mod tests {
    use super::PresentationMode;

    #[test]
    fn wire_names_round_trip() {
        for mode in PresentationMode::ALL {
            assert_eq!(PresentationMode::parse(mode.as_str()), Some(mode));
        }
    }

    #[test]
    fn legacy_dropdown_maps_to_radio_box() {
        assert_eq!(
            PresentationMode::parse("dropdown_box"),
            Some(PresentationMode::RadioBox)
        );
        assert_eq!(PresentationMode::parse("Radio_Box"), None);
    }
}
