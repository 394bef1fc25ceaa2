use thiserror::Error;

/// Reason a control block could not be turned into a directive.
///
/// Every variant is recoverable. The input prompt falls back to free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum InteractionError {
    #[error("incomplete_next_interaction")]
    Incomplete,
    #[error("invalid_xml")]
    InvalidXml,
    #[error("unexpected_root")]
    UnexpectedRoot,
    #[error("missing_presentation_mode")]
    MissingPresentationMode,
    #[error("invalid_presentation_mode")]
    InvalidPresentationMode,
    #[error("missing_suggestions")]
    MissingSuggestions,
    #[error("invalid_date_default")]
    InvalidDateDefault,
    #[error("invalid_date_min")]
    InvalidDateMin,
    #[error("invalid_date_max")]
    InvalidDateMax,
    #[error("invalid_date_range")]
    InvalidDateRange,
    #[error("invalid_datetime_default")]
    InvalidDatetimeDefault,
    #[error("invalid_datetime_min")]
    InvalidDatetimeMin,
    #[error("invalid_datetime_max")]
    InvalidDatetimeMax,
    #[error("invalid_datetime_range")]
    InvalidDatetimeRange,
    #[error("missing_data")]
    MissingData,
    #[error("invalid_data_json")]
    InvalidDataJson,
    #[error("invalid_data_format")]
    InvalidDataFormat,
    #[error("empty_data")]
    EmptyData,
    #[error("invalid_data_rows")]
    InvalidDataRows,
}

impl InteractionError {
    /// Stable snake_case code, as written to logs and debug hints.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Incomplete => "incomplete_next_interaction",
            Self::InvalidXml => "invalid_xml",
            Self::UnexpectedRoot => "unexpected_root",
            Self::MissingPresentationMode => "missing_presentation_mode",
            Self::InvalidPresentationMode => "invalid_presentation_mode",
            Self::MissingSuggestions => "missing_suggestions",
            Self::InvalidDateDefault => "invalid_date_default",
            Self::InvalidDateMin => "invalid_date_min",
            Self::InvalidDateMax => "invalid_date_max",
            Self::InvalidDateRange => "invalid_date_range",
            Self::InvalidDatetimeDefault => "invalid_datetime_default",
            Self::InvalidDatetimeMin => "invalid_datetime_min",
            Self::InvalidDatetimeMax => "invalid_datetime_max",
            Self::InvalidDatetimeRange => "invalid_datetime_range",
            Self::MissingData => "missing_data",
            Self::InvalidDataJson => "invalid_data_json",
            Self::InvalidDataFormat => "invalid_data_format",
            Self::EmptyData => "empty_data",
            Self::InvalidDataRows => "invalid_data_rows",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::InteractionError;

    #[test]
    fn display_matches_code() {
        for error in [
            InteractionError::Incomplete,
            InteractionError::InvalidXml,
            InteractionError::InvalidDatetimeRange,
            InteractionError::InvalidDataRows,
        ] {
            assert_eq!(error.to_string(), error.code());
        }
    }
}
