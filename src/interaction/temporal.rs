//! Date and local date-time parameters for the date widgets.

use std::collections::BTreeMap;

use time::macros::format_description;
use time::{Date, PrimitiveDateTime, Time};

use super::InteractionError;

/// Optional default and inclusive range for a date or date-time widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds<T> {
    pub default: Option<T>,
    pub min: Option<T>,
    pub max: Option<T>,
}

pub type DateBounds = Bounds<Date>;
pub type DateTimeBounds = Bounds<PrimitiveDateTime>;

impl<T: Copy + Ord> Bounds<T> {
    #[must_use]
    pub fn clamp(&self, value: T) -> T {
        let value = self.min.map_or(value, |min| value.max(min));
        self.max.map_or(value, |max| value.min(max))
    }

    #[must_use]
    pub fn contains(&self, value: T) -> bool {
        self.clamp(value) == value
    }

    /// Value the widget starts on. Without a default, `fallback` (usually now) is
    /// clamped into range instead.
    #[must_use]
    pub fn initial_value(&self, fallback: T) -> T {
        self.clamp(self.default.unwrap_or(fallback))
    }
}

/// Error codes reported for each bound of one widget kind.
pub(crate) struct BoundErrors {
    pub default: InteractionError,
    pub min: InteractionError,
    pub max: InteractionError,
    pub range: InteractionError,
}

pub(crate) const DATE_ERRORS: BoundErrors = BoundErrors {
    default: InteractionError::InvalidDateDefault,
    min: InteractionError::InvalidDateMin,
    max: InteractionError::InvalidDateMax,
    range: InteractionError::InvalidDateRange,
};

pub(crate) const DATETIME_ERRORS: BoundErrors = BoundErrors {
    default: InteractionError::InvalidDatetimeDefault,
    min: InteractionError::InvalidDatetimeMin,
    max: InteractionError::InvalidDatetimeMax,
    range: InteractionError::InvalidDatetimeRange,
};

/// Reads `default`, `min` and `max` from raw params. Empty values count as absent.
pub(crate) fn parse_bounds<T: Copy + Ord>(
    params: &BTreeMap<String, String>,
    parse: fn(&str) -> Option<T>,
    errors: &BoundErrors,
) -> Result<Bounds<T>, InteractionError> {
    let read = |key: &str, error: InteractionError| -> Result<Option<T>, InteractionError> {
        match params.get(key).map(String::as_str).filter(|value| !value.is_empty()) {
            Some(value) => parse(value).map(Some).ok_or(error),
            None => Ok(None),
        }
    };

    let default = read("default", errors.default)?;
    let min = read("min", errors.min)?;
    let max = read("max", errors.max)?;
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(errors.range);
        }
    }

    let mut bounds = Bounds { default, min, max };
    bounds.default = default.map(|value| bounds.clamp(value));
    Ok(bounds)
}

/// Parses a calendar date written as `YYYY-MM-DD`.
#[must_use]
pub fn parse_iso_date(text: &str) -> Option<Date> {
    Date::parse(text, format_description!("[year]-[month]-[day]")).ok()
}

/// Parses a local date-time. Any UTC offset or `Z` suffix is rejected.
#[must_use]
pub fn parse_iso_datetime(text: &str) -> Option<PrimitiveDateTime> {
    let date = parse_iso_date(text.get(..10)?)?;
    let rest = &text[10..];
    if rest.is_empty() {
        return Some(date.midnight());
    }

    let time_text = rest.strip_prefix(['T', ' '])?;
    let time = Time::parse(time_text, format_description!("[hour]:[minute]"))
        .or_else(|_| Time::parse(time_text, format_description!("[hour]:[minute]:[second]")))
        .or_else(|_| {
            Time::parse(
                time_text,
                format_description!("[hour]:[minute]:[second].[subsecond]"),
            )
        })
        .ok()?;
    Some(PrimitiveDateTime::new(date, time))
}

#[must_use]
pub fn iso_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Formats as `YYYY-MM-DDTHH:MM:SS`, with microseconds only when non-zero.
#[must_use]
pub fn iso_datetime(value: PrimitiveDateTime) -> String {
    let mut text = format!(
        "{}T{:02}:{:02}:{:02}",
        iso_date(value.date()),
        value.hour(),
        value.minute(),
        value.second()
    );
    let micros = value.microsecond();
    if micros != 0 {
        text.push_str(&format!(".{micros:06}"));
    }
    text
}
