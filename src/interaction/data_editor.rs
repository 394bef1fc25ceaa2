use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::InteractionError;

/// Editable table requested by a `data_editor` block.
#[derive(Debug, Clone, PartialEq)]
pub struct DataEditorSpec {
    pub allow_add_rows: bool,
    /// Declared column order; empty when the block named none.
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
}

pub(crate) fn parse_data_editor(
    params: &BTreeMap<String, String>,
    data: Option<&str>,
) -> Result<DataEditorSpec, InteractionError> {
    let data = data
        .filter(|text| !text.is_empty())
        .ok_or(InteractionError::MissingData)?;
    let decoded: Value =
        serde_json::from_str(data).map_err(|_| InteractionError::InvalidDataJson)?;
    let Value::Array(items) = decoded else {
        return Err(InteractionError::InvalidDataFormat);
    };
    if items.is_empty() {
        return Err(InteractionError::EmptyData);
    }

    let mut rows = items
        .into_iter()
        .map(|item| match item {
            Value::Object(row) => Ok(row),
            _ => Err(InteractionError::InvalidDataRows),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let allow_add_rows = params
        .get("allow_add_rows")
        .is_some_and(|value| parse_flag(value));
    let columns = params
        .get("columns")
        .map(|value| parse_columns(value))
        .unwrap_or_default();
    if !columns.is_empty() {
        rows = rows
            .into_iter()
            .map(|row| order_columns(row, &columns))
            .collect();
    }

    Ok(DataEditorSpec {
        allow_add_rows,
        columns,
        rows,
    })
}

pub(crate) fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

/// Splits a comma list, dropping empty and repeated names.
pub(crate) fn parse_columns(value: &str) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for name in value.split(',').map(str::trim).filter(|name| !name.is_empty()) {
        if !columns.iter().any(|existing| existing == name) {
            columns.push(name.to_string());
        }
    }
    columns
}

/// Declared columns first (missing ones as null), then the row's other keys in their order.
fn order_columns(mut row: Map<String, Value>, columns: &[String]) -> Map<String, Value> {
    let mut ordered = Map::with_capacity(row.len().max(columns.len()));
    for column in columns {
        let value = row.shift_remove(column).unwrap_or(Value::Null);
        ordered.insert(column.clone(), value);
    }
    ordered.extend(row);
    ordered
}
