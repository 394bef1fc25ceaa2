use std::collections::BTreeMap;

use serde_json::json;
use sha2::{Digest, Sha256};

use super::PresentationMode;

const SHORT_HASH_LEN: usize = 10;

/// Canonical identity of a directive's content.
///
/// Compact JSON `[mode, [suggestions], [[key, value], ...], data_hash]` with
/// params in key order and the data reduced to a short digest.
pub(crate) fn directive_signature(
    mode: PresentationMode,
    suggestions: &[String],
    params: &BTreeMap<String, String>,
    data: Option<&str>,
) -> String {
    let params: Vec<[&str; 2]> = params
        .iter()
        .map(|(key, value)| [key.as_str(), value.as_str()])
        .collect();
    let data_hash = data.filter(|text| !text.is_empty()).map(short_hash);
    json!([mode.as_str(), suggestions, params, data_hash]).to_string()
}

/// First ten hex digits of the SHA-256 of `text`.
pub(crate) fn short_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest
        .iter()
        .take(SHORT_HASH_LEN / 2)
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_compact_json_with_sorted_params() {
        let params = BTreeMap::from([
            ("min".to_string(), "2026-01-01".to_string()),
            ("default".to_string(), String::new()),
        ]);
        assert_eq!(
            directive_signature(PresentationMode::DateInput, &[], &params, None),
            r#"["date_input",[],[["default",""],["min","2026-01-01"]],null]"#
        );
    }

    #[test]
    fn data_contributes_a_short_hash() {
        let signature = directive_signature(
            PresentationMode::DataEditor,
            &[],
            &BTreeMap::new(),
            Some("[{\"a\":1}]"),
        );
        let expected = format!(
            r#"["data_editor",[],[],"{}"]"#,
            short_hash("[{\"a\":1}]")
        );
        assert_eq!(signature, expected);
        assert_eq!(short_hash("abc"), "ba7816bf8f");
    }

    #[test]
    fn any_field_change_changes_the_signature() {
        let base = directive_signature(
            PresentationMode::RadioBox,
            &["A".to_string(), "B".to_string()],
            &BTreeMap::new(),
            None,
        );
        let reordered = directive_signature(
            PresentationMode::RadioBox,
            &["B".to_string(), "A".to_string()],
            &BTreeMap::new(),
            None,
        );
        let other_mode = directive_signature(
            PresentationMode::MultiSelectCheckbox,
            &["A".to_string(), "B".to_string()],
            &BTreeMap::new(),
            None,
        );
        assert_ne!(base, reordered);
        assert_ne!(base, other_mode);
    }
}
