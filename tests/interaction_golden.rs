
use fixture::{chunks_of, read_response};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use turn_stream::{
    parse_response, InputSpec, InteractionError, NextInteraction, PresentationMode,
    StreamFrameParser,
};

fn directive_signature(name: &str) -> String {
    parse_response(&read_response(name))
        .next_interaction
        .directive()
        .map(|directive| directive.signature().to_string())
        .unwrap_or_else(|| panic!("{name} should parse into a directive"))
}

#[test]
fn radio_box_block_is_hidden_and_parsed() {
    let parsed = parse_response(&read_response("radio_box.txt"));
    assert_eq!(parsed.clean_text, "Pick one.");

    let directive = parsed.next_interaction.directive().expect("radio directive");
    assert_eq!(directive.mode(), PresentationMode::RadioBox);
    assert_eq!(directive.suggestions(), ["A".to_string(), "B".to_string()]);
}

#[test]
fn truncated_block_reports_incomplete() {
    let parsed = parse_response(&read_response("radio_box_truncated.txt"));
    assert_eq!(parsed.clean_text, "Pick one.");
    assert_eq!(
        parsed.next_interaction,
        NextInteraction::Failed(InteractionError::Incomplete)
    );
    assert_eq!(
        parsed.next_interaction.error().map(|error| error.code()),
        Some("incomplete_next_interaction")
    );
}

#[test]
fn boundary_blocks_fail_with_their_codes() {
    let cases = [
        ("radio_box_empty.txt", "missing_suggestions"),
        ("date_inverted_range.txt", "invalid_date_range"),
        ("datetime_offset.txt", "invalid_datetime_default"),
    ];
    for (name, code) in cases {
        let parsed = parse_response(&read_response(name));
        assert_eq!(parsed.next_interaction.directive(), None, "{name}");
        assert_eq!(
            parsed.next_interaction.error().map(|error| error.code()),
            Some(code),
            "{name}"
        );
    }

    let parsed = parse_response(&read_response("date_inverted_range.txt"));
    assert_eq!(parsed.clean_text, "When?");
}

#[test]
fn data_editor_rows_follow_declared_columns() {
    let parsed = parse_response(&read_response("data_editor.txt"));
    let directive = parsed.next_interaction.directive().expect("table directive");
    let InputSpec::DataEditor(editor) = directive.spec() else {
        panic!("expected a data editor, got {:?}", directive.spec());
    };

    assert!(editor.allow_add_rows);
    assert_eq!(editor.columns, vec!["b".to_string(), "a".to_string()]);
    let keys: Vec<Vec<&str>> = editor
        .rows
        .iter()
        .map(|row| row.keys().map(String::as_str).collect())
        .collect();
    assert_eq!(keys, vec![vec!["b", "a", "c"], vec!["b", "a", "c"]]);

    let encoded = serde_json::to_string(&editor.rows).expect("rows encode");
    let decoded: Value = serde_json::from_str(&encoded).expect("rows decode");
    assert_eq!(
        decoded,
        json!([
            {"b": null, "a": 1, "c": "x"},
            {"b": true, "a": 2, "c": "y"},
        ])
    );
    assert_eq!(encoded, r#"[{"b":null,"a":1,"c":"x"},{"b":true,"a":2,"c":"y"}]"#);
}

#[test]
fn signature_is_stable_across_reparses_and_changes_with_content() {
    let first = directive_signature("radio_box.txt");
    assert_eq!(first, directive_signature("radio_box.txt"));

    let reordered = read_response("radio_box.txt").replace("<q>A</q><q>B</q>", "<q>B</q><q>A</q>");
    let changed = parse_response(&reordered)
        .next_interaction
        .directive()
        .map(|directive| directive.signature().to_string());
    assert_ne!(changed.as_deref(), Some(first.as_str()));

    assert_ne!(
        directive_signature("data_editor.txt"),
        directive_signature("radio_box.txt")
    );
}

#[test]
fn chunk_boundaries_do_not_change_the_display() {
    for name in ["radio_box.txt", "data_editor.txt", "date_inverted_range.txt"] {
        let response = read_response(name);
        let whole = parse_response(&response).clean_text;

        for size in 1..=16 {
            let mut parser = StreamFrameParser::new();
            for chunk in chunks_of(&response, size) {
                parser.push(&chunk);
                assert!(
                    !parser.display().contains('<'),
                    "{name} leaked markup at chunk size {size}: {:?}",
                    parser.display()
                );
            }
            assert_eq!(parser.finish().display(), whole, "{name} at chunk size {size}");
        }
    }
}
