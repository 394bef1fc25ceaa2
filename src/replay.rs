//! Rebuilds the visible conversation from persisted turns after a reload.

use agent_provider::{MediaRef, Role, Turn};
use tracing::{debug, warn};

use crate::interaction::{parse_response, NextInteraction};
use crate::section::tools_label;
use crate::tools::{RecordOutcome, ToolExchange, ToolLedger};

#[derive(Debug, Clone, PartialEq)]
pub enum ReplayItem {
    User {
        text: String,
        media: Vec<MediaRef>,
    },
    Assistant {
        /// Answer text with any control block removed.
        text: String,
        reasoning: Option<String>,
        media: Vec<MediaRef>,
    },
    /// A run of tool traffic shown as one collapsed section.
    ToolGroup {
        label: String,
        /// Reasoning of the turns that issued the calls.
        caption: Option<String>,
        exchanges: Vec<ToolExchange>,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReplayedConversation {
    pub items: Vec<ReplayItem>,
    pub next_interaction: NextInteraction,
    /// Length of the persisted turn list.
    pub turn_count: usize,
    pub prefill_merged: bool,
}

#[derive(Debug, Default)]
struct ToolRun {
    ledger: ToolLedger,
    captions: Vec<String>,
}

impl ToolRun {
    fn record(&mut self, turn: &Turn) {
        if let Some(reasoning) = turn.reasoning_text() {
            self.captions.push(reasoning.to_string());
        }
        for call in &turn.tool_calls {
            if self.ledger.record_call(call) == RecordOutcome::Duplicate {
                warn!(call_id = %call.call_id, "duplicate tool call in history ignored");
            }
        }
        for result in &turn.tool_results {
            match self.ledger.record_result(result) {
                RecordOutcome::Duplicate => {
                    warn!(call_id = %result.call_id, "duplicate tool result in history ignored");
                }
                RecordOutcome::Orphan => {
                    warn!(call_id = %result.call_id, "tool result in history without a matching call");
                }
                RecordOutcome::Recorded => {}
            }
        }
    }

    fn into_item(mut self, deferred_media: &mut Vec<MediaRef>) -> ReplayItem {
        deferred_media.extend(self.ledger.media());
        let caption = (!self.captions.is_empty()).then(|| self.captions.join("\n\n"));
        ReplayItem::ToolGroup {
            label: tools_label(self.ledger.len()),
            caption,
            exchanges: self.ledger.take(),
        }
    }
}

/// Reconstructs the grouping a live session would have shown for `turns`,
/// and the directive still waiting for an answer.
///
/// `pending_prefill` is the prefill of the latest streamed turn, if the
/// caller still has it. When it matches, the prefilled assistant turn and
/// its continuation are shown as one answer.
#[must_use]
pub fn replay_conversation(turns: &[Turn], pending_prefill: Option<&str>) -> ReplayedConversation {
    let merge = prefill_merge(turns, pending_prefill);
    let mut replayed = ReplayedConversation {
        turn_count: turns.len(),
        prefill_merged: merge.is_some(),
        ..ReplayedConversation::default()
    };

    let mut run: Option<ToolRun> = None;
    let mut deferred_media = Vec::new();
    let mut carried: Option<&Turn> = None;

    for (index, turn) in turns.iter().enumerate() {
        if turn.is_tool_traffic() {
            run.get_or_insert_with(ToolRun::default).record(turn);
            continue;
        }
        if let Some(finished) = run.take() {
            replayed.items.push(finished.into_item(&mut deferred_media));
        }

        match turn.role {
            Role::User => {
                flush_media(&mut replayed.items, &mut deferred_media);
                replayed.next_interaction = NextInteraction::Absent;
                if !turn.text.trim().is_empty() || !turn.media.is_empty() {
                    replayed.items.push(ReplayItem::User {
                        text: turn.text.clone(),
                        media: turn.media.clone(),
                    });
                }
            }
            Role::Assistant | Role::Tool => {
                if merge == Some(index) {
                    carried = Some(turn);
                    continue;
                }

                let (raw, reasoning) = match carried.take() {
                    Some(earlier) => {
                        debug!(turn = index, "prefilled answer merged with its continuation");
                        (
                            format!("{}{}", earlier.text, turn.text),
                            join_reasoning(earlier.reasoning_text(), turn.reasoning_text()),
                        )
                    }
                    None => (
                        turn.text.clone(),
                        turn.reasoning_text().map(str::to_string),
                    ),
                };

                let parsed = parse_response(&raw);
                replayed.next_interaction = parsed.next_interaction;

                let mut media = turn.media.clone();
                media.append(&mut deferred_media);
                if parsed.clean_text.trim().is_empty() && reasoning.is_none() && media.is_empty() {
                    continue;
                }
                replayed.items.push(ReplayItem::Assistant {
                    text: parsed.clean_text,
                    reasoning,
                    media,
                });
            }
        }
    }

    if let Some(finished) = run.take() {
        replayed.items.push(finished.into_item(&mut deferred_media));
    }
    flush_media(&mut replayed.items, &mut deferred_media);
    replayed
}

/// Index of the prefilled assistant turn that merges into the turn after it.
fn prefill_merge(turns: &[Turn], pending_prefill: Option<&str>) -> Option<usize> {
    let prefill = pending_prefill.map(str::trim).filter(|text| !text.is_empty())?;
    let latest = turns.iter().rposition(|turn| turn.role == Role::Assistant)?;
    let earlier = latest.checked_sub(1)?;

    let plain = |turn: &Turn| {
        turn.role == Role::Assistant && turn.tool_calls.is_empty() && turn.media.is_empty()
    };
    (plain(&turns[earlier]) && plain(&turns[latest]) && turns[earlier].text.trim() == prefill)
        .then_some(earlier)
}

fn join_reasoning(first: Option<&str>, second: Option<&str>) -> Option<String> {
    match (first, second) {
        (Some(first), Some(second)) => Some(format!("{first}\n\n{second}")),
        (Some(only), None) | (None, Some(only)) => Some(only.to_string()),
        (None, None) => None,
    }
}

fn flush_media(items: &mut Vec<ReplayItem>, deferred_media: &mut Vec<MediaRef>) {
    if deferred_media.is_empty() {
        return;
    }
    items.push(ReplayItem::Assistant {
        text: String::new(),
        reasoning: None,
        media: std::mem::take(deferred_media),
    });
}

#[cfg(test)]
mod tests {
    use agent_provider::{MediaKind, ToolCall, ToolResult};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::interaction::PresentationMode;

    const RADIO: &str = "Pick one.<next_interaction><presentation_mode>radio_box</presentation_mode><suggested_user_follow_ups><q>A</q><q>B</q></suggested_user_follow_ups></next_interaction>";

    fn image_result(call_id: &str) -> ToolResult {
        ToolResult::success(
            call_id,
            "render",
            json!({"media_content": {"type": "image", "url": "https://example.com/p.png"}}),
        )
    }

    #[test]
    fn tool_traffic_collapses_into_one_group() {
        let turns = vec![
            Turn::user("find it"),
            Turn::tool_calls(vec![
                ToolCall::new("a", "search", json!({})),
                ToolCall::new("b", "fetch", json!({})),
            ])
            .with_reasoning("need two lookups"),
            Turn::tool_result(ToolResult::success("b", "", "page")),
            Turn::tool_result(ToolResult::success("a", "search", "hits")),
            Turn::tool_calls(vec![ToolCall::new("c", "read", json!({}))])
                .with_reasoning("one more"),
            Turn::tool_result(ToolResult::success("c", "read", "body")),
            Turn::assistant("Found it."),
        ];

        let replayed = replay_conversation(&turns, None);
        assert_eq!(replayed.items.len(), 3);
        let ReplayItem::ToolGroup {
            label,
            caption,
            exchanges,
        } = &replayed.items[1]
        else {
            panic!("expected a tool group, got {:?}", replayed.items[1]);
        };
        assert_eq!(label, "Used 3 tools");
        assert_eq!(caption.as_deref(), Some("need two lookups\n\none more"));
        let names: Vec<&str> = exchanges.iter().map(ToolExchange::name).collect();
        assert_eq!(names, vec!["search", "fetch", "read"]);
        assert_eq!(exchanges[1].result_text().as_deref(), Some("page"));
        assert_eq!(replayed.next_interaction, NextInteraction::Absent);
    }

    #[test]
    fn latest_answer_yields_the_pending_directive() {
        let turns = vec![Turn::user("hi"), Turn::assistant(RADIO)];
        let replayed = replay_conversation(&turns, None);

        assert_eq!(
            replayed.items[1],
            ReplayItem::Assistant {
                text: "Pick one.".to_string(),
                reasoning: None,
                media: Vec::new(),
            }
        );
        let directive = replayed
            .next_interaction
            .directive()
            .expect("directive should replay");
        assert_eq!(directive.mode(), PresentationMode::RadioBox);
        assert_eq!(replayed.turn_count, 2);
    }

    #[test]
    fn answered_directive_resets_to_absent() {
        let turns = vec![Turn::user("hi"), Turn::assistant(RADIO), Turn::user("A")];
        let replayed = replay_conversation(&turns, None);
        assert_eq!(replayed.next_interaction, NextInteraction::Absent);
        assert_eq!(replayed.items.len(), 3);
    }

    #[test]
    fn prefill_merges_resumed_answer() {
        let turns = vec![
            Turn::user("continue"),
            Turn::assistant("Sure, ").with_reasoning("first"),
            Turn::assistant("here is the rest.").with_reasoning("second"),
        ];

        let replayed = replay_conversation(&turns, Some(" Sure, "));
        assert!(replayed.prefill_merged);
        assert_eq!(
            replayed.items,
            vec![
                ReplayItem::User {
                    text: "continue".to_string(),
                    media: Vec::new(),
                },
                ReplayItem::Assistant {
                    text: "Sure, here is the rest.".to_string(),
                    reasoning: Some("first\n\nsecond".to_string()),
                    media: Vec::new(),
                },
            ]
        );

        let unmerged = replay_conversation(&turns, Some("Other"));
        assert!(!unmerged.prefill_merged);
        assert_eq!(unmerged.items.len(), 3);
    }

    #[test]
    fn prefill_merge_requires_plain_adjacent_turns() {
        let turns = vec![
            Turn::assistant("Sure, ")
                .with_media(MediaRef::url(MediaKind::Image, "u")),
            Turn::assistant("rest"),
        ];
        assert!(!replay_conversation(&turns, Some("Sure,")).prefill_merged);
        assert!(!replay_conversation(&turns, Some("   ")).prefill_merged);
    }

    #[test]
    fn tool_media_attaches_to_the_next_answer_or_a_trailing_item() {
        let followed = vec![
            Turn::tool_calls(vec![ToolCall::new("a", "render", json!({}))]),
            Turn::tool_result(image_result("a")),
            Turn::assistant("Here it is."),
        ];
        let replayed = replay_conversation(&followed, None);
        let ReplayItem::Assistant { media, .. } = &replayed.items[1] else {
            panic!("expected an answer, got {:?}", replayed.items[1]);
        };
        assert_eq!(media.len(), 1);
        let ReplayItem::ToolGroup { exchanges, .. } = &replayed.items[0] else {
            panic!("expected a tool group");
        };
        assert_eq!(exchanges[0].result_text(), None);

        let trailing = replay_conversation(&followed[..2], None);
        assert_eq!(trailing.items.len(), 2);
        assert!(matches!(
            &trailing.items[1],
            ReplayItem::Assistant { text, media, .. } if text.is_empty() && media.len() == 1
        ));
    }

    #[test]
    fn empty_items_are_skipped_and_orphans_kept() {
        let turns = vec![
            Turn::user("   "),
            Turn::tool_result(ToolResult::success("z", "lost", "?")),
            Turn::assistant(""),
            Turn::assistant("<next_interaction><presentation_mode>free_text</presentation_mode></next_interaction>"),
        ];
        let replayed = replay_conversation(&turns, None);
        assert_eq!(replayed.items.len(), 1);
        let ReplayItem::ToolGroup { label, exchanges, .. } = &replayed.items[0] else {
            panic!("expected a tool group");
        };
        assert_eq!(label, "Used 1 tool");
        assert!(exchanges[0].is_orphan());
        assert_eq!(
            replayed.next_interaction.directive().map(|d| d.mode()),
            Some(PresentationMode::FreeText)
        );
    }
}
