use std::collections::HashMap;

use agent_provider::{MediaRef, ToolCall, ToolResult};

use crate::media::media_from_tool_result;

/// One tool call paired with its result by call id.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolExchange {
    pub call_id: String,
    pub call: Option<ToolCall>,
    pub result: Option<ToolResult>,
    /// Media carried by the result; such results are not shown as raw text.
    pub media: Option<MediaRef>,
}

impl ToolExchange {
    /// Invocation name, falling back to the name on the result.
    #[must_use]
    pub fn name(&self) -> &str {
        self.call
            .as_ref()
            .map(|call| call.name.as_str())
            .filter(|name| !name.is_empty())
            .or_else(|| self.result.as_ref().map(|result| result.name.as_str()))
            .unwrap_or_default()
    }

    /// True for a result that arrived without a matching call.
    #[must_use]
    pub fn is_orphan(&self) -> bool {
        self.call.is_none()
    }

    /// Raw result text to display, if the result is not media.
    #[must_use]
    pub fn result_text(&self) -> Option<String> {
        match (&self.result, &self.media) {
            (Some(result), None) => Some(result.content_text()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded,
    /// Result with no earlier call; kept as its own exchange.
    Orphan,
    /// Second call or second result for the same id; ignored.
    Duplicate,
}

/// Exchanges in first-seen order, indexed by call id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolLedger {
    exchanges: Vec<ToolExchange>,
    by_call_id: HashMap<String, usize>,
}

impl ToolLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_call(&mut self, call: &ToolCall) -> RecordOutcome {
        match self.by_call_id.get(&call.call_id) {
            Some(&index) if self.exchanges[index].call.is_some() => RecordOutcome::Duplicate,
            Some(&index) => {
                self.exchanges[index].call = Some(call.clone());
                RecordOutcome::Recorded
            }
            None => {
                self.push(ToolExchange {
                    call_id: call.call_id.clone(),
                    call: Some(call.clone()),
                    result: None,
                    media: None,
                });
                RecordOutcome::Recorded
            }
        }
    }

    pub fn record_result(&mut self, result: &ToolResult) -> RecordOutcome {
        let media = media_from_tool_result(&result.content);
        match self.by_call_id.get(&result.call_id) {
            Some(&index) => {
                let exchange = &mut self.exchanges[index];
                if exchange.result.is_some() {
                    return RecordOutcome::Duplicate;
                }
                exchange.result = Some(result.clone());
                exchange.media = media;
                RecordOutcome::Recorded
            }
            None => {
                self.push(ToolExchange {
                    call_id: result.call_id.clone(),
                    call: None,
                    result: Some(result.clone()),
                    media,
                });
                RecordOutcome::Orphan
            }
        }
    }

    fn push(&mut self, exchange: ToolExchange) {
        self.by_call_id
            .insert(exchange.call_id.clone(), self.exchanges.len());
        self.exchanges.push(exchange);
    }

    #[must_use]
    pub fn get(&self, call_id: &str) -> Option<&ToolExchange> {
        self.by_call_id
            .get(call_id)
            .map(|&index| &self.exchanges[index])
    }

    #[must_use]
    pub fn exchanges(&self) -> &[ToolExchange] {
        &self.exchanges
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    /// Media from every result, in exchange order.
    #[must_use]
    pub fn media(&self) -> Vec<MediaRef> {
        self.exchanges
            .iter()
            .filter_map(|exchange| exchange.media.clone())
            .collect()
    }

    pub fn take(&mut self) -> Vec<ToolExchange> {
        self.by_call_id.clear();
        std::mem::take(&mut self.exchanges)
    }
}
