//! Separates display text from the trailing control block in assistant text.
//!
//! Only the rightmost opening marker is honored. Anything after it is never
//! displayed, and a marker that is still arriving (a trailing partial prefix)
//! is held back so it cannot flash on screen between chunks.

/// Opening marker of the control block. The tag may carry attributes.
pub const OPEN_MARKER: &str = "<next_interaction";
/// Closing marker of the control block.
pub const CLOSE_MARKER: &str = "</next_interaction>";

/// Result of splitting complete (or truncated) assistant text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame<'a> {
    /// No opening marker: the whole text is display text.
    Plain(&'a str),
    /// Opening marker without a closing marker.
    Incomplete { display: &'a str },
    /// Opening and closing markers found; `block` spans both markers.
    Complete { display: &'a str, block: &'a str },
}

impl<'a> Frame<'a> {
    /// Display text for this frame.
    #[must_use]
    pub fn display(&self) -> &'a str {
        match self {
            Self::Plain(text) => text,
            Self::Incomplete { display } | Self::Complete { display, .. } => display,
        }
    }
}

/// Splits `raw` into display text and control block.
///
/// Display text is end-trimmed once a marker is present; plain text is
/// returned untouched.
#[must_use]
pub fn split_frame(raw: &str) -> Frame<'_> {
    let Some(start) = raw.rfind(OPEN_MARKER) else {
        return Frame::Plain(raw);
    };

    let display = raw[..start].trim_end();
    match raw[start..].find(CLOSE_MARKER) {
        Some(offset) => {
            let end = start + offset + CLOSE_MARKER.len();
            Frame::Complete {
                display,
                block: &raw[start..end],
            }
        }
        None => Frame::Incomplete { display },
    }
}

/// Returns the part of in-flight text that is safe to show right now.
#[must_use]
pub fn streaming_display(raw: &str) -> &str {
    if let Some(start) = raw.rfind(OPEN_MARKER) {
        return &raw[..start];
    }

    let pending = pending_marker_prefix_len(raw, OPEN_MARKER);
    &raw[..raw.len() - pending]
}

/// Length of the longest proper prefix of `marker` that `text` ends with.
fn pending_marker_prefix_len(text: &str, marker: &str) -> usize {
    (1..marker.len())
        .rev()
        .find(|&len| text.ends_with(&marker[..len]))
        .unwrap_or(0)
}

/// Incremental display tracker over an append-only token stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamFrameParser {
    raw: String,
    display_len: usize,
}

impl StreamFrameParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `chunk` and returns the new display text when it changed.
    pub fn push(&mut self, chunk: &str) -> Option<&str> {
        if chunk.is_empty() {
            return None;
        }

        self.raw.push_str(chunk);
        // Display text is always a prefix of `raw`, so equal length means equal text.
        let display_len = streaming_display(&self.raw).len();
        if display_len == self.display_len {
            return None;
        }

        self.display_len = display_len;
        Some(self.display())
    }

    #[must_use]
    pub fn display(&self) -> &str {
        &self.raw[..self.display_len]
    }

    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// True when some received text is being withheld from display.
    #[must_use]
    pub fn has_hidden_tail(&self) -> bool {
        self.raw.len() > self.display_len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Splits everything received so far.
    #[must_use]
    pub fn finish(&self) -> Frame<'_> {
        split_frame(&self.raw)
    }

    pub fn reset(&mut self) {
        self.raw.clear();
        self.display_len = 0;
    }
}
