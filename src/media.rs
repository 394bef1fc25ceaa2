use std::borrow::Cow;

use agent_provider::{MediaKind, MediaRef};
use serde_json::Value;

const MEDIA_KEYS: [&str; 2] = ["media_content", "MediaContent"];

/// Extracts a displayable media reference from a tool result payload.
///
/// The payload may be a JSON object or a string holding one. It must carry
/// `media_content` (or `MediaContent`) with a known `type` and a non-empty
/// `url`; anything else is not media and is shown as a raw result.
#[must_use]
pub fn media_from_tool_result(content: &Value) -> Option<MediaRef> {
    let payload = match content {
        Value::Object(_) => Cow::Borrowed(content),
        Value::String(text) => Cow::Owned(serde_json::from_str::<Value>(text).ok()?),
        _ => return None,
    };

    let media = MEDIA_KEYS
        .iter()
        .filter_map(|key| payload.get(key))
        .find(|value| value.is_object())?;
    let kind = MediaKind::parse(media.get("type")?.as_str()?)?;
    let url = media
        .get("url")?
        .as_str()
        .filter(|url| !url.trim().is_empty())?;
    Some(MediaRef::url(kind, url))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn reads_object_payloads() {
        let content = json!({"media_content": {"type": "image", "url": "https://x/y.png"}, "ok": true});
        assert_eq!(
            media_from_tool_result(&content),
            Some(MediaRef::url(MediaKind::Image, "https://x/y.png"))
        );
    }

    #[test]
    fn reads_string_payloads_and_alternate_key() {
        let content = json!(r#"{"MediaContent": {"type": "audio", "url": "file.mp3"}}"#);
        assert_eq!(
            media_from_tool_result(&content),
            Some(MediaRef::url(MediaKind::Audio, "file.mp3"))
        );

        let null_first = json!({"media_content": null, "MediaContent": {"type": "video", "url": "v.mp4"}});
        assert_eq!(
            media_from_tool_result(&null_first),
            Some(MediaRef::url(MediaKind::Video, "v.mp4"))
        );
    }

    #[test]
    fn ignores_unknown_or_incomplete_media() {
        for content in [
            json!("plain text result"),
            json!(42),
            json!({"media_content": {"type": "pdf", "url": "a.pdf"}}),
            json!({"media_content": {"type": "image"}}),
            json!({"media_content": {"type": "image", "url": "  "}}),
            json!({"result": "no media"}),
        ] {
            assert_eq!(media_from_tool_result(&content), None, "{content}");
        }
    }
}
