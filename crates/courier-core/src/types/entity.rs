use super::user::User;
use serde::{Deserialize, Serialize};

/// A rich-text annotation: mention, URL, command, formatting span, etc.
///
/// `offset` and `length` count UTF-16 code units, not bytes or chars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEntity {
    /// "mention", "bot_command", "url", "bold", "text_link", ...
    #[serde(rename = "type")]
    pub kind: String,
    pub offset: usize,
    pub length: usize,
    /// For "text_link" only.
    pub url: Option<String>,
    /// For "text_mention" only.
    pub user: Option<User>,
    /// For "pre" only.
    pub language: Option<String>,
}

impl MessageEntity {
    /// The annotated span of `text`.
    ///
    /// Returns `None` if the span runs past the end of `text` or cuts a
    /// surrogate pair in half.
    pub fn text_in(&self, text: &str) -> Option<String> {
        utf16_slice(text, self.offset, self.length)
    }
}

/// Length of `text` in UTF-16 code units.
pub fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Slice `text` by UTF-16 code unit offset and length.
pub fn utf16_slice(text: &str, offset: usize, length: usize) -> Option<String> {
    let end = offset.checked_add(length)?;
    let units: Vec<u16> = text.encode_utf16().take(end).collect();
    if units.len() < end {
        return None;
    }
    String::from_utf16(&units[offset..end]).ok()
}
