//! Prompt-facing history rendering.
//!
//! Flows never see the raw buffer; they get a capped, label-formatted text
//! projection suitable for embedding in a prompt.

use crate::store::HistoryEntry;

/// Default message cap for [`render_history`].
pub const MAX_RENDER_MESSAGES: usize = 30;
/// Default character cap for [`render_history`].
pub const MAX_RENDER_CHARS: usize = 3000;

/// Render the most recent `max_messages` entries as labeled lines.
///
/// Inner whitespace is collapsed per entry. If the joined text exceeds
/// `max_chars` characters, the trailing `max_chars` are kept and the first
/// (likely truncated) line is dropped up to and including its newline.
#[must_use]
pub fn render_history(entries: &[HistoryEntry], max_messages: usize, max_chars: usize) -> String {
    let start = entries.len().saturating_sub(max_messages);
    let joined = entries[start..]
        .iter()
        .map(|entry| format!("{}: {}", entry.role.label(), collapse_whitespace(&entry.content)))
        .collect::<Vec<_>>()
        .join("\n");

    if joined.chars().count() <= max_chars {
        return joined;
    }

    let tail = char_tail(&joined, max_chars);
    match tail.find('\n') {
        Some(pos) => tail[pos + 1..].to_string(),
        None => tail.to_string(),
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Last `max_chars` characters of `text`, on a char boundary.
fn char_tail(text: &str, max_chars: usize) -> &str {
    let total = text.chars().count();
    if total <= max_chars {
        return text;
    }
    let skip = total - max_chars;
    match text.char_indices().nth(skip) {
        Some((byte_idx, _)) => &text[byte_idx..],
        None => "",
    }
}
