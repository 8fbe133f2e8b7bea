//! Reply chunking and paced delivery.
//!
//! Generated replies go out as several short messages, the way a person
//! types, split at sentence ends, paragraph breaks, and emoji runs. Each
//! chunk sleeps a randomized delay before it is handed to the transport.

use std::time::Duration;

use {
    charla_common::{Outbound, OutboundMessage},
    rand::Rng,
    regex::Regex,
    tracing::warn,
};

/// Randomized per-chunk delay range, in milliseconds.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            min_ms: 150,
            max_ms: 250,
        }
    }
}

impl Pacing {
    pub fn pick(&self) -> Duration {
        let (lo, hi) = if self.min_ms <= self.max_ms {
            (self.min_ms, self.max_ms)
        } else {
            (self.max_ms, self.min_ms)
        };
        Duration::from_millis(rand::rng().random_range(lo..=hi))
    }
}

/// Tokens that keep their trailing period inside a chunk.
const ABBREVIATIONS: &[&str] = &["Av", "Sr", "Sra", "Dr", "Dra", "Ing"];

/// Splits replies into message-sized chunks.
#[derive(Debug, Clone)]
pub struct Chunker {
    emoji_boundary: Regex,
}

impl Chunker {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            // A run of two or more pictographs, or a line holding exactly one.
            emoji_boundary: Regex::new(
                r"(?m)[\p{Emoji_Presentation}\p{Extended_Pictographic}]{2,}|^[ \t]*[\p{Emoji_Presentation}\p{Extended_Pictographic}][ \t]*$",
            )?,
        })
    }

    /// Chunks are trimmed and non-empty; concatenating them reproduces the
    /// reply text up to the whitespace consumed at the boundaries.
    pub fn split(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        for segment in split_sentences(text) {
            self.split_emoji(&segment, &mut chunks);
        }
        chunks
    }

    fn split_emoji(&self, segment: &str, out: &mut Vec<String>) {
        let mut cursor = 0;
        for hit in self.emoji_boundary.find_iter(segment) {
            push_trimmed(out, &segment[cursor..hit.start()]);
            push_trimmed(out, hit.as_str());
            cursor = hit.end();
        }
        push_trimmed(out, &segment[cursor..]);
    }
}

fn push_trimmed(out: &mut Vec<String>, piece: &str) {
    let trimmed = piece.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

/// Sentence and paragraph pass.
///
/// A `.` followed by whitespace closes a chunk, keeping the period, unless
/// the word before it is an abbreviation ("Av. Aramburú" stays whole) or the
/// line the next chunk would start on contains a `:` (labeled form lines
/// stay whole). Two or more newlines always close a chunk.
fn split_sentences(text: &str) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut segments = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                let mut j = i;
                while j < bytes.len() && bytes[j] == b'\n' {
                    j += 1;
                }
                if j - i >= 2 {
                    segments.push(text[start..i].to_string());
                    start = j;
                }
                i = j;
            },
            b'.' => {
                let mut j = i + 1;
                while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                    j += 1;
                }
                if j > i + 1
                    && !ends_with_abbreviation(&text[..i])
                    && !line_has_colon(bytes, j)
                {
                    segments.push(text[start..=i].to_string());
                    start = j;
                    i = j;
                } else {
                    i += 1;
                }
            },
            _ => i += 1,
        }
    }
    if start < bytes.len() {
        segments.push(text[start..].to_string());
    }
    segments
}

fn ends_with_abbreviation(before: &str) -> bool {
    let word_start = before
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_alphabetic())
        .last()
        .map(|(idx, _)| idx);
    match word_start {
        Some(idx) => ABBREVIATIONS.contains(&&before[idx..]),
        None => false,
    }
}

fn line_has_colon(bytes: &[u8], from: usize) -> bool {
    bytes[from..]
        .iter()
        .take_while(|&&b| b != b'\n')
        .any(|&b| b == b':')
}

/// Split a reply and attach a randomized delay to every chunk.
pub fn plan_chunks(chunker: &Chunker, text: &str, pacing: Pacing) -> Vec<OutboundMessage> {
    chunker
        .split(text)
        .into_iter()
        .map(|body| OutboundMessage {
            body,
            delay: pacing.pick(),
        })
        .collect()
}

/// Deliver chunks in order, sleeping each chunk's delay before sending.
///
/// Delivery is at-most-once: a transport error drops the remainder of the
/// reply rather than retrying. Returns whether every chunk went out.
pub async fn dispatch_reply(outbound: &dyn Outbound, to: &str, messages: &[OutboundMessage]) -> bool {
    for message in messages {
        tokio::time::sleep(message.delay).await;
        if let Err(error) = outbound.send_text(to, &message.body).await {
            warn!(to, error = %error, "send failed, dropping remaining chunks");
            return false;
        }
    }
    true
}
