//! Per-recipient accumulation of deferred messages and periodic batched
//! delivery.
//!
//! `add` is called from many dispatch workers at once; the pending map is
//! guarded by a mutex that is only ever held for a push or for the swap at
//! the start of a flush. All rendering and sending happens after the lock
//! is released, so adds arriving mid-flush land in the fresh map and are
//! delivered by the next flush.

use std::collections::HashMap;
use std::sync::Mutex;

use time::OffsetDateTime;
use time::macros::format_description;
use tracing::{error, info, warn};

use herald_core::{DigestEntry, Severity, SubscriberId};

use crate::adapters::Transport;

type PendingMap = HashMap<SubscriberId, Vec<DigestEntry>>;

/// Concurrent accumulator of digest entries, flushed on a timer and on
/// shutdown.
pub struct DigestBuffer {
    pending: Mutex<PendingMap>,
    max_message_len: usize,
}

impl DigestBuffer {
    pub fn new(max_message_len: usize) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            max_message_len,
        }
    }

    /// Append a timestamped entry to the recipient's pending list.
    pub fn add(&self, recipient: &SubscriberId, message: &str, topic: &str, level: Severity) {
        let entry = DigestEntry {
            message: message.to_string(),
            topic: topic.to_string(),
            level,
            buffered_at: OffsetDateTime::now_utc(),
        };
        let mut pending = self.pending.lock().expect("digest buffer lock poisoned");
        pending.entry(recipient.clone()).or_default().push(entry);
    }

    /// Number of recipients with at least one buffered entry.
    pub fn pending_recipients(&self) -> usize {
        self.pending.lock().expect("digest buffer lock poisoned").len()
    }

    /// Detach everything buffered so far and deliver it.
    ///
    /// The swap is the only work done under the lock. Returns the number of
    /// chunks handed to the transport; an empty buffer makes zero transport
    /// calls.
    pub async fn flush(&self, transport: &dyn Transport) -> u32 {
        let drained = {
            let mut pending = self.pending.lock().expect("digest buffer lock poisoned");
            std::mem::take(&mut *pending)
        };

        if drained.is_empty() {
            return 0;
        }

        let mut sent = 0;
        for (recipient, entries) in drained {
            let text = render_digest(&entries);
            for chunk in split_text(&text, self.max_message_len) {
                match transport.send(&recipient, &chunk).await {
                    Ok(()) => sent += 1,
                    Err(e) => {
                        warn!(
                            recipient = %recipient,
                            error = %e,
                            "Digest chunk send failed"
                        );
                    }
                }
            }
        }

        info!(chunks = sent, "Digest flush completed");
        sent
    }
}

/// Render one digest message: a header with the total count, then entries
/// grouped by topic in the order each topic first appeared, each entry in
/// the order it was added.
pub fn render_digest(entries: &[DigestEntry]) -> String {
    let time_format = format_description!("[hour]:[minute]");

    let mut topic_order: Vec<&str> = Vec::new();
    let mut by_topic: HashMap<&str, Vec<&DigestEntry>> = HashMap::new();
    for entry in entries {
        let group = by_topic.entry(entry.topic.as_str()).or_default();
        if group.is_empty() {
            topic_order.push(&entry.topic);
        }
        group.push(entry);
    }

    let mut text = format!("Digest: {} notifications\n", entries.len());
    for topic in topic_order {
        let group = &by_topic[topic];
        text.push_str(&format!("\n{} ({}):\n", topic, group.len()));
        for entry in group {
            let stamp = entry.buffered_at.format(&time_format).unwrap_or_else(|e| {
                error!(error = %e, "Failed to format digest timestamp");
                "??:??".to_string()
            });
            text.push_str(&format!(
                "{}  {}  {}\n",
                stamp,
                entry.level.label(),
                sanitize(&entry.message)
            ));
        }
    }
    text
}

/// Replace control characters (including newlines) with spaces so one event
/// always renders as one digest line.
fn sanitize(message: &str) -> String {
    message
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

/// Split `text` into chunks of at most `limit` bytes.
///
/// Prefers cutting just after the last newline at or before the limit; if
/// no newline fits, cuts at the limit (backed off to a char boundary).
/// Concatenating the chunks reproduces the input exactly.
pub fn split_text(text: &str, limit: usize) -> Vec<String> {
    assert!(limit > 0, "chunk limit must be positive");

    if text.len() <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut rest = text;
    while rest.len() > limit {
        let mut cut = limit;
        while cut > 0 && !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        if cut == 0 {
            // Limit smaller than the first character; emit it whole rather
            // than splitting a code point.
            cut = rest
                .chars()
                .next()
                .map(char::len_utf8)
                .unwrap_or(rest.len());
        } else if let Some(newline) = rest[..cut].rfind('\n') {
            cut = newline + 1;
        }
        let (head, tail) = rest.split_at(cut);
        chunks.push(head.to_string());
        rest = tail;
    }
    chunks.push(rest.to_string());
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(message: &str, topic: &str, level: Severity) -> DigestEntry {
        DigestEntry {
            message: message.to_string(),
            topic: topic.to_string(),
            level,
            buffered_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_render_groups_by_topic_in_insertion_order() {
        let entries = vec![
            entry("m1", "payment", Severity::Warn),
            entry("m2", "invoice", Severity::Info),
            entry("m3", "payment", Severity::Error),
        ];
        let text = render_digest(&entries);

        assert!(text.starts_with("Digest: 3 notifications\n"));
        assert!(text.contains("payment (2):"));
        assert!(text.contains("invoice (1):"));
        let m1 = text.find("m1").unwrap();
        let m3 = text.find("m3").unwrap();
        assert!(m1 < m3, "entries within a topic keep insertion order");
        assert!(text.contains("00:00  WARN  m1"));
        assert!(text.contains("00:00  ERROR  m3"));
    }

    #[test]
    fn test_render_sanitizes_control_characters() {
        let entries = vec![entry("line1\nline2\ttab", "ops", Severity::Info)];
        let text = render_digest(&entries);
        assert!(text.contains("line1 line2 tab"));
    }

    #[test]
    fn test_split_short_text_is_single_chunk() {
        assert_eq!(split_text("hello", 4096), vec!["hello".to_string()]);
    }

    #[test]
    fn test_split_prefers_newline() {
        // 5000 chars with a newline before position 4096 splits into 2 chunks.
        let mut text = "a".repeat(4000);
        text.push('\n');
        text.push_str(&"b".repeat(999));
        assert_eq!(text.len(), 5000);

        let chunks = split_text(&text, 4096);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 4001);
        assert!(chunks[0].ends_with('\n'));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_split_hard_cut_without_newline() {
        let text = "x".repeat(10_000);
        let chunks = split_text(&text, 4096);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 4096);
        assert_eq!(chunks[1].len(), 4096);
        assert_eq!(chunks[2].len(), 10_000 - 2 * 4096);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_split_exact_limit_is_single_chunk() {
        let text = "y".repeat(4096);
        assert_eq!(split_text(&text, 4096).len(), 1);
    }

    #[test]
    fn test_split_respects_char_boundaries() {
        let text = "é".repeat(100); // 2 bytes each
        let chunks = split_text(&text, 7);
        assert_eq!(chunks.concat(), text);
        for chunk in &chunks {
            assert!(chunk.len() <= 7);
        }
    }

    #[test]
    fn test_split_newline_far_back_is_still_used() {
        let mut text = "header\n".to_string();
        text.push_str(&"z".repeat(200));
        let chunks = split_text(&text, 100);
        assert_eq!(chunks[0], "header\n");
        assert_eq!(chunks.concat(), text);
    }
}
