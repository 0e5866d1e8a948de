// ── Note history merging ──
//
// Note histories are append-only from the client. Every merge starts from
// a freshly fetched record, never from the cache or a UI copy, so an entry
// another session deleted cannot come back from a stale array.

use chrono::Utc;
use uuid::Uuid;

use crate::model::{NoteKind, TimestampedEntry};

/// A new entry stamped with a fresh id and the current time.
pub fn new_entry(text: impl Into<String>, kind: NoteKind, author: Option<String>) -> TimestampedEntry {
    TimestampedEntry {
        entry_id: Uuid::new_v4().to_string(),
        text: text.into(),
        timestamp: Utc::now().timestamp_millis(),
        kind,
        author_name: author,
    }
}

/// `authoritative` with `entry` added. Existing entries are kept verbatim.
pub fn appended(authoritative: &[TimestampedEntry], entry: TimestampedEntry) -> Vec<TimestampedEntry> {
    let mut merged = Vec::with_capacity(authoritative.len() + 1);
    merged.extend_from_slice(authoritative);
    merged.push(entry);
    merged
}

/// `authoritative` without the entry `entry_id`, or `None` if it is not
/// there.
pub fn without(authoritative: &[TimestampedEntry], entry_id: &str) -> Option<Vec<TimestampedEntry>> {
    if !authoritative.iter().any(|e| e.entry_id == entry_id) {
        return None;
    }
    Some(
        authoritative
            .iter()
            .filter(|e| e.entry_id != entry_id)
            .cloned()
            .collect(),
    )
}

/// Entries oldest first, ties broken by entry id, optionally restricted to
/// one kind.
pub fn display_order<'a>(
    history: &'a [TimestampedEntry],
    filter: Option<&NoteKind>,
) -> Vec<&'a TimestampedEntry> {
    let mut entries: Vec<_> = history
        .iter()
        .filter(|e| filter.is_none_or(|kind| e.kind == *kind))
        .collect();
    entries.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.entry_id.cmp(&b.entry_id))
    });
    entries
}
