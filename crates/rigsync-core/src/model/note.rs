// ── Note history entries ──

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which history an entry belongs to.
///
/// Unknown kinds from the server are kept verbatim so a round trip never
/// rewrites an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NoteKind {
    Info,
    Completion,
    Other(String),
}

impl NoteKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Info => "info",
            Self::Completion => "completion",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for NoteKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "info" => Self::Info,
            "completion" => Self::Completion,
            _ => Self::Other(s),
        }
    }
}

impl From<NoteKind> for String {
    fn from(kind: NoteKind) -> Self {
        match kind {
            NoteKind::Other(s) => s,
            other => other.as_str().to_owned(),
        }
    }
}

impl fmt::Display for NoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One append-only note or completion comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimestampedEntry {
    pub entry_id: String,
    pub text: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub kind: NoteKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
}

impl TimestampedEntry {
    /// The timestamp as a UTC datetime, if it is in range.
    pub fn at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}
