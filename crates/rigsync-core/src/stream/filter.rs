// ── Filter predicates for entity snapshots ──
//
// Used by front ends to narrow a snapshot without re-querying the server.

use crate::model::Entity;

/// Filter predicate for cached entities.
pub enum EntityFilter {
    All,
    /// Label code group, e.g. `"FOH"` matches `"FOH 1"` and `"FOH 2"`.
    ByCode(String),
    /// Case-insensitive substring of the label.
    LabelContains(String),
    Custom(Box<dyn Fn(&Entity) -> bool + Send + Sync>),
}

impl EntityFilter {
    pub fn matches(&self, entity: &Entity) -> bool {
        match self {
            Self::All => true,
            Self::ByCode(code) => entity.parsed_label().code.eq_ignore_ascii_case(code),
            Self::LabelContains(needle) => entity
                .label
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            Self::Custom(f) => f(entity),
        }
    }
}
