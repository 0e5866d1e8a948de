// ── Authoritative refresh application ──
//
// Listings fetched from the server replace a kind's cache wholesale.
// Push events and call-site writes go through the per-record paths on
// `EntityCache` instead.

use chrono::Utc;
use tracing::debug;

use super::SyncStore;
use crate::model::{Entity, EntityKind};

impl SyncStore {
    /// Replace one kind's records with a fresh server listing.
    pub(crate) fn apply_listing(&self, kind: EntityKind, entities: Vec<Entity>) {
        let count = entities.len();
        self.cache(kind).replace_all(entities);
        debug!(%kind, count, "applied listing");
    }

    /// Record that every kind was just reloaded.
    pub(crate) fn mark_full_refresh(&self) {
        self.last_full_refresh.send_replace(Some(Utc::now()));
    }
}
