// ── Per-production store ──
//
// Groups one `EntityCache` per kind and tracks when the store last heard
// from the server.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use uuid::Uuid;

use super::cache::EntityCache;
use crate::model::{Entity, EntityKind};
use crate::stream::EntityStream;

/// Every cached record of one production.
///
/// Thread-safe; each kind's cache serializes its own writes, and kinds are
/// independent of each other.
pub struct SyncStore {
    pub(crate) cameras: EntityCache,
    pub(crate) monitors: EntityCache,
    pub(crate) media_servers: EntityCache,
    pub(crate) checklist_items: EntityCache,
    pub(crate) sends: EntityCache,
    pub(crate) last_full_refresh: watch::Sender<Option<DateTime<Utc>>>,
    pub(crate) last_push_event: watch::Sender<Option<DateTime<Utc>>>,
}

impl SyncStore {
    pub fn new() -> Self {
        let (last_full_refresh, _) = watch::channel(None);
        let (last_push_event, _) = watch::channel(None);

        Self {
            cameras: EntityCache::new(EntityKind::Camera),
            monitors: EntityCache::new(EntityKind::Monitor),
            media_servers: EntityCache::new(EntityKind::MediaServer),
            checklist_items: EntityCache::new(EntityKind::ChecklistItem),
            sends: EntityCache::new(EntityKind::Send),
            last_full_refresh,
            last_push_event,
        }
    }

    /// The cache holding records of `kind`.
    pub fn cache(&self, kind: EntityKind) -> &EntityCache {
        match kind {
            EntityKind::Camera => &self.cameras,
            EntityKind::Monitor => &self.monitors,
            EntityKind::MediaServer => &self.media_servers,
            EntityKind::ChecklistItem => &self.checklist_items,
            EntityKind::Send => &self.sends,
        }
    }

    /// All caches, one per kind.
    pub fn caches(&self) -> [&EntityCache; 5] {
        [
            &self.cameras,
            &self.monitors,
            &self.media_servers,
            &self.checklist_items,
            &self.sends,
        ]
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    pub fn snapshot(&self, kind: EntityKind) -> Arc<Vec<Arc<Entity>>> {
        self.cache(kind).list()
    }

    pub fn get(&self, kind: EntityKind, uuid: Uuid) -> Option<Arc<Entity>> {
        self.cache(kind).get(uuid)
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        self.cache(kind).len()
    }

    pub fn subscribe(&self, kind: EntityKind) -> EntityStream {
        self.cache(kind).subscribe()
    }

    // ── Metadata ─────────────────────────────────────────────────────

    pub fn last_full_refresh(&self) -> Option<DateTime<Utc>> {
        *self.last_full_refresh.borrow()
    }

    pub fn last_push_event(&self) -> Option<DateTime<Utc>> {
        *self.last_push_event.borrow()
    }

    /// How long ago the last full refresh occurred, or `None` if never refreshed.
    pub fn data_age(&self) -> Option<chrono::Duration> {
        self.last_full_refresh().map(|t| Utc::now() - t)
    }

    pub(crate) fn mark_push_event(&self) {
        self.last_push_event.send_replace(Some(Utc::now()));
    }
}

impl Default for SyncStore {
    fn default() -> Self {
        Self::new()
    }
}
