// ── Per-kind entity cache ──
//
// Ordered storage keyed by uuid with push-based change notification via
// `watch` channels. Every check-then-write (version guard, tombstone check,
// presence check) happens under one lock, so the reconciler and call sites
// can race without double-applying or resurrecting records.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::trace;
use uuid::Uuid;

use crate::model::{Entity, EntityKind, arrange};
use crate::stream::EntityStream;

/// What a cache write did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// A new uuid was added.
    Inserted,
    /// An existing record was overwritten.
    Replaced,
    /// The incoming record was identical to the cached one.
    Unchanged,
    /// Incoming version is older than the cached one; discarded.
    Stale,
    /// The uuid is already cached; insert skipped.
    Duplicate,
    /// The uuid was deleted in this session; write discarded.
    Tombstoned,
    /// A record was removed.
    Removed,
    /// Nothing to remove.
    Absent,
}

impl ApplyOutcome {
    /// Whether the cache contents changed.
    pub fn changed(self) -> bool {
        matches!(self, Self::Inserted | Self::Replaced | Self::Removed)
    }
}

#[derive(Default)]
struct CacheState {
    /// Display order.
    entries: Vec<Arc<Entity>>,
    /// Uuids deleted since the last authoritative listing.
    tombstones: HashSet<Uuid>,
}

impl CacheState {
    fn position(&self, uuid: Uuid) -> Option<usize> {
        self.entries.iter().position(|e| e.uuid == uuid)
    }
}

/// Cache of every record of one [`EntityKind`].
///
/// Holds exactly one record per uuid. Never touches the network.
pub struct EntityCache {
    kind: EntityKind,
    state: Mutex<CacheState>,

    /// Version counter, bumped on every mutation.
    version: watch::Sender<u64>,

    /// Full snapshot in display order, rebuilt on mutation.
    snapshot: watch::Sender<Arc<Vec<Arc<Entity>>>>,
}

impl EntityCache {
    pub fn new(kind: EntityKind) -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            kind,
            state: Mutex::new(CacheState::default()),
            version,
            snapshot,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Insert or replace by uuid. Applying the same entity twice is a
    /// no-op after the first application.
    ///
    /// Unconditional: clears any tombstone for the uuid and ignores versions.
    /// Sync paths use [`apply_versioned`](Self::apply_versioned) instead.
    pub fn upsert(&self, entity: Entity) -> ApplyOutcome {
        self.mutate(|state| {
            state.tombstones.remove(&entity.uuid);
            put(state, entity)
        })
    }

    /// Insert only if the uuid is neither cached nor tombstoned.
    pub fn insert_if_absent(&self, entity: Entity) -> ApplyOutcome {
        self.mutate(|state| {
            if state.tombstones.contains(&entity.uuid) {
                ApplyOutcome::Tombstoned
            } else if state.position(entity.uuid).is_some() {
                ApplyOutcome::Duplicate
            } else {
                put(state, entity)
            }
        })
    }

    /// Apply an authoritative copy of a record.
    ///
    /// Overwrites when `entity.version >= cached.version`, discards older
    /// versions, inserts unknown uuids, and refuses tombstoned ones.
    pub fn apply_versioned(&self, entity: Entity) -> ApplyOutcome {
        self.mutate(|state| {
            if state.tombstones.contains(&entity.uuid) {
                return ApplyOutcome::Tombstoned;
            }
            if let Some(cached) = state.position(entity.uuid).and_then(|i| state.entries.get(i)) {
                if entity.version < cached.version {
                    return ApplyOutcome::Stale;
                }
            }
            put(state, entity)
        })
    }

    /// Remove by uuid if present. The uuid is tombstoned either way, so a
    /// late create or update cannot bring it back.
    pub fn remove(&self, uuid: Uuid) -> ApplyOutcome {
        self.mutate(|state| {
            state.tombstones.insert(uuid);
            match state.position(uuid) {
                Some(i) => {
                    state.entries.remove(i);
                    ApplyOutcome::Removed
                }
                None => ApplyOutcome::Absent,
            }
        })
    }

    /// Replace the whole cache with an authoritative listing.
    ///
    /// Upserts then prunes inside one critical section, so subscribers
    /// never see an empty intermediate state. Tombstones are cleared
    /// because the listing is the server's truth.
    pub fn replace_all(&self, entities: Vec<Entity>) {
        self.mutate(|state| {
            let incoming: Vec<Arc<Entity>> = entities.into_iter().map(Arc::new).collect();
            let unchanged = incoming.len() == state.entries.len()
                && incoming
                    .iter()
                    .zip(&state.entries)
                    .all(|(a, b)| a == b);

            state.tombstones.clear();
            if unchanged {
                return ApplyOutcome::Unchanged;
            }
            state.entries = incoming;
            ApplyOutcome::Replaced
        });
    }

    /// Remove everything, tombstones included.
    pub fn clear(&self) {
        self.mutate(|state| {
            state.tombstones.clear();
            if state.entries.is_empty() {
                ApplyOutcome::Absent
            } else {
                state.entries.clear();
                ApplyOutcome::Removed
            }
        });
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn get(&self, uuid: Uuid) -> Option<Arc<Entity>> {
        let state = self.lock();
        state.position(uuid).and_then(|i| state.entries.get(i)).cloned()
    }

    pub fn contains(&self, uuid: Uuid) -> bool {
        self.lock().position(uuid).is_some()
    }

    pub fn is_tombstoned(&self, uuid: Uuid) -> bool {
        self.lock().tombstones.contains(&uuid)
    }

    /// Current records in display order (cheap `Arc` clone).
    pub fn list(&self) -> Arc<Vec<Arc<Entity>>> {
        self.snapshot.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Mutation counter; bumps on every change.
    pub fn revision(&self) -> u64 {
        *self.version.borrow()
    }

    /// Subscribe to snapshot changes.
    pub fn subscribe(&self) -> EntityStream {
        EntityStream::new(self.snapshot.subscribe())
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` under the lock; if it changed anything, re-arrange and
    /// publish a new snapshot before releasing the lock.
    fn mutate(&self, f: impl FnOnce(&mut CacheState) -> ApplyOutcome) -> ApplyOutcome {
        let mut state = self.lock();
        let outcome = f(&mut state);

        if outcome.changed() {
            let entries = std::mem::take(&mut state.entries);
            state.entries = arrange(self.kind.ordering(), entries);

            let values = state.entries.clone();
            // `send_modify` updates unconditionally, even with zero receivers.
            self.snapshot.send_modify(|snap| *snap = Arc::new(values));
            self.version.send_modify(|v| *v += 1);
            trace!(kind = %self.kind, ?outcome, len = state.entries.len(), "cache updated");
        }

        outcome
    }
}

/// Insert or overwrite in place.
fn put(state: &mut CacheState, entity: Entity) -> ApplyOutcome {
    match state.position(entity.uuid) {
        Some(i) => match state.entries.get_mut(i) {
            Some(slot) if **slot == entity => ApplyOutcome::Unchanged,
            Some(slot) => {
                *slot = Arc::new(entity);
                ApplyOutcome::Replaced
            }
            None => ApplyOutcome::Absent,
        },
        None => {
            state.entries.push(Arc::new(entity));
            ApplyOutcome::Inserted
        }
    }
}
