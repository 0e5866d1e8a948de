// ── Per-kind push suppression ──
//
// While a batch write for a kind is in flight, `updated` events for that
// kind describe intermediate states the batch is about to overwrite.
// Guards nest via a counter and always lower on drop.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::trace;

use crate::model::EntityKind;

/// Registry of kinds whose `updated` events are currently ignored.
#[derive(Debug, Default)]
pub struct Suppression {
    active: DashMap<EntityKind, u32>,
}

impl Suppression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suppress `updated` events for `kind` until the guard is dropped.
    pub fn raise(self: &Arc<Self>, kind: EntityKind) -> SuppressionGuard {
        let mut depth = self.active.entry(kind).or_insert(0);
        *depth += 1;
        trace!(%kind, depth = *depth, "suppression raised");
        drop(depth);

        SuppressionGuard {
            registry: Arc::clone(self),
            kind,
        }
    }

    pub fn is_suppressed(&self, kind: EntityKind) -> bool {
        self.active.get(&kind).is_some_and(|depth| *depth > 0)
    }

    fn lower(&self, kind: EntityKind) {
        if let Entry::Occupied(mut depth) = self.active.entry(kind) {
            if *depth.get() <= 1 {
                depth.remove();
                trace!(%kind, "suppression lowered");
            } else {
                *depth.get_mut() -= 1;
            }
        }
    }
}

/// Keeps one kind suppressed while alive.
#[must_use = "suppression is lowered as soon as the guard is dropped"]
#[derive(Debug)]
pub struct SuppressionGuard {
    registry: Arc<Suppression>,
    kind: EntityKind,
}

impl SuppressionGuard {
    pub fn kind(&self) -> EntityKind {
        self.kind
    }
}

impl Drop for SuppressionGuard {
    fn drop(&mut self) {
        self.registry.lower(self.kind);
    }
}
