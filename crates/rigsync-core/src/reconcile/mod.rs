// ── Push event reconciliation ──
//
// Applies change notifications from other sessions (and echoes of our own
// writes) to the cache. One reconciler serves every kind. Correctness rests
// on uuid identity, the version guard, and tombstones; nothing here depends
// on the order in which a write's response and its echo arrive.

mod suppression;

use std::sync::Arc;

use tracing::{debug, trace};
use uuid::Uuid;

use crate::model::{Entity, EntityKind};
use crate::store::{ApplyOutcome, SyncStore};

pub use suppression::{Suppression, SuppressionGuard};

// ── Events ───────────────────────────────────────────────────────────

/// Who made a change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actor {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// What changed.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Created(Entity),
    Updated(Entity),
    Deleted(Uuid),
}

impl Change {
    pub fn uuid(&self) -> Uuid {
        match self {
            Self::Created(entity) | Self::Updated(entity) => entity.uuid,
            Self::Deleted(uuid) => *uuid,
        }
    }

    fn action(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::Updated(_) => "updated",
            Self::Deleted(_) => "deleted",
        }
    }
}

/// A typed push notification.
#[derive(Debug, Clone, PartialEq)]
pub struct PushEvent {
    pub kind: EntityKind,
    pub change: Change,
    pub actor: Actor,
}

/// What applying a push event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The cache's decision.
    Cache(ApplyOutcome),
    /// An `updated` event arrived while its kind was suppressed.
    Suppressed,
}

impl ReconcileOutcome {
    pub fn changed(self) -> bool {
        matches!(self, Self::Cache(outcome) if outcome.changed())
    }
}

// ── Reconciler ───────────────────────────────────────────────────────

/// Applies push events to a [`SyncStore`].
pub struct Reconciler {
    store: Arc<SyncStore>,
    suppression: Arc<Suppression>,
    /// This session's user id; events from it are self-echoes.
    self_id: Option<String>,
}

impl Reconciler {
    pub fn new(
        store: Arc<SyncStore>,
        suppression: Arc<Suppression>,
        self_id: Option<String>,
    ) -> Self {
        Self {
            store,
            suppression,
            self_id,
        }
    }

    /// Apply one event.
    ///
    /// - `created`: inserted unless the uuid is already cached or tombstoned.
    /// - `updated`: ignored while suppressed; otherwise applied through the
    ///   version guard (equal or newer wins, older is discarded).
    /// - `deleted`: removed unconditionally and tombstoned.
    pub fn apply(&self, event: PushEvent) -> ReconcileOutcome {
        let PushEvent {
            kind,
            change,
            actor,
        } = event;
        let uuid = change.uuid();
        let action = change.action();
        let cache = self.store.cache(kind);

        let outcome = match change {
            Change::Created(entity) => ReconcileOutcome::Cache(cache.insert_if_absent(entity)),
            Change::Updated(_) if self.suppression.is_suppressed(kind) => {
                ReconcileOutcome::Suppressed
            }
            Change::Updated(entity) => ReconcileOutcome::Cache(cache.apply_versioned(entity)),
            Change::Deleted(uuid) => ReconcileOutcome::Cache(cache.remove(uuid)),
        };
        self.store.mark_push_event();

        let echo = self.is_self_echo(&actor);
        if outcome.changed() {
            debug!(
                %kind,
                %uuid,
                action,
                actor = actor.name.as_deref().unwrap_or("unknown"),
                echo,
                ?outcome,
                "push event applied"
            );
        } else {
            trace!(%kind, %uuid, action, echo, ?outcome, "push event ignored");
        }
        outcome
    }

    fn is_self_echo(&self, actor: &Actor) -> bool {
        self.self_id.is_some() && actor.id == self.self_id
    }
}
