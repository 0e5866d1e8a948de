// ── Batch reorder ──
//
// Drag-to-reposition against a versioned backend: plan the renumbering,
// write every changed record concurrently under push suppression, then
// refetch the whole kind. The refetch is the only source of truth for the
// final order, so partially failed batches still converge.

mod drag;
mod plan;

use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::gateway::{MutationGateway, Transport, UpdateOutcome};
use crate::model::EntityKind;
use crate::reconcile::Suppression;
use crate::store::SyncStore;

pub use drag::{DragController, DragState};
pub use plan::{PlannedUpdate, ReorderPlan, plan_move};

/// What a reorder batch did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReorderReport {
    pub kind: EntityKind,
    pub scheduled: usize,
    pub applied: usize,
    pub conflicts: usize,
    pub failed: usize,
    /// The refetched display order matches the requested move.
    pub converged: bool,
}

impl ReorderReport {
    fn empty(kind: EntityKind) -> Self {
        Self {
            kind,
            scheduled: 0,
            applied: 0,
            conflicts: 0,
            failed: 0,
            converged: true,
        }
    }

    /// Every scheduled write was accepted.
    pub fn is_complete(&self) -> bool {
        self.applied == self.scheduled
    }

    /// Every write was accepted and the list now shows the requested order.
    pub fn is_settled(&self) -> bool {
        self.is_complete() && self.converged
    }
}

/// Run a plan: suppressed concurrent writes, then a full refetch.
///
/// Individual write failures and conflicts are counted, not returned; only
/// a failed refetch is an error. Suppression is lowered on every path.
///
/// Renumbering only changes ordinals inside a code group, so a move that
/// interleaves groups can land somewhere else once the list is arranged.
/// `converged` compares the refetched order with the requested one.
pub(crate) async fn execute<T: Transport>(
    gateway: &MutationGateway<T>,
    store: &SyncStore,
    suppression: &Arc<Suppression>,
    plan: &ReorderPlan,
) -> Result<ReorderReport, CoreError> {
    let kind = plan.kind;
    let mut report = ReorderReport::empty(kind);
    if plan.is_noop() {
        report.converged = matches_order(store, plan);
        if !report.converged {
            debug!(%kind, "move needs no writes but cannot be shown as requested");
        }
        return Ok(report);
    }

    let _guard = suppression.raise(kind);
    report.scheduled = plan.updates.len();

    let writes = plan
        .updates
        .iter()
        .map(|update| gateway.update(kind, update.uuid, update.patch(), update.version));
    let results = join_all(writes).await;

    let cache = store.cache(kind);
    for (update, result) in plan.updates.iter().zip(results) {
        match result {
            Ok(UpdateOutcome::Applied(entity)) => {
                report.applied += 1;
                cache.apply_versioned(entity);
            }
            Ok(UpdateOutcome::Conflict(_)) => report.conflicts += 1,
            Err(e) => {
                report.failed += 1;
                debug!(%kind, uuid = %update.uuid, error = %e, "reorder write failed");
            }
        }
    }

    let listing = gateway.list(kind).await.inspect_err(|e| {
        warn!(%kind, error = %e, "refetch after reorder failed; list may be stale");
    })?;
    store.apply_listing(kind, listing);
    report.converged = matches_order(store, plan);

    if report.is_settled() {
        info!(%kind, moved = report.applied, "reorder applied");
    } else {
        warn!(
            %kind,
            scheduled = report.scheduled,
            applied = report.applied,
            conflicts = report.conflicts,
            failed = report.failed,
            converged = report.converged,
            "reorder did not settle as requested; list refetched from server"
        );
    }
    Ok(report)
}

fn matches_order(store: &SyncStore, plan: &ReorderPlan) -> bool {
    store
        .cache(plan.kind)
        .list()
        .iter()
        .map(|e| e.uuid)
        .eq(plan.order.iter().copied())
}
