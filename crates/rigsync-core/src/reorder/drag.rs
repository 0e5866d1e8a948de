// ── Drag state machine ──
//
// Idle → Dragging → Committing → Idle. The order snapshot is taken when the
// record is dropped, not when the drag starts, so edits that land while the
// user is dragging are included in the plan.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use super::{ReorderPlan, ReorderReport, plan_move};
use crate::error::CoreError;
use crate::gateway::Transport;
use crate::model::EntityKind;
use crate::session::Session;

/// Where a drag interaction stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Dragging { source_index: usize },
    /// Writes in flight; `updated` events for the kind are suppressed.
    Committing { plan: Arc<ReorderPlan> },
}

/// Drives drag-and-drop reordering for one kind.
pub struct DragController<T: Transport> {
    session: Session<T>,
    kind: EntityKind,
    state: watch::Sender<DragState>,
}

impl<T: Transport> DragController<T> {
    pub(crate) fn new(session: Session<T>, kind: EntityKind) -> Self {
        let (state, _) = watch::channel(DragState::Idle);
        Self {
            session,
            kind,
            state,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn state(&self) -> DragState {
        self.state.borrow().clone()
    }

    /// Subscribe to state transitions.
    pub fn watch(&self) -> watch::Receiver<DragState> {
        self.state.subscribe()
    }

    /// Pick up the record at `source_index`.
    pub fn begin(&self, source_index: usize) -> Result<(), CoreError> {
        let len = self.session.store().count(self.kind);
        if source_index >= len {
            return Err(CoreError::InvalidMove {
                message: format!("no {} at index {source_index}", self.kind),
            });
        }

        let started = self.state.send_if_modified(|state| {
            if *state == DragState::Idle {
                *state = DragState::Dragging { source_index };
                true
            } else {
                false
            }
        });
        if started {
            debug!(kind = %self.kind, source_index, "drag started");
            Ok(())
        } else {
            Err(CoreError::DragInProgress {
                kind: self.kind.to_string(),
            })
        }
    }

    /// Abandon a drag. Has no effect once the drop is committing.
    pub fn cancel(&self) {
        self.state.send_if_modified(|state| {
            if matches!(state, DragState::Dragging { .. }) {
                *state = DragState::Idle;
                true
            } else {
                false
            }
        });
    }

    /// Drop the dragged record at `target_index` and commit the reorder.
    pub async fn drop_at(&self, target_index: usize) -> Result<ReorderReport, CoreError> {
        let source_index = match *self.state.borrow() {
            DragState::Dragging { source_index } => source_index,
            _ => {
                return Err(CoreError::InvalidMove {
                    message: "no drag in progress".into(),
                });
            }
        };

        let _reset = ResetOnDrop(&self.state);
        let snapshot = self.session.store().snapshot(self.kind);
        let plan = Arc::new(plan_move(self.kind, &snapshot, source_index, target_index)?);

        self.state.send_replace(DragState::Committing {
            plan: Arc::clone(&plan),
        });
        self.session.apply_plan(&plan).await
    }
}

/// Returns the machine to `Idle` however the commit ends.
struct ResetOnDrop<'a>(&'a watch::Sender<DragState>);

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        self.0.send_replace(DragState::Idle);
    }
}
