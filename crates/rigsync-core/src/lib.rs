//! rigsync-core: Sync layer between rigsync-api and front ends.
//!
//! Keeps one cache per equipment kind consistent with the server while
//! several sessions edit the same production: versioned writes through the
//! gateway, push events through the reconciler, drag-to-reorder through the
//! planner, and append-only note merges.

pub mod config;
pub mod convert;
pub mod error;
pub mod gateway;
pub mod model;
pub mod notes;
pub mod reconcile;
pub mod reorder;
pub mod session;
pub mod store;
pub mod stream;

#[cfg(test)]
pub(crate) mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ReconnectSettings, SessionConfig};
pub use error::CoreError;
pub use gateway::{MutationGateway, Transport, UpdateOutcome, VersionConflict};
pub use reconcile::{Actor, Change, PushEvent, ReconcileOutcome, Reconciler, Suppression, SuppressionGuard};
pub use reorder::{DragController, DragState, PlannedUpdate, ReorderPlan, ReorderReport, plan_move};
pub use session::Session;
pub use store::{ApplyOutcome, EntityCache, SyncStore};
pub use stream::{EntityFilter, EntityStream, Snapshot};

// Re-export model types at the crate root for ergonomics.
pub use model::{Entity, EntityKind, EntityPatch, Label, NoteKind, OrderingScheme, TimestampedEntry};
