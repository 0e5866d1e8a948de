// ── Domain model ──
//
// Canonical types shared by the cache, gateway, reconciler, and planner.

mod entity;
mod label;
mod note;

pub use entity::{Entity, EntityKind, EntityPatch};
pub use label::{Label, OrderingScheme, arrange};
pub use note::{NoteKind, TimestampedEntry};
