// ── Reactive entity store ──
//
// One cache per entity kind with push-based change notification.

mod cache;
mod refresh;
mod sync_store;

pub use cache::{ApplyOutcome, EntityCache};
pub use sync_store::SyncStore;
