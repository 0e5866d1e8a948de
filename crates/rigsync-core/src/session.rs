// ── Session ──
//
// One live view of one production: the store, the mutation gateway, and
// the push reconciler wired together. This is where confirmed writes are
// applied to the cache, conflicts are read-repaired, and push-channel gaps
// trigger a full resync.

use std::sync::Arc;

use futures_util::future::try_join_all;
use strum::IntoEnumIterator;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use rigsync_api::{PushChannel, PushMessage, RestClient};

use crate::config::SessionConfig;
use crate::error::CoreError;
use crate::gateway::{MutationGateway, Transport, UpdateOutcome};
use crate::model::{Entity, EntityKind, EntityPatch, NoteKind};
use crate::notes;
use crate::reconcile::{PushEvent, ReconcileOutcome, Reconciler, Suppression};
use crate::reorder::{self, DragController, ReorderPlan, ReorderReport, plan_move};
use crate::store::SyncStore;
use crate::stream::{EntityStream, Snapshot};

// ── Session ──────────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<SessionInner>`. Generic over the
/// [`Transport`] so tests can run against an in-memory server.
pub struct Session<T: Transport> {
    inner: Arc<SessionInner<T>>,
}

impl<T: Transport> Clone for Session<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct SessionInner<T> {
    config: SessionConfig,
    gateway: MutationGateway<T>,
    store: Arc<SyncStore>,
    suppression: Arc<Suppression>,
    reconciler: Reconciler,
    cancel: CancellationToken,
    push: Mutex<Option<PushChannel>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl<T: Transport> Session<T> {
    /// Wrap a transport. Does not load anything; call
    /// [`full_refresh`](Self::full_refresh) first.
    pub fn new(transport: T, config: SessionConfig) -> Self {
        let store = Arc::new(SyncStore::new());
        let suppression = Arc::new(Suppression::new());
        let reconciler = Reconciler::new(
            Arc::clone(&store),
            Arc::clone(&suppression),
            config.user_id.clone(),
        );

        Self {
            inner: Arc::new(SessionInner {
                config,
                gateway: MutationGateway::new(transport),
                store,
                suppression,
                reconciler,
                cancel: CancellationToken::new(),
                push: Mutex::new(None),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<SyncStore> {
        &self.inner.store
    }

    pub fn gateway(&self) -> &MutationGateway<T> {
        &self.inner.gateway
    }

    pub fn suppression(&self) -> &Arc<Suppression> {
        &self.inner.suppression
    }

    pub fn snapshot(&self, kind: EntityKind) -> Snapshot {
        self.inner.store.snapshot(kind)
    }

    pub fn subscribe(&self, kind: EntityKind) -> EntityStream {
        self.inner.store.subscribe(kind)
    }

    // ── Loading ──────────────────────────────────────────────────────

    /// Reload one kind from the server.
    pub async fn refresh(&self, kind: EntityKind) -> Result<(), CoreError> {
        let listing = self.inner.gateway.list(kind).await?;
        self.inner.store.apply_listing(kind, listing);
        Ok(())
    }

    /// Reload every kind. Listings are fetched concurrently and applied
    /// only if all of them succeed.
    ///
    /// Kinds with a reorder in flight, at fetch or at apply time, keep
    /// their cache; the reorder's own refetch replaces it.
    pub async fn full_refresh(&self) -> Result<(), CoreError> {
        let suppression = &self.inner.suppression;
        let kinds: Vec<(EntityKind, bool)> = EntityKind::iter()
            .map(|kind| (kind, suppression.is_suppressed(kind)))
            .collect();
        let listings =
            try_join_all(kinds.iter().map(|&(kind, _)| self.inner.gateway.list(kind))).await?;

        for ((kind, was_busy), listing) in kinds.into_iter().zip(listings) {
            if was_busy || suppression.is_suppressed(kind) {
                debug!(%kind, "reorder in flight, keeping cached listing");
                continue;
            }
            self.inner.store.apply_listing(kind, listing);
        }
        self.inner.store.mark_full_refresh();

        debug!(
            cameras = self.inner.store.count(EntityKind::Camera),
            monitors = self.inner.store.count(EntityKind::Monitor),
            media_servers = self.inner.store.count(EntityKind::MediaServer),
            checklist_items = self.inner.store.count(EntityKind::ChecklistItem),
            sends = self.inner.store.count(EntityKind::Send),
            "full refresh complete"
        );
        Ok(())
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Create a record and cache the server's confirmed copy.
    pub async fn create(&self, kind: EntityKind, patch: EntityPatch) -> Result<Entity, CoreError> {
        let entity = self.inner.gateway.create(kind, patch).await?;
        let applied = self.inner.store.cache(kind).apply_versioned(entity.clone());
        trace!(%kind, uuid = %entity.uuid, ?applied, "create settled");
        Ok(entity)
    }

    /// Update a cached record at the version this session last saw.
    ///
    /// On a conflict the record is refetched and cached, and the conflict
    /// is returned. Nothing is retried.
    pub async fn update(
        &self,
        kind: EntityKind,
        uuid: Uuid,
        patch: EntityPatch,
    ) -> Result<UpdateOutcome, CoreError> {
        let expected_version = self.cached(kind, uuid)?.version;
        self.update_versioned(kind, uuid, patch, expected_version).await
    }

    /// Update with an explicit expected version.
    pub async fn update_versioned(
        &self,
        kind: EntityKind,
        uuid: Uuid,
        patch: EntityPatch,
        expected_version: u64,
    ) -> Result<UpdateOutcome, CoreError> {
        let outcome = self
            .inner
            .gateway
            .update(kind, uuid, patch, expected_version)
            .await?;
        self.settle(kind, uuid, &outcome).await;
        Ok(outcome)
    }

    /// Delete on the server, then locally. The uuid is tombstoned so late
    /// events cannot bring it back.
    pub async fn delete(&self, kind: EntityKind, uuid: Uuid) -> Result<(), CoreError> {
        let result = self.inner.gateway.delete(kind, uuid).await;
        if matches!(result, Ok(()) | Err(CoreError::NotFound { .. })) {
            self.inner.store.cache(kind).remove(uuid);
        }
        result
    }

    /// Apply a write's outcome to the cache.
    async fn settle(&self, kind: EntityKind, uuid: Uuid, outcome: &UpdateOutcome) {
        let cache = self.inner.store.cache(kind);
        match outcome {
            UpdateOutcome::Applied(entity) => {
                let applied = cache.apply_versioned(entity.clone());
                trace!(%kind, %uuid, version = entity.version, ?applied, "update settled");
            }
            UpdateOutcome::Conflict(conflict) => {
                warn!(
                    %kind,
                    %uuid,
                    expected_version = conflict.expected_version,
                    current_version = ?conflict.current_version,
                    "record changed on the server; reloading it"
                );
                match self.inner.gateway.fetch(kind, uuid).await {
                    Ok(current) => {
                        cache.apply_versioned(current);
                    }
                    Err(CoreError::NotFound { .. }) => {
                        cache.remove(uuid);
                    }
                    Err(e) => {
                        warn!(%kind, %uuid, error = %e, "reload after conflict failed");
                    }
                }
            }
        }
    }

    fn cached(&self, kind: EntityKind, uuid: Uuid) -> Result<Arc<Entity>, CoreError> {
        self.inner
            .store
            .get(kind, uuid)
            .ok_or_else(|| CoreError::NotFound {
                kind: kind.to_string(),
                identifier: uuid.to_string(),
            })
    }

    // ── Push ─────────────────────────────────────────────────────────

    /// Apply one push event to the cache.
    pub fn apply_push(&self, event: PushEvent) -> ReconcileOutcome {
        self.inner.reconciler.apply(event)
    }

    // ── Reorder ──────────────────────────────────────────────────────

    /// Move the record displayed at `from` to `to` and persist the new
    /// numbering.
    pub async fn reorder(
        &self,
        kind: EntityKind,
        from: usize,
        to: usize,
    ) -> Result<ReorderReport, CoreError> {
        let snapshot = self.inner.store.snapshot(kind);
        let plan = plan_move(kind, &snapshot, from, to)?;
        self.apply_plan(&plan).await
    }

    /// Execute a precomputed plan.
    pub async fn apply_plan(&self, plan: &ReorderPlan) -> Result<ReorderReport, CoreError> {
        reorder::execute(
            &self.inner.gateway,
            &self.inner.store,
            &self.inner.suppression,
            plan,
        )
        .await
    }

    /// Interactive drag-and-drop for one kind.
    pub fn drag(&self, kind: EntityKind) -> DragController<T> {
        DragController::new(self.clone(), kind)
    }

    // ── Notes ────────────────────────────────────────────────────────

    /// Append a note to the server's current history for a record.
    pub async fn append_note(
        &self,
        kind: EntityKind,
        uuid: Uuid,
        text: &str,
        note_kind: NoteKind,
    ) -> Result<UpdateOutcome, CoreError> {
        let current = self.inner.gateway.fetch(kind, uuid).await?;
        let entry = notes::new_entry(text, note_kind, self.inner.config.user_name.clone());
        let merged = notes::appended(&current.notes, entry);

        self.update_versioned(kind, uuid, EntityPatch::new().notes(merged), current.version)
            .await
    }

    /// Remove one note from the server's current history for a record.
    ///
    /// If the entry is already gone nothing is written and the fetched
    /// record is returned as `Applied`.
    pub async fn remove_note(
        &self,
        kind: EntityKind,
        uuid: Uuid,
        entry_id: &str,
    ) -> Result<UpdateOutcome, CoreError> {
        let current = self.inner.gateway.fetch(kind, uuid).await?;

        match notes::without(&current.notes, entry_id) {
            Some(remaining) => {
                self.update_versioned(
                    kind,
                    uuid,
                    EntityPatch::new().notes(remaining),
                    current.version,
                )
                .await
            }
            None => {
                debug!(%kind, %uuid, entry_id, "note already removed");
                self.inner.store.cache(kind).apply_versioned(current.clone());
                Ok(UpdateOutcome::Applied(current))
            }
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Stop background tasks and the push channel.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        if let Some(channel) = self.inner.push.lock().await.take() {
            channel.shutdown();
        }

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("session shut down");
    }
}

impl<T: Transport + 'static> Session<T> {
    /// Load every kind, then reconcile from `rx`.
    ///
    /// `rx` must already be subscribed: frames it holds from before or
    /// during the load are applied once the load is in the cache.
    pub async fn load_and_follow(
        &self,
        rx: broadcast::Receiver<PushMessage>,
    ) -> Result<(), CoreError> {
        self.full_refresh().await?;
        self.spawn_reconciler(rx).await;
        Ok(())
    }

    /// Consume push messages in the background until shutdown.
    ///
    /// A lagged receiver or a reconnected channel means events were lost,
    /// so both trigger a full refresh.
    pub async fn spawn_reconciler(&self, rx: broadcast::Receiver<PushMessage>) {
        let session = self.clone();
        let cancel = self.inner.cancel.child_token();
        let handle = tokio::spawn(reconcile_task(session, rx, cancel));
        self.inner.task_handles.lock().await.push(handle);
    }
}

impl Session<RestClient> {
    /// Connect to a production: load every kind, then follow the push
    /// channel if enabled.
    ///
    /// The push receiver is subscribed before the initial load, so frames
    /// that arrive during the load queue on it and are applied afterwards
    /// through the version guard.
    pub async fn connect(config: SessionConfig) -> Result<Self, CoreError> {
        let transport = config.transport();
        let client = RestClient::new(config.base_url.as_str(), &config.production_id, &transport)?;
        let session = Self::new(client, config);

        if session.inner.config.push_enabled {
            let channel = session.open_push()?;
            if let Err(e) = session.load_and_follow(channel.subscribe()).await {
                channel.shutdown();
                return Err(e);
            }
            *session.inner.push.lock().await = Some(channel);
        } else {
            session.full_refresh().await?;
        }

        info!(
            production = %session.inner.config.production_id,
            push = session.inner.config.push_enabled,
            "session connected"
        );
        Ok(session)
    }

    fn open_push(&self) -> Result<PushChannel, CoreError> {
        let config = &self.inner.config;
        let channel = PushChannel::connect(
            config.base_url.as_str(),
            &config.production_id,
            &config.transport(),
            (&config.reconnect).into(),
            self.inner.cancel.child_token(),
        )?;
        Ok(channel)
    }
}

// ── Background tasks ─────────────────────────────────────────────────

async fn reconcile_task<T: Transport + 'static>(
    session: Session<T>,
    mut rx: broadcast::Receiver<PushMessage>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            msg = rx.recv() => match msg {
                Ok(PushMessage::Frame(frame)) => match PushEvent::from_frame(&frame) {
                    Some(event) => {
                        session.apply_push(event);
                    }
                    None => {
                        debug!(kind = %frame.entity_kind, action = ?frame.action, "skipping push frame");
                    }
                },
                Ok(PushMessage::Reconnected) => {
                    resync(&session, "push channel reconnected").await;
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "push consumer lagged");
                    resync(&session, "push consumer lagged").await;
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
    debug!("reconciler stopped");
}

async fn resync<T: Transport>(session: &Session<T>, reason: &str) {
    info!(reason, "resyncing after possible missed events");
    if let Err(e) = session.full_refresh().await {
        warn!(error = %e, "resync failed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use rigsync_api::{EntityRecord, PushAction, PushFrame};
    use serde_json::json;
    use url::Url;

    use crate::model::{TimestampedEntry, arrange};
    use crate::reconcile::{Actor, Change};
    use crate::reorder::DragState;
    use crate::store::ApplyOutcome;
    use crate::testing::{FakeTransport, entity};

    type TestSession = Session<Arc<FakeTransport>>;

    fn config() -> SessionConfig {
        let mut config =
            SessionConfig::new(Url::parse("http://localhost:9000/api").unwrap(), "p-1");
        config.user_id = Some("u-me".into());
        config.user_name = Some("Me".into());
        config
    }

    async fn loaded(server: &Arc<FakeTransport>) -> TestSession {
        let session = Session::new(Arc::clone(server), config());
        session.full_refresh().await.unwrap();
        session
    }

    fn labels(session: &TestSession, kind: EntityKind) -> Vec<(Uuid, String, u64)> {
        session
            .snapshot(kind)
            .iter()
            .map(|e| (e.uuid, e.label.clone(), e.version))
            .collect()
    }

    fn push(kind: EntityKind, change: Change) -> PushEvent {
        PushEvent {
            kind,
            change,
            actor: Actor {
                id: Some("u-other".into()),
                name: Some("Sam".into()),
            },
        }
    }

    /// Wait until `ready` holds for the kind's snapshot.
    async fn wait_for(
        session: &TestSession,
        kind: EntityKind,
        ready: impl Fn(&Snapshot) -> bool,
    ) {
        let mut stream = session.subscribe(kind);
        tokio::time::timeout(Duration::from_secs(5), async {
            while !ready(&stream.latest()) {
                stream.changed().await;
            }
        })
        .await
        .unwrap();
    }

    // ── Loading ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn full_refresh_loads_every_kind() {
        let server = Arc::new(FakeTransport::new());
        server.seed(EntityKind::Camera, "FOH 1", 1);
        server.seed(EntityKind::Send, "AUX 1", 1);
        let session = loaded(&server).await;

        assert_eq!(session.store().count(EntityKind::Camera), 1);
        assert_eq!(session.store().count(EntityKind::Send), 1);
        assert_eq!(session.store().count(EntityKind::Monitor), 0);
        assert!(session.store().last_full_refresh().is_some());
    }

    #[tokio::test]
    async fn failed_refresh_leaves_cache_alone() {
        let server = Arc::new(FakeTransport::new());
        server.seed(EntityKind::Camera, "FOH 1", 1);
        let session = loaded(&server).await;

        server.seed(EntityKind::Camera, "FOH 2", 1);
        server.fail_lists(true);
        assert!(session.full_refresh().await.is_err());
        assert_eq!(session.store().count(EntityKind::Camera), 1);
    }

    // ── Create / update / delete ─────────────────────────────────────

    #[tokio::test]
    async fn create_caches_confirmed_entity_and_echo_is_noop() {
        let server = Arc::new(FakeTransport::new());
        let session = loaded(&server).await;

        let created = session
            .create(EntityKind::Monitor, EntityPatch::new().label("DSM 1"))
            .await
            .unwrap();
        assert_eq!(created.version, 1);
        assert_eq!(session.store().count(EntityKind::Monitor), 1);

        let echo = session.apply_push(push(EntityKind::Monitor, Change::Created(created)));
        assert_eq!(echo, ReconcileOutcome::Cache(ApplyOutcome::Duplicate));
        assert_eq!(session.store().count(EntityKind::Monitor), 1);
    }

    #[tokio::test]
    async fn update_uses_cached_version_and_applies_result() {
        let server = Arc::new(FakeTransport::new());
        let cam = server.seed(EntityKind::Camera, "FOH 1", 3);
        let session = loaded(&server).await;

        let outcome = session
            .update(
                EntityKind::Camera,
                cam.uuid,
                EntityPatch::new().field("lens", "HJ40"),
            )
            .await
            .unwrap();
        assert_eq!(outcome.applied().unwrap().version, 4);

        let cached = session.store().get(EntityKind::Camera, cam.uuid).unwrap();
        assert_eq!(cached.version, 4);
        assert_eq!(cached.field("lens"), Some(&json!("HJ40")));
    }

    #[tokio::test]
    async fn echo_before_or_after_response_applies_once() {
        let server = Arc::new(FakeTransport::new());
        let cam = server.seed(EntityKind::Camera, "FOH 1", 1);
        let session = loaded(&server).await;

        let outcome = session
            .update(EntityKind::Camera, cam.uuid, EntityPatch::new().label("FOH 5"))
            .await
            .unwrap();
        let confirmed = outcome.applied().unwrap().clone();
        let rev = session.store().cache(EntityKind::Camera).revision();

        // Echo after the response.
        let echo = session.apply_push(push(EntityKind::Camera, Change::Updated(confirmed.clone())));
        assert_eq!(echo, ReconcileOutcome::Cache(ApplyOutcome::Unchanged));
        assert_eq!(session.store().cache(EntityKind::Camera).revision(), rev);

        // Echo before the response: the late response changes nothing.
        let late = session
            .store()
            .cache(EntityKind::Camera)
            .apply_versioned(confirmed);
        assert_eq!(late, ApplyOutcome::Unchanged);
        assert_eq!(session.store().count(EntityKind::Camera), 1);
    }

    #[tokio::test]
    async fn stale_response_does_not_overwrite_newer_push() {
        let server = Arc::new(FakeTransport::new());
        let cam = server.seed(EntityKind::Camera, "FOH 1", 1);
        let session = loaded(&server).await;

        // A newer version arrives by push while our write is in flight.
        let newer = Entity {
            label: "FOH 7".into(),
            version: 3,
            ..cam.clone()
        };
        session.apply_push(push(EntityKind::Camera, Change::Updated(newer)));

        let outcome = session
            .update_versioned(EntityKind::Camera, cam.uuid, EntityPatch::new().label("FOH 2"), 1)
            .await
            .unwrap();
        assert_eq!(outcome.applied().unwrap().version, 2);

        let cached = session.store().get(EntityKind::Camera, cam.uuid).unwrap();
        assert_eq!((cached.label.as_str(), cached.version), ("FOH 7", 3));
    }

    #[tokio::test]
    async fn conflict_is_returned_and_record_reloaded() {
        let server = Arc::new(FakeTransport::new());
        let x = server.seed(EntityKind::Camera, "FOH 1", 3);
        let session = loaded(&server).await;

        server.remote_edit(EntityKind::Camera, x.uuid, |e| {
            e.fields.insert("operator".into(), json!("Sam"));
        });

        // The gateway alone reports the conflict and leaves the cache be.
        let raw = session
            .gateway()
            .update(EntityKind::Camera, x.uuid, EntityPatch::new().label("FOH 9"), 3)
            .await
            .unwrap();
        assert!(raw.is_conflict());
        assert_eq!(session.store().get(EntityKind::Camera, x.uuid).unwrap().version, 3);

        // The session reloads the record after the conflict.
        let outcome = session
            .update(EntityKind::Camera, x.uuid, EntityPatch::new().label("FOH 9"))
            .await
            .unwrap();
        match outcome {
            UpdateOutcome::Conflict(conflict) => {
                assert_eq!(conflict.expected_version, 3);
                assert_eq!(conflict.current_version, Some(4));
            }
            UpdateOutcome::Applied(_) => panic!("expected conflict"),
        }

        let cached = session.store().get(EntityKind::Camera, x.uuid).unwrap();
        assert_eq!(cached.version, 4);
        assert_eq!(cached.label, "FOH 1");
        assert_eq!(cached.field("operator"), Some(&json!("Sam")));
        // One attempt from the gateway, one from the session; no retries.
        assert_eq!(server.update_calls(), 2);
    }

    #[tokio::test]
    async fn update_of_unknown_record_fails_without_writing() {
        let server = Arc::new(FakeTransport::new());
        let session = loaded(&server).await;

        let err = session
            .update(EntityKind::Send, Uuid::new_v4(), EntityPatch::new().label("AUX 2"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
        assert_eq!(server.update_calls(), 0);
    }

    #[tokio::test]
    async fn network_failure_leaves_cache_untouched() {
        let server = Arc::new(FakeTransport::new());
        let cam = server.seed(EntityKind::Camera, "FOH 1", 1);
        let session = loaded(&server).await;
        server.fail_writes_for(cam.uuid);

        let before = labels(&session, EntityKind::Camera);
        let err = session
            .update(EntityKind::Camera, cam.uuid, EntityPatch::new().label("FOH 2"))
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert_eq!(labels(&session, EntityKind::Camera), before);
    }

    #[tokio::test]
    async fn deleted_record_is_not_resurrected_by_late_events() {
        let server = Arc::new(FakeTransport::new());
        let cam = server.seed(EntityKind::Camera, "FOH 1", 1);
        let session = loaded(&server).await;

        session.delete(EntityKind::Camera, cam.uuid).await.unwrap();
        assert!(session.store().get(EntityKind::Camera, cam.uuid).is_none());

        let late_update = Entity {
            version: 2,
            ..cam.clone()
        };
        assert_eq!(
            session.apply_push(push(EntityKind::Camera, Change::Updated(late_update))),
            ReconcileOutcome::Cache(ApplyOutcome::Tombstoned)
        );
        assert_eq!(
            session.apply_push(push(EntityKind::Camera, Change::Created(cam.clone()))),
            ReconcileOutcome::Cache(ApplyOutcome::Tombstoned)
        );
        assert_eq!(
            session.apply_push(push(EntityKind::Camera, Change::Deleted(cam.uuid))),
            ReconcileOutcome::Cache(ApplyOutcome::Absent)
        );
        assert_eq!(session.store().count(EntityKind::Camera), 0);
    }

    #[tokio::test]
    async fn failed_delete_keeps_record() {
        let server = Arc::new(FakeTransport::new());
        let cam = server.seed(EntityKind::Camera, "FOH 1", 1);
        let session = loaded(&server).await;
        server.fail_writes_for(cam.uuid);

        assert!(session.delete(EntityKind::Camera, cam.uuid).await.is_err());
        assert!(session.store().get(EntityKind::Camera, cam.uuid).is_some());
        assert!(!session.store().cache(EntityKind::Camera).is_tombstoned(cam.uuid));
    }

    #[tokio::test]
    async fn delete_of_record_already_gone_removes_it_locally() {
        let server = Arc::new(FakeTransport::new());
        let session = loaded(&server).await;
        let ghost = entity(EntityKind::Camera, "FOH 1", 1);
        session.store().cache(EntityKind::Camera).upsert(ghost.clone());

        let err = session.delete(EntityKind::Camera, ghost.uuid).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
        assert!(session.store().get(EntityKind::Camera, ghost.uuid).is_none());
    }

    // ── Reorder ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn drag_to_top_renumbers_and_refetches() {
        let server = Arc::new(FakeTransport::new());
        let a = server.seed(EntityKind::Camera, "FOH 1", 1);
        let b = server.seed(EntityKind::Camera, "FOH 2", 1);
        let c = server.seed(EntityKind::Camera, "BSM 1", 1);
        let session = loaded(&server).await;

        let report = session.reorder(EntityKind::Camera, 1, 0).await.unwrap();
        assert_eq!(report.scheduled, 2);
        assert!(report.is_complete());

        assert_eq!(
            labels(&session, EntityKind::Camera),
            vec![
                (b.uuid, "FOH 1".to_owned(), 2),
                (a.uuid, "FOH 2".to_owned(), 2),
                (c.uuid, "BSM 1".to_owned(), 1),
            ]
        );
    }

    #[tokio::test]
    async fn reorder_across_interleaved_groups_reports_divergence() {
        let server = Arc::new(FakeTransport::new());
        let a = server.seed(EntityKind::Camera, "FOH 1", 1);
        let b = server.seed(EntityKind::Camera, "BSM 1", 1);
        let c = server.seed(EntityKind::Camera, "FOH 2", 1);
        let session = loaded(&server).await;

        let report = session.reorder(EntityKind::Camera, 2, 0).await.unwrap();
        assert_eq!(report.scheduled, 2);
        assert!(report.is_complete());
        assert!(!report.converged);
        assert!(!report.is_settled());

        let order: Vec<_> = session
            .snapshot(EntityKind::Camera)
            .iter()
            .map(|e| e.uuid)
            .collect();
        assert_ne!(order, vec![c.uuid, a.uuid, b.uuid]);
        assert_eq!(
            session.store().get(EntityKind::Camera, c.uuid).unwrap().label,
            "FOH 1"
        );
    }

    #[tokio::test]
    async fn reorder_within_one_group_converges() {
        let server = Arc::new(FakeTransport::new());
        let a = server.seed(EntityKind::Camera, "FOH 1", 1);
        let b = server.seed(EntityKind::Camera, "FOH 2", 1);
        let c = server.seed(EntityKind::Camera, "FOH 3", 1);
        let session = loaded(&server).await;

        let report = session.reorder(EntityKind::Camera, 2, 0).await.unwrap();
        assert!(report.is_settled());

        let order: Vec<_> = session
            .snapshot(EntityKind::Camera)
            .iter()
            .map(|e| e.uuid)
            .collect();
        assert_eq!(order, vec![c.uuid, a.uuid, b.uuid]);
    }

    #[tokio::test]
    async fn reorder_suppresses_updates_only_while_writing() {
        let server = Arc::new(FakeTransport::new());
        server.seed(EntityKind::Camera, "FOH 1", 1);
        server.seed(EntityKind::Camera, "FOH 2", 1);
        let session = loaded(&server).await;

        let suppression = Arc::clone(session.suppression());
        server.set_probe(move || suppression.is_suppressed(EntityKind::Camera));

        session.reorder(EntityKind::Camera, 1, 0).await.unwrap();
        assert_eq!(server.observed(), vec![true, true]);
        assert!(!session.suppression().is_suppressed(EntityKind::Camera));
    }

    #[tokio::test]
    async fn reorder_converges_to_server_despite_failed_writes() {
        let server = Arc::new(FakeTransport::new());
        let a = server.seed(EntityKind::Camera, "FOH 1", 1);
        server.seed(EntityKind::Camera, "FOH 2", 1);
        server.seed(EntityKind::Camera, "FOH 3", 1);
        let session = loaded(&server).await;
        server.fail_writes_for(a.uuid);

        let report = session.reorder(EntityKind::Camera, 2, 0).await.unwrap();
        assert_eq!(report.scheduled, 3);
        assert_eq!(report.failed, 1);
        assert_eq!(report.applied, 2);

        let truth: Vec<_> = arrange(
            EntityKind::Camera.ordering(),
            server
                .records(EntityKind::Camera)
                .into_iter()
                .map(Arc::new)
                .collect(),
        )
        .iter()
        .map(|e| (e.uuid, e.label.clone(), e.version))
        .collect();
        assert_eq!(labels(&session, EntityKind::Camera), truth);
    }

    #[tokio::test]
    async fn reorder_counts_conflicts() {
        let server = Arc::new(FakeTransport::new());
        let a = server.seed(EntityKind::Monitor, "DSM 1", 1);
        server.seed(EntityKind::Monitor, "DSM 2", 1);
        let session = loaded(&server).await;
        server.remote_edit(EntityKind::Monitor, a.uuid, |_| {});

        let report = session.reorder(EntityKind::Monitor, 0, 1).await.unwrap();
        assert_eq!((report.applied, report.conflicts), (1, 1));
        assert_eq!(
            session.store().get(EntityKind::Monitor, a.uuid).unwrap().version,
            2
        );
    }

    #[tokio::test]
    async fn refetch_failure_still_lowers_suppression() {
        let server = Arc::new(FakeTransport::new());
        server.seed(EntityKind::Camera, "FOH 1", 1);
        server.seed(EntityKind::Camera, "FOH 2", 1);
        let session = loaded(&server).await;
        server.fail_lists(true);

        assert!(session.reorder(EntityKind::Camera, 0, 1).await.is_err());
        assert!(!session.suppression().is_suppressed(EntityKind::Camera));
    }

    #[tokio::test]
    async fn drop_in_place_writes_nothing() {
        let server = Arc::new(FakeTransport::new());
        server.seed(EntityKind::Camera, "FOH 1", 1);
        let session = loaded(&server).await;

        let report = session.reorder(EntityKind::Camera, 0, 0).await.unwrap();
        assert_eq!(report.scheduled, 0);
        assert_eq!(server.update_calls(), 0);
    }

    #[tokio::test]
    async fn media_servers_reorder_by_pair_number() {
        let server = Arc::new(FakeTransport::new());
        for (label, pair) in [("Main", 1), ("Backup", 2), ("Spare", 3)] {
            let mut e = entity(EntityKind::MediaServer, label, 1);
            e.pair_number = Some(pair);
            server.seed_entity(e);
        }
        let session = loaded(&server).await;

        session.reorder(EntityKind::MediaServer, 2, 0).await.unwrap();
        let order: Vec<_> = session
            .snapshot(EntityKind::MediaServer)
            .iter()
            .map(|e| (e.label.clone(), e.pair_number))
            .collect();
        assert_eq!(
            order,
            vec![
                ("Spare".to_owned(), Some(1)),
                ("Main".to_owned(), Some(2)),
                ("Backup".to_owned(), Some(3)),
            ]
        );
    }

    #[tokio::test]
    async fn drag_controller_walks_the_state_machine() {
        let server = Arc::new(FakeTransport::new());
        server.seed(EntityKind::Send, "AUX 1", 1);
        server.seed(EntityKind::Send, "AUX 2", 1);
        let session = loaded(&server).await;
        let drag = session.drag(EntityKind::Send);

        assert!(matches!(
            drag.drop_at(0).await,
            Err(CoreError::InvalidMove { .. })
        ));

        drag.begin(1).unwrap();
        assert_eq!(drag.state(), DragState::Dragging { source_index: 1 });
        assert!(matches!(
            drag.begin(0),
            Err(CoreError::DragInProgress { .. })
        ));

        drag.cancel();
        assert_eq!(drag.state(), DragState::Idle);

        drag.begin(1).unwrap();
        let report = drag.drop_at(0).await.unwrap();
        assert_eq!(report.applied, 2);
        assert_eq!(drag.state(), DragState::Idle);
    }

    #[tokio::test]
    async fn drag_returns_to_idle_after_bad_drop() {
        let server = Arc::new(FakeTransport::new());
        server.seed(EntityKind::Send, "AUX 1", 1);
        let session = loaded(&server).await;
        let drag = session.drag(EntityKind::Send);

        assert!(drag.begin(3).is_err());
        drag.begin(0).unwrap();
        assert!(drag.drop_at(5).await.is_err());
        assert_eq!(drag.state(), DragState::Idle);
    }

    // ── Notes ────────────────────────────────────────────────────────

    fn note(id: &str, timestamp: i64) -> TimestampedEntry {
        TimestampedEntry {
            entry_id: id.into(),
            text: format!("note {id}"),
            timestamp,
            kind: NoteKind::Info,
            author_name: Some("Sam".into()),
        }
    }

    #[tokio::test]
    async fn append_merges_into_server_history() {
        let server = Arc::new(FakeTransport::new());
        let item = server.seed(EntityKind::ChecklistItem, "Rig 1", 1);
        let session = loaded(&server).await;

        // Another user adds a note the cache has not seen.
        server.remote_edit(EntityKind::ChecklistItem, item.uuid, |e| {
            e.notes.push(note("theirs", 10));
        });

        let outcome = session
            .append_note(EntityKind::ChecklistItem, item.uuid, "cabled", NoteKind::Completion)
            .await
            .unwrap();
        let updated = outcome.applied().unwrap();
        assert_eq!(updated.notes.len(), 2);
        assert_eq!(updated.notes[0].entry_id, "theirs");
        assert_eq!(updated.notes[1].text, "cabled");
        assert_eq!(updated.notes[1].author_name.as_deref(), Some("Me"));

        let cached = session.store().get(EntityKind::ChecklistItem, item.uuid).unwrap();
        assert_eq!(cached.version, 3);
        assert_eq!(cached.notes.len(), 2);
    }

    #[tokio::test]
    async fn removed_note_is_not_resurrected_from_cache() {
        let server = Arc::new(FakeTransport::new());
        let mut seeded = entity(EntityKind::Camera, "FOH 1", 1);
        seeded.notes = vec![note("a", 1), note("b", 2)];
        let cam = server.seed_entity(seeded);
        let session = loaded(&server).await;

        // Someone else deletes note "a"; our cache still has it.
        server.remote_edit(EntityKind::Camera, cam.uuid, |e| {
            e.notes.retain(|n| n.entry_id != "a");
        });
        session
            .append_note(EntityKind::Camera, cam.uuid, "new", NoteKind::Info)
            .await
            .unwrap();

        let ids: Vec<_> = server
            .record(EntityKind::Camera, cam.uuid)
            .unwrap()
            .notes
            .into_iter()
            .map(|n| n.entry_id)
            .collect();
        assert_eq!(ids.len(), 2);
        assert!(!ids.contains(&"a".to_owned()));
    }

    #[tokio::test]
    async fn remove_note_writes_remaining_history() {
        let server = Arc::new(FakeTransport::new());
        let mut seeded = entity(EntityKind::Camera, "FOH 1", 1);
        seeded.notes = vec![note("a", 1), note("b", 2)];
        let cam = server.seed_entity(seeded);
        let session = loaded(&server).await;

        let outcome = session
            .remove_note(EntityKind::Camera, cam.uuid, "a")
            .await
            .unwrap();
        assert_eq!(outcome.applied().unwrap().notes, vec![note("b", 2)]);
        assert_eq!(server.update_calls(), 1);
    }

    #[tokio::test]
    async fn removing_missing_note_skips_the_write() {
        let server = Arc::new(FakeTransport::new());
        let cam = server.seed(EntityKind::Camera, "FOH 1", 1);
        let session = loaded(&server).await;

        let outcome = session
            .remove_note(EntityKind::Camera, cam.uuid, "nope")
            .await
            .unwrap();
        assert_eq!(outcome.applied().unwrap().version, 1);
        assert_eq!(server.update_calls(), 0);
    }

    // ── Push loop ────────────────────────────────────────────────────

    fn frame(kind: &str, action: PushAction, entity: &Entity) -> PushMessage {
        let record: EntityRecord = serde_json::from_value(json!({
            "uuid": entity.uuid,
            "id": entity.label,
            "version": entity.version,
        }))
        .unwrap();
        PushMessage::Frame(Arc::new(PushFrame {
            entity_kind: kind.into(),
            action,
            entity: Some(record),
            entity_id: None,
            acting_user_id: Some("u-other".into()),
            acting_user_name: Some("Sam".into()),
        }))
    }

    #[tokio::test]
    async fn reconciler_task_applies_frames_and_resyncs() {
        let server = Arc::new(FakeTransport::new());
        let session = loaded(&server).await;
        let (tx, rx) = broadcast::channel(16);
        session.spawn_reconciler(rx).await;

        let remote = entity(EntityKind::Monitor, "DSM 4", 1);
        tx.send(frame("monitor", PushAction::Created, &remote)).unwrap();
        wait_for(&session, EntityKind::Monitor, |snap| snap.len() == 1).await;

        // Missed while disconnected; only a resync can find it.
        let missed = server.seed(EntityKind::Send, "AUX 9", 1);
        tx.send(PushMessage::Reconnected).unwrap();
        wait_for(&session, EntityKind::Send, |snap| {
            snap.iter().any(|e| e.uuid == missed.uuid)
        })
        .await;

        session.shutdown().await;
    }

    #[tokio::test]
    async fn frames_queued_during_load_are_applied_after_it() {
        let server = Arc::new(FakeTransport::new());
        let cam = server.seed(EntityKind::Camera, "FOH 1", 1);
        let session = Session::new(Arc::clone(&server), config());

        let (tx, rx) = broadcast::channel(16);
        let mut renamed = cam.clone();
        renamed.label = "FOH 7".into();
        renamed.version = 2;
        tx.send(frame("camera", PushAction::Updated, &renamed)).unwrap();
        let remote = entity(EntityKind::Monitor, "DSM 1", 1);
        tx.send(frame("monitor", PushAction::Created, &remote)).unwrap();

        session.load_and_follow(rx).await.unwrap();

        wait_for(&session, EntityKind::Camera, |snap| {
            snap.iter().any(|e| e.label == "FOH 7" && e.version == 2)
        })
        .await;
        wait_for(&session, EntityKind::Monitor, |snap| {
            snap.iter().any(|e| e.uuid == remote.uuid)
        })
        .await;
        session.shutdown().await;
    }

    #[tokio::test]
    async fn resync_keeps_cache_of_kind_being_reordered() {
        let server = Arc::new(FakeTransport::new());
        server.seed(EntityKind::Camera, "FOH 1", 1);
        let session = loaded(&server).await;

        server.seed(EntityKind::Camera, "FOH 2", 1);
        server.seed(EntityKind::Send, "AUX 1", 1);
        let guard = session.suppression().raise(EntityKind::Camera);
        session.full_refresh().await.unwrap();

        assert_eq!(session.store().count(EntityKind::Camera), 1);
        assert_eq!(session.store().count(EntityKind::Send), 1);

        drop(guard);
        session.full_refresh().await.unwrap();
        assert_eq!(session.store().count(EntityKind::Camera), 2);
    }

    #[tokio::test]
    async fn lagged_reconciler_resyncs() {
        let server = Arc::new(FakeTransport::new());
        let session = loaded(&server).await;
        let (tx, rx) = broadcast::channel(2);
        session.spawn_reconciler(rx).await;

        let missed = server.seed(EntityKind::Camera, "FOH 1", 1);
        // Overflow the channel before the task gets to run.
        for i in 0..4 {
            let remote = entity(EntityKind::Monitor, &format!("DSM {i}"), 1);
            tx.send(frame("monitor", PushAction::Updated, &remote)).unwrap();
        }

        wait_for(&session, EntityKind::Camera, |snap| {
            snap.iter().any(|e| e.uuid == missed.uuid)
        })
        .await;
        session.shutdown().await;
    }

    #[tokio::test]
    async fn unknown_frames_are_skipped() {
        let server = Arc::new(FakeTransport::new());
        let session = loaded(&server).await;
        let (tx, rx) = broadcast::channel(16);
        session.spawn_reconciler(rx).await;

        let stray = entity(EntityKind::Camera, "X", 1);
        tx.send(frame("ip-allocation", PushAction::Created, &stray)).unwrap();
        let cam = entity(EntityKind::Camera, "FOH 1", 1);
        tx.send(frame("camera", PushAction::Created, &cam)).unwrap();

        wait_for(&session, EntityKind::Camera, |snap| snap.len() == 1).await;
        assert_eq!(session.snapshot(EntityKind::Camera)[0].uuid, cam.uuid);
        session.shutdown().await;
    }
}
