// ── In-memory versioned server for tests ──

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Map;
use uuid::Uuid;

use crate::error::CoreError;
use crate::gateway::{Transport, UpdateOutcome, VersionConflict};
use crate::model::{Entity, EntityKind, EntityPatch};

type Probe = Arc<dyn Fn() -> bool + Send + Sync>;

#[derive(Default)]
struct ServerState {
    /// Per kind, in insertion order.
    records: HashMap<EntityKind, Vec<Entity>>,
    failing: HashSet<Uuid>,
    lists_fail: bool,
    update_calls: usize,
    /// Evaluated on every update; results collected in `observed`.
    probe: Option<Probe>,
    observed: Vec<bool>,
}

/// Behaves like the production server: bumps versions, rejects stale
/// writes, and lists in insertion order.
#[derive(Default)]
pub(crate) struct FakeTransport {
    state: Mutex<ServerState>,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn seed(&self, kind: EntityKind, label: &str, version: u64) -> Entity {
        self.seed_entity(entity(kind, label, version))
    }

    pub(crate) fn seed_entity(&self, entity: Entity) -> Entity {
        self.lock()
            .records
            .entry(entity.kind)
            .or_default()
            .push(entity.clone());
        entity
    }

    /// Another user edits a record: applies `edit` and bumps the version.
    pub(crate) fn remote_edit(
        &self,
        kind: EntityKind,
        uuid: Uuid,
        edit: impl FnOnce(&mut Entity),
    ) -> Option<Entity> {
        let mut state = self.lock();
        let record = state
            .records
            .get_mut(&kind)?
            .iter_mut()
            .find(|e| e.uuid == uuid)?;
        edit(record);
        record.version += 1;
        Some(record.clone())
    }

    pub(crate) fn record(&self, kind: EntityKind, uuid: Uuid) -> Option<Entity> {
        self.lock()
            .records
            .get(&kind)?
            .iter()
            .find(|e| e.uuid == uuid)
            .cloned()
    }

    pub(crate) fn records(&self, kind: EntityKind) -> Vec<Entity> {
        self.lock().records.get(&kind).cloned().unwrap_or_default()
    }

    /// Updates and deletes of `uuid` fail with a 503 from now on.
    pub(crate) fn fail_writes_for(&self, uuid: Uuid) {
        self.lock().failing.insert(uuid);
    }

    pub(crate) fn fail_lists(&self, fail: bool) {
        self.lock().lists_fail = fail;
    }

    pub(crate) fn update_calls(&self) -> usize {
        self.lock().update_calls
    }

    pub(crate) fn set_probe(&self, probe: impl Fn() -> bool + Send + Sync + 'static) {
        self.lock().probe = Some(Arc::new(probe));
    }

    pub(crate) fn observed(&self) -> Vec<bool> {
        self.lock().observed.clone()
    }
}

impl Transport for FakeTransport {
    async fn list(&self, kind: EntityKind) -> Result<Vec<Entity>, CoreError> {
        let state = self.lock();
        if state.lists_fail {
            return Err(CoreError::ConnectionFailed {
                url: "memory://".into(),
                reason: "listing disabled".into(),
            });
        }
        Ok(state.records.get(&kind).cloned().unwrap_or_default())
    }

    async fn fetch(&self, kind: EntityKind, uuid: Uuid) -> Result<Entity, CoreError> {
        self.record(kind, uuid)
            .ok_or_else(|| not_found(kind, uuid))
    }

    async fn create(&self, kind: EntityKind, patch: EntityPatch) -> Result<Entity, CoreError> {
        let created = Entity {
            uuid: Uuid::new_v4(),
            kind,
            label: patch.label.unwrap_or_default(),
            version: 1,
            pair_number: patch.pair_number,
            notes: patch.notes.unwrap_or_default(),
            fields: patch.fields,
        };
        Ok(self.seed_entity(created))
    }

    async fn update(
        &self,
        kind: EntityKind,
        uuid: Uuid,
        patch: EntityPatch,
        expected_version: u64,
    ) -> Result<UpdateOutcome, CoreError> {
        let mut state = self.lock();
        state.update_calls += 1;
        if let Some(probe) = state.probe.clone() {
            state.observed.push(probe());
        }

        if state.failing.contains(&uuid) {
            return Err(unavailable());
        }

        let record = state
            .records
            .get_mut(&kind)
            .and_then(|records| records.iter_mut().find(|e| e.uuid == uuid))
            .ok_or_else(|| not_found(kind, uuid))?;

        if record.version != expected_version {
            return Ok(UpdateOutcome::Conflict(VersionConflict {
                kind,
                uuid,
                expected_version,
                current_version: Some(record.version),
                reason: "version_conflict".into(),
            }));
        }

        if let Some(label) = patch.label {
            record.label = label;
        }
        if let Some(pair_number) = patch.pair_number {
            record.pair_number = Some(pair_number);
        }
        if let Some(notes) = patch.notes {
            record.notes = notes;
        }
        record.fields.extend(patch.fields);
        record.version += 1;
        Ok(UpdateOutcome::Applied(record.clone()))
    }

    async fn delete(&self, kind: EntityKind, uuid: Uuid) -> Result<(), CoreError> {
        let mut state = self.lock();
        if state.failing.contains(&uuid) {
            return Err(unavailable());
        }
        let records = state.records.entry(kind).or_default();
        let before = records.len();
        records.retain(|e| e.uuid != uuid);
        if records.len() == before {
            return Err(not_found(kind, uuid));
        }
        Ok(())
    }
}

fn unavailable() -> CoreError {
    CoreError::Api {
        message: "service unavailable".into(),
        status: Some(503),
    }
}

fn not_found(kind: EntityKind, uuid: Uuid) -> CoreError {
    CoreError::NotFound {
        kind: kind.to_string(),
        identifier: uuid.to_string(),
    }
}

/// A bare record with a fresh uuid.
pub(crate) fn entity(kind: EntityKind, label: &str, version: u64) -> Entity {
    Entity {
        uuid: Uuid::new_v4(),
        kind,
        label: label.into(),
        version,
        pair_number: None,
        notes: Vec::new(),
        fields: Map::new(),
    }
}
