// ── Mutation gateway ──
//
// The single write path to the server. `Transport` is the seam: the REST
// client implements it for real sessions, an in-memory server implements
// it in tests. The gateway adds logging and never touches the cache;
// applying results is the caller's job.

mod rest;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::CoreError;
use crate::model::{Entity, EntityKind, EntityPatch};

// ── Outcomes ─────────────────────────────────────────────────────────

/// The server refused a write because `expected_version` was stale.
///
/// Carries no entity data; the caller refetches if it wants the current
/// record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConflict {
    pub kind: EntityKind,
    pub uuid: Uuid,
    pub expected_version: u64,
    /// Server's version at rejection time, when it says.
    pub current_version: Option<u64>,
    pub reason: String,
}

impl fmt::Display for VersionConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} changed on the server (expected version {}",
            self.kind, self.uuid, self.expected_version
        )?;
        if let Some(current) = self.current_version {
            write!(f, ", server has {current}")?;
        }
        write!(f, "): {}", self.reason)
    }
}

/// Result of a versioned update.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// The server accepted the write and returned the new record.
    Applied(Entity),
    Conflict(VersionConflict),
}

impl UpdateOutcome {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    pub fn applied(&self) -> Option<&Entity> {
        match self {
            Self::Applied(entity) => Some(entity),
            Self::Conflict(_) => None,
        }
    }
}

// ── Transport ────────────────────────────────────────────────────────

/// Repository interface for one production.
pub trait Transport: Send + Sync {
    /// Every record of `kind`, in server order.
    fn list(
        &self,
        kind: EntityKind,
    ) -> impl Future<Output = Result<Vec<Entity>, CoreError>> + Send;

    /// One record, authoritative.
    fn fetch(
        &self,
        kind: EntityKind,
        uuid: Uuid,
    ) -> impl Future<Output = Result<Entity, CoreError>> + Send;

    /// Create a record; the server assigns `uuid` and `version`.
    fn create(
        &self,
        kind: EntityKind,
        patch: EntityPatch,
    ) -> impl Future<Output = Result<Entity, CoreError>> + Send;

    /// Versioned partial update.
    fn update(
        &self,
        kind: EntityKind,
        uuid: Uuid,
        patch: EntityPatch,
        expected_version: u64,
    ) -> impl Future<Output = Result<UpdateOutcome, CoreError>> + Send;

    fn delete(
        &self,
        kind: EntityKind,
        uuid: Uuid,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn list(
        &self,
        kind: EntityKind,
    ) -> impl Future<Output = Result<Vec<Entity>, CoreError>> + Send {
        (**self).list(kind)
    }

    fn fetch(
        &self,
        kind: EntityKind,
        uuid: Uuid,
    ) -> impl Future<Output = Result<Entity, CoreError>> + Send {
        (**self).fetch(kind, uuid)
    }

    fn create(
        &self,
        kind: EntityKind,
        patch: EntityPatch,
    ) -> impl Future<Output = Result<Entity, CoreError>> + Send {
        (**self).create(kind, patch)
    }

    fn update(
        &self,
        kind: EntityKind,
        uuid: Uuid,
        patch: EntityPatch,
        expected_version: u64,
    ) -> impl Future<Output = Result<UpdateOutcome, CoreError>> + Send {
        (**self).update(kind, uuid, patch, expected_version)
    }

    fn delete(
        &self,
        kind: EntityKind,
        uuid: Uuid,
    ) -> impl Future<Output = Result<(), CoreError>> + Send {
        (**self).delete(kind, uuid)
    }
}

// ── MutationGateway ──────────────────────────────────────────────────

/// Logged access to a [`Transport`]. Never mutates the cache, so a
/// network failure leaves local state exactly as it was.
pub struct MutationGateway<T> {
    transport: T,
}

impl<T: Transport> MutationGateway<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn list(&self, kind: EntityKind) -> Result<Vec<Entity>, CoreError> {
        let entities = self.transport.list(kind).await?;
        debug!(%kind, count = entities.len(), "listed");
        Ok(entities)
    }

    pub async fn fetch(&self, kind: EntityKind, uuid: Uuid) -> Result<Entity, CoreError> {
        let entity = self.transport.fetch(kind, uuid).await?;
        debug!(%kind, %uuid, version = entity.version, "fetched");
        Ok(entity)
    }

    pub async fn create(&self, kind: EntityKind, patch: EntityPatch) -> Result<Entity, CoreError> {
        let entity = self.transport.create(kind, patch).await?;
        info!(%kind, uuid = %entity.uuid, label = %entity.label, "created");
        Ok(entity)
    }

    pub async fn update(
        &self,
        kind: EntityKind,
        uuid: Uuid,
        patch: EntityPatch,
        expected_version: u64,
    ) -> Result<UpdateOutcome, CoreError> {
        debug!(%kind, %uuid, expected_version, "updating");
        let outcome = self
            .transport
            .update(kind, uuid, patch, expected_version)
            .await?;

        match &outcome {
            UpdateOutcome::Applied(entity) => {
                debug!(%kind, %uuid, version = entity.version, "update applied");
            }
            UpdateOutcome::Conflict(conflict) => {
                debug!(
                    %kind,
                    %uuid,
                    expected_version,
                    current_version = ?conflict.current_version,
                    "update rejected: version conflict"
                );
            }
        }
        Ok(outcome)
    }

    pub async fn delete(&self, kind: EntityKind, uuid: Uuid) -> Result<(), CoreError> {
        self.transport.delete(kind, uuid).await?;
        info!(%kind, %uuid, "deleted");
        Ok(())
    }
}
