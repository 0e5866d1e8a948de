// ── REST transport ──
//
// `Transport` over the production REST API. Maps wire records to domain
// entities and version-conflict bodies to `UpdateOutcome::Conflict`.

use uuid::Uuid;

use rigsync_api::{RestClient, UpdateResponse};

use super::{Transport, UpdateOutcome, VersionConflict};
use crate::error::CoreError;
use crate::model::{Entity, EntityKind, EntityPatch};

impl Transport for RestClient {
    async fn list(&self, kind: EntityKind) -> Result<Vec<Entity>, CoreError> {
        let records = RestClient::list(self, kind.resource()).await?;
        Ok(records
            .into_iter()
            .map(|r| Entity::from_record(kind, r))
            .collect())
    }

    async fn fetch(&self, kind: EntityKind, uuid: Uuid) -> Result<Entity, CoreError> {
        RestClient::get(self, kind.resource(), uuid)
            .await
            .map(|r| Entity::from_record(kind, r))
            .map_err(|e| with_identity(e, kind, uuid))
    }

    async fn create(&self, kind: EntityKind, patch: EntityPatch) -> Result<Entity, CoreError> {
        let record = RestClient::create(self, kind.resource(), &patch.into_wire()).await?;
        Ok(Entity::from_record(kind, record))
    }

    async fn update(
        &self,
        kind: EntityKind,
        uuid: Uuid,
        patch: EntityPatch,
        expected_version: u64,
    ) -> Result<UpdateOutcome, CoreError> {
        let response = RestClient::update(
            self,
            kind.resource(),
            uuid,
            &patch.into_wire(),
            expected_version,
        )
        .await
        .map_err(|e| with_identity(e, kind, uuid))?;

        Ok(match response {
            UpdateResponse::Applied(record) => {
                UpdateOutcome::Applied(Entity::from_record(kind, record))
            }
            UpdateResponse::Conflict(body) => UpdateOutcome::Conflict(VersionConflict {
                kind,
                uuid,
                expected_version,
                current_version: body.current_version,
                reason: body.message.unwrap_or(body.error),
            }),
        })
    }

    async fn delete(&self, kind: EntityKind, uuid: Uuid) -> Result<(), CoreError> {
        RestClient::delete(self, kind.resource(), uuid)
            .await
            .map_err(|e| with_identity(e, kind, uuid))
    }
}

/// Name the record in not-found errors instead of the request path.
fn with_identity(err: rigsync_api::Error, kind: EntityKind, uuid: Uuid) -> CoreError {
    if err.is_not_found() {
        CoreError::NotFound {
            kind: kind.to_string(),
            identifier: uuid.to_string(),
        }
    } else {
        CoreError::from(err)
    }
}
