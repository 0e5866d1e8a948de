// Wire types for the production REST API and push channel.
//
// Field names follow the server's camelCase JSON. Domain fields the sync
// layer does not interpret are captured in `fields` via `#[serde(flatten)]`,
// so nothing the server sends is silently dropped on a round trip.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

// ── Entities ─────────────────────────────────────────────────────────

/// One equipment record as the server returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRecord {
    /// Immutable server-assigned identity.
    pub uuid: Uuid,

    /// Display label, e.g. `"FOH 2"`. Mutable.
    pub id: String,

    /// Optimistic-concurrency counter.
    pub version: u64,

    /// Explicit ordinal for kinds that are not ordered by label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pair_number: Option<u32>,

    #[serde(default)]
    pub note_history: Vec<NoteEntryRecord>,

    /// All remaining domain fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// A timestamped note or completion comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteEntryRecord {
    pub entry_id: String,
    pub text: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    /// `"info"` or `"completion"`; other values are preserved verbatim.
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
}

// ── Update responses ─────────────────────────────────────────────────

/// Body of a version-conflict response.
///
/// The presence of `error` is the wire tag that distinguishes a conflict
/// from a confirmed entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictBody {
    pub error: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub current_version: Option<u64>,
}

/// Result of a versioned `PATCH`.
///
/// Untagged: `Conflict` is tried first, so any body carrying an `error`
/// field is a conflict.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum UpdateResponse {
    Conflict(ConflictBody),
    Applied(EntityRecord),
}

// ── Push channel ─────────────────────────────────────────────────────

/// What happened to the entity named in a [`PushFrame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushAction {
    Created,
    Updated,
    Deleted,
}

/// A change notification delivered over the push channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushFrame {
    /// `"camera"`, `"monitor"`, `"media-server"`, `"checklist-item"`, `"send"`.
    pub entity_kind: String,
    pub action: PushAction,
    /// Full entity for `created` / `updated`.
    #[serde(default)]
    pub entity: Option<EntityRecord>,
    /// Bare uuid for `deleted`.
    #[serde(default)]
    pub entity_id: Option<Uuid>,
    #[serde(default)]
    pub acting_user_id: Option<String>,
    #[serde(default)]
    pub acting_user_name: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entity_record_keeps_unknown_fields() {
        let uuid = Uuid::new_v4();
        let record: EntityRecord = serde_json::from_value(json!({
            "uuid": uuid,
            "id": "FOH 1",
            "version": 3,
            "resolution": "1080p59.94",
            "isWireless": false,
            "noteHistory": [
                { "entryId": "n1", "text": "lens swapped", "timestamp": 10, "kind": "info" }
            ]
        }))
        .unwrap();

        assert_eq!(record.uuid, uuid);
        assert_eq!(record.id, "FOH 1");
        assert_eq!(record.version, 3);
        assert_eq!(record.pair_number, None);
        assert_eq!(record.note_history.len(), 1);
        assert_eq!(record.fields["resolution"], "1080p59.94");
        assert_eq!(record.fields["isWireless"], false);
    }

    #[test]
    fn error_field_tags_a_conflict() {
        let body = json!({ "error": "version_conflict", "currentVersion": 4 });
        let resp: UpdateResponse = serde_json::from_value(body).unwrap();
        assert_eq!(
            resp,
            UpdateResponse::Conflict(ConflictBody {
                error: "version_conflict".into(),
                message: None,
                current_version: Some(4),
            })
        );
    }

    #[test]
    fn entity_body_is_applied() {
        let uuid = Uuid::new_v4();
        let body = json!({ "uuid": uuid, "id": "BSM 1", "version": 2 });
        let resp: UpdateResponse = serde_json::from_value(body).unwrap();
        match resp {
            UpdateResponse::Applied(record) => assert_eq!(record.version, 2),
            UpdateResponse::Conflict(c) => panic!("unexpected conflict: {c:?}"),
        }
    }

    #[test]
    fn deleted_frame_carries_only_the_id() {
        let uuid = Uuid::new_v4();
        let frame: PushFrame = serde_json::from_value(json!({
            "entityKind": "monitor",
            "action": "deleted",
            "entityId": uuid,
            "actingUserId": "u-7",
            "actingUserName": "Sam"
        }))
        .unwrap();

        assert_eq!(frame.action, PushAction::Deleted);
        assert_eq!(frame.entity_id, Some(uuid));
        assert!(frame.entity.is_none());
        assert_eq!(frame.acting_user_name.as_deref(), Some("Sam"));
    }
}
