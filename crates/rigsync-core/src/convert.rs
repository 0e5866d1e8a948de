// ── Wire ↔ domain conversions ──
//
// Translates rigsync-api wire records into canonical domain types and back.
// The api crate stays kind-agnostic (resources and kinds are strings there);
// kinds become typed here.

use serde_json::{Map, Value};

use rigsync_api::{EntityRecord, NoteEntryRecord, PushAction, PushFrame};

use crate::model::{Entity, EntityKind, EntityPatch, NoteKind, TimestampedEntry};
use crate::reconcile::{Actor, Change, PushEvent};

// ── Notes ────────────────────────────────────────────────────────────

impl From<NoteEntryRecord> for TimestampedEntry {
    fn from(r: NoteEntryRecord) -> Self {
        Self {
            entry_id: r.entry_id,
            text: r.text,
            timestamp: r.timestamp,
            kind: NoteKind::from(r.kind),
            author_name: r.author_name,
        }
    }
}

// ── Entities ─────────────────────────────────────────────────────────

impl Entity {
    /// Build a domain entity from a wire record of a known kind.
    pub fn from_record(kind: EntityKind, r: EntityRecord) -> Self {
        Self {
            uuid: r.uuid,
            kind,
            label: r.id,
            version: r.version,
            pair_number: r.pair_number,
            notes: r.note_history.into_iter().map(TimestampedEntry::from).collect(),
            fields: r.fields,
        }
    }
}

impl EntityPatch {
    /// Wire body for a create or `PATCH` (without the version field).
    pub fn into_wire(self) -> Map<String, Value> {
        let mut body = self.fields;
        if let Some(label) = self.label {
            body.insert("id".into(), Value::String(label));
        }
        if let Some(pair_number) = self.pair_number {
            body.insert("pairNumber".into(), Value::from(pair_number));
        }
        if let Some(notes) = self.notes {
            let entries = notes.into_iter().map(note_to_value).collect();
            body.insert("noteHistory".into(), Value::Array(entries));
        }
        body
    }
}

fn note_to_value(entry: TimestampedEntry) -> Value {
    let mut obj = Map::new();
    obj.insert("entryId".into(), Value::String(entry.entry_id));
    obj.insert("text".into(), Value::String(entry.text));
    obj.insert("timestamp".into(), Value::from(entry.timestamp));
    obj.insert("kind".into(), Value::String(String::from(entry.kind)));
    if let Some(author) = entry.author_name {
        obj.insert("authorName".into(), Value::String(author));
    }
    Value::Object(obj)
}

// ── Push frames ──────────────────────────────────────────────────────

impl PushEvent {
    /// Interpret a push frame. Returns `None` for unknown kinds and for
    /// frames missing the payload their action requires.
    pub fn from_frame(frame: &PushFrame) -> Option<Self> {
        let kind: EntityKind = frame.entity_kind.parse().ok()?;
        let entity = || {
            frame
                .entity
                .clone()
                .map(|record| Entity::from_record(kind, record))
        };

        let change = match frame.action {
            PushAction::Created => Change::Created(entity()?),
            PushAction::Updated => Change::Updated(entity()?),
            PushAction::Deleted => {
                let uuid = frame
                    .entity_id
                    .or_else(|| frame.entity.as_ref().map(|r| r.uuid))?;
                Change::Deleted(uuid)
            }
        };

        Some(Self {
            kind,
            change,
            actor: Actor {
                id: frame.acting_user_id.clone(),
                name: frame.acting_user_name.clone(),
            },
        })
    }
}
