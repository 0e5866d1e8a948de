// ── Entity records ──
//
// One `Entity` type serves every equipment kind. The sync layer only
// interprets identity, version, ordering, and note history; every other
// field rides along in `fields` untouched.

use serde::Serialize;
use serde_json::{Map, Value};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use uuid::Uuid;

use super::label::{Label, OrderingScheme};
use super::note::TimestampedEntry;

// ── EntityKind ──────────────────────────────────────────────────────

/// The equipment collections a production holds.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    serde::Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum EntityKind {
    Camera,
    Monitor,
    MediaServer,
    ChecklistItem,
    Send,
}

impl EntityKind {
    /// REST resource path segment.
    pub fn resource(self) -> &'static str {
        match self {
            Self::Camera => "cameras",
            Self::Monitor => "monitors",
            Self::MediaServer => "media-servers",
            Self::ChecklistItem => "checklist-items",
            Self::Send => "sends",
        }
    }

    /// How list order is encoded for this kind.
    pub fn ordering(self) -> OrderingScheme {
        match self {
            Self::MediaServer => OrderingScheme::Sequential,
            Self::Camera | Self::Monitor | Self::ChecklistItem | Self::Send => {
                OrderingScheme::Grouped
            }
        }
    }
}

// ── Entity ──────────────────────────────────────────────────────────

/// A cached production record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// Immutable identity; the only cache key.
    pub uuid: Uuid,
    pub kind: EntityKind,
    /// Display label (`"FOH 2"`). Never used for lookups.
    pub label: String,
    pub version: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pair_number: Option<u32>,
    pub notes: Vec<TimestampedEntry>,
    /// Domain fields opaque to the sync layer.
    pub fields: Map<String, Value>,
}

impl Entity {
    pub fn parsed_label(&self) -> Label {
        Label::parse(&self.label)
    }

    /// Look up an opaque domain field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

// ── EntityPatch ─────────────────────────────────────────────────────

/// Fields to send with a create or versioned update.
///
/// Only the fields that were set are sent; everything else is left to the
/// server. Note history is always sent whole.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityPatch {
    pub label: Option<String>,
    pub pair_number: Option<u32>,
    pub notes: Option<Vec<TimestampedEntry>>,
    pub fields: Map<String, Value>,
}

impl EntityPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn pair_number(mut self, pair_number: u32) -> Self {
        self.pair_number = Some(pair_number);
        self
    }

    pub fn notes(mut self, notes: Vec<TimestampedEntry>) -> Self {
        self.notes = Some(notes);
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.label.is_none()
            && self.pair_number.is_none()
            && self.notes.is_none()
            && self.fields.is_empty()
    }
}
