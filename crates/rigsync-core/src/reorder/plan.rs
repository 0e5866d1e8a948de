// ── Reorder planning ──
//
// Pure computation: given the displayed order at drop time and a move,
// work out which records need a new label (or pair number) and at which
// version to write it. Nothing here touches the network or the cache.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::CoreError;
use crate::model::{Entity, EntityKind, EntityPatch, OrderingScheme};

/// One record whose ordering key changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUpdate {
    pub uuid: Uuid,
    pub current_label: String,
    pub new_label: String,
    /// Set for sequential kinds only.
    pub new_pair_number: Option<u32>,
    /// Version observed at drop time; sent as `expected_version`.
    pub version: u64,
}

impl PlannedUpdate {
    /// The patch that carries this change.
    pub fn patch(&self) -> EntityPatch {
        match self.new_pair_number {
            Some(pair_number) => EntityPatch::new().pair_number(pair_number),
            None => EntityPatch::new().label(self.new_label.clone()),
        }
    }
}

/// The outcome of planning one drag-and-drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderPlan {
    pub kind: EntityKind,
    /// Uuids in the moved order.
    pub order: Vec<Uuid>,
    /// Only records whose ordering key changes, in moved order.
    pub updates: Vec<PlannedUpdate>,
}

impl ReorderPlan {
    /// Nothing to write.
    pub fn is_noop(&self) -> bool {
        self.updates.is_empty()
    }
}

/// Plan moving the record at `from` to `to` within `snapshot`.
///
/// `to` is the drop index in the list after the dragged record is taken
/// out, so both indices must be below `snapshot.len()`.
pub fn plan_move(
    kind: EntityKind,
    snapshot: &[Arc<Entity>],
    from: usize,
    to: usize,
) -> Result<ReorderPlan, CoreError> {
    let len = snapshot.len();
    if from >= len || to >= len {
        return Err(CoreError::InvalidMove {
            message: format!("cannot move {from} -> {to} in a list of {len} {kind} records"),
        });
    }

    let mut moved: Vec<&Arc<Entity>> = snapshot.iter().collect();
    if from != to {
        let dragged = moved.remove(from);
        moved.insert(to, dragged);
    }

    let updates = match kind.ordering() {
        OrderingScheme::Grouped => renumber_groups(&moved),
        OrderingScheme::Sequential => renumber_sequence(&moved),
    };

    Ok(ReorderPlan {
        kind,
        order: moved.iter().map(|e| e.uuid).collect(),
        updates,
    })
}

/// Number each code group 1..N by position; labels without an ordinal
/// keep theirs.
fn renumber_groups(moved: &[&Arc<Entity>]) -> Vec<PlannedUpdate> {
    let mut counters: HashMap<String, u32> = HashMap::new();
    let mut final_labels = Vec::with_capacity(moved.len());
    let mut scheduled = Vec::new();

    for (position, entity) in moved.iter().enumerate() {
        let label = entity.parsed_label();
        if label.ordinal.is_none() {
            final_labels.push(entity.label.clone());
            continue;
        }

        let counter = counters.entry(label.code.clone()).or_insert(0);
        *counter += 1;
        let new_label = label.with_ordinal(*counter);

        final_labels.push(new_label.clone());
        if new_label != entity.label {
            scheduled.push((
                position,
                PlannedUpdate {
                    uuid: entity.uuid,
                    current_label: entity.label.clone(),
                    new_label,
                    new_pair_number: None,
                    version: entity.version,
                },
            ));
        }
    }

    drop_shadowed(scheduled, &final_labels)
}

/// Pair numbers become 1..N by position.
fn renumber_sequence(moved: &[&Arc<Entity>]) -> Vec<PlannedUpdate> {
    moved
        .iter()
        .zip(1u32..)
        .filter(|(entity, position)| entity.pair_number != Some(*position))
        .map(|(entity, position)| PlannedUpdate {
            uuid: entity.uuid,
            current_label: entity.label.clone(),
            new_label: entity.label.clone(),
            new_pair_number: Some(position),
            version: entity.version,
        })
        .collect()
}

/// When two records would end up with the same label (compared without
/// case, as the server does), the later one in list order keeps it and the
/// earlier one's write is dropped. The post-write refetch shows whatever
/// the server settled on.
fn drop_shadowed(
    scheduled: Vec<(usize, PlannedUpdate)>,
    final_labels: &[String],
) -> Vec<PlannedUpdate> {
    let mut last_holder: HashMap<String, usize> = HashMap::new();
    for (position, label) in final_labels.iter().enumerate() {
        last_holder.insert(label.to_lowercase(), position);
    }

    scheduled
        .into_iter()
        .filter(|(position, update)| {
            last_holder.get(&update.new_label.to_lowercase()) == Some(position)
        })
        .map(|(_, update)| update)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::Map;

    fn entity(kind: EntityKind, label: &str, pair: Option<u32>) -> Arc<Entity> {
        Arc::new(Entity {
            uuid: Uuid::new_v4(),
            kind,
            label: label.into(),
            version: 1,
            pair_number: pair,
            notes: Vec::new(),
            fields: Map::new(),
        })
    }

    fn cameras(labels: &[&str]) -> Vec<Arc<Entity>> {
        labels
            .iter()
            .map(|l| entity(EntityKind::Camera, l, None))
            .collect()
    }

    fn relabels(plan: &ReorderPlan) -> Vec<(&str, &str)> {
        plan.updates
            .iter()
            .map(|u| (u.current_label.as_str(), u.new_label.as_str()))
            .collect()
    }

    #[test]
    fn drag_to_top_swaps_group_numbers() {
        let list = cameras(&["FOH 1", "FOH 2", "BSM 1"]);
        let plan = plan_move(EntityKind::Camera, &list, 1, 0).unwrap();

        assert_eq!(plan.order, vec![list[1].uuid, list[0].uuid, list[2].uuid]);
        assert_eq!(relabels(&plan), vec![("FOH 2", "FOH 1"), ("FOH 1", "FOH 2")]);
        assert!(plan.updates.iter().all(|u| u.version == 1));
    }

    #[test]
    fn drop_in_place_is_a_noop() {
        let list = cameras(&["FOH 1", "FOH 2"]);
        let plan = plan_move(EntityKind::Camera, &list, 1, 1).unwrap();
        assert!(plan.is_noop());
        assert_eq!(plan.order, vec![list[0].uuid, list[1].uuid]);
    }

    #[test]
    fn out_of_range_is_an_error() {
        let list = cameras(&["FOH 1", "FOH 2"]);
        let err = plan_move(EntityKind::Camera, &list, 0, 2).unwrap_err();
        assert!(matches!(err, CoreError::InvalidMove { .. }));
        assert!(plan_move(EntityKind::Camera, &[], 0, 0).is_err());
    }

    #[test]
    fn only_changed_records_are_scheduled() {
        let list = cameras(&["FOH 1", "FOH 2", "FOH 3", "FOH 4"]);
        // FOH 4 moves between FOH 2 and FOH 3; FOH 1 and FOH 2 keep their numbers.
        let plan = plan_move(EntityKind::Camera, &list, 3, 2).unwrap();
        assert_eq!(relabels(&plan), vec![("FOH 4", "FOH 3"), ("FOH 3", "FOH 4")]);
    }

    #[test]
    fn moving_across_groups_keeps_group_numbering() {
        let list = cameras(&["FOH 1", "BSM 1", "BSM 2"]);
        // FOH 1 lands after the BSM cameras; both groups are still 1..N.
        let plan = plan_move(EntityKind::Camera, &list, 0, 2).unwrap();
        assert!(plan.is_noop());
    }

    #[test]
    fn unnumbered_labels_are_untouched() {
        let list = cameras(&["Wide", "FOH 1", "FOH 2"]);
        let plan = plan_move(EntityKind::Camera, &list, 2, 0).unwrap();
        assert_eq!(relabels(&plan), vec![("FOH 2", "FOH 1"), ("FOH 1", "FOH 2")]);
    }

    #[test]
    fn compact_labels_keep_their_format() {
        let list = cameras(&["CAM1", "CAM2"]);
        let plan = plan_move(EntityKind::Camera, &list, 0, 1).unwrap();
        assert_eq!(relabels(&plan), vec![("CAM2", "CAM1"), ("CAM1", "CAM2")]);
    }

    #[test]
    fn sequential_kinds_renumber_pair_numbers() {
        let list = vec![
            entity(EntityKind::MediaServer, "Main", Some(1)),
            entity(EntityKind::MediaServer, "Backup", Some(2)),
            entity(EntityKind::MediaServer, "Spare", Some(3)),
        ];
        let plan = plan_move(EntityKind::MediaServer, &list, 2, 0).unwrap();

        let pairs: Vec<_> = plan
            .updates
            .iter()
            .map(|u| (u.new_label.as_str(), u.new_pair_number))
            .collect();
        assert_eq!(
            pairs,
            vec![("Spare", Some(1)), ("Main", Some(2)), ("Backup", Some(3))]
        );
        assert_eq!(plan.updates[0].patch(), EntityPatch::new().pair_number(1));
    }

    #[test]
    fn later_record_wins_a_label_collision() {
        // "FOH" and "foh" number separately but collide on the server.
        let list = cameras(&["foh 2", "FOH 3"]);
        let plan = plan_move(EntityKind::Camera, &list, 1, 0).unwrap();
        assert_eq!(relabels(&plan), vec![("foh 2", "foh 1")]);
    }

    #[test]
    fn label_patch_carries_only_the_label() {
        let list = cameras(&["FOH 1", "FOH 2"]);
        let plan = plan_move(EntityKind::Camera, &list, 1, 0).unwrap();
        assert_eq!(plan.updates[0].patch(), EntityPatch::new().label("FOH 1"));
    }
}
