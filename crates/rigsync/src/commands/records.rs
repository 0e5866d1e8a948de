//! Record command handlers: list, show, create, update, delete, move.

use std::sync::Arc;

use rigsync_core::{
    Entity, EntityFilter, EntityKind, EntityPatch, Session, Transport, UpdateOutcome,
};

use crate::cli::{CreateArgs, GlobalOpts, ListArgs, MoveArgs, OutputFormat, RecordArgs, UpdateArgs};
use crate::error::CliError;
use crate::output::{self, EntityRow};

use super::util;

/// Filter built from `--code` / `--label`.
pub fn filter_for(args: &ListArgs) -> EntityFilter {
    match (&args.code, &args.label) {
        (Some(code), None) => EntityFilter::ByCode(code.clone()),
        (None, Some(text)) => EntityFilter::LabelContains(text.clone()),
        (Some(code), Some(text)) => {
            let code = EntityFilter::ByCode(code.clone());
            let text = EntityFilter::LabelContains(text.clone());
            EntityFilter::Custom(Box::new(move |e| code.matches(e) && text.matches(e)))
        }
        (None, None) => EntityFilter::All,
    }
}

/// Render records in display order. Positions are those of the full list,
/// so they stay valid for `move` when a filter is applied.
pub fn render_records(
    format: OutputFormat,
    snapshot: &[Arc<Entity>],
    filter: &EntityFilter,
) -> String {
    let (positions, records): (Vec<usize>, Vec<Entity>) = snapshot
        .iter()
        .enumerate()
        .filter(|(_, e)| filter.matches(e))
        .map(|(i, e)| (i, Entity::clone(e)))
        .unzip();

    output::render_list(
        format,
        &records,
        |i, e| EntityRow::new(positions.get(i).copied().unwrap_or(i), e),
        |e| e.uuid.to_string(),
    )
}

pub fn list<T: Transport>(
    session: &Session<T>,
    args: &ListArgs,
    global: &GlobalOpts,
    format: OutputFormat,
) {
    let snapshot = session.snapshot(args.kind.into());
    let out = render_records(format, &snapshot, &filter_for(args));
    output::print_output(&out, global.quiet);
}

pub fn show<T: Transport>(
    session: &Session<T>,
    args: &RecordArgs,
    global: &GlobalOpts,
    format: OutputFormat,
) -> Result<(), CliError> {
    let kind: EntityKind = args.kind.into();
    let uuid = util::resolve_uuid(session, kind, &args.uuid)?;
    let entity = session
        .store()
        .get(kind, uuid)
        .ok_or_else(|| CliError::NotFound {
            kind: kind.to_string(),
            identifier: args.uuid.clone(),
        })?;

    let out = output::render_single(format, entity.as_ref(), output::entity_detail, |e| {
        e.uuid.to_string()
    });
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn create<T: Transport>(
    session: &Session<T>,
    args: CreateArgs,
    global: &GlobalOpts,
    format: OutputFormat,
) -> Result<(), CliError> {
    let kind: EntityKind = args.kind.into();
    let mut patch = EntityPatch::new().label(args.label);
    if let Some(pair_number) = args.pair_number {
        patch = patch.pair_number(pair_number);
    }
    patch.fields = util::parse_fields(&args.fields)?;

    let created = session.create(kind, patch).await?;
    if !global.quiet {
        eprintln!("Created {kind} {}", created.label);
    }
    let out = output::render_single(format, &created, output::entity_detail, |e| {
        e.uuid.to_string()
    });
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn update<T: Transport>(
    session: &Session<T>,
    args: UpdateArgs,
    global: &GlobalOpts,
    format: OutputFormat,
) -> Result<(), CliError> {
    let kind: EntityKind = args.record.kind.into();
    let uuid = util::resolve_uuid(session, kind, &args.record.uuid)?;

    let mut patch = EntityPatch::new();
    if let Some(label) = args.label {
        patch = patch.label(label);
    }
    if let Some(pair_number) = args.pair_number {
        patch = patch.pair_number(pair_number);
    }
    patch.fields = util::parse_fields(&args.fields)?;
    if patch.is_empty() {
        return Err(CliError::Validation {
            field: "update".into(),
            reason: "nothing to change; pass --label, --pair-number, or --set".into(),
        });
    }

    let outcome = match args.expected_version {
        Some(expected) => session.update_versioned(kind, uuid, patch, expected).await?,
        None => session.update(kind, uuid, patch).await?,
    };

    match outcome {
        UpdateOutcome::Applied(entity) => {
            if !global.quiet {
                eprintln!("Updated {kind} {} (version {})", entity.label, entity.version);
            }
            let out = output::render_single(format, &entity, output::entity_detail, |e| {
                e.uuid.to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }
        UpdateOutcome::Conflict(conflict) => Err(conflict.into()),
    }
}

pub async fn delete<T: Transport>(
    session: &Session<T>,
    args: &RecordArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let kind: EntityKind = args.kind.into();
    let uuid = util::resolve_uuid(session, kind, &args.uuid)?;
    let label = session
        .store()
        .get(kind, uuid)
        .map_or_else(|| uuid.to_string(), |e| e.label.clone());

    if !util::confirm(&format!("Delete {kind} '{label}'?"), global.yes)? {
        return Ok(());
    }

    session.delete(kind, uuid).await?;
    if !global.quiet {
        eprintln!("Deleted {kind} {label}");
    }
    Ok(())
}

/// Move through the drag controller, then print the refetched list.
pub async fn move_record<T: Transport>(
    session: &Session<T>,
    args: &MoveArgs,
    global: &GlobalOpts,
    format: OutputFormat,
) -> Result<(), CliError> {
    let kind: EntityKind = args.kind.into();
    let drag = session.drag(kind);
    drag.begin(args.from)?;
    let report = drag.drop_at(args.to).await?;

    if !global.quiet {
        if report.scheduled == 0 {
            eprintln!("Nothing to renumber");
        } else if report.is_complete() {
            eprintln!("Renumbered {} {kind} records", report.applied);
        } else {
            eprintln!(
                "Renumbered {} of {} {kind} records ({} conflicts, {} failed); showing the server's order",
                report.applied, report.scheduled, report.conflicts, report.failed
            );
        }
        if !report.converged {
            eprintln!(
                "Labels in other code groups sit between these {kind} records; the list cannot show the requested order"
            );
        }
    }

    let out = render_records(format, &session.snapshot(kind), &EntityFilter::All);
    output::print_output(&out, global.quiet);
    Ok(())
}
