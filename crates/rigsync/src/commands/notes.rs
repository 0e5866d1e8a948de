//! Note history handlers.

use rigsync_core::{EntityKind, NoteKind, Session, TimestampedEntry, Transport, UpdateOutcome, notes};

use crate::cli::{GlobalOpts, NoteArgs, NoteCommand, OutputFormat};
use crate::error::CliError;
use crate::output::{self, NoteRow};

use super::util;

pub async fn handle<T: Transport>(
    session: &Session<T>,
    args: NoteArgs,
    global: &GlobalOpts,
    format: OutputFormat,
) -> Result<(), CliError> {
    match args.command {
        NoteCommand::Show { record, note_kind } => {
            let kind: EntityKind = record.kind.into();
            let uuid = util::resolve_uuid(session, kind, &record.uuid)?;
            let entity = session.gateway().fetch(kind, uuid).await?;

            let filter = note_kind.map(NoteKind::from);
            let entries: Vec<TimestampedEntry> = notes::display_order(&entity.notes, filter.as_ref())
                .into_iter()
                .cloned()
                .collect();
            print_notes(format, &entries, global);
            Ok(())
        }

        NoteCommand::Add {
            record,
            text,
            note_kind,
        } => {
            let kind: EntityKind = record.kind.into();
            let uuid = util::resolve_uuid(session, kind, &record.uuid)?;
            if text.trim().is_empty() {
                return Err(CliError::Validation {
                    field: "text".into(),
                    reason: "note text must not be empty".into(),
                });
            }

            let outcome = session
                .append_note(kind, uuid, &text, note_kind.into())
                .await?;
            settled(outcome, "Added note to", format, global)
        }

        NoteCommand::Remove { record, entry_id } => {
            let kind: EntityKind = record.kind.into();
            let uuid = util::resolve_uuid(session, kind, &record.uuid)?;
            let outcome = session.remove_note(kind, uuid, &entry_id).await?;
            settled(outcome, "Removed note from", format, global)
        }
    }
}

fn settled(
    outcome: UpdateOutcome,
    verb: &str,
    format: OutputFormat,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match outcome {
        UpdateOutcome::Applied(entity) => {
            if !global.quiet {
                eprintln!("{verb} {} {}", entity.kind, entity.label);
            }
            let entries: Vec<TimestampedEntry> = notes::display_order(&entity.notes, None)
                .into_iter()
                .cloned()
                .collect();
            print_notes(format, &entries, global);
            Ok(())
        }
        UpdateOutcome::Conflict(conflict) => Err(conflict.into()),
    }
}

fn print_notes(format: OutputFormat, entries: &[TimestampedEntry], global: &GlobalOpts) {
    let out = output::render_list(
        format,
        entries,
        |_, e| NoteRow::from(e),
        |e| e.entry_id.clone(),
    );
    output::print_output(&out, global.quiet);
}
