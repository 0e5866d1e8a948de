//! Shared helpers for command handlers.

use serde_json::{Map, Value};
use uuid::Uuid;

use rigsync_core::{EntityKind, Session, Transport};

use crate::error::CliError;

/// Resolve a uuid, or a unique uuid prefix, against the loaded records.
pub fn resolve_uuid<T: Transport>(
    session: &Session<T>,
    kind: EntityKind,
    identifier: &str,
) -> Result<Uuid, CliError> {
    if let Ok(uuid) = identifier.parse::<Uuid>() {
        return Ok(uuid);
    }

    let needle = identifier.to_ascii_lowercase();
    let snapshot = session.snapshot(kind);
    let mut matches = snapshot
        .iter()
        .filter(|e| e.uuid.to_string().starts_with(&needle));

    match (matches.next(), matches.next()) {
        (Some(entity), None) if !needle.is_empty() => Ok(entity.uuid),
        (Some(_), Some(_)) => Err(CliError::Validation {
            field: "uuid".into(),
            reason: format!("'{identifier}' matches more than one {kind}"),
        }),
        _ => Err(CliError::NotFound {
            kind: kind.to_string(),
            identifier: identifier.into(),
        }),
    }
}

/// Parse `--set key=value` pairs. Values that are valid JSON keep their
/// type; anything else is a string.
pub fn parse_fields(pairs: &[String]) -> Result<Map<String, Value>, CliError> {
    pairs
        .iter()
        .map(|pair| {
            let (key, raw) = pair.split_once('=').ok_or_else(|| CliError::Validation {
                field: "set".into(),
                reason: format!("expected KEY=VALUE, got '{pair}'"),
            })?;
            if key.is_empty() {
                return Err(CliError::Validation {
                    field: "set".into(),
                    reason: format!("empty key in '{pair}'"),
                });
            }
            let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.into()));
            Ok((key.to_owned(), value))
        })
        .collect()
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}
