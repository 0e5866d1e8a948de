//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::io::{self, Write};

use tabled::{Table, Tabled, settings::Style};

use rigsync_core::{Entity, TimestampedEntry};

use crate::cli::OutputFormat;

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(usize, &T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().enumerate().map(|(i, t)| to_row(i, t)).collect();
            render_table(&rows)
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => data.iter().map(&id_fn).collect::<Vec<_>>().join("\n"),
    }
}

/// Render a single item. Table mode uses `detail_fn`.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => id_fn(data),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Rows ─────────────────────────────────────────────────────────────

#[derive(Tabled)]
pub struct EntityRow {
    #[tabled(rename = "#")]
    pub position: usize,
    #[tabled(rename = "Label")]
    pub label: String,
    #[tabled(rename = "Pair")]
    pub pair: String,
    #[tabled(rename = "Version")]
    pub version: u64,
    #[tabled(rename = "Notes")]
    pub notes: usize,
    #[tabled(rename = "UUID")]
    pub uuid: String,
}

impl EntityRow {
    pub fn new(position: usize, entity: &Entity) -> Self {
        Self {
            position,
            label: entity.label.clone(),
            pair: entity
                .pair_number
                .map_or_else(String::new, |n| n.to_string()),
            version: entity.version,
            notes: entity.notes.len(),
            uuid: entity.uuid.to_string(),
        }
    }
}

#[derive(Tabled)]
pub struct NoteRow {
    #[tabled(rename = "When")]
    pub when: String,
    #[tabled(rename = "Kind")]
    pub kind: String,
    #[tabled(rename = "Author")]
    pub author: String,
    #[tabled(rename = "Text")]
    pub text: String,
    #[tabled(rename = "Entry")]
    pub entry_id: String,
}

impl From<&TimestampedEntry> for NoteRow {
    fn from(entry: &TimestampedEntry) -> Self {
        Self {
            when: entry.at().map_or_else(
                || entry.timestamp.to_string(),
                |at| at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ),
            kind: entry.kind.to_string(),
            author: entry.author_name.clone().unwrap_or_default(),
            text: entry.text.clone(),
            entry_id: entry.entry_id.clone(),
        }
    }
}

/// Key/value detail view of one record.
pub fn entity_detail(entity: &Entity) -> String {
    let mut lines = vec![
        format!("Label:    {}", entity.label),
        format!("Kind:     {}", entity.kind),
        format!("UUID:     {}", entity.uuid),
        format!("Version:  {}", entity.version),
    ];
    if let Some(pair) = entity.pair_number {
        lines.push(format!("Pair:     {pair}"));
    }
    lines.push(format!("Notes:    {}", entity.notes.len()));
    for (name, value) in &entity.fields {
        lines.push(format!("{name}: {value}"));
    }
    lines.join("\n")
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> String {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.unwrap_or_else(|e| format!("<serialization failed: {e}>"))
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).unwrap_or_else(|e| format!("<serialization failed: {e}>"))
}
