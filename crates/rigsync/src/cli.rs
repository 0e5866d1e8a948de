//! Clap derive structures for the `rigsync` CLI.
//!
//! Defines the command tree, global flags, and shared argument types.

use clap::{Args, Parser, Subcommand, ValueEnum};

use rigsync_core::{EntityKind, NoteKind};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// rigsync -- keep a production's equipment records in sync
#[derive(Debug, Parser)]
#[command(
    name = "rigsync",
    version,
    about = "Edit live-production equipment records from the command line",
    long_about = "List, edit, reorder and annotate a production's equipment records\n\
        (cameras, monitors, media servers, checklist items, sends) while other\n\
        sessions edit them. Every write is version-checked against the server.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Server profile to use
    #[arg(long, short = 'p', env = "RIGSYNC_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Server base URL (overrides profile)
    #[arg(long, short = 's', env = "RIGSYNC_SERVER", global = true)]
    pub server: Option<String>,

    /// Production id (overrides profile)
    #[arg(long, short = 'P', env = "RIGSYNC_PRODUCTION", global = true)]
    pub production: Option<String>,

    /// API token
    #[arg(long, env = "RIGSYNC_TOKEN", global = true, hide_env = true)]
    pub token: Option<String>,

    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', env = "RIGSYNC_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation for destructive commands
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "RIGSYNC_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Entity kinds ─────────────────────────────────────────────────────

/// Equipment collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    #[value(alias = "cameras", alias = "cam")]
    Camera,
    #[value(alias = "monitors", alias = "mon")]
    Monitor,
    #[value(alias = "media-servers", alias = "ms")]
    MediaServer,
    #[value(alias = "checklist", alias = "checklist-items")]
    ChecklistItem,
    #[value(alias = "sends")]
    Send,
}

impl From<KindArg> for EntityKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Camera => Self::Camera,
            KindArg::Monitor => Self::Monitor,
            KindArg::MediaServer => Self::MediaServer,
            KindArg::ChecklistItem => Self::ChecklistItem,
            KindArg::Send => Self::Send,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NoteKindArg {
    Info,
    Completion,
}

impl From<NoteKindArg> for NoteKind {
    fn from(kind: NoteKindArg) -> Self {
        match kind {
            NoteKindArg::Info => Self::Info,
            NoteKindArg::Completion => Self::Completion,
        }
    }
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List records of one kind in display order
    #[command(alias = "ls")]
    List(ListArgs),

    /// Show one record
    #[command(alias = "get")]
    Show(RecordArgs),

    /// Create a record
    Create(CreateArgs),

    /// Update a record at the version last seen
    #[command(alias = "edit")]
    Update(UpdateArgs),

    /// Delete a record
    #[command(alias = "rm")]
    Delete(RecordArgs),

    /// Move a record to a new position and renumber its group
    #[command(alias = "mv")]
    Move(MoveArgs),

    /// Follow a kind live, printing the list on every change
    Watch(ListArgs),

    /// Read and edit a record's note history
    Note(NoteArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Record commands ──────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Record kind
    pub kind: KindArg,

    /// Only labels in this code group (e.g. FOH)
    #[arg(long, short = 'c')]
    pub code: Option<String>,

    /// Only labels containing this text
    #[arg(long)]
    pub label: Option<String>,
}

#[derive(Debug, Args)]
pub struct RecordArgs {
    /// Record kind
    pub kind: KindArg,

    /// Record uuid (a unique prefix is enough)
    pub uuid: String,
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Record kind
    pub kind: KindArg,

    /// Display label, e.g. "FOH 3"
    #[arg(long, short = 'l')]
    pub label: String,

    /// Pair number for sequentially ordered kinds
    #[arg(long)]
    pub pair_number: Option<u32>,

    /// Domain field as key=value (value parsed as JSON, else string)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub fields: Vec<String>,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub record: RecordArgs,

    /// New display label
    #[arg(long, short = 'l')]
    pub label: Option<String>,

    /// New pair number
    #[arg(long)]
    pub pair_number: Option<u32>,

    /// Domain field as key=value (value parsed as JSON, else string)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub fields: Vec<String>,

    /// Expected version [default: the version just loaded]
    #[arg(long)]
    pub expected_version: Option<u64>,
}

#[derive(Debug, Args)]
pub struct MoveArgs {
    /// Record kind
    pub kind: KindArg,

    /// Current position (0-based, as listed)
    pub from: usize,

    /// Target position (0-based, in the list without the moved record)
    pub to: usize,
}

// ── Notes ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct NoteArgs {
    #[command(subcommand)]
    pub command: NoteCommand,
}

#[derive(Debug, Subcommand)]
pub enum NoteCommand {
    /// Show a record's note history, oldest first
    #[command(alias = "ls")]
    Show {
        #[command(flatten)]
        record: RecordArgs,

        /// Only entries of this kind
        #[arg(long = "kind", value_name = "KIND")]
        note_kind: Option<NoteKindArg>,
    },

    /// Append a note
    Add {
        #[command(flatten)]
        record: RecordArgs,

        /// Note text
        text: String,

        /// Entry kind
        #[arg(long = "kind", value_name = "KIND", default_value = "info")]
        note_kind: NoteKindArg,
    },

    /// Remove one note by entry id
    #[command(alias = "rm")]
    Remove {
        #[command(flatten)]
        record: RecordArgs,

        /// Entry id
        entry_id: String,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create or replace a profile
    Init {
        /// Profile name
        #[arg(long, default_value = "default")]
        name: String,

        /// Server base URL
        #[arg(long = "url")]
        server: String,

        /// Production id
        #[arg(long = "prod")]
        production: String,

        /// Environment variable holding the token
        #[arg(long, conflicts_with = "plaintext_token")]
        token_env: Option<String>,

        /// Token stored in the config file as plaintext
        #[arg(long = "store-token")]
        plaintext_token: Option<String>,

        /// Your user id, for recognizing your own push events
        #[arg(long)]
        user_id: Option<String>,

        /// Name stamped on notes you write
        #[arg(long)]
        user_name: Option<String>,
    },

    /// Show the resolved configuration (tokens redacted)
    Show,

    /// Print the config file path
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name
        name: String,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
