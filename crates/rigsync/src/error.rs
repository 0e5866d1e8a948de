//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text and a stable exit code.

use miette::Diagnostic;
use thiserror::Error;

use rigsync_config::ConfigError;
use rigsync_core::{CoreError, VersionConflict};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the server at {url}")]
    #[diagnostic(
        code(rigsync::connection_failed),
        help(
            "Check that the server is running and reachable.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(rigsync::timeout),
        help("Increase the timeout with --timeout or check server responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── Authentication ───────────────────────────────────────────────

    #[error("The server rejected the API token")]
    #[diagnostic(
        code(rigsync::unauthorized),
        help(
            "Pass --token, set RIGSYNC_TOKEN, or store one with:\n\
             rigsync config init --url <URL> --prod <ID> --token-env <VAR>"
        )
    )]
    Unauthorized,

    #[error("Profile '{profile}' reads its token from ${var}, which is not set")]
    #[diagnostic(code(rigsync::missing_token), help("Export {var} or pass --token."))]
    MissingToken { profile: String, var: String },

    // ── Records ──────────────────────────────────────────────────────

    #[error("{kind} '{identifier}' not found")]
    #[diagnostic(
        code(rigsync::not_found),
        help("Run: rigsync list {kind} to see available records")
    )]
    NotFound { kind: String, identifier: String },

    #[error("{kind} {uuid} was changed by someone else (you had version {expected}, server has {current})")]
    #[diagnostic(
        code(rigsync::conflict),
        help(
            "Nothing was written. Review the current record and retry:\n\
             rigsync show {kind} {uuid}"
        )
    )]
    Conflict {
        kind: String,
        uuid: String,
        expected: u64,
        current: String,
    },

    #[error("Invalid move: {message}")]
    #[diagnostic(code(rigsync::invalid_move), help("Positions are 0-based, as listed by `rigsync list`."))]
    InvalidMove { message: String },

    // ── API ──────────────────────────────────────────────────────────

    #[error("API error ({status}): {message}")]
    #[diagnostic(code(rigsync::api_error))]
    ApiError { status: String, message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(rigsync::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(rigsync::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: rigsync config init --name {name} --url <URL> --prod <ID>"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No server configured")]
    #[diagnostic(
        code(rigsync::no_config),
        help(
            "Pass --server and --production, or create a profile with:\n\
             rigsync config init --url <URL> --prod <ID>\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(rigsync::config))]
    Config { message: String },

    // ── Other ────────────────────────────────────────────────────────

    #[error("{0}")]
    #[diagnostic(code(rigsync::internal))]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Unauthorized | Self::MissingToken { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::InvalidMove { .. } | Self::Validation { .. } | Self::NoConfig { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

impl From<VersionConflict> for CliError {
    fn from(conflict: VersionConflict) -> Self {
        Self::Conflict {
            kind: conflict.kind.to_string(),
            uuid: conflict.uuid.to_string(),
            expected: conflict.expected_version,
            current: conflict
                .current_version
                .map_or_else(|| "a newer one".into(), |v| v.to_string()),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::Timeout { timeout_secs } => Self::Timeout {
                seconds: timeout_secs,
            },
            CoreError::Unauthorized => Self::Unauthorized,
            CoreError::NotFound { kind, identifier } => Self::NotFound { kind, identifier },
            CoreError::InvalidMove { message } => Self::InvalidMove { message },
            CoreError::DragInProgress { kind } => {
                Self::Internal(format!("a {kind} move is already in progress"))
            }
            CoreError::Api { message, status } => Self::ApiError {
                status: status.map_or_else(|| "no status".into(), |s| s.to_string()),
                message,
            },
            CoreError::Config { message } => Self::Config { message },
            CoreError::Internal(message) => Self::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::UnknownProfile { name } => Self::ProfileNotFound {
                name,
                available: String::new(),
            },
            ConfigError::MissingTokenEnv { profile, var } => Self::MissingToken { profile, var },
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config {
                message: other.to_string(),
            },
        }
    }
}
