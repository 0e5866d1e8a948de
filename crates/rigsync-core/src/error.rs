// ── Core error types ──
//
// User-facing errors from rigsync-core. These are NOT transport-specific --
// consumers never see HTTP status codes or JSON parse failures directly.
// Version conflicts are not errors at all: they are returned as
// `UpdateOutcome::Conflict` so every call site has to handle them.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach server at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Unauthorized -- check the configured API token")]
    Unauthorized,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("{kind} not found: {identifier}")]
    NotFound { kind: String, identifier: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Invalid move: {message}")]
    InvalidMove { message: String },

    #[error("Drag already in progress for {kind}")]
    DragInProgress { kind: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Returns `true` for failures a user can reasonably retry by hand.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. } | Self::Timeout { .. } => true,
            Self::Api { status, .. } => status.is_some_and(|s| s >= 500),
            _ => false,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<rigsync_api::Error> for CoreError {
    fn from(err: rigsync_api::Error) -> Self {
        match err {
            rigsync_api::Error::Unauthorized => CoreError::Unauthorized,
            rigsync_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            rigsync_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            rigsync_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            rigsync_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            rigsync_api::Error::NotFound { path } => CoreError::NotFound {
                kind: "resource".into(),
                identifier: path,
            },
            rigsync_api::Error::Http { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            rigsync_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("Push channel connection failed: {reason}"),
            },
            rigsync_api::Error::WebSocketClosed { code, reason } => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("Push channel closed (code {code}): {reason}"),
            },
            rigsync_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
