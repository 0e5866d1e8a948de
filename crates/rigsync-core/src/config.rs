// ── Runtime session configuration ──
//
// These types describe *how* to reach a production's server. They carry
// credential data and connection tuning, but never touch disk.
// Front ends (rigsync-config, the CLI) construct a `SessionConfig` and hand it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// Backoff tuning for the push channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectSettings {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// `None` retries forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

impl From<&ReconnectSettings> for rigsync_api::ReconnectConfig {
    fn from(settings: &ReconnectSettings) -> Self {
        Self {
            initial_delay: settings.initial_delay,
            max_delay: settings.max_delay,
            max_retries: settings.max_retries,
        }
    }
}

/// Configuration for one session against one production.
///
/// Built by CLI/config layers, passed to `Session` -- core never reads config files.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Server base URL (e.g., `https://rig.example.com/api`).
    pub base_url: Url,
    /// Production whose records this session mirrors.
    pub production_id: String,
    /// Bearer token for the REST API and push channel.
    pub token: Option<SecretString>,
    /// This session's user id, used to recognize self-echoes in logs.
    pub user_id: Option<String>,
    /// Display name stamped on notes this session writes.
    pub user_name: Option<String>,
    /// Request timeout.
    pub timeout: Duration,
    /// Subscribe to the push channel after the initial load.
    pub push_enabled: bool,
    pub reconnect: ReconnectSettings,
}

impl SessionConfig {
    /// Config with default tuning for the given server and production.
    pub fn new(base_url: Url, production_id: impl Into<String>) -> Self {
        Self {
            base_url,
            production_id: production_id.into(),
            token: None,
            user_id: None,
            user_name: None,
            timeout: Duration::from_secs(30),
            push_enabled: true,
            reconnect: ReconnectSettings::default(),
        }
    }

    pub(crate) fn transport(&self) -> rigsync_api::TransportConfig {
        rigsync_api::TransportConfig {
            timeout: self.timeout,
            token: self.token.clone(),
        }
    }
}
