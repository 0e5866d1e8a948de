//! Shared configuration for rigsync front ends.
//!
//! TOML profiles, token resolution (env var + plaintext), and translation
//! to `rigsync_core::SessionConfig`. The CLI layers its flag overrides on
//! top of what this crate resolves.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rigsync_core::{ReconnectSettings, SessionConfig};

/// Environment variable consulted for the token when a profile names none.
pub const TOKEN_ENV: &str = "RIGSYNC_TOKEN";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no profile named '{name}'")]
    UnknownProfile { name: String },

    #[error("profile '{profile}' reads its token from ${var}, which is not set")]
    MissingTokenEnv { profile: String, var: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named server/production profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up `name`, or the default profile when `name` is `None`.
    pub fn profile<'a>(&'a self, name: Option<&'a str>) -> Result<(&'a str, &'a Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get(name)
            .map(|profile| (name, profile))
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Follow the push channel in long-running commands.
    #[serde(default = "default_push")]
    pub push: bool,

    /// First reconnect delay in milliseconds.
    #[serde(default = "default_reconnect_initial_ms")]
    pub reconnect_initial_ms: u64,

    /// Backoff ceiling in seconds.
    #[serde(default = "default_reconnect_max_secs")]
    pub reconnect_max_secs: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            timeout: default_timeout(),
            push: default_push(),
            reconnect_initial_ms: default_reconnect_initial_ms(),
            reconnect_max_secs: default_reconnect_max_secs(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_push() -> bool {
    true
}
fn default_reconnect_initial_ms() -> u64 {
    1000
}
fn default_reconnect_max_secs() -> u64 {
    30
}

/// A named server + production pair.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// Server base URL (e.g., "https://rig.example.com/api").
    pub server: String,

    /// Production id.
    pub production: String,

    /// API token (plaintext; prefer `token_env`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Environment variable holding the API token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,

    /// This user's id, for recognizing our own push echoes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Name stamped on notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,

    /// Override timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Override push subscription.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push: Option<bool>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "rigsync", "rigsync").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("rigsync");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from a specific file, layered as defaults → file → `RIGSYNC_*` env.
///
/// Env keys nest with `__`: `RIGSYNC_DEFAULTS__TIMEOUT=5`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("RIGSYNC_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist or is broken.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Token resolution ────────────────────────────────────────────────

/// Resolve the API token.
///
/// Order: the profile's `token_env` variable, then [`TOKEN_ENV`], then the
/// plaintext `token`. No token at all is fine; some servers run open.
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Result<Option<SecretString>, ConfigError> {
    if let Some(ref var) = profile.token_env {
        return std::env::var(var)
            .map(|val| Some(SecretString::from(val)))
            .map_err(|_| ConfigError::MissingTokenEnv {
                profile: profile_name.into(),
                var: var.clone(),
            });
    }

    if let Ok(val) = std::env::var(TOKEN_ENV) {
        return Ok(Some(SecretString::from(val)));
    }

    Ok(profile.token.clone().map(SecretString::from))
}

/// Build a `SessionConfig` from a profile, no CLI flag overrides.
pub fn profile_to_session_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<SessionConfig, ConfigError> {
    let base_url: url::Url = profile
        .server
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "server".into(),
            reason: format!("invalid URL: {}", profile.server),
        })?;

    if profile.production.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "production".into(),
            reason: "must not be empty".into(),
        });
    }

    let mut config = SessionConfig::new(base_url, profile.production.clone());
    config.token = resolve_token(profile, profile_name)?;
    config.user_id.clone_from(&profile.user_id);
    config.user_name.clone_from(&profile.user_name);
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.push_enabled = profile.push.unwrap_or(defaults.push);
    config.reconnect = ReconnectSettings {
        initial_delay: Duration::from_millis(defaults.reconnect_initial_ms),
        max_delay: Duration::from_secs(defaults.reconnect_max_secs),
        max_retries: None,
    };
    Ok(config)
}
