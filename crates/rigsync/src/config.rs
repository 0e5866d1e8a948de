//! CLI configuration -- thin wrapper around `rigsync_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--server, --production, --token, --timeout).

use std::time::Duration;

use secrecy::SecretString;

use rigsync_core::SessionConfig;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

pub use rigsync_config::{Config, Profile, config_path, load_config_or_default, save_config};

/// Output format: flag, then `defaults.output`, then table.
pub fn output_format(global: &GlobalOpts, config: &Config) -> OutputFormat {
    use clap::ValueEnum;

    global.output.unwrap_or_else(|| {
        OutputFormat::from_str(&config.defaults.output, true).unwrap_or(OutputFormat::Table)
    })
}

/// Build a `SessionConfig` from the config file, profile, and CLI overrides.
pub fn session_config(global: &GlobalOpts, cfg: &Config) -> Result<SessionConfig, CliError> {
    let mut session = if let Ok((profile_name, profile)) = cfg.profile(global.profile.as_deref()) {
        let mut profile = profile.clone();
        if let Some(ref server) = global.server {
            profile.server.clone_from(server);
        }
        if let Some(ref production) = global.production {
            profile.production.clone_from(production);
        }
        if global.token.is_some() {
            // Skip the profile's token_env lookup; the flag wins.
            profile.token_env = None;
        }
        rigsync_config::profile_to_session_config(&profile, profile_name, &cfg.defaults)?
    } else if let Some(ref name) = global.profile {
        return Err(CliError::ProfileNotFound {
            name: name.clone(),
            available: available_profiles(cfg),
        });
    } else {
        from_flags(global, cfg)?
    };

    if let Some(ref token) = global.token {
        session.token = Some(SecretString::from(token.clone()));
    }
    if let Some(timeout) = global.timeout {
        session.timeout = Duration::from_secs(timeout);
    }
    Ok(session)
}

/// No profile: everything comes from flags and env vars.
fn from_flags(global: &GlobalOpts, cfg: &Config) -> Result<SessionConfig, CliError> {
    let (Some(server), Some(production)) = (&global.server, &global.production) else {
        return Err(CliError::NoConfig {
            path: config_path().display().to_string(),
        });
    };

    let profile = Profile {
        server: server.clone(),
        production: production.clone(),
        token: None,
        token_env: None,
        user_id: None,
        user_name: None,
        timeout: None,
        push: None,
    };
    Ok(rigsync_config::profile_to_session_config(
        &profile,
        "(flags)",
        &cfg.defaults,
    )?)
}

pub fn available_profiles(cfg: &Config) -> String {
    let mut names: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort_unstable();
    names.join(", ")
}
