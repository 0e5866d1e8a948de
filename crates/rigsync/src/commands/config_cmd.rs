//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

pub fn handle(
    args: ConfigArgs,
    mut cfg: Config,
    global: &GlobalOpts,
    format: OutputFormat,
) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init {
            name,
            server,
            production,
            token_env,
            plaintext_token,
            user_id,
            user_name,
        } => {
            let url: url::Url = server.parse().map_err(|_| CliError::Validation {
                field: "url".into(),
                reason: format!("invalid URL: {server}"),
            })?;

            let profile = Profile {
                server: url.to_string(),
                production,
                token: plaintext_token,
                token_env,
                user_id,
                user_name,
                timeout: None,
                push: None,
            };

            cfg.profiles.insert(name.clone(), profile);
            let default = cfg.default_profile.as_deref().unwrap_or_default();
            if !cfg.profiles.contains_key(default) {
                cfg.default_profile = Some(name.clone());
            }

            let path = config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("Saved profile '{name}' to {}", path.display());
            }
            Ok(())
        }

        ConfigCommand::Show => {
            let redacted = redact(cfg);
            let out = match format {
                OutputFormat::Table | OutputFormat::Plain => {
                    toml::to_string_pretty(&redacted).map_err(|e| CliError::Config {
                        message: format!("failed to serialize config: {e}"),
                    })?
                }
                other => output::render_single(other, &redacted, |_| String::new(), |_| String::new()),
            };
            output::print_output(out.trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            let mut names: Vec<&String> = cfg.profiles.keys().collect();
            names.sort_unstable();
            let lines: Vec<String> = names
                .into_iter()
                .map(|name| {
                    let profile = &cfg.profiles[name];
                    let marker = if name == default { "*" } else { " " };
                    format!("{marker} {name}\t{} ({})", profile.server, profile.production)
                })
                .collect();
            output::print_output(&lines.join("\n"), global.quiet);
            Ok(())
        }

        ConfigCommand::Use { name } => {
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name,
                });
            }
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("Default profile is now '{name}'");
            }
            Ok(())
        }
    }
}

/// Copy of `cfg` with plaintext tokens masked.
fn redact(mut cfg: Config) -> Config {
    for profile in cfg.profiles.values_mut() {
        if profile.token.is_some() {
            profile.token = Some("********".into());
        }
    }
    cfg
}
