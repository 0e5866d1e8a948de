mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let cfg = config::load_config_or_default();
    let format = config::output_format(&cli.global, &cfg);

    match cli.command {
        // Config commands don't need a server
        Command::Config(args) => commands::config_cmd::handle(args, cfg, &cli.global, format),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "rigsync", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let session_config = config::session_config(&cli.global, &cfg)?;
            tracing::debug!(command = ?cmd, server = %session_config.base_url, "dispatching command");
            commands::dispatch(cmd, session_config, &cli.global, format).await
        }
    }
}
