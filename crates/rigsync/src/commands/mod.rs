//! Command dispatch: bridges CLI args -> session operations -> output.

pub mod config_cmd;
pub mod notes;
pub mod records;
pub mod util;
pub mod watch;

use rigsync_core::{Session, SessionConfig};

use crate::cli::{Command, GlobalOpts, OutputFormat};
use crate::error::CliError;

/// Dispatch a server-bound command.
///
/// `watch` keeps a push-following session open; every other command loads
/// the production once without push and shuts down when done.
pub async fn dispatch(
    cmd: Command,
    config: SessionConfig,
    global: &GlobalOpts,
    format: OutputFormat,
) -> Result<(), CliError> {
    if let Command::Watch(args) = cmd {
        let session = Session::connect(config).await?;
        watch::handle(&session, &args, global, format).await;
        session.shutdown().await;
        return Ok(());
    }

    let mut config = config;
    config.push_enabled = false;
    let session = Session::connect(config).await?;

    let result = match cmd {
        Command::List(args) => {
            records::list(&session, &args, global, format);
            Ok(())
        }
        Command::Show(args) => records::show(&session, &args, global, format),
        Command::Create(args) => records::create(&session, args, global, format).await,
        Command::Update(args) => records::update(&session, args, global, format).await,
        Command::Delete(args) => records::delete(&session, &args, global).await,
        Command::Move(args) => records::move_record(&session, &args, global, format).await,
        Command::Note(args) => notes::handle(&session, args, global, format).await,
        // Handled before a session is opened
        Command::Watch(_) | Command::Config(_) | Command::Completions(_) => Ok(()),
    };

    session.shutdown().await;
    result
}
