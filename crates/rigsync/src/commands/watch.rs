//! `watch`: print a kind's list, then again on every change until Ctrl-C.

use chrono::Local;

use rigsync_core::{EntityKind, Session, Transport};

use crate::cli::{GlobalOpts, ListArgs, OutputFormat};
use crate::output;

use super::records;

pub async fn handle<T: Transport>(
    session: &Session<T>,
    args: &ListArgs,
    global: &GlobalOpts,
    format: OutputFormat,
) {
    let kind: EntityKind = args.kind.into();
    let filter = records::filter_for(args);
    let mut stream = session.subscribe(kind);

    print_snapshot(format, stream.current(), &filter, global);

    loop {
        tokio::select! {
            changed = stream.changed() => {
                let Some(snapshot) = changed else {
                    break;
                };
                print_snapshot(format, &snapshot, &filter, global);
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::debug!(%kind, "watch interrupted");
                break;
            }
        }
    }
}

fn print_snapshot(
    format: OutputFormat,
    snapshot: &rigsync_core::Snapshot,
    filter: &rigsync_core::EntityFilter,
    global: &GlobalOpts,
) {
    if format == OutputFormat::Table && !global.quiet {
        eprintln!("── {} ──", Local::now().format("%H:%M:%S"));
    }
    let out = records::render_records(format, snapshot, filter);
    output::print_output(&out, global.quiet);
}
