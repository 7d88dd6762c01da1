//! Command-line subcommands of the `fieldalert` binary.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

pub mod queue_cmd;
pub mod route_cmd;
pub mod submit_cmd;

use std::sync::Arc;

use fieldalert_core::Config;

use crate::queue::{QueueDatabase, ResyncWorker};
use crate::remote::RestRemote;
use crate::session::SessionContext;

pub use queue_cmd::QueueAction;
pub use route_cmd::RouteArgs;
pub use submit_cmd::SubmitArgs;

/// Build the remote client, with a hint when it is not configured.
pub fn connect_remote(config: &Config) -> anyhow::Result<Arc<RestRemote>> {
    RestRemote::new(&config.remote).map(Arc::new).map_err(|e| {
        anyhow::anyhow!("{e}. Set remote.base_url in settings.json or FIELDALERT_REMOTE_URL")
    })
}

/// Run one resync pass over the offline queue.
pub async fn resync(
    config: &Config,
    db: QueueDatabase,
    session: &SessionContext,
) -> anyhow::Result<()> {
    use std::io::{self, Write};

    let remote = connect_remote(config)?;
    let worker = ResyncWorker::new(
        db,
        Arc::clone(&remote) as Arc<dyn crate::remote::RemoteReportStore>,
        remote,
        config.remote.station_root.clone(),
    );
    let summary = worker.run_pass(session).await?;

    let mut out = io::stdout();
    writeln!(
        out,
        "Resync: {} pending, {} sent, {} skipped, {} purged",
        summary.pending, summary.sent, summary.skipped, summary.purged
    )?;
    if let Some(reason) = summary.halted {
        writeln!(out, "Stopped early: {reason}")?;
    }
    Ok(())
}
