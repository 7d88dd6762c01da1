//! Queue subcommands: list, purge.

use std::io::{self, Write};

use crate::queue::QueueDatabase;

/// Queue subcommand actions.
#[derive(clap::Subcommand, Debug)]
pub enum QueueAction {
    /// List every queued report.
    List {
        /// Print entries as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Delete reports already delivered.
    Purge,
}

/// Execute a queue subcommand.
pub async fn run(action: QueueAction, db: &QueueDatabase) -> anyhow::Result<()> {
    match action {
        QueueAction::List { json } => list(db, json).await,
        QueueAction::Purge => purge(db).await,
    }
}

async fn list(db: &QueueDatabase, json: bool) -> anyhow::Result<()> {
    let entries = db.list_entries().await?;
    let mut out = io::stdout();
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&entries)?)?;
        return Ok(());
    }
    if entries.is_empty() {
        writeln!(out, "Queue is empty")?;
        return Ok(());
    }
    writeln!(
        out,
        "{:<6} {:<8} {:<10} {:<20} {:<24} LOCATION",
        "ID", "STATUS", "CATEGORY", "CREATED", "TYPE"
    )?;
    for e in &entries {
        let created = format!("{} {}", e.date, e.time);
        writeln!(
            out,
            "{:<6} {:<8} {:<10} {:<20} {:<24} {}",
            e.id,
            e.status,
            e.report_category(),
            created,
            e.report,
            if e.location.is_empty() {
                e.point().to_string()
            } else {
                e.location.clone()
            }
        )?;
    }
    Ok(())
}

async fn purge(db: &QueueDatabase) -> anyhow::Result<()> {
    let removed = db.purge_sent().await?;
    writeln!(io::stdout(), "Purged {removed} sent report(s)")?;
    Ok(())
}
