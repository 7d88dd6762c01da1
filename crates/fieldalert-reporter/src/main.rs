//! `FieldAlert` reporter CLI
//!
//! Submits geofenced incident reports, routes them to the nearest active
//! responder station and resyncs reports queued while offline.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use fieldalert_core::config::{load_config, load_config_from};
use fieldalert_core::Config;
use fieldalert_core::tracing_init::{filter_for_level, init_tracing};
use fieldalert_reporter::commands::{self, QueueAction, RouteArgs, SubmitArgs, queue_cmd};
use fieldalert_reporter::queue::QueueDatabase;
use fieldalert_reporter::session::{Role, SessionContext, SessionManager};

#[derive(Parser, Debug)]
#[command(name = "fieldalert")]
#[command(version, about = "FieldAlert - geofenced emergency incident reporting")]
struct Cli {
    /// Settings file to use instead of the global and project settings.
    #[arg(long, global = true, env = "FIELDALERT_CONFIG")]
    config: Option<PathBuf>,

    /// Offline queue database path.
    #[arg(long, global = true, env = "FIELDALERT_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Output logs as JSON.
    #[arg(long, global = true, env = "FIELDALERT_LOG_JSON")]
    log_json: bool,

    /// Log level filter (e.g. "info", "debug", "warn").
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Reporter user id.
    #[arg(long, global = true, env = "FIELDALERT_USER_ID", default_value = "local-reporter")]
    user_id: String,

    /// Reporter display name.
    #[arg(long, global = true, env = "FIELDALERT_USER_NAME", default_value = "Field Reporter")]
    name: String,

    /// Reporter contact number.
    #[arg(long, global = true, env = "FIELDALERT_USER_PHONE")]
    phone: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Confirm the position and submit a report.
    Submit(SubmitArgs),
    /// Deliver reports queued while offline.
    Resync,
    /// Inspect or purge the offline queue.
    Queue {
        #[command(subcommand)]
        action: QueueAction,
    },
    /// Show which station a position routes to.
    Route(RouteArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config(std::env::current_dir().ok().as_deref())?,
    };
    if let Some(level) = &cli.log_level {
        config.log_level.clone_from(level);
    }
    init_tracing(&filter_for_level(&config.log_level), cli.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        remote = config.remote.base_url.is_some(),
        "Starting fieldalert"
    );

    let mut context = SessionContext::new(&cli.user_id, &cli.name, Role::Reporter);
    if let Some(phone) = &cli.phone {
        context = context.with_phone(phone);
    }
    run_in_session(&SessionManager::new(), context, cli.command, cli.db_path, &config).await
}

/// Run `command` between login and logout. Logout happens whether or not
/// the command succeeds.
async fn run_in_session(
    sessions: &SessionManager,
    context: SessionContext,
    command: Command,
    db_path: Option<PathBuf>,
    config: &Config,
) -> anyhow::Result<()> {
    let session = sessions.login(context).await;
    let result = run(command, db_path, config, &session).await;
    sessions.logout().await;
    result
}

async fn run(
    command: Command,
    db_path: Option<PathBuf>,
    config: &Config,
    session: &SessionContext,
) -> anyhow::Result<()> {
    let db_path = match db_path.or_else(|| config.queue.database_path.clone()) {
        Some(path) => path,
        None => default_db_path()?,
    };

    match command {
        Command::Submit(args) => {
            let queue = if args.offline {
                info!(path = %db_path.display(), "Opening queue database");
                Some(QueueDatabase::open(&db_path).await?)
            } else {
                None
            };
            commands::submit_cmd::run(args, config, session, queue).await
        }
        Command::Resync => {
            let db = QueueDatabase::open(&db_path).await?;
            commands::resync(config, db, session).await
        }
        Command::Queue { action } => {
            let db = QueueDatabase::open(&db_path).await?;
            queue_cmd::run(action, &db).await
        }
        Command::Route(args) => commands::route_cmd::run(&args, config).await,
    }
}

/// Default queue database path: ~/.fieldalert/queue.db
fn default_db_path() -> anyhow::Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".fieldalert").join("queue.db"))
}
