//! Shared tracing/logging initialization.
//!
//! The `fieldalert` binary installs the subscriber itself. Hosts that embed
//! the reporter library (a mobile shell, an SMS gateway) may already own a
//! global subscriber, so installation never panics when one is present.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Crates whose events are enabled by [`filter_for_level`].
const FIELDALERT_TARGETS: &[&str] = &["fieldalert_core", "fieldalert_reporter", "fieldalert"];

/// Build an `EnvFilter` directive enabling `level` for every `FieldAlert` crate.
///
/// `filter_for_level("debug")` yields
/// `"fieldalert_core=debug,fieldalert_reporter=debug,fieldalert=debug"`.
pub fn filter_for_level(level: &str) -> String {
    FIELDALERT_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialise the global tracing subscriber.
///
/// * `default_filter` -- default `RUST_LOG` value when the env-var is not set.
/// * `log_json` -- when `true`, emit structured JSON log lines instead of the
///   human-readable format.
///
/// Returns `false` when another subscriber was already installed.
pub fn init_tracing(default_filter: &str, log_json: bool) -> bool {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
    );
    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = if log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
    installed.is_ok()
}
