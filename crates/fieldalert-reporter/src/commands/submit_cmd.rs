//! Submit subcommand: run the gate at a given position and submit a report.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use fieldalert_core::{Config, GeoPoint};
use tracing::info;

use super::connect_remote;
use crate::geofence::{GeofenceParams, GeofenceResolver};
use crate::location::{FixedLocationProvider, NullGeocoder};
use crate::queue::QueueDatabase;
use crate::remote::{IdentityStore, RemoteError, RemoteReportStore, StationDirectory};
use crate::report::{ReportCategory, ReportPath, ReportSnapshot, ReporterIdentity};
use crate::routing::StationRecord;
use crate::session::SessionContext;
use crate::submission::{Evidence, SubmissionCoordinator, SubmissionError, SubmissionRequest};

#[derive(clap::Args, Debug)]
pub struct SubmitArgs {
    /// Reporter latitude in decimal degrees.
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,
    /// Reporter longitude in decimal degrees.
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,
    /// Report category (fire, crime, medical, accident, disaster, other).
    #[arg(long)]
    pub category: ReportCategory,
    /// Incident type, e.g. "House fire".
    #[arg(long = "type")]
    pub incident_type: String,
    /// Photo to attach as evidence.
    #[arg(long)]
    pub image: Option<PathBuf>,
    /// Queue the report for later resync instead of sending it now.
    #[arg(long)]
    pub offline: bool,
}

/// Stand-in collaborators for offline submission without a configured
/// remote store. Never reached on the constrained channel.
struct Disconnected;

#[async_trait]
impl RemoteReportStore for Disconnected {
    async fn create_report(
        &self,
        _path: &ReportPath,
        _snapshot: &ReportSnapshot,
    ) -> Result<String, RemoteError> {
        Err(RemoteError::Http("remote store not configured".into()))
    }
}

#[async_trait]
impl StationDirectory for Disconnected {
    async fn fetch_stations(&self) -> Result<Vec<StationRecord>, RemoteError> {
        Err(RemoteError::Http("remote store not configured".into()))
    }
}

#[async_trait]
impl IdentityStore for Disconnected {
    async fn fetch_profile(&self, user_id: &str) -> Result<ReporterIdentity, RemoteError> {
        Err(RemoteError::NotFound(format!("Profile {user_id}")))
    }
}

pub async fn run(
    args: SubmitArgs,
    config: &Config,
    session: &SessionContext,
    queue: Option<QueueDatabase>,
) -> anyhow::Result<()> {
    let point = GeoPoint::checked(args.lat, args.lon)?;
    let mut out = io::stdout();

    let mut gate = GeofenceResolver::new(
        GeofenceParams::from_config(&config.service_area),
        Arc::new(FixedLocationProvider::new(point)),
        Arc::new(NullGeocoder),
        &config.location,
    );
    if let Err(e) = gate.begin_confirmation().await {
        let e = SubmissionError::from(e);
        anyhow::bail!(e.user_message().unwrap_or_else(|| e.to_string()));
    }

    let coordinator = if args.offline {
        let disconnected = Arc::new(Disconnected);
        SubmissionCoordinator::new(
            config,
            Arc::clone(&disconnected) as Arc<dyn RemoteReportStore>,
            Arc::clone(&disconnected) as Arc<dyn StationDirectory>,
            disconnected,
        )
    } else {
        let remote = connect_remote(config)?;
        SubmissionCoordinator::new(
            config,
            Arc::clone(&remote) as Arc<dyn RemoteReportStore>,
            Arc::clone(&remote) as Arc<dyn StationDirectory>,
            remote,
        )
    };
    let coordinator = match queue {
        Some(queue) => coordinator.with_queue(queue),
        None => coordinator,
    };

    let evidence = match &args.image {
        Some(path) => Some(Evidence::Raw(std::fs::read(path).map_err(|e| {
            anyhow::anyhow!("Failed to read image {}: {e}", path.display())
        })?)),
        None => None,
    };
    let request = SubmissionRequest {
        category: Some(args.category),
        incident_type: Some(args.incident_type),
        evidence,
    };

    let prepared = coordinator
        .prepare(gate.state(), session, request)
        .map_err(user_facing)?;
    writeln!(out, "{}", prepared.summary())?;

    if args.offline {
        let queue_id = coordinator
            .submit_constrained(prepared.draft())
            .await
            .map_err(user_facing)?;
        info!(queue_id, "Report queued");
        writeln!(out, "Queued as #{queue_id}; run `fieldalert resync` when online")?;
        return Ok(());
    }

    let receipt = coordinator.submit(prepared).await.map_err(user_facing)?;
    writeln!(
        out,
        "Submitted to {} ({:.0} m away){}",
        receipt.station.name,
        receipt.distance_meters,
        if receipt.media_attached {
            " with photo"
        } else {
            ""
        }
    )?;
    writeln!(out, "Report: {}", receipt.path)?;
    Ok(())
}

fn user_facing(e: SubmissionError) -> anyhow::Error {
    match e.user_message() {
        Some(message) => anyhow::anyhow!("{message} ({e})"),
        None => e.into(),
    }
}
