//! Route subcommand: show which station a position would be routed to.

use std::io::{self, Write};

use fieldalert_core::{Config, GeoPoint};

use super::connect_remote;
use crate::remote::StationDirectory;
use crate::routing::StationRouter;

#[derive(clap::Args, Debug)]
pub struct RouteArgs {
    /// Reporter latitude in decimal degrees.
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,
    /// Reporter longitude in decimal degrees.
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,
}

pub async fn run(args: &RouteArgs, config: &Config) -> anyhow::Result<()> {
    let reporter = GeoPoint::checked(args.lat, args.lon)?;
    let stations = connect_remote(config)?.fetch_stations().await?;
    let decision = StationRouter::new().route(reporter, &stations)?;

    let mut out = io::stdout();
    writeln!(
        out,
        "{} ({}) at {:.0} m{}",
        decision.station.name,
        decision.station.id,
        decision.distance_meters,
        if decision.fallback_to_inactive {
            " [no active station, nearest inactive]"
        } else {
            ""
        }
    )?;
    Ok(())
}
