// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

mod config;

use anyhow::{Context, Result, anyhow, bail};
use api::{AuthTokenSource, HttpApiClient};
use clap::Parser;
use common::{
    clock::{Clock, SystemClock},
    vehicle::Motor,
};
use config::{RunnerConfig, read_waypoints_from_file};
use dirs::data_local_dir;
use domain_store::DomainStore;
use gnss::ConstantLocationModule;
use module_core::{Event, EventBus, EventKind, Module};
use std::{path::PathBuf, sync::Arc, time::Duration};
use storage::{FileSystemStorage, KeyValueStorage};
use tokio::sync::broadcast::{Receiver, error::RecvError};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use trip_tracker::{TrackerServices, TripTracker, TripTrackerModule};

/// Replays a recorded route as a tracked ride and stores it as trip.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Id of the signed in user.
    #[arg(short, long)]
    user: String,
    /// Motor used for the ride, the first motor of the user if not set.
    #[arg(short, long)]
    motor: Option<String>,
    /// CSV file with `longitude,latitude` rows.
    #[arg(short = 'f', long)]
    route_file: PathBuf,
    /// JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Overrides the API base URL of the configuration.
    #[arg(long)]
    base_url: Option<String>,
    /// Bearer token, the persisted token is used if not set.
    #[arg(long)]
    token: Option<String>,
    /// Replay speed in m/s.
    #[arg(long, default_value_t = 10.0)]
    speed: f64,
    /// Time between two replayed samples.
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,
    #[arg(long)]
    storage_dir: Option<PathBuf>,
}

fn get_storage_dir(cli: &Cli) -> Result<PathBuf> {
    if let Some(dir) = &cli.storage_dir {
        return Ok(dir.clone());
    }
    let mut storage_dir = data_local_dir().context("Could not determine local data directory")?;
    storage_dir.push("ride");
    Ok(storage_dir)
}

fn select_motor(store: &DomainStore, motor_id: Option<&str>) -> Result<Motor> {
    match motor_id {
        Some(id) => store
            .motor(id)
            .ok_or_else(|| anyhow!("Motor {} is unknown", id)),
        None => store
            .motors()
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("The user has no motor")),
    }
}

/// Starts the ride, stops it when the replay ends or Ctrl-C was pressed and
/// quits all modules once the trip was handled.
async fn control_ride(event_bus: &EventBus, mut rx: Receiver<Event>) {
    loop {
        match rx.recv().await {
            Ok(event) => match event.kind {
                EventKind::LocationSourceFinishedEvent => {
                    info!("Route replayed, stopping ride");
                    event_bus.publish(&Event {
                        kind: EventKind::StopTripRequestEvent,
                    });
                }
                EventKind::TrackingStartedEvent(started) => {
                    info!("Ride started at {}", started.start_address);
                }
                EventKind::RideStatsEvent(stats) => {
                    info!(
                        "{:.3} km, {:.1} km/h",
                        stats.distance_meters / 1000.0,
                        stats.current_speed_kmh
                    );
                }
                EventKind::SnappingDegradedEvent(degraded) => {
                    warn!("Road snapping degraded: {:?}", degraded.reason);
                }
                EventKind::FuelUpdateFailedEvent(failed) => {
                    warn!("Fuel level {:.1} not stored: {}", failed.level, failed.error);
                }
                EventKind::TripSavedEvent(saved) => {
                    info!(
                        "Stored trip {} from {} to {}",
                        saved.trip_id, saved.summary.start_address, saved.summary.end_address
                    );
                    break;
                }
                EventKind::TripSaveFailedEvent(failed) => {
                    error!("Trip could not be stored: {}", failed.error);
                    break;
                }
                _ => (),
            },
            Err(RecvError::Lagged(skipped)) => warn!("Controller skipped {} events", skipped),
            Err(RecvError::Closed) => break,
        }
    }
    event_bus.publish(&Event {
        kind: EventKind::QuitEvent,
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut config = RunnerConfig::load(cli.config.as_deref())?;
    if let Some(base_url) = &cli.base_url {
        config.api.base_url = base_url.clone();
    }
    let waypoints = read_waypoints_from_file(&cli.route_file)?;

    let storage: Arc<dyn KeyValueStorage> = Arc::new(FileSystemStorage::new(&get_storage_dir(&cli)?));
    let tokens = Arc::new(AuthTokenSource::new(Some(storage.clone())));
    if let Some(token) = &cli.token {
        tokens.set_token(Some(token.clone()));
    }
    let client = Arc::new(HttpApiClient::new(config.api.clone(), tokens)?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let eb = EventBus::default();

    let store = Arc::new(DomainStore::new(
        storage,
        client.clone(),
        eb.sender(),
        config.store.clone(),
        clock.clone(),
    ));
    store.initialize(&cli.user).await?;
    let motor = select_motor(&store, cli.motor.as_deref())?;
    info!("Riding {} ({})", motor.nickname, motor.id);

    let tracker = TripTracker::new(
        TrackerServices {
            snapper: client.clone(),
            geocoder: client.clone(),
            fuel_updater: client.clone(),
            trips: client,
        },
        Some(store),
        config.tracker.clone(),
        clock.clone(),
        eb.sender(),
    );
    let mut tracker_module = TripTrackerModule::new(eb.context(), tracker);
    let mut location_source = ConstantLocationModule::new(
        eb.context(),
        &waypoints,
        cli.speed,
        Duration::from_millis(cli.interval_ms),
        clock,
    )?;

    let sender = eb.sender();
    ctrlc::set_handler(move || {
        let _ = sender.send(Event {
            kind: EventKind::StopTripRequestEvent,
        });
    })
    .context("Failed to install Ctrl-C handler")?;

    let controller_rx = eb.subscribe();
    eb.publish(&Event {
        kind: EventKind::StartTripRequestEvent(Arc::new(motor)),
    });
    info!("Starting modules...");
    let (tracker_result, source_result, ()) = tokio::join!(
        tracker_module.run(),
        location_source.run(),
        control_ride(&eb, controller_rx)
    );
    if tracker_result.is_err() || source_result.is_err() {
        bail!("A module stopped with an error");
    }
    Ok(())
}

#[cfg(test)]
mod tests;
