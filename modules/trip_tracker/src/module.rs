// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::TripTracker;
use common::position::LocationSample;
use module_core::{EventKind, Module, ModuleCtx};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

/// Time the module waits for queued fuel updates when it quits.
const FUEL_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs a [`TripTracker`] on the event bus.
///
/// Location samples and start/stop requests arrive as events, the tracker's
/// notifications leave through the same bus. A periodic tick closes timed out
/// snapping batches and releases throttled ride statistics.
pub struct TripTrackerModule {
    ctx: ModuleCtx,
    tracker: TripTracker,
    last_sample: Option<LocationSample>,
}

impl TripTrackerModule {
    pub fn new(ctx: ModuleCtx, tracker: TripTracker) -> Self {
        TripTrackerModule {
            ctx,
            tracker,
            last_sample: None,
        }
    }

    async fn handle_event(&mut self, kind: EventKind) {
        match kind {
            EventKind::LocationSampleEvent(sample) => {
                self.last_sample = Some(*sample);
                if let Err(e) = self.tracker.on_location_sample(*sample) {
                    warn!("Rejected location sample. Error: {}", e);
                }
            }
            EventKind::StartTripRequestEvent(motor) => {
                // the latest fix is the start location of the ride
                if let Err(e) = self
                    .tracker
                    .start(motor.as_ref().clone(), self.last_sample)
                    .await
                {
                    error!("Failed to start ride. Error: {}", e);
                }
            }
            EventKind::StopTripRequestEvent => match self.tracker.stop().await {
                Ok(Some(trip_id)) => info!("Ride stored as trip {}", trip_id),
                Ok(None) => debug!("Stop requested without a ride"),
                Err(e) => error!("Failed to store ride. Error: {}", e),
            },
            _ => (),
        }
    }
}

#[async_trait::async_trait]
impl Module for TripTrackerModule {
    async fn run(&mut self) -> Result<(), ()> {
        let mut tick = tokio::time::interval(Duration::from_millis(
            self.tracker.config().tick_interval_ms.max(1),
        ));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let mut run = true;
        while run {
            tokio::select! {
                event = self.ctx.receiver.recv() => {
                    match event {
                        Ok(event) => {
                            if event.kind == EventKind::QuitEvent {
                                run = false;
                            } else {
                                self.handle_event(event.kind).await;
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("Trip tracker lagged behind, {} events lost", skipped);
                        }
                        Err(RecvError::Closed) => run = false,
                    }
                }
                Some(outcome) = self.tracker.next_snap_outcome() => {
                    self.tracker.apply_snap_outcome(outcome);
                }
                _ = tick.tick() => {
                    self.tracker.on_tick();
                }
            }
        }
        self.tracker.shutdown(FUEL_FLUSH_TIMEOUT).await;
        info!("Trip tracker module stopped");
        Ok(())
    }
}
