// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{Event, EventBus, EventKind, EventKindType};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::time::{Instant, timeout, timeout_at};
use tracing::debug;

/// Sends a quit signal to a running module and waits for it to stop gracefully.
///
/// This function publishes a [`QuitEvent`](EventKind::QuitEvent) through the given [`EventBus`],
/// signaling the target module to terminate. It then waits asynchronously for the module’s task
/// (represented by the provided [`tokio::task::JoinHandle`]) to complete within a fixed timeout.
///
/// # Panics
/// This function panics if:
/// - The module does not stop within 500 ms.
/// - The task panicked or returned `Err(())`.
pub async fn stop_module(
    event_bus: &EventBus,
    handle: &mut tokio::task::JoinHandle<Result<(), ()>>,
) {
    event_bus.publish(&Event {
        kind: EventKind::QuitEvent,
    });
    timeout(std::time::Duration::from_millis(500), handle)
        .await
        .expect("Module doesn't handle quit event in timeout")
        .expect("Module task panicked")
        .expect("Module returned an error");
}

/// Waits asynchronously for a specific type of [`Event`] to be received on a
/// [`tokio::sync::broadcast::Receiver`] within a given duration.
///
/// Events of other types are skipped. Only the variant type is compared,
/// payload data is ignored. A lagging receiver keeps waiting for newer events.
///
/// # Panics
///
/// This function panics if no matching event is received within `duration`.
pub async fn wait_for_event(
    rx: &mut tokio::sync::broadcast::Receiver<Event>,
    duration: std::time::Duration,
    exp_event: EventKindType,
) -> Event {
    let deadline = Instant::now() + duration;
    loop {
        match timeout_at(deadline, rx.recv()).await {
            Ok(Ok(event)) => {
                if EventKindType::from(&event.kind) == exp_event {
                    return event;
                }
            }
            Ok(Err(RecvError::Lagged(skipped))) => {
                debug!("Receiver lagged behind, skipped {} events", skipped);
            }
            Ok(Err(RecvError::Closed)) => break,
            Err(_) => break,
        }
    }
    panic!("Failed to receive event of type {:?}", exp_event);
}

/// Returns all events that are currently queued on `rx` without waiting.
pub fn drain_events(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = vec![];
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    events
}

/// Counts the queued events of type `event_type` on `rx` without waiting.
pub fn count_events(
    rx: &mut tokio::sync::broadcast::Receiver<Event>,
    event_type: EventKindType,
) -> usize {
    drain_events(rx)
        .iter()
        .filter(|event| event.event_type() == event_type)
        .count()
}
