// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::{
    collections::CollectionName,
    error::Error,
    position::LocationSample,
    trip::{RideStats, TripSummary},
    vehicle::Motor,
};
use std::sync::Arc;
use strum_macros::EnumDiscriminants;

/// Represents a high-level event in the system.
///
/// Each `Event` wraps an [`EventKind`], which defines the actual type
/// and data carried by the event.
///
/// This structure is designed to be passed through an [`EventBus`]
/// between asynchronous modules.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    /// The inner event type and associated data.
    pub kind: EventKind,
}

impl Event {
    pub fn event_type(&self) -> EventKindType {
        EventKindType::from(&self.kind)
    }
}

impl From<EventKind> for Event {
    fn from(kind: EventKind) -> Self {
        Event { kind }
    }
}

/// A thread-safe, reference-counted pointer to a [`LocationSample`].
pub type LocationSamplePtr = Arc<LocationSample>;

/// A thread-safe, reference-counted pointer to a [`Motor`].
pub type MotorPtr = Arc<Motor>;

/// A thread-safe, reference-counted pointer to a [`RideStats`] snapshot.
pub type RideStatsPtr = Arc<RideStats>;

pub type TrackingStartedPtr = Arc<TrackingStarted>;
pub type SnappingDegradedPtr = Arc<SnappingDegraded>;
pub type GeocodingDegradedPtr = Arc<GeocodingDegraded>;
pub type FuelLevelPtr = Arc<FuelLevel>;
pub type FuelUpdateFailedPtr = Arc<FuelUpdateFailed>;
pub type TripSavedPtr = Arc<TripSaved>;
pub type TripSaveFailedPtr = Arc<TripSaveFailed>;

/// Published when a tracking session was started.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackingStarted {
    pub motor_id: String,
    pub start_address: String,
    pub started_at_ms: i64,
}

/// Why the road snapped path fell back to raw coordinates.
#[derive(Clone, Debug, PartialEq)]
pub enum SnappingDegradedReason {
    /// The snapping service found no road for the batch.
    NoRoadMatch,
    /// The snapping call failed.
    ServiceError(Error),
}

/// A batch of raw coordinates was appended to the snapped path unchanged.
///
/// This is a signal for observers (e.g. a toast), not an error. Tracking
/// continues unaffected.
#[derive(Clone, Debug, PartialEq)]
pub struct SnappingDegraded {
    pub reason: SnappingDegradedReason,
    pub batch_len: usize,
}

/// Reverse geocoding gave no usable address and a placeholder was used.
#[derive(Clone, Debug, PartialEq)]
pub struct GeocodingDegraded {
    pub placeholder: String,
    pub error: Option<Error>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FuelLevel {
    pub motor_id: String,
    /// Fuel level in percent, always finite and inside `0..=100`.
    pub level: f64,
}

/// The fuel level service did not accept an update after all retries.
#[derive(Clone, Debug, PartialEq)]
pub struct FuelUpdateFailed {
    pub motor_id: String,
    pub level: f64,
    pub error: Error,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TripSaved {
    pub trip_id: String,
    pub summary: Arc<TripSummary>,
}

/// Saving a finished trip failed after all retries.
///
/// Carries the complete summary so a consumer can offer a manual retry.
#[derive(Clone, Debug, PartialEq)]
pub struct TripSaveFailed {
    pub summary: Arc<TripSummary>,
    pub error: Error,
}

/// Enumerates the different kinds of events that can be emitted
/// and transmitted via the [`EventBus`].
#[derive(Clone, Debug, PartialEq, EnumDiscriminants)]
#[strum_discriminants(name(EventKindType), derive(Hash))]
pub enum EventKind {
    /// Indicates that a module shall terminate.
    QuitEvent,

    /// A new fix from the location source.
    LocationSampleEvent(LocationSamplePtr),

    /// The location source has no further samples.
    LocationSourceFinishedEvent,

    /// Requests the trip tracker to start a ride with the given motor.
    StartTripRequestEvent(MotorPtr),

    /// Requests the trip tracker to stop and finalize the current ride.
    StopTripRequestEvent,

    TrackingStartedEvent(TrackingStartedPtr),

    /// Throttled snapshot of the running ride statistics.
    RideStatsEvent(RideStatsPtr),

    SnappingDegradedEvent(SnappingDegradedPtr),

    GeocodingDegradedEvent(GeocodingDegradedPtr),

    /// No fuel level was derived because the motor has no drivable range.
    /// Carries the motor id.
    FuelUpdateSkippedEvent(Arc<String>),

    /// A new fuel level was derived and applied optimistically.
    FuelLevelUpdatedEvent(FuelLevelPtr),

    FuelUpdateFailedEvent(FuelUpdateFailedPtr),

    TripSavedEvent(TripSavedPtr),

    TripSaveFailedEvent(TripSaveFailedPtr),

    /// A collection of the domain store was replaced in memory.
    CollectionUpdatedEvent(CollectionName),

    /// The active user of the domain store changed. `None` after sign out.
    ActiveUserChangedEvent(Option<Arc<String>>),
}

/// Returns a reference to the payload of `$kind` if it is the `$variant`, `None` otherwise.
///
/// ```
/// use module_core::{EventKind, payload_ref};
/// use std::sync::Arc;
///
/// let kind = EventKind::FuelUpdateSkippedEvent(Arc::new("m-1".to_string()));
/// let motor_id = payload_ref!(kind, EventKind::FuelUpdateSkippedEvent);
/// assert_eq!(motor_id.map(|id| id.as_str()), Some("m-1"));
/// ```
#[macro_export]
macro_rules! payload_ref {
    ($kind:expr, $variant:path) => {
        match &$kind {
            $variant(payload) => Some(payload),
            _ => None,
        }
    };
}

/// A simple asynchronous event bus for publishing and subscribing to [`Event`]s.
///
/// The event bus uses a [`tokio::sync::broadcast::channel`] under the hood,
/// allowing multiple receivers to listen for the same stream of events.
///
/// Each published event is cloned and distributed to all active subscribers.
/// If no subscribers exist at the time of publication, the event is discarded silently.
pub struct EventBus {
    /// The broadcast sender used internally to distribute events.
    sender: tokio::sync::broadcast::Sender<Event>,
}

impl EventBus {
    /// Creates a new [`EventBus`] with a fixed buffer capacity of 256 messages.
    ///
    /// When the buffer is full, the oldest messages are dropped automatically
    /// as new ones are published.
    pub fn new() -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(256);
        EventBus { sender }
    }

    /// Subscribes to the event bus and returns a [`tokio::sync::broadcast::Receiver`].
    ///
    /// The returned receiver will receive all future events published after the
    /// subscription is created.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Publishes an [`Event`] to all active subscribers.
    ///
    /// If no subscribers exist, the event is discarded silently.
    pub fn publish(&self, event: &Event) {
        let _ = self.sender.send(event.clone());
    }

    /// Returns a sender for components that only emit events.
    pub fn sender(&self) -> tokio::sync::broadcast::Sender<Event> {
        self.sender.clone()
    }

    /// Creates a [`ModuleCtx`] bound to this [`EventBus`].
    ///
    /// The returned context can be used by modules implementing [`Module`]
    /// to send and receive events within their execution scope.
    pub fn context(&self) -> ModuleCtx {
        ModuleCtx::new(self)
    }
}

/// Provides a default instance of [`EventBus`].
impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Defines the common interface for an asynchronous module
/// that can be executed and communicate via the [`EventBus`].
#[async_trait::async_trait]
pub trait Module {
    /// Runs the module asynchronously until completion.
    ///
    /// This function typically contains the module's main event loop,
    /// reacting to messages received through the [`ModuleCtx`].
    async fn run(&mut self) -> Result<(), ()>;
}

/// Provides a module-scoped context for interacting with the [`EventBus`].
///
/// Each `ModuleCtx` owns both a sender and a receiver, allowing the module
/// to both publish and listen for events concurrently.
pub struct ModuleCtx {
    /// The broadcast sender used to publish events.
    pub sender: tokio::sync::broadcast::Sender<Event>,

    /// The broadcast receiver used to listen for events.
    pub receiver: tokio::sync::broadcast::Receiver<Event>,
}

impl ModuleCtx {
    /// Constructs a new [`ModuleCtx`] from the given [`EventBus`].
    ///
    /// Clones the internal broadcast sender and creates a new receiver.
    pub fn new(event_bus: &EventBus) -> Self {
        ModuleCtx {
            sender: event_bus.sender.clone(),
            receiver: event_bus.subscribe(),
        }
    }

    /// Wraps `kind` into an [`Event`] and publishes it.
    ///
    /// Returns the number of receivers the event was delivered to.
    pub fn publish_event(
        &self,
        kind: EventKind,
    ) -> Result<usize, tokio::sync::broadcast::error::SendError<Event>> {
        self.sender.send(Event { kind })
    }
}

pub mod test_helper;
