// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::collections::CollectionName;
use module_core::{
    test_helper::{count_events, drain_events, wait_for_event},
    *,
};
use std::sync::Arc;

#[tokio::test]
#[test_log::test]
pub async fn events_delivered() {
    let event_bus = EventBus::new();
    let mut receiver = event_bus.subscribe();
    let event = Event {
        kind: EventKind::QuitEvent,
    };
    event_bus.publish(&event);
    let received_event =
        tokio::time::timeout(std::time::Duration::from_millis(100), receiver.recv())
            .await
            .expect("Failed to receive event in required time")
            .unwrap();
    assert_eq!(received_event.event_type(), event.event_type());
}

#[tokio::test]
#[test_log::test]
pub async fn wait_for_event_skips_other_types() {
    let event_bus = EventBus::new();
    let mut receiver = event_bus.subscribe();
    let ctx = event_bus.context();
    ctx.publish_event(EventKind::StopTripRequestEvent).unwrap();
    ctx.publish_event(EventKind::CollectionUpdatedEvent(CollectionName::Motors))
        .unwrap();

    let event = wait_for_event(
        &mut receiver,
        std::time::Duration::from_millis(100),
        EventKindType::CollectionUpdatedEvent,
    )
    .await;
    let name = payload_ref!(event.kind, EventKind::CollectionUpdatedEvent).unwrap();
    assert_eq!(*name, CollectionName::Motors);
}

#[tokio::test]
pub async fn drained_events_keep_order() {
    let event_bus = EventBus::new();
    let mut receiver = event_bus.subscribe();
    event_bus.publish(&EventKind::FuelUpdateSkippedEvent(Arc::new("m-1".to_string())).into());
    event_bus.publish(&EventKind::LocationSourceFinishedEvent.into());
    event_bus.publish(&EventKind::FuelUpdateSkippedEvent(Arc::new("m-2".to_string())).into());

    let events = drain_events(&mut receiver);
    assert_eq!(events.len(), 3);
    assert_eq!(events[1].event_type(), EventKindType::LocationSourceFinishedEvent);
    assert_eq!(
        payload_ref!(events[2].kind, EventKind::FuelUpdateSkippedEvent).map(|id| id.as_str()),
        Some("m-2")
    );
    assert_eq!(
        count_events(&mut receiver, EventKindType::FuelUpdateSkippedEvent),
        0
    );
}

#[test]
fn payload_ref_of_other_variant_is_none() {
    let kind = EventKind::StopTripRequestEvent;
    assert!(payload_ref!(kind, EventKind::TripSavedEvent).is_none());
}
