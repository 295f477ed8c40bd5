// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::{Clock, FakeClock};
use serde_json::json;

fn machine_update() -> Event {
    Event::MachineUpdate(MachineUpdate {
        resource_class: ResourceClass::Washer,
        resource_ordinal: 1,
        state: MachineState::InUse,
        remaining_seconds: 1800,
        owner_id: Some(RequesterId(42)),
    })
}

#[test]
fn machine_update_wire_shape() {
    let value = serde_json::to_value(machine_update()).unwrap();
    assert_eq!(
        value,
        json!({
            "event": "machine_update",
            "data": {
                "resource_class": "washer",
                "resource_ordinal": 1,
                "state": "in_use",
                "remaining_seconds": 1800,
                "owner_id": 42
            }
        })
    );
}

#[test]
fn released_machine_serializes_null_owner() {
    let event = Event::MachineUpdate(MachineUpdate {
        resource_class: ResourceClass::Dryer,
        resource_ordinal: 3,
        state: MachineState::Available,
        remaining_seconds: 0,
        owner_id: None,
    });
    let value = serde_json::to_value(event).unwrap();
    assert_eq!(value["data"]["owner_id"], serde_json::Value::Null);
}

#[test]
fn waitlist_changes_are_externally_tagged() {
    let joined = Event::WaitlistUpdate(WaitlistUpdate {
        resource_class: ResourceClass::Washer,
        change: WaitlistChange::Joined {
            position: 2,
            requester_id: RequesterId(9),
        },
    });
    let left = Event::WaitlistUpdate(WaitlistUpdate {
        resource_class: ResourceClass::Washer,
        change: WaitlistChange::Left {
            requester_id: RequesterId(7),
        },
    });

    assert_eq!(
        serde_json::to_value(joined).unwrap()["data"]["change"],
        json!({"joined": {"position": 2, "requester_id": 9}})
    );
    assert_eq!(
        serde_json::to_value(left).unwrap()["data"]["change"],
        json!({"left": {"requester_id": 7}})
    );
}

#[test]
fn fault_reported_wire_shape() {
    let event = Event::FaultReported(FaultReported {
        resource_class: ResourceClass::Dryer,
        resource_ordinal: 2,
        report_count: 3,
        is_disabled: true,
        description: "drum stuck".to_string(),
    });
    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["event"], "fault_reported");
    assert_eq!(value["data"]["report_count"], 3);
    assert_eq!(value["data"]["is_disabled"], true);
    assert_eq!(event.resource(), Some(ResourceRef::dryer(2)));
}

#[test]
fn event_names_match_wire_tags() {
    let event = machine_update();
    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["event"], event.name());
}

#[test]
fn envelope_adds_timestamp_next_to_tag() {
    let clock = FakeClock::new();
    let event = machine_update();
    let json = Envelope::new(&event, clock.now()).to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["event"], "machine_update");
    assert_eq!(value["data"]["owner_id"], 42);
    assert_eq!(value["timestamp"], "2026-01-01T00:00:00Z");
}

#[test]
fn events_roundtrip_through_json() {
    let event = Event::Notification(Notification {
        requester_id: RequesterId(42),
        kind: NotificationKind::CycleComplete,
        message: "washer#1 finished".to_string(),
    });
    let json = serde_json::to_string(&event).unwrap();
    let back: Event = serde_json::from_str(&json).unwrap();
    assert_eq!(back, event);
}
