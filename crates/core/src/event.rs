// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events delivered to real-time observers
//!
//! On the wire each event becomes `{"event": <kind>, "data": <payload>, "timestamp": ...}`.
//! The timestamp is added by the fan-out hub when the event is broadcast.

use crate::id::{RequesterId, ResourceClass, ResourceRef};
use crate::machine::MachineState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events emitted after a committed mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum Event {
    MachineUpdate(MachineUpdate),
    WaitlistUpdate(WaitlistUpdate),
    FaultReported(FaultReported),
    /// Targeted at one requester's observers only
    Notification(Notification),
}

impl Event {
    /// Wire name of the event kind
    pub fn name(&self) -> &'static str {
        match self {
            Event::MachineUpdate(_) => "machine_update",
            Event::WaitlistUpdate(_) => "waitlist_update",
            Event::FaultReported(_) => "fault_reported",
            Event::Notification(_) => "notification",
        }
    }

    /// The machine this event concerns, if any
    pub fn resource(&self) -> Option<ResourceRef> {
        match self {
            Event::MachineUpdate(u) => Some(ResourceRef::new(u.resource_class, u.resource_ordinal)),
            Event::FaultReported(f) => Some(ResourceRef::new(f.resource_class, f.resource_ordinal)),
            Event::WaitlistUpdate(_) | Event::Notification(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineUpdate {
    pub resource_class: ResourceClass,
    pub resource_ordinal: u32,
    pub state: MachineState,
    pub remaining_seconds: u32,
    pub owner_id: Option<RequesterId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistUpdate {
    pub resource_class: ResourceClass,
    pub change: WaitlistChange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitlistChange {
    Joined {
        position: u32,
        requester_id: RequesterId,
    },
    Left {
        requester_id: RequesterId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultReported {
    pub resource_class: ResourceClass,
    pub resource_ordinal: u32,
    pub report_count: u32,
    pub is_disabled: bool,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub requester_id: RequesterId,
    pub kind: NotificationKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    CycleComplete,
    JoinedWaitlist,
}

/// An event stamped with the broadcast time
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<'a> {
    #[serde(flatten)]
    pub event: &'a Event,
    pub timestamp: DateTime<Utc>,
}

impl<'a> Envelope<'a> {
    pub fn new(event: &'a Event, timestamp: DateTime<Utc>) -> Self {
        Self { event, timestamp }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
