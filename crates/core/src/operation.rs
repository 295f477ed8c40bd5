// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operations for the write-ahead log
//!
//! Each committed mutation is exactly one operation, so a single WAL line is
//! the unit of atomicity.

use crate::fault::FaultRecord;
use crate::id::{RequesterId, ResourceClass, ResourceRef};
use crate::machine::Machine;
use crate::waitlist::WaitlistEntry;
use serde::{Deserialize, Serialize};

/// Operations that can be persisted to the WAL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Full machine record after a start, cancel, end, or collect
    MachineUpdate { machine: Machine },

    /// A fault report and the machine as it stands afterwards
    FaultRecorded { record: FaultRecord, machine: Machine },

    /// A requester joined a class waitlist
    WaitlistJoin { entry: WaitlistEntry },

    /// A requester left a class waitlist
    WaitlistLeave {
        class: ResourceClass,
        requester_id: RequesterId,
    },
}

impl Operation {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Operation::MachineUpdate { .. } => "machine_update",
            Operation::FaultRecorded { .. } => "fault_recorded",
            Operation::WaitlistJoin { .. } => "waitlist_join",
            Operation::WaitlistLeave { .. } => "waitlist_leave",
        }
    }

    /// Machine touched by this operation, if any
    pub fn resource(&self) -> Option<ResourceRef> {
        match self {
            Operation::MachineUpdate { machine } | Operation::FaultRecorded { machine, .. } => {
                Some(machine.resource)
            }
            Operation::WaitlistJoin { .. } | Operation::WaitlistLeave { .. } => None,
        }
    }
}
