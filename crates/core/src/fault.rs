// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fault reports and the threshold that takes a machine offline

use crate::event::{Event, FaultReported};
use crate::id::{RequesterId, ResourceRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of reports that disables a machine
pub const DEFAULT_FAULT_THRESHOLD: u32 = 3;

/// One user's report that a machine is broken. Never modified after creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultRecord {
    pub resource: ResourceRef,
    pub reporter_id: RequesterId,
    pub description: String,
    /// Base64 photo supplied by the reporter, stored as-is
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    pub reported_at: DateTime<Utc>,
}

/// Decision for one resource after counting its reports
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaultVerdict {
    pub count: u32,
    pub should_disable: bool,
}

/// Report count and disabled flag, as returned to callers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultTally {
    pub count: u32,
    pub disabled: bool,
}

impl FaultTally {
    pub fn event(&self, resource: ResourceRef, description: impl Into<String>) -> Event {
        Event::FaultReported(FaultReported {
            resource_class: resource.class,
            resource_ordinal: resource.ordinal,
            report_count: self.count,
            is_disabled: self.disabled,
            description: description.into(),
        })
    }
}

/// Stateless threshold policy over a resource's fault records
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaultMonitor {
    threshold: u32,
}

impl FaultMonitor {
    /// A threshold of zero would disable on the first read; it is raised to one
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn should_disable(&self, count: u32) -> bool {
        count >= self.threshold
    }

    /// Evaluate the records already stored plus the one being recorded now
    pub fn evaluate(&self, existing: &[FaultRecord]) -> FaultVerdict {
        let count = u32::try_from(existing.len())
            .unwrap_or(u32::MAX)
            .saturating_add(1);
        FaultVerdict {
            count,
            should_disable: self.should_disable(count),
        }
    }
}

impl Default for FaultMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_FAULT_THRESHOLD)
    }
}
