// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Machine operations
//!
//! Each machine lives in its own async mutex together with its fault
//! records. An operation holds that lock across transition, commit,
//! install and publish, so operations on one machine are totally ordered
//! and their events reach the hub in the same order. Operations on
//! different machines never wait on each other.

use crate::error::CoreError;
use crate::hub::Hub;
use crate::runtime::commit;
use std::collections::BTreeMap;
use std::sync::Arc;
use suds_core::{
    Clock, CycleKind, FaultMonitor, FaultRecord, FaultTally, Machine, MachineInput, Operation,
    RequesterId, ResourceClass, ResourceRef, Settings,
};
use suds_storage::Journal;
use tokio::sync::Mutex;

struct MachineCell {
    machine: Machine,
    faults: Vec<FaultRecord>,
}

/// Result of a successful start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOutcome {
    pub machine: Machine,
    /// Cycle length the machine was started with
    pub seconds: u32,
}

pub struct Coordinator<C: Clock> {
    cells: BTreeMap<ResourceRef, Mutex<MachineCell>>,
    journal: Arc<dyn Journal>,
    hub: Hub,
    monitor: FaultMonitor,
    settings: Settings,
    clock: C,
}

impl<C: Clock> Coordinator<C> {
    pub fn new(
        machines: BTreeMap<ResourceRef, Machine>,
        mut faults: BTreeMap<ResourceRef, Vec<FaultRecord>>,
        journal: Arc<dyn Journal>,
        hub: Hub,
        settings: Settings,
        clock: C,
    ) -> Self {
        let cells = machines
            .into_iter()
            .map(|(resource, machine)| {
                let faults = faults.remove(&resource).unwrap_or_default();
                (resource, Mutex::new(MachineCell { machine, faults }))
            })
            .collect();
        Self {
            cells,
            journal,
            hub,
            monitor: FaultMonitor::new(settings.fault_disable_threshold),
            settings,
            clock,
        }
    }

    fn cell(&self, resource: ResourceRef) -> Result<&Mutex<MachineCell>, CoreError> {
        self.cells.get(&resource).ok_or(CoreError::NotFound(resource))
    }

    /// Every known machine reference, ordered by class then ordinal
    pub fn resources(&self) -> impl Iterator<Item = ResourceRef> + '_ {
        self.cells.keys().copied()
    }

    /// Claim an available machine for `requester`
    pub async fn start(
        &self,
        resource: ResourceRef,
        requester: RequesterId,
        cycle: CycleKind,
    ) -> Result<StartOutcome, CoreError> {
        let seconds = self.settings.cycle_seconds(cycle);
        let machine = self
            .apply(
                resource,
                MachineInput::Start {
                    requester,
                    cycle,
                    seconds,
                },
            )
            .await?;
        Ok(StartOutcome { machine, seconds })
    }

    /// Abort the owner's running cycle
    pub async fn cancel(
        &self,
        resource: ResourceRef,
        requester: RequesterId,
    ) -> Result<Machine, CoreError> {
        self.apply(resource, MachineInput::Cancel { requester }).await
    }

    /// Mark the running cycle finished; the owner is notified
    pub async fn end(
        &self,
        resource: ResourceRef,
        requester: RequesterId,
    ) -> Result<Machine, CoreError> {
        self.apply(resource, MachineInput::End { requester }).await
    }

    /// Empty a completed machine, making it available again
    pub async fn collect(
        &self,
        resource: ResourceRef,
        requester: RequesterId,
    ) -> Result<Machine, CoreError> {
        self.apply(resource, MachineInput::Collect { requester }).await
    }

    async fn apply(
        &self,
        resource: ResourceRef,
        input: MachineInput,
    ) -> Result<Machine, CoreError> {
        let mut cell = self.cell(resource)?.lock().await;
        let (next, effects) = cell.machine.transition(input).map_err(|e| {
            tracing::debug!(%resource, error = %e, "transition rejected");
            e
        })?;

        commit(
            self.journal.as_ref(),
            &Operation::MachineUpdate {
                machine: next.clone(),
            },
        )?;

        tracing::info!(
            %resource,
            state = %next.state,
            owner = ?next.owner_id,
            "machine updated"
        );
        cell.machine = next;
        self.hub.dispatch(effects);
        Ok(cell.machine.clone())
    }

    /// Record a fault report, disabling the machine at the threshold
    pub async fn report_fault(
        &self,
        resource: ResourceRef,
        reporter: RequesterId,
        description: impl Into<String>,
        photo: Option<String>,
    ) -> Result<FaultTally, CoreError> {
        let mut cell = self.cell(resource)?.lock().await;
        let verdict = self.monitor.evaluate(&cell.faults);
        let record = FaultRecord {
            resource,
            reporter_id: reporter,
            description: description.into(),
            photo,
            reported_at: self.clock.now(),
        };

        let machine = if verdict.should_disable {
            let (disabled, _) = cell.machine.transition(MachineInput::Disable)?;
            disabled
        } else {
            cell.machine.clone()
        };
        let tally = FaultTally {
            count: verdict.count,
            disabled: !machine.enabled,
        };

        commit(
            self.journal.as_ref(),
            &Operation::FaultRecorded {
                record: record.clone(),
                machine: machine.clone(),
            },
        )?;

        if verdict.should_disable && cell.machine.enabled {
            tracing::warn!(%resource, count = verdict.count, "machine disabled after fault reports");
        } else {
            tracing::info!(%resource, count = verdict.count, %reporter, "fault reported");
        }
        let event = tally.event(resource, record.description.as_str());
        cell.machine = machine;
        cell.faults.push(record);
        self.hub.publish(event);
        Ok(tally)
    }

    /// Consistent snapshot of one machine
    pub async fn machine(&self, resource: ResourceRef) -> Result<Machine, CoreError> {
        Ok(self.cell(resource)?.lock().await.machine.clone())
    }

    /// Snapshots of every machine in a class, ordered by ordinal
    pub async fn machines(&self, class: ResourceClass) -> Vec<Machine> {
        let mut out = Vec::new();
        for (resource, cell) in &self.cells {
            if resource.class == class {
                out.push(cell.lock().await.machine.clone());
            }
        }
        out
    }

    pub async fn fault_count(&self, resource: ResourceRef) -> Result<FaultTally, CoreError> {
        let cell = self.cell(resource)?.lock().await;
        Ok(FaultTally {
            count: u32::try_from(cell.faults.len()).unwrap_or(u32::MAX),
            disabled: !cell.machine.enabled,
        })
    }

    /// Every fault report, newest first
    pub async fn fault_reports(&self) -> Vec<FaultRecord> {
        let mut out = Vec::new();
        for cell in self.cells.values() {
            out.extend(cell.lock().await.faults.iter().rev().cloned());
        }
        out.sort_by(|a, b| b.reported_at.cmp(&a.reported_at));
        out
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
