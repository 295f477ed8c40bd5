// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state from WAL replay

use std::collections::BTreeMap;
use suds_core::{FaultRecord, Machine, Operation, ResourceClass, ResourceRef, Waitlist};

/// Materialized state built from WAL operations
#[derive(Debug, Clone)]
pub struct MaterializedState {
    pub machines: BTreeMap<ResourceRef, Machine>,
    pub waitlists: BTreeMap<ResourceClass, Waitlist>,
    pub faults: BTreeMap<ResourceRef, Vec<FaultRecord>>,
}

impl MaterializedState {
    /// Fresh state with machines `1..=machines_per_class` in every class
    pub fn seeded(machines_per_class: u32) -> Self {
        let mut machines = BTreeMap::new();
        let mut waitlists = BTreeMap::new();
        for class in ResourceClass::ALL {
            for ordinal in 1..=machines_per_class {
                let resource = ResourceRef::new(class, ordinal);
                machines.insert(resource, Machine::new(resource));
            }
            waitlists.insert(class, Waitlist::new(class));
        }
        Self {
            machines,
            waitlists,
            faults: BTreeMap::new(),
        }
    }

    /// Seed, then apply every operation in order
    pub fn replay(machines_per_class: u32, ops: &[Operation]) -> Self {
        let mut state = Self::seeded(machines_per_class);
        for op in ops {
            state.apply(op);
        }
        state
    }

    /// Take ownership of a class waitlist, leaving an empty one behind
    pub fn take_waitlist(&mut self, class: ResourceClass) -> Waitlist {
        self.waitlists
            .insert(class, Waitlist::new(class))
            .unwrap_or_else(|| Waitlist::new(class))
    }

    /// Apply an operation to update the state
    pub fn apply(&mut self, op: &Operation) {
        match op {
            Operation::MachineUpdate { machine } => {
                self.machines.insert(machine.resource, machine.clone());
            }

            Operation::FaultRecorded { record, machine } => {
                self.faults
                    .entry(record.resource)
                    .or_default()
                    .push(record.clone());
                self.machines.insert(machine.resource, machine.clone());
            }

            Operation::WaitlistJoin { entry } => {
                let list = self
                    .waitlists
                    .entry(entry.resource_class)
                    .or_insert_with(|| Waitlist::new(entry.resource_class));
                list.insert(entry.clone());
            }

            Operation::WaitlistLeave {
                class,
                requester_id,
            } => {
                if let Some(list) = self.waitlists.get_mut(class) {
                    list.remove(*requester_id);
                }
            }
        }
    }

    /// Machines of one class ordered by ordinal
    pub fn machines_of(&self, class: ResourceClass) -> impl Iterator<Item = &Machine> {
        self.machines.values().filter(move |m| m.resource.class == class)
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
