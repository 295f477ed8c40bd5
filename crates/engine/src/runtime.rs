// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime wiring for the laundry coordinator

use crate::coordinator::Coordinator;
use crate::error::CoreError;
use crate::hub::Hub;
use crate::waitlist::WaitlistManager;
use std::sync::Arc;
use suds_core::{Clock, Operation, ResourceClass, Settings};
use suds_storage::{Journal, MaterializedState};

/// Owns the coordinator, the waitlists and the hub they publish to
pub struct Runtime<C: Clock> {
    coordinator: Coordinator<C>,
    waitlists: WaitlistManager<C>,
    hub: Hub,
    settings: Settings,
}

impl<C: Clock> Runtime<C> {
    /// Build from recovered state; must be called inside a tokio runtime
    pub fn new(
        mut state: MaterializedState,
        journal: Arc<dyn Journal>,
        settings: Settings,
        clock: C,
    ) -> Self {
        let hub = Hub::spawn(clock.clone(), settings.delivery_timeout);
        let washers = state.take_waitlist(ResourceClass::Washer);
        let dryers = state.take_waitlist(ResourceClass::Dryer);
        let waitlists = WaitlistManager::new(
            washers,
            dryers,
            Arc::clone(&journal),
            hub.clone(),
            clock.clone(),
        );
        let coordinator = Coordinator::new(
            state.machines,
            state.faults,
            journal,
            hub.clone(),
            settings.clone(),
            clock,
        );
        Self {
            coordinator,
            waitlists,
            hub,
            settings,
        }
    }

    pub fn coordinator(&self) -> &Coordinator<C> {
        &self.coordinator
    }

    pub fn waitlists(&self) -> &WaitlistManager<C> {
        &self.waitlists
    }

    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

/// Commit an operation, logging failures; nothing is installed on error
pub(crate) fn commit(journal: &dyn Journal, op: &Operation) -> Result<u64, CoreError> {
    journal.commit(op).map_err(|e| {
        tracing::error!(op = op.name(), error = %e, "commit failed, state unchanged");
        CoreError::Storage(e)
    })
}
