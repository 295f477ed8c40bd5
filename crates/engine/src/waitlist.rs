// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-class waitlist queues
//!
//! Each class has its own lock. A join computes its position under that
//! lock, so concurrent joins get distinct, strictly increasing positions
//! in commit order.

use crate::error::CoreError;
use crate::hub::Hub;
use crate::runtime::commit;
use std::sync::Arc;
use suds_core::{Clock, Operation, RequesterId, ResourceClass, Waitlist, WaitlistSnapshot};
use suds_storage::Journal;
use tokio::sync::Mutex;

pub struct WaitlistManager<C: Clock> {
    washers: Mutex<Waitlist>,
    dryers: Mutex<Waitlist>,
    journal: Arc<dyn Journal>,
    hub: Hub,
    clock: C,
}

impl<C: Clock> WaitlistManager<C> {
    pub fn new(
        washers: Waitlist,
        dryers: Waitlist,
        journal: Arc<dyn Journal>,
        hub: Hub,
        clock: C,
    ) -> Self {
        Self {
            washers: Mutex::new(washers),
            dryers: Mutex::new(dryers),
            journal,
            hub,
            clock,
        }
    }

    fn queue(&self, class: ResourceClass) -> &Mutex<Waitlist> {
        match class {
            ResourceClass::Washer => &self.washers,
            ResourceClass::Dryer => &self.dryers,
        }
    }

    /// Append `requester` to the class queue, returning its position
    pub async fn join(
        &self,
        class: ResourceClass,
        requester: RequesterId,
    ) -> Result<u32, CoreError> {
        let mut list = self.queue(class).lock().await;
        let entry = list.plan_join(requester, self.clock.now())?;
        commit(
            self.journal.as_ref(),
            &Operation::WaitlistJoin {
                entry: entry.clone(),
            },
        )?;

        let position = entry.position;
        tracing::info!(%class, %requester, position, "joined waitlist");
        let effects = list.insert(entry);
        self.hub.dispatch(effects);
        Ok(position)
    }

    /// Remove `requester` from the class queue; other positions are unchanged
    pub async fn leave(&self, class: ResourceClass, requester: RequesterId) -> Result<(), CoreError> {
        let mut list = self.queue(class).lock().await;
        let entry = list.plan_leave(requester)?;
        commit(
            self.journal.as_ref(),
            &Operation::WaitlistLeave {
                class,
                requester_id: requester,
            },
        )?;

        tracing::info!(%class, %requester, position = entry.position, "left waitlist");
        let effects = list.remove(requester);
        self.hub.dispatch(effects);
        Ok(())
    }

    pub async fn list(&self, class: ResourceClass) -> WaitlistSnapshot {
        self.queue(class).lock().await.snapshot()
    }

    pub async fn position_of(&self, class: ResourceClass, requester: RequesterId) -> Option<u32> {
        self.queue(class).lock().await.position_of(requester)
    }
}

#[cfg(test)]
#[path = "waitlist_tests.rs"]
mod tests;
