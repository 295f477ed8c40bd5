// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ordered waitlist for one resource class
//!
//! Positions are `max(live positions) + 1`. Leaving never renumbers the
//! remaining entries, so gaps are expected.

use crate::effect::Effect;
use crate::event::{Event, Notification, NotificationKind, WaitlistChange, WaitlistUpdate};
use crate::id::{RequesterId, ResourceClass};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistEntry {
    pub requester_id: RequesterId,
    pub resource_class: ResourceClass,
    pub position: u32,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WaitlistError {
    #[error("{requester} is already on the {class} waitlist at position {position}")]
    AlreadyQueued {
        class: ResourceClass,
        requester: RequesterId,
        position: u32,
    },
    #[error("{requester} is not on the {class} waitlist")]
    NotQueued {
        class: ResourceClass,
        requester: RequesterId,
    },
}

/// Waitlist state for a single class
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Waitlist {
    class: ResourceClass,
    entries: BTreeMap<u32, WaitlistEntry>,
    positions: HashMap<RequesterId, u32>,
}

impl Waitlist {
    pub fn new(class: ResourceClass) -> Self {
        Self {
            class,
            entries: BTreeMap::new(),
            positions: HashMap::new(),
        }
    }

    pub fn class(&self) -> ResourceClass {
        self.class
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn position_of(&self, requester: RequesterId) -> Option<u32> {
        self.positions.get(&requester).copied()
    }

    /// Position the next joiner would receive
    pub fn next_position(&self) -> u32 {
        self.entries
            .keys()
            .next_back()
            .map_or(1, |max| max.saturating_add(1))
    }

    /// Entries in ascending position order
    pub fn iter(&self) -> impl Iterator<Item = &WaitlistEntry> {
        self.entries.values()
    }

    /// Compute the entry a join would create, without changing the list
    pub fn plan_join(
        &self,
        requester: RequesterId,
        joined_at: DateTime<Utc>,
    ) -> Result<WaitlistEntry, WaitlistError> {
        if let Some(position) = self.position_of(requester) {
            return Err(WaitlistError::AlreadyQueued {
                class: self.class,
                requester,
                position,
            });
        }
        Ok(WaitlistEntry {
            requester_id: requester,
            resource_class: self.class,
            position: self.next_position(),
            joined_at,
        })
    }

    /// Find the entry a leave would remove, without changing the list
    pub fn plan_leave(&self, requester: RequesterId) -> Result<WaitlistEntry, WaitlistError> {
        self.positions
            .get(&requester)
            .and_then(|position| self.entries.get(position))
            .cloned()
            .ok_or(WaitlistError::NotQueued {
                class: self.class,
                requester,
            })
    }

    /// Install a planned (and committed) entry
    pub fn insert(&mut self, entry: WaitlistEntry) -> Vec<Effect> {
        let requester = entry.requester_id;
        let position = entry.position;
        self.positions.insert(requester, position);
        self.entries.insert(position, entry);

        vec![
            Effect::Emit(Event::WaitlistUpdate(WaitlistUpdate {
                resource_class: self.class,
                change: WaitlistChange::Joined {
                    position,
                    requester_id: requester,
                },
            })),
            Effect::Notify {
                requester,
                event: Event::Notification(Notification {
                    requester_id: requester,
                    kind: NotificationKind::JoinedWaitlist,
                    message: format!("You are number {} on the {} waitlist", position, self.class),
                }),
            },
        ]
    }

    /// Remove a requester's entry; remaining positions are left as they are
    pub fn remove(&mut self, requester: RequesterId) -> Vec<Effect> {
        let Some(position) = self.positions.remove(&requester) else {
            return Vec::new();
        };
        self.entries.remove(&position);

        vec![Effect::Emit(Event::WaitlistUpdate(WaitlistUpdate {
            resource_class: self.class,
            change: WaitlistChange::Left {
                requester_id: requester,
            },
        }))]
    }

    /// Immutable copy for readers outside the lock
    pub fn snapshot(&self) -> WaitlistSnapshot {
        WaitlistSnapshot {
            class: self.class,
            entries: self.entries.values().cloned().collect(),
        }
    }
}

/// Point-in-time copy of a waitlist; iterate it as many times as needed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WaitlistSnapshot {
    class: ResourceClass,
    entries: Arc<[WaitlistEntry]>,
}

impl WaitlistSnapshot {
    pub fn class(&self) -> ResourceClass {
        self.class
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WaitlistEntry> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<WaitlistEntry> {
        self.entries.to_vec()
    }
}

impl<'a> IntoIterator for &'a WaitlistSnapshot {
    type Item = &'a WaitlistEntry;
    type IntoIter = std::slice::Iter<'a, WaitlistEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
#[path = "waitlist_tests.rs"]
mod tests;
