// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effects requested by state machine transitions

use crate::event::Event;
use crate::id::RequesterId;

/// Side effects a transition asks its owner to perform after commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Broadcast an event to every observer
    Emit(Event),
    /// Deliver an event only to one requester's observers
    Notify {
        requester: RequesterId,
        event: Event,
    },
}

impl Effect {
    pub fn event(&self) -> &Event {
        match self {
            Effect::Emit(event) => event,
            Effect::Notify { event, .. } => event,
        }
    }
}
