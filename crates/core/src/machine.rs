// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Machine lifecycle state machine
//!
//! ```text
//! Available --start--> InUse --end--> Completed --collect--> Available
//!     |                  |
//!     |                  +--cancel--> Available
//!     +--disable--> Disabled --reenable--> Available
//! ```
//!
//! A fault-threshold disable may arrive in any state and clears the current run.

use crate::effect::Effect;
use crate::event::{Event, MachineUpdate, Notification, NotificationKind};
use crate::id::{RequesterId, ResourceRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineState {
    Available,
    InUse,
    Completed,
    Disabled,
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MachineState::Available => "available",
            MachineState::InUse => "in_use",
            MachineState::Completed => "completed",
            MachineState::Disabled => "disabled",
        };
        f.write_str(s)
    }
}

/// Selectable cycle length
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CycleKind {
    #[serde(rename = "normal")]
    Normal,
    #[serde(rename = "extra_5")]
    Extra5,
    #[serde(rename = "extra_10")]
    Extra10,
    #[serde(rename = "extra_15")]
    Extra15,
}

impl fmt::Display for CycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CycleKind::Normal => "normal",
            CycleKind::Extra5 => "extra_5",
            CycleKind::Extra10 => "extra_10",
            CycleKind::Extra15 => "extra_15",
        };
        f.write_str(s)
    }
}

/// Authoritative record for one machine
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    pub resource: ResourceRef,
    pub state: MachineState,
    pub cycle_kind: Option<CycleKind>,
    pub remaining_seconds: u32,
    /// Set while in use; still set after `End` until the next start or collect
    pub owner_id: Option<RequesterId>,
    pub enabled: bool,
    pub total_cycles_completed: u64,
}

/// Inputs that drive machine transitions
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MachineInput {
    Start {
        requester: RequesterId,
        cycle: CycleKind,
        seconds: u32,
    },
    Cancel {
        requester: RequesterId,
    },
    End {
        requester: RequesterId,
    },
    Collect {
        requester: RequesterId,
    },
    /// Fault threshold crossed
    Disable,
    /// Maintenance brought the machine back; not reachable from the coordinator
    Reenable,
}

impl MachineInput {
    fn action(&self) -> &'static str {
        match self {
            MachineInput::Start { .. } => "start",
            MachineInput::Cancel { .. } => "cancel",
            MachineInput::End { .. } => "end",
            MachineInput::Collect { .. } => "collect",
            MachineInput::Disable => "disable",
            MachineInput::Reenable => "reenable",
        }
    }
}

/// Rejected transitions
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MachineError {
    #[error("{resource} is disabled")]
    Disabled { resource: ResourceRef },
    #[error("cannot {action} {resource} while it is {state}")]
    InvalidState {
        resource: ResourceRef,
        state: MachineState,
        action: &'static str,
    },
    #[error("{requester} is not using {resource}")]
    Forbidden {
        resource: ResourceRef,
        requester: RequesterId,
    },
}

impl Machine {
    pub fn new(resource: ResourceRef) -> Self {
        Self {
            resource,
            state: MachineState::Available,
            cycle_kind: None,
            remaining_seconds: 0,
            owner_id: None,
            enabled: true,
            total_cycles_completed: 0,
        }
    }

    pub fn is_available(&self) -> bool {
        self.enabled && self.state == MachineState::Available
    }

    pub fn is_owned_by(&self, requester: RequesterId) -> bool {
        self.owner_id == Some(requester)
    }

    /// Snapshot broadcast to observers
    ///
    /// The owner is only published while a cycle is running.
    pub fn update_event(&self) -> Event {
        let owner_id = match self.state {
            MachineState::InUse => self.owner_id,
            MachineState::Available | MachineState::Completed | MachineState::Disabled => None,
        };
        Event::MachineUpdate(MachineUpdate {
            resource_class: self.resource.class,
            resource_ordinal: self.resource.ordinal,
            state: self.state,
            remaining_seconds: self.remaining_seconds,
            owner_id,
        })
    }

    /// Pure state transition function
    ///
    /// Returns the next machine and the effects to perform once it is committed.
    /// On error the current machine is unchanged.
    pub fn transition(&self, input: MachineInput) -> Result<(Machine, Vec<Effect>), MachineError> {
        let mut next = self.clone();
        let mut effects = Vec::new();
        let action = input.action();

        match input {
            MachineInput::Start {
                requester,
                cycle,
                seconds,
            } => {
                self.require(MachineState::Available, action)?;
                if !self.enabled {
                    return Err(MachineError::Disabled {
                        resource: self.resource,
                    });
                }
                next.state = MachineState::InUse;
                next.owner_id = Some(requester);
                next.cycle_kind = Some(cycle);
                next.remaining_seconds = seconds;
                next.total_cycles_completed += 1;
                effects.push(Effect::Emit(next.update_event()));
            }

            MachineInput::Cancel { requester } => {
                self.require(MachineState::InUse, action)?;
                if !self.is_owned_by(requester) {
                    return Err(MachineError::Forbidden {
                        resource: self.resource,
                        requester,
                    });
                }
                next.release();
                effects.push(Effect::Emit(next.update_event()));
            }

            MachineInput::End { requester: _ } => {
                self.require(MachineState::InUse, action)?;
                next.state = MachineState::Completed;
                next.remaining_seconds = 0;
                effects.push(Effect::Emit(next.update_event()));
                if let Some(owner) = next.owner_id {
                    effects.push(Effect::Notify {
                        requester: owner,
                        event: Event::Notification(Notification {
                            requester_id: owner,
                            kind: NotificationKind::CycleComplete,
                            message: format!("{} has finished its cycle", self.resource),
                        }),
                    });
                }
            }

            MachineInput::Collect { requester: _ } => {
                self.require(MachineState::Completed, action)?;
                next.release();
                effects.push(Effect::Emit(next.update_event()));
            }

            MachineInput::Disable => {
                next.release();
                next.state = MachineState::Disabled;
                next.enabled = false;
            }

            MachineInput::Reenable => {
                self.require(MachineState::Disabled, action)?;
                next.release();
                next.enabled = true;
                effects.push(Effect::Emit(next.update_event()));
            }
        }

        Ok((next, effects))
    }

    fn require(&self, state: MachineState, action: &'static str) -> Result<(), MachineError> {
        if self.state == state {
            Ok(())
        } else {
            Err(MachineError::InvalidState {
                resource: self.resource,
                state: self.state,
                action,
            })
        }
    }

    /// Back to available with no run attached
    fn release(&mut self) {
        self.state = MachineState::Available;
        self.owner_id = None;
        self.cycle_kind = None;
        self.remaining_seconds = 0;
    }
}

#[cfg(test)]
#[path = "machine_tests.rs"]
mod tests;
