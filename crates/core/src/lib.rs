// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! suds-core: data model and pure state machines for shared laundry machines
//!
//! This crate provides:
//! - Machine lifecycle state machine (available, in use, completed, disabled)
//! - Per-class waitlist with monotonically assigned positions
//! - Fault threshold policy
//! - Observer-facing events and the operations persisted to the WAL
//!
//! Nothing here performs I/O or locking; the engine crate owns concurrency.

pub mod clock;
pub mod config;
pub mod id;

// State machines (order matters for dependencies)
pub mod event;
pub mod effect;
pub mod fault;
pub mod machine;
pub mod waitlist;
pub mod operation;

// Re-exports
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{ConfigError, CycleMinutes, Settings};
pub use effect::Effect;
pub use event::{
    Envelope, Event, FaultReported, MachineUpdate, Notification, NotificationKind, WaitlistChange,
    WaitlistUpdate,
};
pub use fault::{FaultMonitor, FaultRecord, FaultTally, FaultVerdict};
pub use id::{
    IdGen, ObserverId, ParseClassError, RequesterId, ResourceClass, ResourceRef, SequentialIdGen,
    UuidIdGen,
};
pub use machine::{CycleKind, Machine, MachineError, MachineInput, MachineState};
pub use operation::Operation;
pub use waitlist::{Waitlist, WaitlistEntry, WaitlistError, WaitlistSnapshot};
