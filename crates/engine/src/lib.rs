// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Suds coordination engine

mod coordinator;
mod error;
pub mod hub;
mod runtime;
mod waitlist;

pub use coordinator::{Coordinator, StartOutcome};
pub use error::{CoreError, ErrorKind};
pub use hub::{channel_sink, ChannelSink, DeliveryReport, Frame, Hub, ObserverSink, SinkError};
pub use runtime::Runtime;
pub use waitlist::WaitlistManager;
