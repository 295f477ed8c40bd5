// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Durable storage: write-ahead log, commit journal, and replayed state

mod journal;
mod state;
mod wal;

pub use journal::{Journal, WalJournal};
pub use state::MaterializedState;
pub use wal::{Wal, WalError};

#[cfg(any(test, feature = "test-support"))]
pub use journal::{FailingJournal, MemoryJournal};
