// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Commit point for mutations
//!
//! A mutation counts as committed once `Journal::commit` returns `Ok`.
//! Callers install the new in-memory state only after that.

use crate::wal::{Wal, WalError};
use std::sync::Mutex;
use suds_core::Operation;

/// Durable sink for committed operations
pub trait Journal: Send + Sync {
    /// Persist one operation, returning its sequence number
    fn commit(&self, op: &Operation) -> Result<u64, WalError>;
}

/// Journal backed by the on-disk WAL
pub struct WalJournal {
    wal: Mutex<Wal>,
}

impl WalJournal {
    pub fn new(wal: Wal) -> Self {
        Self {
            wal: Mutex::new(wal),
        }
    }

    pub fn sequence(&self) -> u64 {
        self.wal.lock().unwrap_or_else(|e| e.into_inner()).sequence()
    }
}

impl Journal for WalJournal {
    fn commit(&self, op: &Operation) -> Result<u64, WalError> {
        let mut wal = self.wal.lock().unwrap_or_else(|e| e.into_inner());
        let seq = wal.append(op)?;
        tracing::trace!(seq, op = op.name(), resource = ?op.resource(), "committed");
        Ok(seq)
    }
}

/// In-memory journal that records operations in commit order
#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
pub struct MemoryJournal {
    ops: Mutex<Vec<Operation>>,
}

#[cfg(any(test, feature = "test-support"))]
impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Operations committed so far
    pub fn ops(&self) -> Vec<Operation> {
        self.ops.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Journal for MemoryJournal {
    fn commit(&self, op: &Operation) -> Result<u64, WalError> {
        let mut ops = self.ops.lock().unwrap_or_else(|e| e.into_inner());
        ops.push(op.clone());
        Ok(ops.len() as u64)
    }
}

/// Journal whose storage is unavailable; every commit fails
#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
pub struct FailingJournal;

#[cfg(any(test, feature = "test-support"))]
impl Journal for FailingJournal {
    fn commit(&self, _op: &Operation) -> Result<u64, WalError> {
        Err(WalError::Io(std::io::Error::other("storage unavailable")))
    }
}
