// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for coordinator operations

use suds_core::{MachineError, ResourceRef, WaitlistError};
use suds_storage::WalError;
use thiserror::Error;

/// Errors returned by coordinator and waitlist operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0} not found")]
    NotFound(ResourceRef),
    #[error(transparent)]
    Machine(#[from] MachineError),
    #[error(transparent)]
    Waitlist(#[from] WaitlistError),
    #[error("internal error: {0}")]
    Storage(#[from] WalError),
}

/// Stable category of a [`CoreError`], as reported over the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    Forbidden,
    AlreadyQueued,
    NotQueued,
    Disabled,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::AlreadyQueued => "already_queued",
            ErrorKind::NotQueued => "not_queued",
            ErrorKind::Disabled => "disabled",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound(_) => ErrorKind::NotFound,
            CoreError::Machine(MachineError::Disabled { .. }) => ErrorKind::Disabled,
            CoreError::Machine(MachineError::InvalidState { .. }) => ErrorKind::InvalidState,
            CoreError::Machine(MachineError::Forbidden { .. }) => ErrorKind::Forbidden,
            CoreError::Waitlist(WaitlistError::AlreadyQueued { .. }) => ErrorKind::AlreadyQueued,
            CoreError::Waitlist(WaitlistError::NotQueued { .. }) => ErrorKind::NotQueued,
            CoreError::Storage(_) => ErrorKind::Internal,
        }
    }
}
