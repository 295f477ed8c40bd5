// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol for daemon requests and observer streams.
//!
//! Every message is a JSON object preceded by a 4-byte big-endian length.
//! A connection carries one request and one response, unless the request
//! is `Subscribe`, in which case the server keeps writing event frames
//! until either side goes away.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use suds_core::{
    CycleKind, FaultRecord, Machine, RequesterId, ResourceClass, ResourceRef, WaitlistEntry,
};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Reported by `Hello`; clients compare it against their own build
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Read/write timeout when no setting overrides it
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Frames larger than this are rejected before the body is read
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    Ping,
    Hello {
        version: String,
    },
    Status,
    Start {
        resource: ResourceRef,
        requester_id: RequesterId,
        cycle: CycleKind,
    },
    Cancel {
        resource: ResourceRef,
        requester_id: RequesterId,
    },
    End {
        resource: ResourceRef,
        requester_id: RequesterId,
    },
    Collect {
        resource: ResourceRef,
        requester_id: RequesterId,
    },
    ReportFault {
        resource: ResourceRef,
        requester_id: RequesterId,
        description: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        photo: Option<String>,
    },
    GetMachine {
        resource: ResourceRef,
    },
    ListMachines {
        class: ResourceClass,
    },
    FaultCount {
        resource: ResourceRef,
    },
    FaultReports,
    JoinWaitlist {
        class: ResourceClass,
        requester_id: RequesterId,
    },
    LeaveWaitlist {
        class: ResourceClass,
        requester_id: RequesterId,
    },
    GetWaitlist {
        class: ResourceClass,
    },
    /// Turn this connection into an observer stream
    Subscribe {
        #[serde(default)]
        requester_id: Option<RequesterId>,
    },
    /// Only meaningful on a subscribed connection
    Identify {
        requester_id: RequesterId,
    },
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    Pong,
    Hello {
        version: String,
    },
    Ok,
    ShuttingDown,
    Status {
        uptime_secs: u64,
        machines_in_use: usize,
        machines_disabled: usize,
        washers_waiting: usize,
        dryers_waiting: usize,
        observers: usize,
    },
    Started {
        machine: Machine,
        seconds: u32,
    },
    Machine {
        machine: Machine,
    },
    Machines {
        machines: Vec<Machine>,
    },
    FaultTally {
        count: u32,
        disabled: bool,
    },
    FaultReports {
        reports: Vec<FaultRecord>,
    },
    Position {
        position: u32,
    },
    Waitlist {
        entries: Vec<WaitlistEntry>,
    },
    Subscribed {
        observer_id: String,
    },
    Error {
        kind: String,
        message: String,
    },
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame of {0} bytes exceeds limit")]
    FrameTooLarge(usize),

    #[error("timed out")]
    Timeout,

    #[error("connection closed")]
    ConnectionClosed,
}

/// Serialize a message to JSON, without the length prefix
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(message)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Write one length-prefixed frame
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    data: &[u8],
) -> Result<(), ProtocolError> {
    if data.len() > MAX_FRAME_BYTES {
        return Err(ProtocolError::FrameTooLarge(data.len()));
    }
    let len = u32::try_from(data.len()).map_err(|_| ProtocolError::FrameTooLarge(data.len()))?;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed frame
///
/// EOF before the length prefix is reported as `ConnectionClosed`.
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut header = [0u8; 4];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed)
        }
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(header) as usize;
    if len > MAX_FRAME_BYTES {
        return Err(ProtocolError::FrameTooLarge(len));
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(body)
}

async fn with_timeout<T>(
    timeout: Duration,
    fut: impl std::future::Future<Output = Result<T, ProtocolError>>,
) -> Result<T, ProtocolError> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| ProtocolError::Timeout)?
}

pub async fn read_request<R: AsyncRead + Unpin>(
    reader: &mut R,
    timeout: Duration,
) -> Result<Request, ProtocolError> {
    let bytes = with_timeout(timeout, read_message(reader)).await?;
    decode(&bytes)
}

pub async fn write_request<W: AsyncWrite + Unpin>(
    writer: &mut W,
    request: &Request,
    timeout: Duration,
) -> Result<(), ProtocolError> {
    let bytes = encode(request)?;
    with_timeout(timeout, write_message(writer, &bytes)).await
}

pub async fn read_response<R: AsyncRead + Unpin>(
    reader: &mut R,
    timeout: Duration,
) -> Result<Response, ProtocolError> {
    let bytes = with_timeout(timeout, read_message(reader)).await?;
    decode(&bytes)
}

pub async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &Response,
    timeout: Duration,
) -> Result<(), ProtocolError> {
    let bytes = encode(response)?;
    with_timeout(timeout, write_message(writer, &bytes)).await
}

/// Write an already serialized event envelope on an observer stream
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    frame: &str,
    timeout: Duration,
) -> Result<(), ProtocolError> {
    with_timeout(timeout, write_message(writer, frame.as_bytes())).await
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
