// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Observer delivery seam

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// One serialized envelope, shared by every recipient of a broadcast
pub type Frame = Arc<str>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("observer connection closed")]
    Closed,
    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),
    #[error("delivery failed: {0}")]
    Failed(String),
}

/// Destination for frames sent to one observer
#[async_trait]
pub trait ObserverSink: Send + Sync + 'static {
    async fn deliver(&self, frame: Frame) -> Result<(), SinkError>;
}

/// Sink backed by a bounded channel drained by the connection task
pub struct ChannelSink {
    tx: mpsc::Sender<Frame>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Frame>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl ObserverSink for ChannelSink {
    async fn deliver(&self, frame: Frame) -> Result<(), SinkError> {
        self.tx.send(frame).await.map_err(|_| SinkError::Closed)
    }
}

/// Create a channel sink and the receiver its connection drains
pub fn channel_sink(capacity: usize) -> (ChannelSink, mpsc::Receiver<Frame>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ChannelSink::new(tx), rx)
}
