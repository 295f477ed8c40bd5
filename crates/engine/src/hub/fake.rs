// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake observer sinks for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::sink::{Frame, ObserverSink, SinkError};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Sink that records every frame it receives
#[derive(Clone, Default)]
pub struct RecordingSink {
    frames: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw frames in delivery order
    pub fn frames(&self) -> Vec<String> {
        self.frames.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Frames parsed as JSON; unparseable frames are skipped
    pub fn events(&self) -> Vec<serde_json::Value> {
        self.frames()
            .iter()
            .filter_map(|f| serde_json::from_str(f).ok())
            .collect()
    }

    /// `event` tag of each received frame
    pub fn event_names(&self) -> Vec<String> {
        self.events()
            .iter()
            .filter_map(|v| v["event"].as_str().map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl ObserverSink for RecordingSink {
    async fn deliver(&self, frame: Frame) -> Result<(), SinkError> {
        self.frames
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(frame.to_string());
        Ok(())
    }
}

/// Sink whose connection is already gone
#[derive(Clone, Copy, Default)]
pub struct FailingSink;

#[async_trait]
impl ObserverSink for FailingSink {
    async fn deliver(&self, _frame: Frame) -> Result<(), SinkError> {
        Err(SinkError::Closed)
    }
}

/// Sink that never completes a delivery
#[derive(Clone, Copy, Default)]
pub struct StalledSink;

#[async_trait]
impl ObserverSink for StalledSink {
    async fn deliver(&self, _frame: Frame) -> Result<(), SinkError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}
