// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime settings loaded from `suds.toml`
//!
//! ```toml
//! machines_per_class = 6
//! fault_disable_threshold = 3
//! delivery_timeout = "5s"
//! request_timeout = "5s"
//!
//! [cycle_minutes]
//! normal = 30
//! extra_5 = 35
//! ```
//!
//! Every key is optional.

use crate::fault::DEFAULT_FAULT_THRESHOLD;
use crate::machine::CycleKind;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Machines created per class at startup, numbered from 1
    pub machines_per_class: u32,
    /// Fault reports that take a machine offline
    pub fault_disable_threshold: u32,
    /// Per-observer send timeout before the observer is dropped
    #[serde(with = "humantime_serde")]
    pub delivery_timeout: Duration,
    /// Socket read/write timeout for daemon requests
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    pub cycle_minutes: CycleMinutes,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            machines_per_class: 6,
            fault_disable_threshold: DEFAULT_FAULT_THRESHOLD,
            delivery_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(5),
            cycle_minutes: CycleMinutes::default(),
        }
    }
}

/// Cycle lengths in minutes per cycle kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CycleMinutes {
    pub normal: u32,
    pub extra_5: u32,
    pub extra_10: u32,
    pub extra_15: u32,
}

impl Default for CycleMinutes {
    fn default() -> Self {
        Self {
            normal: 30,
            extra_5: 35,
            extra_10: 40,
            extra_15: 45,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.machines_per_class == 0 {
            return Err(ConfigError::Invalid(
                "machines_per_class must be at least 1".to_string(),
            ));
        }
        if self.fault_disable_threshold == 0 {
            return Err(ConfigError::Invalid(
                "fault_disable_threshold must be at least 1".to_string(),
            ));
        }
        if self.delivery_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "delivery_timeout must be non-zero".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "request_timeout must be non-zero".to_string(),
            ));
        }
        let cycles = &self.cycle_minutes;
        for (name, minutes) in [
            ("normal", cycles.normal),
            ("extra_5", cycles.extra_5),
            ("extra_10", cycles.extra_10),
            ("extra_15", cycles.extra_15),
        ] {
            if minutes == 0 {
                return Err(ConfigError::Invalid(format!(
                    "cycle_minutes.{name} must be at least 1"
                )));
            }
        }
        Ok(())
    }

    /// Length of a cycle in seconds
    pub fn cycle_seconds(&self, kind: CycleKind) -> u32 {
        let minutes = match kind {
            CycleKind::Normal => self.cycle_minutes.normal,
            CycleKind::Extra5 => self.cycle_minutes.extra_5,
            CycleKind::Extra10 => self.cycle_minutes.extra_10,
            CycleKind::Extra15 => self.cycle_minutes.extra_15,
        };
        minutes.saturating_mul(60)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
