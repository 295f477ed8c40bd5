// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifiers for machines, requesters, and observers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Kind of machine; the dimension for waitlists and fault thresholds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceClass {
    Washer,
    Dryer,
}

impl ResourceClass {
    pub const ALL: [ResourceClass; 2] = [ResourceClass::Washer, ResourceClass::Dryer];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceClass::Washer => "washer",
            ResourceClass::Dryer => "dryer",
        }
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown resource class: {0:?} (expected washer or dryer)")]
pub struct ParseClassError(pub String);

impl FromStr for ResourceClass {
    type Err = ParseClassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "washer" => Ok(ResourceClass::Washer),
            "dryer" => Ok(ResourceClass::Dryer),
            _ => Err(ParseClassError(s.to_string())),
        }
    }
}

/// A single machine: class plus 1-based ordinal, unique within its class
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceRef {
    pub class: ResourceClass,
    pub ordinal: u32,
}

impl ResourceRef {
    pub fn new(class: ResourceClass, ordinal: u32) -> Self {
        Self { class, ordinal }
    }

    pub fn washer(ordinal: u32) -> Self {
        Self::new(ResourceClass::Washer, ordinal)
    }

    pub fn dryer(ordinal: u32) -> Self {
        Self::new(ResourceClass::Dryer, ordinal)
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.class, self.ordinal)
    }
}

/// The user on whose behalf an operation runs (issued by the auth layer)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequesterId(pub u64);

impl fmt::Display for RequesterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user:{}", self.0)
    }
}

/// Opaque handle for one live observer connection
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObserverId(pub String);

impl ObserverId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generates unique identifiers
pub trait IdGen: Clone + Send + Sync {
    fn next(&self) -> String;
}

/// UUID-based ID generator for production use
#[derive(Clone, Default)]
pub struct UuidIdGen;

impl IdGen for UuidIdGen {
    fn next(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Sequential ID generator for testing
#[derive(Clone)]
pub struct SequentialIdGen {
    prefix: String,
    counter: Arc<AtomicU64>,
}

impl SequentialIdGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for SequentialIdGen {
    fn default() -> Self {
        Self::new("id")
    }
}

impl IdGen for SequentialIdGen {
    fn next(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}-{}", self.prefix, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_gen_creates_unique_ids() {
        let id_gen = UuidIdGen;
        let id1 = id_gen.next();
        let id2 = id_gen.next();
        assert_ne!(id1, id2);
        assert_eq!(id1.len(), 36);
    }

    #[test]
    fn sequential_gen_is_cloneable_and_shared() {
        let id_gen1 = SequentialIdGen::new("obs");
        let id_gen2 = id_gen1.clone();
        assert_eq!(id_gen1.next(), "obs-1");
        assert_eq!(id_gen2.next(), "obs-2");
        assert_eq!(id_gen1.next(), "obs-3");
    }

    #[test]
    fn resource_class_parses_case_insensitively() {
        assert_eq!("Washer".parse::<ResourceClass>(), Ok(ResourceClass::Washer));
        assert_eq!("dryer".parse::<ResourceClass>(), Ok(ResourceClass::Dryer));
        assert!("iron".parse::<ResourceClass>().is_err());
    }

    #[test]
    fn resource_ref_display() {
        assert_eq!(ResourceRef::washer(1).to_string(), "washer#1");
        assert_eq!(ResourceRef::dryer(6).to_string(), "dryer#6");
    }

    #[test]
    fn resource_refs_order_by_class_then_ordinal() {
        let mut refs = vec![
            ResourceRef::dryer(1),
            ResourceRef::washer(2),
            ResourceRef::washer(1),
        ];
        refs.sort();
        assert_eq!(
            refs,
            vec![
                ResourceRef::washer(1),
                ResourceRef::washer(2),
                ResourceRef::dryer(1)
            ]
        );
    }

    #[test]
    fn requester_id_serializes_as_number() {
        let json = serde_json::to_string(&RequesterId(42)).unwrap();
        assert_eq!(json, "42");
    }
}
