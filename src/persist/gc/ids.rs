use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of a replica that issued a destroy. Stands in for the
/// distributed membership id the real region map would hand us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemberId(pub u64);

impl MemberId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Opaque handle to a region, stable across the region's lifetime.
///
/// Deliberately not a live reference: a tombstone must not keep a region
/// alive, and `unschedule` has to be able to invalidate every tombstone
/// of a closed region without waiting on a drop to happen somewhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionId(pub u64);

static NEXT_REGION_ID: AtomicU64 = AtomicU64::new(1);

impl RegionId {
    pub fn new() -> Self {
        Self(NEXT_REGION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for RegionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Opaque handle to a region-map entry, same rationale as `RegionId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(pub u64);

static NEXT_ENTRY_ID: AtomicU64 = AtomicU64::new(1);

impl EntryId {
    pub fn new() -> Self {
        Self(NEXT_ENTRY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

/// A region-map key, opaque to the sweeper beyond equality and hashing.
pub type KeyBytes = Vec<u8>;
