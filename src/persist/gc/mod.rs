//! Tombstone reclamation subsystem: ages out destroyed-entry markers,
//! reclaims them in batches for replicated regions, and drives the
//! cluster-wide GC protocol (RVV comparison and key-set propagation).
//!
//! Region maps, the on-disk format, the RVV data structure itself, the
//! distribution/messaging layer, the partitioned-region bucket model,
//! and heap monitoring are all out of scope here — this module only
//! consumes them through the narrow traits in [`collab`].

mod batch;
pub mod collab;
mod config;
mod error;
mod expired_batch;
mod ids;
mod queue;
mod service;
mod stats;
mod sweeper;
mod tombstone;

pub use config::{GcConfig, GcTestHooks, SweeperTuning, DEFAULT_DEFUNCT_SCAN_INTERVAL_MS};
pub use error::GcError;
pub use ids::{EntryId, KeyBytes, MemberId, RegionId};
pub use service::GcService;
pub use stats::SweeperStats;
pub use sweeper::Sweeper;
pub use tombstone::{Tombstone, VersionTag, PER_TOMBSTONE_OVERHEAD_BYTES};
