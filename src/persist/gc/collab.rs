//! Narrow trait boundaries for the systems the sweeper depends on but does
//! not own: region maps, RVVs, the distribution layer, and the cache's
//! clock/memory/stat surfaces. Out of scope per the subsystem's own
//! charter — these traits are the seam, not an implementation of any of
//! those systems.

pub mod memory;

use super::error::GcError;
use super::ids::{KeyBytes, MemberId, RegionId};
use futures::future::BoxFuture;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Replication and persistence posture of a region. A region with no
/// data policy at all resolves to `default()`, i.e. non-replicated — the
/// subsystem never treats "unknown" as "replicated".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DataPolicy {
    pub with_replication: bool,
    pub with_persistence: bool,
}

/// Free/total/max heap figures, as the cache's runtime memory monitor
/// would report them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuntimeMemory {
    pub free: u64,
    pub total: u64,
    pub max: u64,
}

/// A region version vector: per-member highest contiguous version plus
/// an exception list for gaps, and the GC subset that is safe to
/// reclaim cluster-wide.
pub trait RegionVersionVector: Send + Sync {
    /// Folds a member/version pair into the GC-safe subset of the RVV.
    fn record_gc_version(&self, member: MemberId, version: u64);

    /// Drops recorded exceptions now subsumed by the given GC versions.
    fn prune_old_exceptions(&self, up_to: &BTreeMap<MemberId, u64>);

    /// Persists the GC RVV to disk. This is the ordering barrier: callers
    /// must await this before removing anything from the in-memory
    /// region map for a persistent region.
    fn write_rvv_gc(&self) -> BoxFuture<'static, Result<(), GcError>>;

    /// A point-in-time copy of the recorded GC versions, used by
    /// `gcByRVV` to compare against caller-supplied versions.
    fn snapshot_gc_versions(&self) -> BTreeMap<MemberId, u64>;
}

/// The region-map operations the sweeper calls to actually drop a
/// tombstone, and to ask whether one is still needed at all.
pub trait RegionMap: Send + Sync {
    /// Removes the tombstone marker for `entry`. Returns whether it was
    /// still present (a partitioned bucket needs this to know whether to
    /// report the key to peers). `cancel` signals a cancellation-driven
    /// removal; `destroy` distinguishes an actual reclaim from a mere
    /// unschedule.
    fn remove_tombstone(
        &self,
        entry: super::ids::EntryId,
        tombstone: &super::tombstone::Tombstone,
        cancel: bool,
        destroy: bool,
    ) -> BoxFuture<'static, Result<bool, GcError>>;

    /// True once the entry has been resurrected or overwritten at a
    /// version that makes this tombstone moot.
    fn is_tombstone_not_needed(&self, entry: super::ids::EntryId, entry_version: u64) -> bool;

    /// The key behind an entry, needed when reporting reaped keys to a
    /// partitioned-region bucket's peers.
    fn key_for(&self, entry: super::ids::EntryId) -> KeyBytes;
}

/// A region, as far as the sweeper needs to know about it.
pub trait Region: Send + Sync {
    fn id(&self) -> RegionId;
    fn full_path(&self) -> &str;
    fn is_distributed(&self) -> bool;
    fn has_server_proxy(&self) -> bool;
    fn data_policy(&self) -> DataPolicy;
    fn local_member_id(&self) -> MemberId;
    fn version_vector(&self) -> Arc<dyn RegionVersionVector>;
    fn region_map(&self) -> Arc<dyn RegionMap>;
    fn is_partitioned_bucket(&self) -> bool;

    /// Tells peers which keys were just cluster-GC'd in this region.
    /// Runs on the distribution worker pool, never on the sweeper task.
    fn distribute_tombstone_gc(&self, keys: HashSet<KeyBytes>) -> BoxFuture<'static, ()>;
}

/// True when `region` should be serviced by the replicated (batch-mode)
/// sweeper: distributed, no server proxy (not a client region), and
/// replicated. A region with no data policy at all is non-replicated —
/// this function is total, never panics on an absent policy.
pub fn is_replicated_region(region: &dyn Region) -> bool {
    region.is_distributed() && !region.has_server_proxy() && region.data_policy().with_replication
}

/// The cache surface the sweeper needs: its clock, cancellation signal,
/// heap figures, and the perf-stat gauges it publishes to.
pub trait Cache: Send + Sync {
    fn cache_time_ms(&self) -> i64;
    fn is_cancelled(&self) -> bool;
    fn runtime_memory(&self) -> RuntimeMemory;
    fn set_replicated_tombstones_size(&self, bytes: u64);
    fn set_non_replicated_tombstones_size(&self, bytes: u64);
}

/// Resolves the opaque `RegionId` a `Tombstone` carries back to a live
/// region, for the sweeper loop's own scans (the defunct scan and batch
/// reclamation, neither of which is handed a region by a caller).
///
/// A region that has since closed resolves to `None`; the sweeper treats
/// that exactly like a resurrection — the tombstone is dropped without
/// reclamation work, since `unschedule` should already have removed it
/// on close and a `None` here means it raced ahead of that call.
pub trait RegionDirectory: Send + Sync {
    /// Registers (or re-registers, on region recreation) a region under
    /// its id.
    fn register(&self, region: Arc<dyn Region>);

    fn resolve(&self, id: RegionId) -> Option<Arc<dyn Region>>;
}
