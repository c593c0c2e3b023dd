//! A reference, in-memory implementation of the `collab` traits.
//!
//! Good enough to drive the sweeper end-to-end in tests and in a demo,
//! the way `persist::cluster::InMemoryRuntimeForwarder` stands in for a
//! real peer transport. Never a substitute for an actual region map.

use super::{Cache, DataPolicy, Region, RegionDirectory, RegionMap, RegionVersionVector, RuntimeMemory};
use crate::persist::gc::error::GcError;
use crate::persist::gc::ids::{EntryId, KeyBytes, MemberId, RegionId};
use crate::persist::gc::tombstone::Tombstone;
use futures::future::BoxFuture;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// A version vector the tests can inspect call-by-call.
#[derive(Default)]
pub struct InMemoryRvv {
    gc_versions: Mutex<BTreeMap<MemberId, u64>>,
    exceptions: Mutex<BTreeSet<(MemberId, u64)>>,
    persisted: AtomicBool,
    record_calls: AtomicU64,
    persist_calls: AtomicU64,
}

impl InMemoryRvv {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_exception(&self, member: MemberId, version: u64) {
        self.exceptions.lock().unwrap().insert((member, version));
    }

    pub fn was_persisted(&self) -> bool {
        self.persisted.load(Ordering::SeqCst)
    }

    pub fn record_calls(&self) -> u64 {
        self.record_calls.load(Ordering::SeqCst)
    }

    pub fn persist_calls(&self) -> u64 {
        self.persist_calls.load(Ordering::SeqCst)
    }

    pub fn exceptions(&self) -> Vec<(MemberId, u64)> {
        self.exceptions.lock().unwrap().iter().copied().collect()
    }
}

impl RegionVersionVector for InMemoryRvv {
    fn record_gc_version(&self, member: MemberId, version: u64) {
        self.record_calls.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.gc_versions.lock().unwrap();
        let entry = guard.entry(member).or_insert(0);
        if version > *entry {
            *entry = version;
        }
    }

    fn prune_old_exceptions(&self, up_to: &BTreeMap<MemberId, u64>) {
        let mut guard = self.exceptions.lock().unwrap();
        guard.retain(|(member, version)| up_to.get(member).is_none_or(|gc| *version > *gc));
    }

    fn write_rvv_gc(&self) -> BoxFuture<'static, Result<(), GcError>> {
        self.persisted.store(true, Ordering::SeqCst);
        self.persist_calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }

    fn snapshot_gc_versions(&self) -> BTreeMap<MemberId, u64> {
        self.gc_versions.lock().unwrap().clone()
    }
}

/// A region map the tests can mark entries "not needed" on, to model
/// resurrection, and that records every (entry, destroy) removal it was
/// asked to perform.
#[derive(Default)]
pub struct InMemoryRegionMap {
    not_needed: Mutex<HashSet<EntryId>>,
    keys: Mutex<HashMap<EntryId, KeyBytes>>,
    removed: Mutex<Vec<(EntryId, bool)>>,
    fail_removal_for: Mutex<HashSet<EntryId>>,
}

impl InMemoryRegionMap {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_key(&self, entry: EntryId, key: KeyBytes) {
        self.keys.lock().unwrap().insert(entry, key);
    }

    pub fn mark_not_needed(&self, entry: EntryId) {
        self.not_needed.lock().unwrap().insert(entry);
    }

    pub fn fail_removal(&self, entry: EntryId) {
        self.fail_removal_for.lock().unwrap().insert(entry);
    }

    pub fn removed(&self) -> Vec<(EntryId, bool)> {
        self.removed.lock().unwrap().clone()
    }
}

impl RegionMap for InMemoryRegionMap {
    fn remove_tombstone(
        &self,
        entry: EntryId,
        _tombstone: &Tombstone,
        _cancel: bool,
        destroy: bool,
    ) -> BoxFuture<'static, Result<bool, GcError>> {
        let fails = self.fail_removal_for.lock().unwrap().contains(&entry);
        if fails {
            return Box::pin(async { Err(GcError::RegionMapFailure("forced test failure".into())) });
        }
        self.removed.lock().unwrap().push((entry, destroy));
        Box::pin(async { Ok(true) })
    }

    fn is_tombstone_not_needed(&self, entry: EntryId, _entry_version: u64) -> bool {
        self.not_needed.lock().unwrap().contains(&entry)
    }

    fn key_for(&self, entry: EntryId) -> KeyBytes {
        self.keys
            .lock()
            .unwrap()
            .get(&entry)
            .cloned()
            .unwrap_or_default()
    }
}

/// A region whose fields are set directly by the test, plus an in-memory
/// RVV and region map wired in.
pub struct InMemoryRegion {
    id: RegionId,
    full_path: String,
    distributed: bool,
    server_proxy: bool,
    data_policy: DataPolicy,
    local_member_id: MemberId,
    partitioned_bucket: bool,
    rvv: Arc<InMemoryRvv>,
    region_map: Arc<InMemoryRegionMap>,
    distributed_keys: Mutex<Vec<HashSet<KeyBytes>>>,
}

impl InMemoryRegion {
    pub fn new(full_path: impl Into<String>, local_member_id: MemberId) -> Arc<Self> {
        Arc::new(Self {
            id: RegionId::new(),
            full_path: full_path.into(),
            distributed: true,
            server_proxy: false,
            data_policy: DataPolicy::default(),
            local_member_id,
            partitioned_bucket: false,
            rvv: InMemoryRvv::new(),
            region_map: InMemoryRegionMap::new(),
            distributed_keys: Mutex::new(Vec::new()),
        })
    }

    pub fn with_data_policy(self: Arc<Self>, policy: DataPolicy) -> Arc<Self> {
        Arc::new(Self {
            data_policy: policy,
            ..Self::clone_fields(&self)
        })
    }

    pub fn with_server_proxy(self: Arc<Self>, has_proxy: bool) -> Arc<Self> {
        Arc::new(Self {
            server_proxy: has_proxy,
            ..Self::clone_fields(&self)
        })
    }

    pub fn with_partitioned_bucket(self: Arc<Self>, value: bool) -> Arc<Self> {
        Arc::new(Self {
            partitioned_bucket: value,
            ..Self::clone_fields(&self)
        })
    }

    fn clone_fields(this: &Self) -> Self {
        Self {
            id: this.id,
            full_path: this.full_path.clone(),
            distributed: this.distributed,
            server_proxy: this.server_proxy,
            data_policy: this.data_policy,
            local_member_id: this.local_member_id,
            partitioned_bucket: this.partitioned_bucket,
            rvv: this.rvv.clone(),
            region_map: this.region_map.clone(),
            distributed_keys: Mutex::new(Vec::new()),
        }
    }

    pub fn rvv(&self) -> Arc<InMemoryRvv> {
        self.rvv.clone()
    }

    pub fn region_map_handle(&self) -> Arc<InMemoryRegionMap> {
        self.region_map.clone()
    }

    pub fn distributed_batches(&self) -> Vec<HashSet<KeyBytes>> {
        self.distributed_keys.lock().unwrap().clone()
    }
}

impl Region for InMemoryRegion {
    fn id(&self) -> RegionId {
        self.id
    }

    fn full_path(&self) -> &str {
        &self.full_path
    }

    fn is_distributed(&self) -> bool {
        self.distributed
    }

    fn has_server_proxy(&self) -> bool {
        self.server_proxy
    }

    fn data_policy(&self) -> DataPolicy {
        self.data_policy
    }

    fn local_member_id(&self) -> MemberId {
        self.local_member_id
    }

    fn version_vector(&self) -> Arc<dyn RegionVersionVector> {
        self.rvv.clone()
    }

    fn region_map(&self) -> Arc<dyn RegionMap> {
        self.region_map.clone()
    }

    fn is_partitioned_bucket(&self) -> bool {
        self.partitioned_bucket
    }

    fn distribute_tombstone_gc(&self, keys: HashSet<KeyBytes>) -> BoxFuture<'static, ()> {
        self.distributed_keys.lock().unwrap().push(keys);
        Box::pin(async {})
    }
}

/// A cache with a caller-driven virtual clock, so tests never sleep
/// wall-clock time to exercise age-based expiry.
pub struct InMemoryCache {
    now_ms: AtomicI64,
    cancelled: AtomicBool,
    memory: Mutex<RuntimeMemory>,
    replicated_gauge: AtomicU64,
    non_replicated_gauge: AtomicU64,
}

impl InMemoryCache {
    pub fn new(start_ms: i64) -> Arc<Self> {
        Arc::new(Self {
            now_ms: AtomicI64::new(start_ms),
            cancelled: AtomicBool::new(false),
            memory: Mutex::new(RuntimeMemory {
                free: u64::MAX,
                total: 1,
                max: 1,
            }),
            replicated_gauge: AtomicU64::new(0),
            non_replicated_gauge: AtomicU64::new(0),
        })
    }

    pub fn advance(&self, ms: i64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn set_memory(&self, memory: RuntimeMemory) {
        *self.memory.lock().unwrap() = memory;
    }

    pub fn replicated_gauge(&self) -> u64 {
        self.replicated_gauge.load(Ordering::SeqCst)
    }

    pub fn non_replicated_gauge(&self) -> u64 {
        self.non_replicated_gauge.load(Ordering::SeqCst)
    }
}

impl Cache for InMemoryCache {
    fn cache_time_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn runtime_memory(&self) -> RuntimeMemory {
        *self.memory.lock().unwrap()
    }

    fn set_replicated_tombstones_size(&self, bytes: u64) {
        self.replicated_gauge.store(bytes, Ordering::SeqCst);
    }

    fn set_non_replicated_tombstones_size(&self, bytes: u64) {
        self.non_replicated_gauge.store(bytes, Ordering::SeqCst);
    }
}

/// Registers regions by weak reference and resolves them back, the way a
/// real region map keyed by id would, minus the persistence.
#[derive(Default)]
pub struct InMemoryRegionDirectory {
    regions: Mutex<HashMap<RegionId, Weak<dyn Region>>>,
}

impl InMemoryRegionDirectory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(&self, region: &Arc<dyn Region>) {
        self.regions
            .lock()
            .unwrap()
            .insert(region.id(), Arc::downgrade(region));
    }
}

impl super::RegionDirectory for InMemoryRegionDirectory {
    fn register(&self, region: Arc<dyn Region>) {
        self.regions
            .lock()
            .unwrap()
            .insert(region.id(), Arc::downgrade(&region));
    }

    fn resolve(&self, id: RegionId) -> Option<Arc<dyn Region>> {
        self.regions.lock().unwrap().get(&id)?.upgrade()
    }
}
