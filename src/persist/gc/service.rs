//! Service façade (C7): owns the two sweepers a cache needs and routes
//! operations to whichever one services a given region.

use super::collab::{is_replicated_region, Cache, Region, RegionDirectory};
use super::config::GcConfig;
use super::ids::{EntryId, MemberId, RegionId};
use super::sweeper::Sweeper;
use super::tombstone::VersionTag;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

/// Owns the replicated (batch-mode) and non-replicated (non-batch)
/// sweepers for one cache, and dispatches the C6 API to the right one.
pub struct GcService {
    replicated: Arc<Sweeper>,
    non_replicated: Arc<Sweeper>,
}

impl GcService {
    /// Constructs and starts both sweepers, sharing a single block-GC
    /// counter between them — block-GC is a cluster-wide signal, not a
    /// per-sweeper one.
    pub fn initialize(
        config: Arc<GcConfig>,
        cache: Arc<dyn Cache>,
        directory: Arc<dyn RegionDirectory>,
    ) -> Self {
        let block_gc = Arc::new(AsyncMutex::new(0u32));

        let replicated = Sweeper::spawn(
            config.replicated,
            config.clone(),
            cache.clone(),
            directory.clone(),
            block_gc.clone(),
        );
        let non_replicated = Sweeper::spawn(
            config.non_replicated,
            config,
            cache,
            directory,
            block_gc,
        );

        Self {
            replicated,
            non_replicated,
        }
    }

    /// Stops both sweepers and drops their queued work.
    pub async fn stop(&self) {
        self.replicated.stop().await;
        self.non_replicated.stop().await;
        self.replicated.clear().await;
        self.non_replicated.clear().await;
    }

    pub fn replicated(&self) -> &Arc<Sweeper> {
        &self.replicated
    }

    pub fn non_replicated(&self) -> &Arc<Sweeper> {
        &self.non_replicated
    }

    fn sweeper_for(&self, region: &Arc<dyn Region>) -> &Arc<Sweeper> {
        if is_replicated_region(region.as_ref()) {
            &self.replicated
        } else {
            &self.non_replicated
        }
    }

    pub async fn schedule(
        &self,
        region: &Arc<dyn Region>,
        entry: EntryId,
        destroyed_version: Option<VersionTag>,
        key_size_estimate: u64,
    ) {
        self.sweeper_for(region)
            .schedule(region, entry, destroyed_version, key_size_estimate)
            .await;
    }

    /// Removes `region`'s tombstones from both sweepers: a region's data
    /// policy can't be assumed stable once it's being torn down.
    pub async fn unschedule(&self, region: RegionId) {
        self.replicated.unschedule(region).await;
        self.non_replicated.unschedule(region).await;
    }

    pub async fn gc_by_rvv(
        &self,
        region: &Arc<dyn Region>,
        gc_versions: &BTreeMap<MemberId, u64>,
        needs_keys: bool,
    ) -> Option<HashSet<Vec<u8>>> {
        self.sweeper_for(region)
            .gc_by_rvv(region, gc_versions, needs_keys)
            .await
    }

    pub async fn gc_by_keys(&self, region: &Arc<dyn Region>, keys: &HashSet<Vec<u8>>) {
        self.sweeper_for(region).gc_by_keys(region, keys).await;
    }

    pub async fn increment_block_gc(&self) {
        self.replicated.increment_block_gc().await;
    }

    pub async fn decrement_block_gc(&self) {
        self.replicated.decrement_block_gc().await;
    }

    pub async fn block_gc_count(&self) -> u32 {
        self.replicated.block_gc_count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::gc::collab::memory::{InMemoryCache, InMemoryRegion, InMemoryRegionDirectory};
    use crate::persist::gc::collab::DataPolicy;

    #[tokio::test]
    async fn routes_to_replicated_sweeper_for_replicated_regions() {
        let config = Arc::new(GcConfig::default());
        let cache = InMemoryCache::new(0);
        let directory = InMemoryRegionDirectory::new();
        let service = GcService::initialize(config, cache.clone(), directory.clone());

        let region: Arc<dyn Region> = InMemoryRegion::new("/r", MemberId(1)).with_data_policy(DataPolicy {
            with_replication: true,
            with_persistence: false,
        });

        service
            .schedule(
                &region,
                EntryId::new(),
                Some(VersionTag {
                    member_id: Some(MemberId(1)),
                    region_version: 1,
                    entry_version: 1,
                    timestamp_ms: 0,
                }),
                16,
            )
            .await;

        assert_eq!(service.replicated.state.lock().await.queue.len(), 1);
        assert_eq!(service.non_replicated.state.lock().await.queue.len(), 0);

        service.stop().await;
    }

    #[tokio::test]
    async fn routes_to_non_replicated_sweeper_otherwise() {
        let config = Arc::new(GcConfig::default());
        let cache = InMemoryCache::new(0);
        let directory = InMemoryRegionDirectory::new();
        let service = GcService::initialize(config, cache.clone(), directory.clone());

        let region: Arc<dyn Region> = InMemoryRegion::new("/r", MemberId(1));

        service
            .schedule(
                &region,
                EntryId::new(),
                Some(VersionTag {
                    member_id: Some(MemberId(1)),
                    region_version: 1,
                    entry_version: 1,
                    timestamp_ms: 0,
                }),
                16,
            )
            .await;

        assert_eq!(service.non_replicated.state.lock().await.queue.len(), 1);
        assert_eq!(service.replicated.state.lock().await.queue.len(), 0);

        service.stop().await;
    }
}
