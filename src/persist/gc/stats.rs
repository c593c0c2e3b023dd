use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free gauges a sweeper publishes once per loop iteration, read by
/// the cache's perf-stats surface and by tests without touching the
/// current-tombstone lock.
#[derive(Debug, Default)]
pub struct SweeperStats {
    queue_bytes: AtomicU64,
    passes: AtomicU64,
    batches_reclaimed: AtomicU64,
    tombstones_reclaimed: AtomicU64,
}

impl SweeperStats {
    pub fn publish_queue_bytes(&self, bytes: u64) {
        self.queue_bytes.store(bytes, Ordering::Relaxed);
    }

    pub fn queue_bytes(&self) -> u64 {
        self.queue_bytes.load(Ordering::Relaxed)
    }

    pub fn record_pass(&self) {
        self.passes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }

    pub fn record_batch_reclaimed(&self, tombstone_count: u64) {
        self.batches_reclaimed.fetch_add(1, Ordering::Relaxed);
        self.tombstones_reclaimed
            .fetch_add(tombstone_count, Ordering::Relaxed);
    }

    pub fn batches_reclaimed(&self) -> u64 {
        self.batches_reclaimed.load(Ordering::Relaxed)
    }

    pub fn tombstones_reclaimed(&self) -> u64 {
        self.tombstones_reclaimed.load(Ordering::Relaxed)
    }
}
