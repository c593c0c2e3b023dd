//! The sweeper loop (C4) and the reclamation API it serves (C6).
//!
//! One `Sweeper` instance is a single parameterized component: the two
//! sweepers a cache needs (replicated/batch, non-replicated/non-batch)
//! are two instances of this same type, differing only in `SweeperTuning`.
//! Do not duplicate the loop for the second instance.

use super::batch;
use super::collab::{Cache, Region, RegionDirectory};
use super::config::{GcConfig, SweeperTuning};
use super::error::GcError;
use super::expired_batch::ExpiredBatch;
use super::ids::{EntryId, MemberId, RegionId};
use super::queue::SweepQueue;
use super::stats::SweeperStats;
use super::tombstone::{Tombstone, VersionTag};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::Duration as TokioDuration;
use tracing::{debug, trace, warn};

/// Everything guarded by the "current tombstone lock": the slot the
/// sweeper is actively waiting on, the live queue behind it, and (batch
/// mode only) the age-expired tombstones awaiting cluster reclamation.
///
/// One lock covers all three so `foreach_tombstone`-style scans (the
/// defunct scan, `gcByRVV`, `gcByKeys`, `unschedule`) see a single
/// consistent snapshot instead of racing the loop advancing the slot.
pub(crate) struct SweeperState {
    pub current: Option<Tombstone>,
    pub queue: SweepQueue,
    pub expired: ExpiredBatch,
    /// Bytes for every tombstone still "present" anywhere above —
    /// queued, in the slot, or sitting in the expired batch. Decremented
    /// only at the points the spec calls out as actual removal.
    pub queue_bytes: u64,
}

impl SweeperState {
    fn new() -> Self {
        Self {
            current: None,
            queue: SweepQueue::new(),
            expired: ExpiredBatch::new(),
            queue_bytes: 0,
        }
    }

    fn add_bytes(&mut self, t: &Tombstone) {
        self.queue_bytes = self.queue_bytes.saturating_add(t.size());
    }

    fn sub_bytes(&mut self, t: &Tombstone) {
        self.queue_bytes = self.queue_bytes.saturating_sub(t.size());
    }
}

pub struct Sweeper {
    pub(crate) tuning: SweeperTuning,
    pub(crate) config: Arc<GcConfig>,
    pub(crate) cache: Arc<dyn Cache>,
    pub(crate) directory: Arc<dyn RegionDirectory>,
    pub(crate) state: Mutex<SweeperState>,
    pub(crate) block_gc: Arc<Mutex<u32>>,
    pub(crate) wake: Notify,
    pub(crate) force_batch: AtomicBool,
    pub(crate) forced_expiration_count: AtomicU32,
    pub(crate) batch_in_progress: Arc<AtomicBool>,
    pub(crate) batch_done: Arc<Notify>,
    pub(crate) stats: SweeperStats,
    stop_tx: Mutex<Option<oneshot::Sender<()>>>,
    join_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Sweeper {
    /// Builds and starts the background task. `block_gc` is shared across
    /// both sweepers of a cache (the block-GC counter is cluster-wide,
    /// not per-sweeper).
    pub fn spawn(
        tuning: SweeperTuning,
        config: Arc<GcConfig>,
        cache: Arc<dyn Cache>,
        directory: Arc<dyn RegionDirectory>,
        block_gc: Arc<Mutex<u32>>,
    ) -> Arc<Self> {
        let sweeper = Arc::new(Self {
            tuning,
            config,
            cache,
            directory,
            state: Mutex::new(SweeperState::new()),
            block_gc,
            wake: Notify::new(),
            force_batch: AtomicBool::new(false),
            forced_expiration_count: AtomicU32::new(0),
            batch_in_progress: Arc::new(AtomicBool::new(false)),
            batch_done: Arc::new(Notify::new()),
            stats: SweeperStats::default(),
            stop_tx: Mutex::new(None),
            join_handle: Mutex::new(None),
        });

        let (stop_tx, stop_rx) = oneshot::channel();
        let loop_sweeper = sweeper.clone();
        let handle = tokio::spawn(async move { loop_sweeper.run(stop_rx).await });

        // Constructor, not yet shared: plain blocking-free assignment.
        if let Ok(mut guard) = sweeper.stop_tx.try_lock() {
            *guard = Some(stop_tx);
        }
        if let Ok(mut guard) = sweeper.join_handle.try_lock() {
            *guard = Some(handle);
        }

        sweeper
    }

    pub fn is_batch_mode(&self) -> bool {
        self.tuning.batch_mode
    }

    pub fn stats(&self) -> &SweeperStats {
        &self.stats
    }

    /// Wakes the loop immediately instead of waiting for its current
    /// sleep to elapse. Exposed for tests driving a virtual clock; the
    /// same path `schedule`/`stop`/`force_batch_expiration_for_tests`
    /// already use internally.
    pub fn wake_now(&self) {
        self.wake.notify_one();
    }

    /// Signals the loop to stop and waits (bounded) for it to exit.
    pub async fn stop(&self) {
        if let Some(tx) = self.stop_tx.lock().await.take() {
            let _ = tx.send(());
        }
        self.wake.notify_one();
        if let Some(handle) = self.join_handle.lock().await.take() {
            let _ = tokio::time::timeout(TokioDuration::from_millis(100), handle).await;
        }
    }

    /// Empties the queue, current slot, and expired batch, for shutdown.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.current = None;
        while state.queue.pop_front().is_some() {}
        state.expired.take();
        state.queue_bytes = 0;
    }

    // ---------------------------------------------------------------
    // C6: Reclamation API
    // ---------------------------------------------------------------

    /// Schedules a tombstone for a just-destroyed entry. Rejects (logs,
    /// drops) entries without a version stamp rather than propagating an
    /// error the caller would have to special-case.
    pub async fn schedule(
        &self,
        region: &Arc<dyn Region>,
        entry: EntryId,
        destroyed_version: Option<VersionTag>,
        key_size_estimate: u64,
    ) {
        let Some(tag) = destroyed_version else {
            warn!(?entry, "dropping schedule: entry has no version stamp");
            return;
        };

        self.directory.register(region.clone());
        let tombstone = Tombstone::new(region.id(), entry, tag, key_size_estimate);

        let mut state = self.state.lock().await;
        state.add_bytes(&tombstone);
        state.queue.enqueue(tombstone);
        drop(state);
        debug!(region = region.full_path(), ?entry, "tombstone scheduled");
        self.wake.notify_one();
    }

    /// Removes every tombstone of `region` from the queue, current slot,
    /// and expired batch. Used on region clear/destroy.
    pub async fn unschedule(&self, region: RegionId) {
        let mut state = self.state.lock().await;

        let mut removed = state.queue.remove_region(region);

        if state.current.as_ref().is_some_and(|t| t.region == region) {
            removed.push(state.current.take().unwrap());
        }

        let mut expired_items = state.expired.take();
        let (matching, rest): (Vec<_>, Vec<_>) =
            expired_items.drain(..).partition(|t| t.region == region);
        for t in rest {
            state.expired.push(t);
        }
        removed.extend(matching);

        for t in &removed {
            state.sub_bytes(t);
        }
    }

    /// Under the block-GC mutex: scans the combined current-slot + queue
    /// for tombstones of `region` whose destroying member's recorded
    /// version is covered by `gc_versions`, then runs the same
    /// RVV-record → prune → persist → remove sequence batch reclamation
    /// uses. Returns `None` (the null sentinel) if block-GC is in effect.
    pub async fn gc_by_rvv(
        &self,
        region: &Arc<dyn Region>,
        gc_versions: &std::collections::BTreeMap<MemberId, u64>,
        needs_keys: bool,
    ) -> Option<HashSet<Vec<u8>>> {
        let guard = self.block_gc.lock().await;
        if *guard > 0 {
            return None;
        }
        // Held for the entirety of the call: an `incrementBlockGC` that
        // lands after this check must not be able to race a removal that
        // was already in flight.

        let local_member = region.local_member_id();
        let mut state = self.state.lock().await;

        let mut to_remove = Vec::new();
        if let Some(t) = &state.current {
            if t.region == region.id() {
                let destroying = t.destroying_member(local_member);
                if gc_versions.get(&destroying).is_some_and(|v| *v >= t.region_version) {
                    to_remove.push(t.clone());
                }
            }
        }
        to_remove.extend(state.queue.iter().filter(|t| {
            t.region == region.id() && {
                let destroying = t.destroying_member(local_member);
                gc_versions.get(&destroying).is_some_and(|v| *v >= t.region_version)
            }
        }).cloned());

        if to_remove.is_empty() {
            return Some(HashSet::new());
        }

        for t in &to_remove {
            if state.current.as_ref() == Some(t) {
                state.current = None;
            } else {
                state.queue.drain_matching(|q| q == t);
            }
            state.sub_bytes(t);
        }
        drop(state);

        batch::finalize_removal(self, region, to_remove, needs_keys).await
    }

    /// Client-side GC by key for partitioned servers. No-op if the
    /// region has no server proxy.
    pub async fn gc_by_keys(&self, region: &Arc<dyn Region>, keys: &HashSet<Vec<u8>>) {
        if !region.has_server_proxy() {
            return;
        }

        let region_map = region.region_map();
        let mut state = self.state.lock().await;

        let mut to_remove = Vec::new();
        if let Some(t) = &state.current {
            if t.region == region.id() && keys.contains(&region_map.key_for(t.entry)) {
                to_remove.push(t.clone());
            }
        }
        to_remove.extend(state.queue.iter().filter(|t| {
            t.region == region.id() && keys.contains(&region_map.key_for(t.entry))
        }).cloned());

        for t in &to_remove {
            if state.current.as_ref() == Some(t) {
                state.current = None;
            } else {
                state.queue.drain_matching(|q| q == t);
            }
            state.sub_bytes(t);
        }
        drop(state);

        for t in to_remove {
            match region_map.remove_tombstone(t.entry, &t, false, true).await {
                Ok(_) => {}
                Err(GcError::Cancelled) => {}
                Err(err) => warn!(%err, "region map failed to remove tombstone during gcByKeys"),
            }
        }
    }

    pub async fn increment_block_gc(&self) {
        let mut guard = self.block_gc.lock().await;
        *guard = guard.saturating_add(1);
    }

    pub async fn decrement_block_gc(&self) {
        let mut guard = self.block_gc.lock().await;
        *guard = guard.saturating_sub(1);
    }

    pub async fn block_gc_count(&self) -> u32 {
        *self.block_gc.lock().await
    }

    /// Test-only: forces `n` forced expirations and waits (bounded) for a
    /// batch reclamation pass to complete.
    pub async fn force_batch_expiration_for_tests(&self, n: u32) {
        self.forced_expiration_count.fetch_add(n, Ordering::SeqCst);
        self.wake.notify_one();
        let _ = tokio::time::timeout(TokioDuration::from_secs(30), self.batch_done.notified()).await;
    }

    // ---------------------------------------------------------------
    // C4: Sweeper loop
    // ---------------------------------------------------------------

    async fn run(self: Arc<Self>, mut stop_rx: oneshot::Receiver<()>) {
        let mut last_scan_ms = self.cache.cache_time_ms();
        let min_scan_floor_ms = self.config.min_scan_floor_ms;
        let mut min_scan_ms = min_scan_floor_ms;

        'outer: loop {
            if self.cache.is_cancelled() {
                return;
            }

            // Step 1: publish stats.
            let published_bytes = self.state.lock().await.queue_bytes;
            self.stats.publish_queue_bytes(published_bytes);
            if self.tuning.batch_mode {
                self.cache.set_replicated_tombstones_size(published_bytes);
            } else {
                self.cache.set_non_replicated_tombstones_size(published_bytes);
            }
            self.stats.record_pass();

            // Step 2: batch trigger.
            if self.tuning.batch_mode {
                let expired_len = self.state.lock().await.expired.len();
                let forced = self.force_batch.swap(false, Ordering::SeqCst);
                if forced
                    || expired_len >= self.config.expired_limit
                    || self.config.test_hooks.force_gc_memory_events
                {
                    batch::reclaim(&self).await;
                }
            }

            // Step 3: memory pressure.
            if self.tuning.batch_mode && self.config.gc_memory_threshold_pct > 0 {
                let mem = self.cache.runtime_memory();
                if mem.total > 0 {
                    let free = mem.free + mem.max.saturating_sub(mem.total);
                    let ratio = free as f64 / mem.total as f64;
                    let expired_len = self.state.lock().await.expired.len();
                    if ratio < self.config.gc_memory_threshold_ratio()
                        && !self.batch_in_progress.load(Ordering::SeqCst)
                        && expired_len > self.config.expired_limit / 4
                    {
                        self.force_batch.store(true, Ordering::SeqCst);
                    }
                }
            }

            // Step 4: pick current tombstone.
            let mut sleep_ms: i64;
            let mut expire_now = false;
            {
                let mut state = self.state.lock().await;
                if state.current.is_none() {
                    state.current = state.queue.pop_front();
                }

                let now = self.cache.cache_time_ms();
                match &state.current {
                    None => {
                        sleep_ms = self.tuning.expiry_ms as i64;
                        self.forced_expiration_count.store(0, Ordering::SeqCst);
                    }
                    Some(t) => {
                        let remaining = t.ms_remaining(now, self.tuning.expiry_ms);
                        let min_retention = self.tuning.min_retention_ms() as i64;
                        let forced = self.forced_expiration_count.load(Ordering::SeqCst);
                        if forced > 0 && remaining > 0 && remaining <= min_retention {
                            sleep_ms = remaining;
                        } else if forced > 0 {
                            self.forced_expiration_count.fetch_sub(1, Ordering::SeqCst);
                            expire_now = true;
                            sleep_ms = 0;
                        } else if remaining > 0 {
                            sleep_ms = remaining;
                        } else {
                            expire_now = true;
                            sleep_ms = 0;
                        }
                    }
                }

                // Step 6: expire current.
                if expire_now {
                    let t = state.current.take().unwrap();
                    if self.tuning.batch_mode {
                        state.expired.push(t);
                    } else {
                        state.sub_bytes(&t);
                        drop(state);
                        self.remove_expired_non_batch(t).await;
                        state = self.state.lock().await;
                    }
                }

                drop(state);
            }

            // Step 7: defunct scan.
            let now = self.cache.cache_time_ms();
            if sleep_ms > min_scan_ms as i64
                && now - last_scan_ms >= self.config.scan_interval_ms(self.tuning) as i64
            {
                let scan_start = now;
                let forced_zero = self.run_defunct_scan().await;
                if forced_zero {
                    sleep_ms = 0;
                }
                last_scan_ms = now;

                let elapsed = self.cache.cache_time_ms() - scan_start;
                sleep_ms -= elapsed;
                if sleep_ms <= 0 {
                    min_scan_ms = elapsed.max(0) as u64;
                    continue 'outer;
                }
            }

            // Step 8: idle batch (test hook).
            if self.config.test_hooks.idle_expiration
                && self.tuning.batch_mode
                && sleep_ms >= self.tuning.expiry_ms as i64
                && !self.state.lock().await.expired.is_empty()
            {
                batch::reclaim(&self).await;
            }

            // Step 9: sleep.
            let sleep_ms = sleep_ms.clamp(0, self.config.max_sleep_ms as i64) as u64;
            trace!(sleep_ms, "sweeper loop computed sleep");

            tokio::select! {
                _ = &mut stop_rx => return,
                _ = self.wake.notified() => {}
                _ = tokio::time::sleep(TokioDuration::from_millis(sleep_ms)) => {}
            }
        }
    }

    async fn remove_expired_non_batch(&self, t: Tombstone) {
        let Some(region) = self.directory.resolve(t.region) else {
            return;
        };
        match region.region_map().remove_tombstone(t.entry, &t, false, true).await {
            Ok(_) => {}
            Err(GcError::Cancelled) => {}
            Err(err) => warn!(%err, "region map failed to remove expired tombstone"),
        }
    }

    /// Scans current slot + queue for resurrected tombstones, and (batch
    /// mode) the queue for age-expired ones plus the expired batch for
    /// resurrections. Returns whether anything changed (forcing sleep to
    /// zero so the loop reconsiders immediately).
    async fn run_defunct_scan(&self) -> bool {
        let mut state = self.state.lock().await;
        let now = self.cache.cache_time_ms();
        let batch_mode = self.tuning.batch_mode;
        let mut changed = false;

        if let Some(t) = state.current.clone() {
            if let Some(region) = self.directory.resolve(t.region) {
                if region.region_map().is_tombstone_not_needed(t.entry, t.entry_version) {
                    state.current = None;
                    state.sub_bytes(&t);
                    changed = true;
                }
            }
        }

        let mut resurrected = Vec::new();
        let mut aged_out = Vec::new();
        for t in state.queue.iter() {
            let Some(region) = self.directory.resolve(t.region) else {
                continue;
            };
            if region.region_map().is_tombstone_not_needed(t.entry, t.entry_version) {
                resurrected.push(t.clone());
            } else if batch_mode && t.ms_remaining(now, self.tuning.expiry_ms) <= 0 {
                aged_out.push(t.clone());
            }
        }

        if !resurrected.is_empty() {
            let removed = state.queue.drain_matching(|t| resurrected.contains(t));
            for t in &removed {
                state.sub_bytes(t);
            }
            changed = changed || !removed.is_empty();
        }

        if batch_mode && !aged_out.is_empty() {
            let moved = state.queue.drain_matching(|t| aged_out.contains(t));
            for t in moved {
                state.expired.push(t);
            }
            changed = true;
        }

        if batch_mode {
            let directory = &self.directory;
            let dropped = state.expired.drop_not_needed(|t| {
                directory
                    .resolve(t.region)
                    .is_some_and(|r| r.region_map().is_tombstone_not_needed(t.entry, t.entry_version))
            });
            if dropped > 0 {
                changed = true;
            }
        }

        changed
    }
}
