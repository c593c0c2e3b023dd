//! Batch reclamation (C5): the RVV-record → prune → persist → remove →
//! distribute sequence, run against the accumulated expired batch of a
//! batch-mode sweeper, and reused by `gcByRVV` for its own, narrower
//! removal set.

use super::collab::Region;
use super::error::GcError;
use super::ids::{EntryId, MemberId};
use super::sweeper::Sweeper;
use super::tombstone::Tombstone;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::warn;

/// Runs one batch reclamation pass, if one isn't already in flight and
/// the block-GC counter allows it. No-op (and does not touch
/// `batch_in_progress`) if the expired batch is empty.
pub(crate) async fn reclaim(sweeper: &Arc<Sweeper>) {
    let guard = sweeper.block_gc.lock().await;
    if *guard > 0 {
        return;
    }
    // Held for the entirety of the pass: batch reclamation and `gcByRVV`
    // must be mutually exclusive with a concurrent `incrementBlockGC`,
    // not merely with each other's initial check.

    if sweeper
        .batch_in_progress
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return;
    }

    let items = {
        let mut state = sweeper.state.lock().await;
        state.expired.take()
    };

    if items.is_empty() {
        sweeper.batch_in_progress.store(false, Ordering::SeqCst);
        return;
    }

    let mut by_region: HashMap<_, Vec<Tombstone>> = HashMap::new();
    for t in items {
        by_region.entry(t.region).or_default().push(t);
    }

    let mut removed_bytes: u64 = 0;
    let mut removed_count: u64 = 0;
    let mut distribute_targets: Vec<(Arc<dyn Region>, HashSet<Vec<u8>>)> = Vec::new();
    let mut requeued: Vec<Tombstone> = Vec::new();

    for (region_id, tombstones) in by_region {
        let Some(region) = sweeper.directory.resolve(region_id) else {
            // Region closed out from under us; unschedule should already
            // have cleared its tombstones, but if it raced ahead of us,
            // put them back for a future pass instead of losing them.
            requeued.extend(tombstones);
            continue;
        };

        let local_member = region.local_member_id();
        for t in &tombstones {
            region
                .version_vector()
                .record_gc_version(t.destroying_member(local_member), t.region_version);
        }

        let up_to = region.version_vector().snapshot_gc_versions();
        region.version_vector().prune_old_exceptions(&up_to);

        if region.data_policy().with_persistence {
            if let Err(err) = region.version_vector().write_rvv_gc().await {
                warn!(region = region.full_path(), %err, "failed to persist GC RVV; retrying region next pass");
                requeued.extend(tombstones);
                continue;
            }
        }

        // Only past the persistence barrier are these tombstones actually
        // being removed; only now do they leave the sweeper's byte
        // accounting.
        removed_bytes = removed_bytes.saturating_add(tombstones.iter().map(Tombstone::size).sum());

        let region_map = region.region_map();
        let bucket = region.is_partitioned_bucket();
        let mut keys = HashSet::new();
        for t in &tombstones {
            match region_map.remove_tombstone(t.entry, t, false, true).await {
                Ok(true) => {
                    removed_count += 1;
                    if bucket {
                        keys.insert(region_map.key_for(t.entry));
                    }
                }
                Ok(false) => {}
                Err(GcError::Cancelled) => {}
                Err(err) => warn!(%err, "region map failed to remove tombstone during batch reclamation"),
            }
        }

        // Every region touched by this batch gets told what was reaped,
        // even when `keys` is empty (non-bucket regions never populate
        // it) — distribution is per-region, not conditioned on there
        // being bucket keys to report.
        distribute_targets.push((region.clone(), keys));
    }

    {
        let mut state = sweeper.state.lock().await;
        state.queue_bytes = state.queue_bytes.saturating_sub(removed_bytes);
        for t in requeued {
            state.expired.push(t);
        }
    }

    sweeper.stats.record_batch_reclaimed(removed_count);

    let batch_in_progress = sweeper.batch_in_progress.clone();
    let batch_done = sweeper.batch_done.clone();
    if distribute_targets.is_empty() {
        batch_in_progress.store(false, Ordering::SeqCst);
        batch_done.notify_waiters();
    } else {
        tokio::spawn(async move {
            for (region, keys) in distribute_targets {
                region.distribute_tombstone_gc(keys).await;
            }
            batch_in_progress.store(false, Ordering::SeqCst);
            batch_done.notify_waiters();
        });
    }
}

/// Shared tail of `gcByRVV`: record → prune → (persist) → remove, for a
/// caller-selected set of tombstones already pulled out of the queue and
/// current slot. Returns the set of reaped keys (empty unless
/// `needs_keys` and the region is a partitioned bucket).
pub(crate) async fn finalize_removal(
    _sweeper: &Sweeper,
    region: &Arc<dyn Region>,
    tombstones: Vec<Tombstone>,
    needs_keys: bool,
) -> Option<HashSet<Vec<u8>>> {
    if tombstones.is_empty() {
        return Some(HashSet::new());
    }

    let local_member = region.local_member_id();
    let gc_versions: BTreeMap<MemberId, u64> = {
        for t in &tombstones {
            region
                .version_vector()
                .record_gc_version(t.destroying_member(local_member), t.region_version);
        }
        region.version_vector().snapshot_gc_versions()
    };
    region.version_vector().prune_old_exceptions(&gc_versions);

    if region.data_policy().with_persistence {
        if let Err(err) = region.version_vector().write_rvv_gc().await {
            warn!(region = region.full_path(), %err, "failed to persist GC RVV during gcByRVV");
            return Some(HashSet::new());
        }
    }

    let region_map = region.region_map();
    let bucket = region.is_partitioned_bucket();
    let mut keys = HashSet::new();
    for t in &tombstones {
        let entry: EntryId = t.entry;
        match region_map.remove_tombstone(entry, t, false, true).await {
            Ok(true) if needs_keys && bucket => {
                keys.insert(region_map.key_for(entry));
            }
            Ok(_) => {}
            Err(GcError::Cancelled) => {}
            Err(err) => warn!(%err, "region map failed to remove tombstone during gcByRVV"),
        }
    }

    Some(keys)
}
