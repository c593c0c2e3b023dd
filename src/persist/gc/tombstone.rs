use super::ids::{EntryId, MemberId, RegionId};
use serde::{Deserialize, Serialize};

/// Fixed accounting overhead charged against every queued tombstone,
/// independent of the key it shadows. Mirrors the distilled spec's
/// "fixed per-entry overhead plus key size estimate".
pub const PER_TOMBSTONE_OVERHEAD_BYTES: u64 = 48;

/// The version stamp a destroy carries. Resolved from whatever the
/// region map attached to the destroyed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionTag {
    pub member_id: Option<MemberId>,
    pub region_version: u64,
    pub entry_version: u64,
    pub timestamp_ms: i64,
}

/// A destroyed-entry marker, retained so a late, stale-versioned update
/// can be recognized and discarded instead of resurrecting the entry.
///
/// Immutable once constructed: every field is fixed at schedule time and
/// nothing in the sweeper ever mutates a `Tombstone` in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tombstone {
    pub region: RegionId,
    pub entry: EntryId,
    pub member_id: Option<MemberId>,
    pub region_version: u64,
    pub entry_version: u64,
    pub timestamp_ms: i64,
    pub key_size_estimate: u64,
}

impl Tombstone {
    pub fn new(region: RegionId, entry: EntryId, tag: VersionTag, key_size_estimate: u64) -> Self {
        Self {
            region,
            entry,
            member_id: tag.member_id,
            region_version: tag.region_version,
            entry_version: tag.entry_version,
            timestamp_ms: tag.timestamp_ms,
            key_size_estimate,
        }
    }

    /// Accounting size: fixed overhead plus the key's estimated footprint.
    pub fn size(&self) -> u64 {
        PER_TOMBSTONE_OVERHEAD_BYTES.saturating_add(self.key_size_estimate)
    }

    /// Resolves the member that issued the destroy, substituting the
    /// local member id when the destroy carried none.
    pub fn destroying_member(&self, local_member_id: MemberId) -> MemberId {
        self.member_id.unwrap_or(local_member_id)
    }

    /// Milliseconds until this tombstone reaches `expiry_ms` age, measured
    /// against `now_ms`. Negative once the tombstone has aged out.
    pub fn ms_remaining(&self, now_ms: i64, expiry_ms: u64) -> i64 {
        self.timestamp_ms.saturating_add(expiry_ms as i64) - now_ms
    }
}
