//! Treasure metadata (`spec.md` §3.2).

/// Unix timestamp in milliseconds, UTC. `0` means "unset" throughout this
/// crate, per `spec.md` §3.2.
pub type Timestamp = i64;

/// Returns the current wall-clock time as a millisecond UTC timestamp.
pub fn now() -> Timestamp {
    chrono::Utc::now().timestamp_millis()
}

/// Metadata carried by every Treasure, independent of its value variant.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Metadata {
    /// When the Treasure was first written. `0` if unset.
    pub created_at: Timestamp,
    /// Actor that created the Treasure.
    pub created_by: String,
    /// When the Treasure was last updated. `0` if unset.
    pub updated_at: Timestamp,
    /// Actor that last updated the Treasure.
    pub updated_by: String,
    /// Wall-clock expiration threshold. `0` means "never expires".
    pub expired_at: Timestamp,
    /// When the Treasure was shadow-deleted. `0` means "not deleted".
    pub deleted_at: Timestamp,
    /// Actor that deleted the Treasure.
    pub deleted_by: String,
}

impl Metadata {
    /// A tombstone is a Treasure whose `deleted_at` is set (`spec.md` §3.2
    /// invariant ii).
    pub fn is_tombstone(&self) -> bool {
        self.deleted_at > 0
    }

    /// Whether `expired_at` is set and has passed relative to `now`
    /// (`spec.md` §3.2 invariant iii). A Treasure with `expired_at == 0`
    /// never expires.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expired_at > 0 && self.expired_at <= now
    }
}
