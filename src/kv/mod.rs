//! Storage backend abstraction over the shared key-value store.
//!
//! The note store and the rate limiter both run on top of this trait. All
//! cross-request coordination (the view-decrement race, the window update)
//! happens inside the backend's atomic operations, never in process-local
//! locks, because several service instances may share one store.

mod memory;
mod redis;

pub use memory::InMemoryBackend;
pub use self::redis::RedisBackend;

use async_trait::async_trait;

use crate::error::NoteError;
use crate::error::Result;

/// Key probed by the liveness check.
const PROBE_KEY: &str = "healthcheck:probe";
/// Seconds before a stale probe value falls out of the store.
const PROBE_TTL_SECONDS: u64 = 5;
const PROBE_VALUE: &str = "1";

/// Storage primitives required by the note store and rate limiter.
///
/// Implementations must make `consume_record` and `record_hit` atomic with
/// respect to concurrent callers, including callers in other processes
/// sharing the same store.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Fetch the value at `key`, if present and not expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` at `key` with no lifetime limit.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Store `value` at `key`, expiring after `ttl_seconds`.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()>;

    /// Remove `key`. Returns `true` when a live value existed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Atomically read the JSON record at `key` and retire one view.
    ///
    /// When the record carries a `views` field, the count is decremented in
    /// the same indivisible step: a final view deletes the key, otherwise the
    /// record is rewritten in place with its remaining TTL intact. Records
    /// without a `views` field pass through unmodified. Returns the
    /// post-mutation record, or `None` when no live record exists.
    async fn consume_record(&self, key: &str) -> Result<Option<String>>;

    /// Record one hit on the sliding window at `key` and return the number
    /// of hits inside the trailing `window_seconds`, including this one.
    ///
    /// Trim, insert, count, and expiry refresh are one atomic step. The
    /// window key's expiry is refreshed to slightly more than the window so
    /// idle keys vanish from the store on their own.
    async fn record_hit(&self, key: &str, window_seconds: u64) -> Result<u64>;

    /// Verify the store answers a real write-then-read round trip.
    async fn probe(&self) -> Result<()> {
        self.set_with_ttl(PROBE_KEY, PROBE_VALUE, PROBE_TTL_SECONDS).await?;
        match self.get(PROBE_KEY).await? {
            Some(value) if value == PROBE_VALUE => Ok(()),
            _ => Err(NoteError::StoreUnavailable {
                reason: "probe value did not round-trip".to_string(),
            }),
        }
    }
}
