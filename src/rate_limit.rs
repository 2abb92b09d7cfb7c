//! Sliding-window rate limiting over the shared store.

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::kv::StoreBackend;

/// Width of the sliding window.
pub const WINDOW_SECONDS: u64 = 60;

/// Store key prefix namespacing rate-limit windows away from notes.
const WINDOW_KEY_PREFIX: &str = "rl:";

/// Request class with its own per-identity budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitAction {
    /// Note creation.
    Create,
    /// Note preview or consumption.
    Read,
}

impl fmt::Display for RateLimitAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLimitAction::Create => write!(f, "create"),
            RateLimitAction::Read => write!(f, "read"),
        }
    }
}

/// Sliding-window limiter shared across processes through the store.
///
/// All state lives in the store keyed by `rl:{action}:{identity}`, so any
/// number of service instances over the same store enforce one budget.
/// Rejected requests are still recorded in the window; a client hammering
/// past its limit keeps pushing its own recovery out.
#[derive(Clone)]
pub struct RateLimiter {
    backend: Arc<dyn StoreBackend>,
}

impl RateLimiter {
    /// Create a limiter over `backend`.
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self { backend }
    }

    /// Record one request and report whether it is admitted.
    ///
    /// The recorded hit counts toward the returned total, so with a limit
    /// of `n` the n-th request inside a window is admitted and the n+1-th
    /// is not.
    pub async fn allow(
        &self,
        identity: &str,
        action: RateLimitAction,
        limit_per_minute: u32,
    ) -> Result<bool> {
        let key = format!("{WINDOW_KEY_PREFIX}{action}:{identity}");
        let count = self.backend.record_hit(&key, WINDOW_SECONDS).await?;
        Ok(count <= u64::from(limit_per_minute))
    }
}
