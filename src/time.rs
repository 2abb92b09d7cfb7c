//! Wall-clock access with an injectable provider for deterministic tests.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// Current unix time in milliseconds from the system clock.
pub fn current_time_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Current unix time in whole seconds from the system clock.
pub fn current_time_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Current unix time in nanoseconds from the system clock.
///
/// Fine enough that two readings from concurrent requests are distinct in
/// practice, which keeps rate-limit window members unique.
pub fn current_time_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0)
}

/// Source of the current time for components that enforce deadlines.
///
/// Production code uses [`SystemTimeProvider`]; tests substitute
/// [`SimulatedTimeProvider`] to step through TTLs and rate-limit windows
/// without sleeping.
pub trait TimeProvider: Send + Sync {
    /// Current unix time in milliseconds.
    fn now_ms(&self) -> u64;

    /// Current unix time in whole seconds.
    fn now_secs(&self) -> u64 {
        self.now_ms() / 1000
    }
}

/// [`TimeProvider`] backed by the system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_ms(&self) -> u64 {
        current_time_ms()
    }
}

/// Manually advanced clock for deterministic tests.
///
/// Starts at the given instant and only moves when told to.
#[derive(Debug, Default)]
pub struct SimulatedTimeProvider {
    now_ms: AtomicU64,
}

impl SimulatedTimeProvider {
    /// Create a clock frozen at `start_ms`.
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(start_ms),
        }
    }

    /// Move the clock forward by `delta_ms` milliseconds.
    pub fn advance_ms(&self, delta_ms: u64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }

    /// Move the clock forward by `delta_secs` seconds.
    pub fn advance_secs(&self, delta_secs: u64) {
        self.advance_ms(delta_secs * 1000);
    }
}

impl TimeProvider for SimulatedTimeProvider {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}
