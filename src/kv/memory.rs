//! Deterministic in-memory backend for tests and single-process use.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::NoteError;
use crate::error::Result;
use crate::kv::StoreBackend;
use crate::time::SystemTimeProvider;
use crate::time::TimeProvider;

/// Stored value plus its optional expiry deadline in unix milliseconds.
struct Entry {
    value: String,
    expires_at_ms: Option<u64>,
}

/// Hit log for one sliding window, with its own expiry deadline.
struct Window {
    hits_ms: Vec<u64>,
    expires_at_ms: u64,
}

/// In-memory [`StoreBackend`] with the same observable semantics as Redis.
///
/// TTLs are enforced lazily: an expired entry is treated as absent and
/// dropped the next time it is touched. Consume and window updates run under
/// one mutex, which stands in for the store-side atomicity of the production
/// backend. The clock is injectable so tests can step through expiry and
/// rate-limit windows without sleeping.
pub struct InMemoryBackend {
    entries: Mutex<HashMap<String, Entry>>,
    windows: Mutex<HashMap<String, Window>>,
    time: Arc<dyn TimeProvider>,
}

impl InMemoryBackend {
    /// Create a backend on the system clock.
    pub fn new() -> Self {
        Self::with_time_provider(Arc::new(SystemTimeProvider))
    }

    /// Create a backend on the given clock.
    pub fn with_time_provider(time: Arc<dyn TimeProvider>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            windows: Mutex::new(HashMap::new()),
            time,
        }
    }

    /// Read the live value at `key`, dropping it if its deadline passed.
    fn live_value(entries: &mut HashMap<String, Entry>, key: &str, now_ms: u64) -> Option<String> {
        match entries.get(key) {
            Some(entry) if entry.expires_at_ms.is_some_and(|deadline| deadline <= now_ms) => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock().await;
        Ok(Self::live_value(&mut entries, key, self.time.now_ms()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at_ms: None,
            },
        );
        Ok(())
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at_ms: Some(self.time.now_ms() + ttl_seconds * 1000),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries.lock().await;
        let existed = Self::live_value(&mut entries, key, self.time.now_ms()).is_some();
        entries.remove(key);
        Ok(existed)
    }

    async fn consume_record(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock().await;

        let raw = match Self::live_value(&mut entries, key, self.time.now_ms()) {
            Some(raw) => raw,
            None => return Ok(None),
        };

        let mut record: Value = serde_json::from_str(&raw).map_err(|err| NoteError::StoreUnavailable {
            reason: format!("corrupted record at {key}: {err}"),
        })?;

        // Same branching as the Redis-side script: only a present `views`
        // field makes the record view-limited.
        match record.get("views").and_then(Value::as_u64) {
            Some(views) if views <= 1 => {
                entries.remove(key);
                record["views"] = Value::from(0u64);
            }
            Some(views) => {
                record["views"] = Value::from(views - 1);
                let rewritten = record.to_string();
                if let Some(entry) = entries.get_mut(key) {
                    // Deadline untouched: a decrement never extends the TTL.
                    entry.value = rewritten;
                }
            }
            None => {}
        }

        Ok(Some(record.to_string()))
    }

    async fn record_hit(&self, key: &str, window_seconds: u64) -> Result<u64> {
        let mut windows = self.windows.lock().await;
        let now_ms = self.time.now_ms();
        let window_ms = window_seconds * 1000;

        let window = windows.entry(key.to_string()).or_insert_with(|| Window {
            hits_ms: Vec::new(),
            expires_at_ms: 0,
        });
        if window.expires_at_ms != 0 && window.expires_at_ms <= now_ms {
            window.hits_ms.clear();
        }
        window.hits_ms.retain(|&hit| hit > now_ms.saturating_sub(window_ms));
        window.hits_ms.push(now_ms);
        window.expires_at_ms = now_ms + (window_seconds + 1) * 1000;

        Ok(window.hits_ms.len() as u64)
    }
}
