//! Redis-backed [`StoreBackend`] for production deployments.
//!
//! Consumption runs as a server-side Lua script and the rate-limit window
//! update as a MULTI/EXEC pipeline, so concurrent callers across processes
//! never interleave partial read-then-write cycles.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use redis::Client;
use redis::Script;

use crate::error::NoteError;
use crate::error::Result;
use crate::kv::StoreBackend;
use crate::time::current_time_nanos;

/// Atomic read-and-retire for view-limited records.
///
/// Only a present `views` field makes a record view-limited; a final view
/// deletes the key, otherwise the record is rewritten with `KEEPTTL` so the
/// decrement never extends or clears an attached expiry.
const CONSUME_SCRIPT: &str = r#"
local raw = redis.call('GET', KEYS[1])
if not raw then
    return nil
end
local record = cjson.decode(raw)
if record.views then
    if record.views <= 1 then
        redis.call('DEL', KEYS[1])
        record.views = 0
    else
        record.views = record.views - 1
        redis.call('SET', KEYS[1], cjson.encode(record), 'KEEPTTL')
    end
end
return cjson.encode(record)
"#;

/// [`StoreBackend`] over a multiplexed Redis connection.
///
/// The connection manager handle is cheap to clone and reconnects on its
/// own; every call clones it rather than holding a lock.
pub struct RedisBackend {
    conn: ConnectionManager,
    consume: Script,
}

impl RedisBackend {
    /// Connect to the Redis instance at `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url).map_err(|err| NoteError::StoreUnavailable {
            reason: format!("invalid redis url: {err}"),
        })?;
        let conn = ConnectionManager::new(client).await.map_err(store_unavailable)?;
        Ok(Self {
            conn,
            consume: Script::new(CONSUME_SCRIPT),
        })
    }
}

fn store_unavailable(err: redis::RedisError) -> NoteError {
    NoteError::StoreUnavailable {
        reason: err.to_string(),
    }
}

#[async_trait]
impl StoreBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await.map_err(store_unavailable)?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(key, value).await.map_err(store_unavailable)?;
        Ok(())
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl_seconds).await.map_err(store_unavailable)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.del(key).await.map_err(store_unavailable)?;
        Ok(removed > 0)
    }

    async fn consume_record(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let record: Option<String> = self
            .consume
            .key(key)
            .invoke_async(&mut conn)
            .await
            .map_err(store_unavailable)?;
        Ok(record)
    }

    async fn record_hit(&self, key: &str, window_seconds: u64) -> Result<u64> {
        let mut conn = self.conn.clone();
        let now_nanos = current_time_nanos();
        let score = now_nanos as f64 / 1e9;
        let cutoff = score - window_seconds as f64;

        // Trim, insert, count, refresh expiry in one transaction. The member
        // is the nanosecond timestamp so concurrent hits never collide.
        let (count,): (u64,) = redis::pipe()
            .atomic()
            .zrembyscore(key, 0, cutoff)
            .ignore()
            .zadd(key, now_nanos.to_string(), score)
            .ignore()
            .zcard(key)
            .expire(key, (window_seconds + 1) as i64)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(store_unavailable)?;

        Ok(count)
    }
}
