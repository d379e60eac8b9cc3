use std::fmt;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use redis::{Script, aio::ConnectionManager};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::domain::aggregates::RefreshSessionRecord;
use crate::auth::domain::repositories::{SessionStore, StoreError};

mod scripts {
    use redis::Script;

    /// GET + DEL + SREM of one session.
    /// KEYS[1] session key; ARGV[1] user key prefix, ARGV[2] token hash.
    pub fn pop() -> Script {
        Script::new(
            r#"
            local raw = redis.call('GET', KEYS[1])
            if not raw then
                return false
            end
            redis.call('DEL', KEYS[1])
            local stored = cjson.decode(raw)
            redis.call('SREM', ARGV[1] .. stored.record.user_id, ARGV[2])
            return raw
            "#,
        )
    }

    /// Live sessions in a user's index; prunes members whose key is gone.
    /// KEYS[1] user key; ARGV[1] session key prefix, ARGV[2] now (ms).
    pub fn count_live() -> Script {
        Script::new(
            r#"
            local now = tonumber(ARGV[2])
            local live = 0
            for _, hash in ipairs(redis.call('SMEMBERS', KEYS[1])) do
                local raw = redis.call('GET', ARGV[1] .. hash)
                if raw then
                    if tonumber(cjson.decode(raw).expires_at_ms) > now then
                        live = live + 1
                    end
                else
                    redis.call('SREM', KEYS[1], hash)
                end
            end
            return live
            "#,
        )
    }

    /// KEYS[1] user key; ARGV[1] session key prefix.
    pub fn delete_user() -> Script {
        Script::new(
            r#"
            local removed = 0
            for _, hash in ipairs(redis.call('SMEMBERS', KEYS[1])) do
                removed = removed + redis.call('DEL', ARGV[1] .. hash)
            end
            redis.call('DEL', KEYS[1])
            return removed
            "#,
        )
    }

    /// Insert a session, wiping the user's sessions first when the live
    /// count has reached the cap. A negative cap disables the check. Index
    /// members whose session key has lapsed are dropped on the way, and the
    /// index itself never outlives the longest session it points at.
    /// KEYS[1] session key, KEYS[2] user key; ARGV[1] session key prefix,
    /// ARGV[2] token hash, ARGV[3] payload, ARGV[4] ttl (ms), ARGV[5] now
    /// (ms), ARGV[6] cap.
    pub fn insert_capped() -> Script {
        Script::new(
            r#"
            local ttl = tonumber(ARGV[4])
            local now = tonumber(ARGV[5])
            local cap = tonumber(ARGV[6])
            local live = 0
            for _, hash in ipairs(redis.call('SMEMBERS', KEYS[2])) do
                local raw = redis.call('GET', ARGV[1] .. hash)
                if not raw then
                    redis.call('SREM', KEYS[2], hash)
                elseif tonumber(cjson.decode(raw).expires_at_ms) > now then
                    live = live + 1
                end
            end
            local evicted = 0
            if cap >= 0 and live >= cap then
                for _, hash in ipairs(redis.call('SMEMBERS', KEYS[2])) do
                    evicted = evicted + redis.call('DEL', ARGV[1] .. hash)
                end
                redis.call('DEL', KEYS[2])
            end
            redis.call('SET', KEYS[1], ARGV[3], 'PX', ttl)
            redis.call('SADD', KEYS[2], ARGV[2])
            if redis.call('PTTL', KEYS[2]) < ttl then
                redis.call('PEXPIRE', KEYS[2], ttl)
            end
            return evicted
            "#,
        )
    }
}

#[derive(Serialize, Deserialize)]
struct StoredSession {
    expires_at_ms: i64,
    record: RefreshSessionRecord,
}

/// Redis-backed session store.
///
/// Each session lives under `{prefix}:session:{hash}` as JSON with a TTL of
/// its remaining lifetime plus a retention window. Keeping expired sessions
/// for a while lets a late rotation attempt be recognised as expired reuse
/// rather than an unknown token. `{prefix}:user:{id}` indexes a user's
/// sessions and expires with the longest of them. Multi-key operations run
/// as Lua scripts that build session keys from a prefix argument, so the
/// store needs a standalone Redis server rather than Redis Cluster.
pub struct RedisSessionStore {
    conn: ConnectionManager,
    session_prefix: String,
    user_prefix: String,
    expired_retention: Duration,
    pop_script: Script,
    count_live_script: Script,
    delete_user_script: Script,
    insert_capped_script: Script,
}

impl fmt::Debug for RedisSessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisSessionStore")
            .field("connection", &"ConnectionManager")
            .field("session_prefix", &self.session_prefix)
            .field("expired_retention", &self.expired_retention)
            .finish_non_exhaustive()
    }
}

impl RedisSessionStore {
    pub const DEFAULT_KEY_PREFIX: &'static str = "warden";

    pub fn default_expired_retention() -> Duration {
        Duration::hours(24)
    }

    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        info!("Connecting to Redis session store");
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        info!("Connected to Redis session store");
        Ok(Self::new(conn))
    }

    pub fn new(conn: ConnectionManager) -> Self {
        Self::with_key_prefix(conn, Self::DEFAULT_KEY_PREFIX)
    }

    pub fn with_key_prefix(conn: ConnectionManager, prefix: &str) -> Self {
        Self {
            conn,
            session_prefix: format!("{prefix}:session:"),
            user_prefix: format!("{prefix}:user:"),
            expired_retention: Self::default_expired_retention(),
            pop_script: scripts::pop(),
            count_live_script: scripts::count_live(),
            delete_user_script: scripts::delete_user(),
            insert_capped_script: scripts::insert_capped(),
        }
    }

    pub fn with_expired_retention(mut self, retention: Duration) -> Self {
        self.expired_retention = retention;
        self
    }

    fn session_key(&self, token_hash: &str) -> String {
        format!("{}{token_hash}", self.session_prefix)
    }

    fn user_key(&self, user_id: Uuid) -> String {
        format!("{}{user_id}", self.user_prefix)
    }

    async fn insert(&self, record: &RefreshSessionRecord, cap: i64) -> Result<u64, StoreError> {
        let now = Utc::now();
        let ttl_ms = ((record.expires_at - now) + self.expired_retention)
            .num_milliseconds()
            .max(1);
        let payload = serde_json::to_string(&StoredSession {
            expires_at_ms: record.expires_at.timestamp_millis(),
            record: record.clone(),
        })
        .map_err(|err| StoreError::Corrupt(err.to_string()))?;

        let mut conn = self.conn.clone();
        let evicted: u64 = self
            .insert_capped_script
            .key(self.session_key(&record.token_hash))
            .key(self.user_key(record.user_id))
            .arg(&self.session_prefix)
            .arg(&record.token_hash)
            .arg(payload)
            .arg(ttl_ms)
            .arg(now.timestamp_millis())
            .arg(cap)
            .invoke_async(&mut conn)
            .await?;
        Ok(evicted)
    }

    async fn pop(&self, token_hash: &str) -> Result<Option<RefreshSessionRecord>, StoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = self
            .pop_script
            .key(self.session_key(token_hash))
            .arg(&self.user_prefix)
            .arg(token_hash)
            .invoke_async(&mut conn)
            .await?;

        raw.map(|raw| {
            serde_json::from_str::<StoredSession>(&raw)
                .map(|stored| stored.record)
                .map_err(|err| StoreError::Corrupt(err.to_string()))
        })
        .transpose()
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(&self, record: &RefreshSessionRecord) -> Result<(), StoreError> {
        self.insert(record, -1).await?;
        Ok(())
    }

    async fn get_and_delete(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshSessionRecord>, StoreError> {
        self.pop(token_hash).await
    }

    async fn count_by_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        let live: u64 = self
            .count_live_script
            .key(self.user_key(user_id))
            .arg(&self.session_prefix)
            .arg(Utc::now().timestamp_millis())
            .invoke_async(&mut conn)
            .await?;
        Ok(live)
    }

    async fn delete_all_by_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        let removed: u64 = self
            .delete_user_script
            .key(self.user_key(user_id))
            .arg(&self.session_prefix)
            .invoke_async(&mut conn)
            .await?;
        Ok(removed)
    }

    async fn delete_one(&self, token_hash: &str) -> Result<(), StoreError> {
        self.pop(token_hash).await?;
        Ok(())
    }

    async fn create_capped(
        &self,
        record: &RefreshSessionRecord,
        max_sessions: u64,
    ) -> Result<u64, StoreError> {
        let cap = i64::try_from(max_sessions).unwrap_or(i64::MAX);
        self.insert(record, cap).await
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        // Key TTLs handle expiry; inserts and counts prune lapsed index
        // members.
        debug!("redis session store relies on key expiry; nothing to purge");
        Ok(0)
    }
}
