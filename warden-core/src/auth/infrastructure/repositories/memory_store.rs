use std::collections::{HashMap, HashSet};
use std::fmt;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::auth::domain::aggregates::{RefreshSessionRecord, UserRecord};
use crate::auth::domain::repositories::{SessionStore, StoreError, UserStore};

#[derive(Default)]
struct SessionTables {
    by_hash: HashMap<String, RefreshSessionRecord>,
    by_user: HashMap<Uuid, HashSet<String>>,
}

impl SessionTables {
    fn insert(&mut self, record: RefreshSessionRecord) {
        self.by_user
            .entry(record.user_id)
            .or_default()
            .insert(record.token_hash.clone());
        if let Some(previous) = self.by_hash.insert(record.token_hash.clone(), record) {
            self.unindex(&previous);
        }
    }

    fn remove(&mut self, token_hash: &str) -> Option<RefreshSessionRecord> {
        let record = self.by_hash.remove(token_hash)?;
        self.unindex(&record);
        Some(record)
    }

    fn unindex(&mut self, record: &RefreshSessionRecord) {
        if self.by_hash.contains_key(&record.token_hash) {
            return;
        }
        if let Some(hashes) = self.by_user.get_mut(&record.user_id) {
            hashes.remove(&record.token_hash);
            if hashes.is_empty() {
                self.by_user.remove(&record.user_id);
            }
        }
    }

    fn live_count(&self, user_id: Uuid) -> u64 {
        let now = Utc::now();
        self.by_user
            .get(&user_id)
            .map(|hashes| {
                hashes
                    .iter()
                    .filter_map(|hash| self.by_hash.get(hash))
                    .filter(|record| !record.is_expired_at(now))
                    .count() as u64
            })
            .unwrap_or(0)
    }

    fn remove_user(&mut self, user_id: Uuid) -> u64 {
        let Some(hashes) = self.by_user.remove(&user_id) else {
            return 0;
        };
        hashes
            .iter()
            .filter(|hash| self.by_hash.remove(*hash).is_some())
            .count() as u64
    }
}

/// Process-local session store. Every operation runs under one lock, so the
/// capped insert and the pop are trivially atomic.
#[derive(Default)]
pub struct InMemorySessionStore {
    tables: Mutex<SessionTables>,
}

impl fmt::Debug for InMemorySessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemorySessionStore")
            .field("sessions", &self.tables.lock().by_hash.len())
            .finish()
    }
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored session for `user_id`, expired ones included.
    pub fn sessions_for_user(&self, user_id: Uuid) -> Vec<RefreshSessionRecord> {
        let tables = self.tables.lock();
        tables
            .by_user
            .get(&user_id)
            .map(|hashes| {
                hashes
                    .iter()
                    .filter_map(|hash| tables.by_hash.get(hash).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.tables.lock().by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, record: &RefreshSessionRecord) -> Result<(), StoreError> {
        self.tables.lock().insert(record.clone());
        Ok(())
    }

    async fn get_and_delete(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshSessionRecord>, StoreError> {
        Ok(self.tables.lock().remove(token_hash))
    }

    async fn count_by_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
        Ok(self.tables.lock().live_count(user_id))
    }

    async fn delete_all_by_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
        Ok(self.tables.lock().remove_user(user_id))
    }

    async fn delete_one(&self, token_hash: &str) -> Result<(), StoreError> {
        self.tables.lock().remove(token_hash);
        Ok(())
    }

    async fn create_capped(
        &self,
        record: &RefreshSessionRecord,
        max_sessions: u64,
    ) -> Result<u64, StoreError> {
        let mut tables = self.tables.lock();
        let evicted = if tables.live_count(record.user_id) >= max_sessions {
            tables.remove_user(record.user_id)
        } else {
            0
        };
        tables.insert(record.clone());
        Ok(evicted)
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let now = Utc::now();
        let mut tables = self.tables.lock();
        let expired: Vec<String> = tables
            .by_hash
            .values()
            .filter(|record| record.is_expired_at(now))
            .map(|record| record.token_hash.clone())
            .collect();
        for hash in &expired {
            tables.remove(hash);
        }
        Ok(expired.len() as u64)
    }
}

/// Process-local user store keyed by username.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<String, UserRecord>>,
}

impl fmt::Debug for InMemoryUserStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryUserStore")
            .field("users", &self.users.lock().len())
            .finish()
    }
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(
        &self,
        username: &str,
        password_hash: &str,
        email: &str,
    ) -> Result<Uuid, StoreError> {
        let mut users = self.users.lock();
        if users.contains_key(username) {
            return Err(StoreError::Conflict);
        }
        let record = UserRecord {
            id: Uuid::now_v7(),
            username: username.to_owned(),
            email: email.to_owned(),
            password_hash: password_hash.to_owned(),
            created_at: Utc::now(),
        };
        let id = record.id;
        users.insert(record.username.clone(), record);
        Ok(id)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.lock().get(username).cloned())
    }
}
