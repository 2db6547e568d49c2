// =============================================================================
// store.rs — WHERE THE RATES END UP
// =============================================================================
//
// The orchestrator only knows one operation: upsert a record. Stores key on
// InterestRateRecord::upsert_key, so re-crawling the same table cell replaces
// the previous value instead of piling up duplicates.
//
// Two backends:
// - RedisStore: one Redis hash, field = upsert key, value = record JSON.
// - MemoryStore: a locked HashMap, for runs without Redis and for tests.
// =============================================================================

use async_trait::async_trait;
use parking_lot::RwLock;
use redis::AsyncCommands;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::models::InterestRateRecord;

#[async_trait]
pub trait Store: Send + Sync {
    /// Insert or replace the record under its upsert key.
    async fn upsert(&self, record: &InterestRateRecord) -> Result<(), StoreError>;
}

/// Redis-backed store: `HSET <hash> <upsert_key> <json>`.
pub struct RedisStore {
    con: redis::aio::MultiplexedConnection,
    hash_key: String,
}

impl RedisStore {
    pub async fn connect(url: &str, hash_key: impl Into<String>) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let con = client.get_multiplexed_async_connection().await?;
        let hash_key = hash_key.into();
        info!(hash = %hash_key, "Redis store connected");
        Ok(Self { con, hash_key })
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn upsert(&self, record: &InterestRateRecord) -> Result<(), StoreError> {
        let key = record.upsert_key();
        let json = serde_json::to_string(record)?;

        // MultiplexedConnection is a cheap handle; each call gets its own.
        let mut con = self.con.clone();
        let _: () = con.hset(&self.hash_key, &key, json).await?;

        debug!(key = %key, hash = %self.hash_key, "record upserted to Redis");
        Ok(())
    }
}

/// In-process store. Last write per key wins.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, InterestRateRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Every stored record, ordered by key.
    pub fn records(&self) -> Vec<InterestRateRecord> {
        let guard = self.records.read();
        let mut keys: Vec<&String> = guard.keys().collect();
        keys.sort();
        keys.into_iter().map(|k| guard[k].clone()).collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert(&self, record: &InterestRateRecord) -> Result<(), StoreError> {
        let key = record.upsert_key();
        if let Err(e) = record.validate() {
            return Err(StoreError::Rejected {
                key,
                reason: e.to_string(),
            });
        }
        self.records.write().insert(key, record.clone());
        Ok(())
    }
}
