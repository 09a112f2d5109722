use std::collections::HashMap;
use std::sync::Arc;

use redis::AsyncCommands;
use tokio::sync::RwLock;

use crate::config::Config;

/// A state-store operation could not be completed; callers treat every
/// variant of this as "store unavailable".
#[derive(Debug)]
pub struct StoreError(pub String);

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Networked hash-map capability backing the transaction tracker and the
/// user-history collaborator. Keys map to sets of named string fields.
///
/// The `Memory` backend exists for tests and single-process development; the
/// `Redis` backend is the production one.
#[derive(Clone)]
pub enum StateStore {
    Redis(RedisStore),
    Memory(MemoryStore),
}

impl StateStore {
    pub async fn connect_redis(config: &Config) -> Result<Self, StoreError> {
        let url = format!(
            "redis://{}:{}/{}",
            config.redis_host, config.redis_port, config.redis_db
        );
        let client = redis::Client::open(url.as_str())
            .map_err(|e| StoreError(format!("invalid redis url {}: {}", url, e)))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError(format!("failed to connect to redis: {}", e)))?;
        tracing::info!("Connected to state store at {}:{}", config.redis_host, config.redis_port);
        Ok(StateStore::Redis(RedisStore { conn }))
    }

    pub fn memory() -> Self {
        StateStore::Memory(MemoryStore::default())
    }

    /// Set all given fields on `key`, creating the key if absent. Fields not
    /// named are left untouched (store-level merge; domain-level replacement
    /// is the tracker's business since it always writes the full field set).
    pub async fn put_fields(&self, key: &str, fields: &[(&str, String)]) -> Result<(), StoreError> {
        match self {
            StateStore::Redis(store) => {
                let mut conn = store.conn.clone();
                let _: () = conn
                    .hset_multiple(key, fields)
                    .await
                    .map_err(|e| StoreError(format!("failed to write fields for {}: {}", key, e)))?;
                Ok(())
            }
            StateStore::Memory(store) => {
                let mut data = store.data.write().await;
                let entry = data.entry(key.to_string()).or_default();
                for (field, value) in fields {
                    entry.insert(field.to_string(), value.clone());
                }
                Ok(())
            }
        }
    }

    pub async fn put_field(&self, key: &str, field: &str, value: String) -> Result<(), StoreError> {
        self.put_fields(key, &[(field, value)]).await
    }

    /// All fields of `key`; empty map when the key does not exist.
    pub async fn get_fields(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        match self {
            StateStore::Redis(store) => {
                let mut conn = store.conn.clone();
                conn.hgetall(key)
                    .await
                    .map_err(|e| StoreError(format!("failed to read fields for {}: {}", key, e)))
            }
            StateStore::Memory(store) => {
                let data = store.data.read().await;
                Ok(data.get(key).cloned().unwrap_or_default())
            }
        }
    }

    pub async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        match self {
            StateStore::Redis(store) => {
                let mut conn = store.conn.clone();
                conn.exists(key)
                    .await
                    .map_err(|e| StoreError(format!("failed to check existence of {}: {}", key, e)))
            }
            StateStore::Memory(store) => {
                let data = store.data.read().await;
                Ok(data.contains_key(key))
            }
        }
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        match self {
            StateStore::Redis(store) => {
                let mut conn = store.conn.clone();
                let _: String = redis::cmd("PING")
                    .query_async(&mut conn)
                    .await
                    .map_err(|e| StoreError(format!("ping failed: {}", e)))?;
                Ok(())
            }
            StateStore::Memory(_) => Ok(()),
        }
    }
}

#[derive(Clone)]
pub struct RedisStore {
    conn: redis::aio::MultiplexedConnection,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<HashMap<String, HashMap<String, String>>>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_put_get_exists() {
        let store = StateStore::memory();
        assert!(!store.exists("transaction:abc").await.unwrap());
        assert!(store.get_fields("transaction:abc").await.unwrap().is_empty());

        store
            .put_fields(
                "transaction:abc",
                &[("status", "pending".to_string()), ("metadata", "{}".to_string())],
            )
            .await
            .unwrap();

        assert!(store.exists("transaction:abc").await.unwrap());
        let fields = store.get_fields("transaction:abc").await.unwrap();
        assert_eq!(fields.get("status").map(String::as_str), Some("pending"));
        assert_eq!(fields.get("metadata").map(String::as_str), Some("{}"));
    }

    #[tokio::test]
    async fn memory_store_merges_at_field_level() {
        let store = StateStore::memory();
        store
            .put_fields("k", &[("a", "1".to_string()), ("b", "2".to_string())])
            .await
            .unwrap();
        store.put_field("k", "a", "3".to_string()).await.unwrap();

        let fields = store.get_fields("k").await.unwrap();
        assert_eq!(fields.get("a").map(String::as_str), Some("3"));
        assert_eq!(fields.get("b").map(String::as_str), Some("2"));
    }

    #[tokio::test]
    async fn memory_store_ping_is_healthy() {
        assert!(StateStore::memory().ping().await.is_ok());
    }
}
