//! Key-value store seam for sessions and drawing submissions.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::EvalError;

/// Keyed storage. Implementations decide where values live.
#[async_trait]
pub trait Store<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    /// Insert or replace the value under `key`.
    async fn put(&self, key: &str, value: V) -> Result<(), EvalError>;

    /// Fetch the value under `key`, or `NotFound`.
    async fn get(&self, key: &str) -> Result<V, EvalError>;
}

/// Process-local store. Contents are lost on restart.
pub struct InMemoryStore<V> {
    entries: RwLock<HashMap<String, V>>,
}

impl<V> InMemoryStore<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl<V> Default for InMemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V> Store<V> for InMemoryStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn put(&self, key: &str, value: V) -> Result<(), EvalError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<V, EvalError> {
        self.entries
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| EvalError::NotFound(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get() {
        let store = InMemoryStore::new();
        store.put("a", 1u32).await.unwrap();
        store.put("a", 2u32).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), 2);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let store: InMemoryStore<String> = InMemoryStore::new();
        assert!(store.is_empty().await);
        assert!(matches!(
            store.get("nope").await,
            Err(EvalError::NotFound(k)) if k == "nope"
        ));
    }
}
