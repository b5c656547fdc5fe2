use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Clone)]
struct CachedValue {
    value: Value,
    expires_at: Instant,
}

/// Rendered responses keyed by endpoint and filter, each with its own TTL.
#[derive(Clone, Default)]
pub struct ResponseCache {
    entries: Arc<RwLock<HashMap<String, CachedValue>>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries
            .get(key)
            .and_then(|entry| (entry.expires_at > now).then(|| entry.value.clone()))
    }

    pub async fn put(&self, key: String, value: Value, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key,
            CachedValue {
                value,
                expires_at: now + ttl,
            },
        );
    }

    /// Drops every entry. Returns how many there were.
    pub async fn clear(&self) -> usize {
        let mut entries = self.entries.write().await;
        let count = entries.len();
        entries.clear();
        count
    }

    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries.values().filter(|e| e.expires_at > now).count()
    }
}
