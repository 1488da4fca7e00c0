//! In-process TTL cache for read-mostly JSON responses.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde_json::Value;

pub struct TtlCache {
    default_ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, Value)>>,
}

impl TtlCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            default_ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        match entries.get(key) {
            Some((expires, value)) if *expires > Instant::now() => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn set(&self, key: &str, value: Value, ttl: Option<Duration>) {
        let expires = Instant::now() + ttl.unwrap_or(self.default_ttl);
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.insert(key.to_string(), (expires, value));
    }

    pub fn remove(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.remove(key);
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.clear();
    }

    /// Returns the cached value, or runs `fetch` and caches its result.
    /// Errors are passed through and never cached.
    pub async fn get_or_set<F, Fut, E>(&self, key: &str, fetch: F) -> Result<Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        if let Some(hit) = self.get(key) {
            return Ok(hit);
        }
        let value = fetch().await?;
        if !self.default_ttl.is_zero() {
            self.set(key, value.clone(), None);
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn second_lookup_is_served_from_cache() {
        let cache = TtlCache::new(Duration::from_secs(60));
        let first: Result<Value, ()> = cache.get_or_set("k", || async { Ok(json!(1)) }).await;
        let second: Result<Value, ()> = cache.get_or_set("k", || async { Ok(json!(2)) }).await;
        assert_eq!(first.unwrap(), json!(1));
        assert_eq!(second.unwrap(), json!(1));
    }

    #[test]
    fn expired_entries_are_dropped() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.set("k", json!("v"), Some(Duration::ZERO));
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn remove_and_clear() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.set("a", json!(1), None);
        cache.set("b", json!(2), None);
        cache.remove("a");
        assert!(cache.get("a").is_none());
        cache.clear();
        assert!(cache.get("b").is_none());
    }
}
