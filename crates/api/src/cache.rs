use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Per-key in-memory store of last-fetched results.
///
/// Keys are query identities like `"events"` or `"event/3/reviews"`. The
/// cache serves two jobs: it hands views their last-known data while a
/// refetch is pending, and its in-flight markers deduplicate overlapping
/// requests under one key. There is no eviction beyond explicit
/// invalidation after mutations.
#[derive(Default)]
pub struct QueryCache {
    values: RwLock<HashMap<String, Value>>,
    in_flight: Mutex<HashSet<String>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last-fetched value for `key`, decoded. Returns `None` when the key
    /// is absent or the cached value no longer matches the requested type.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let values = self.values.read();
        let value = values.get(key)?;
        serde_json::from_value(value.clone()).ok()
    }

    pub fn put<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.values.write().insert(key.to_string(), value);
            }
            Err(err) => {
                tracing::warn!(key, %err, "value not cacheable");
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }

    /// Mark a fetch for `key` as started. Returns `false` when one is
    /// already running, in which case the caller skips the duplicate fetch.
    pub fn begin(&self, key: &str) -> bool {
        self.in_flight.lock().insert(key.to_string())
    }

    /// Clear the in-flight marker once a fetch resolves, success or not.
    pub fn finish(&self, key: &str) {
        self.in_flight.lock().remove(key);
    }

    pub fn invalidate(&self, key: &str) {
        self.values.write().remove(key);
    }

    /// Drop every cached value. Used when the signed-in user changes and
    /// all user-scoped queries go stale at once.
    pub fn clear(&self) {
        self.values.write().clear();
    }

    /// Drop every cached value whose key starts with `prefix`. Used after
    /// mutations that touch a family of queries, like a ticket purchase
    /// invalidating all event detail keys.
    pub fn invalidate_prefix(&self, prefix: &str) {
        self.values
            .write()
            .retain(|key, _| !key.starts_with(prefix));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_put_get_round_trip() {
        let cache = QueryCache::new();
        cache.put("events", &json!([{"id": 1}]));
        let value: Option<Value> = cache.get("events");
        assert_eq!(value, Some(json!([{"id": 1}])));
        assert!(cache.get::<Value>("clubs").is_none());
    }

    #[test]
    fn test_typed_round_trip() {
        let cache = QueryCache::new();
        cache.put("ids", &vec![1i64, 2, 3]);
        let ids: Option<Vec<i64>> = cache.get("ids");
        assert_eq!(ids, Some(vec![1, 2, 3]));
        // A type mismatch is treated as a miss, not an error.
        let wrong: Option<String> = cache.get("ids");
        assert!(wrong.is_none());
    }

    #[test]
    fn test_in_flight_dedup() {
        let cache = QueryCache::new();
        assert!(cache.begin("events"));
        assert!(!cache.begin("events"));
        cache.finish("events");
        assert!(cache.begin("events"));
    }

    #[test]
    fn test_invalidate_single_key() {
        let cache = QueryCache::new();
        cache.put("event/3", &json!({"id": 3}));
        cache.put("event/4", &json!({"id": 4}));
        cache.invalidate("event/3");
        assert!(!cache.contains("event/3"));
        assert!(cache.contains("event/4"));
    }

    #[test]
    fn test_clear_drops_everything() {
        let cache = QueryCache::new();
        cache.put("events", &json!([]));
        cache.put("tickets", &json!([]));
        cache.clear();
        assert!(!cache.contains("events"));
        assert!(!cache.contains("tickets"));
    }

    #[test]
    fn test_invalidate_prefix() {
        let cache = QueryCache::new();
        cache.put("event/3", &json!({"id": 3}));
        cache.put("event/3/reviews", &json!([]));
        cache.put("tickets", &json!([]));
        cache.invalidate_prefix("event/3");
        assert!(!cache.contains("event/3"));
        assert!(!cache.contains("event/3/reviews"));
        assert!(cache.contains("tickets"));
    }
}
