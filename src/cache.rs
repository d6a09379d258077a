use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// A cache API used to make custom cache implementations.
///
/// The client keeps two entries in the cache: the TTL-bound flag set, and a
/// failover copy of the last successfully resolved flag set that never expires.
/// Values are whole serialized flag sets; the client never updates them partially.
pub trait FeatureCache: Sync + Send {
    /// Gets the value stored under `key`, or [`None`] if it's missing or expired.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key` for `ttl`.
    fn set(&self, key: &str, value: &str, ttl: Duration);

    /// Stores `value` under `key` without expiration.
    fn set_forever(&self, key: &str, value: &str);

    /// Removes the value stored under `key`.
    fn forget(&self, key: &str);
}

struct Entry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// The default [`FeatureCache`]: an in-process map honoring expirations.
#[derive(Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn put(&self, key: &str, value: &str, expires_at: Option<DateTime<Utc>>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                key.to_owned(),
                Entry {
                    value: value.to_owned(),
                    expires_at,
                },
            );
        }
    }
}

impl FeatureCache for InMemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().ok()?;
        if entries.get(key)?.is_expired(Utc::now()) {
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|entry| entry.value.clone())
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) {
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl));
        self.put(key, value, expires_at);
    }

    fn set_forever(&self, key: &str, value: &str) {
        self.put(key, value, None);
    }

    fn forget(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }
}
