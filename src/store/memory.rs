use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry as MapEntry;

use super::{AttemptStore, StoreError};
use crate::clock::Clock;

#[derive(Debug, Clone, Copy)]
struct Entry {
    value: i64,
    expires_at: DateTime<Utc>,
}

impl Entry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// In-process attempt store.
///
/// Per-key atomicity comes from the shard lock held by `DashMap::entry`.
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Drops expired entries and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            tracing::debug!(removed, remaining = self.entries.len(), "Purged expired attempt entries");
        }
        removed
    }

    fn expiry(&self, key: &str, ttl: Duration) -> Result<DateTime<Utc>, StoreError> {
        if ttl <= Duration::zero() {
            return Err(StoreError::InvalidTtl {
                key: key.to_string(),
                ttl_ms: ttl.num_milliseconds(),
            });
        }
        self.clock
            .now()
            .checked_add_signed(ttl)
            .ok_or_else(|| StoreError::InvalidTtl {
                key: key.to_string(),
                ttl_ms: ttl.num_milliseconds(),
            })
    }
}

impl AttemptStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<i64>, StoreError> {
        let now = self.clock.now();
        Ok(self
            .entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value))
    }

    fn incr(&self, key: &str, ttl: Duration) -> Result<i64, StoreError> {
        let now = self.clock.now();
        let expires_at = self.expiry(key, ttl)?;

        match self.entries.entry(key.to_string()) {
            MapEntry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                if entry.is_live(now) {
                    entry.value = entry
                        .value
                        .checked_add(1)
                        .ok_or_else(|| StoreError::Overflow(key.to_string()))?;
                } else {
                    *entry = Entry {
                        value: 1,
                        expires_at,
                    };
                }
                Ok(entry.value)
            }
            MapEntry::Vacant(vacant) => {
                vacant.insert(Entry {
                    value: 1,
                    expires_at,
                });
                Ok(1)
            }
        }
    }

    fn set(&self, key: &str, value: i64, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = self.expiry(key, ttl)?;
        self.entries
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let expires_at = self.expiry(key, ttl)?;
        match self.entries.get_mut(key) {
            Some(mut entry) if entry.is_live(now) => {
                entry.expires_at = expires_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn store() -> (Arc<ManualClock>, MemoryStore) {
        let clock = Arc::new(ManualClock::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        ));
        let store = MemoryStore::new(clock.clone());
        (clock, store)
    }

    #[test]
    fn incr_starts_at_one_and_counts_up() {
        let (_, store) = store();
        assert_eq!(store.incr("k", Duration::minutes(1)).unwrap(), 1);
        assert_eq!(store.incr("k", Duration::minutes(1)).unwrap(), 2);
        assert_eq!(store.get("k").unwrap(), Some(2));
    }

    #[test]
    fn incr_keeps_the_original_window() {
        let (clock, store) = store();
        store.incr("k", Duration::seconds(60)).unwrap();
        clock.advance(Duration::seconds(50));
        store.incr("k", Duration::seconds(60)).unwrap();
        clock.advance(Duration::seconds(11));
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn incr_restarts_after_expiry() {
        let (clock, store) = store();
        store.incr("k", Duration::seconds(10)).unwrap();
        store.incr("k", Duration::seconds(10)).unwrap();
        clock.advance(Duration::seconds(10));
        assert_eq!(store.incr("k", Duration::seconds(10)).unwrap(), 1);
    }

    #[test]
    fn set_overwrites_value_and_ttl() {
        let (clock, store) = store();
        store.incr("k", Duration::seconds(10)).unwrap();
        store.set("k", 7, Duration::seconds(100)).unwrap();
        clock.advance(Duration::seconds(50));
        assert_eq!(store.get("k").unwrap(), Some(7));
    }

    #[test]
    fn delete_is_idempotent() {
        let (_, store) = store();
        store.set("k", 1, Duration::seconds(10)).unwrap();
        store.delete("k").unwrap();
        store.delete("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let (_, store) = store();
        let err = store.set("k", 1, Duration::zero()).unwrap_err();
        assert!(matches!(err, StoreError::InvalidTtl { .. }));
    }

    #[test]
    fn purge_removes_only_expired_entries() {
        let (clock, store) = store();
        store.set("short", 1, Duration::seconds(5)).unwrap();
        store.set("long", 1, Duration::seconds(500)).unwrap();
        clock.advance(Duration::seconds(6));
        assert_eq!(store.purge_expired(), 1);
        assert!(!store.entries.contains_key("short"));
        assert_eq!(store.get("long").unwrap(), Some(1));
    }

    #[test]
    fn expire_moves_the_deadline_but_keeps_the_value() {
        let (clock, store) = store();
        store.incr("k", Duration::seconds(10)).unwrap();
        store.incr("k", Duration::seconds(10)).unwrap();
        clock.advance(Duration::seconds(8));
        assert!(store.expire("k", Duration::seconds(100)).unwrap());
        clock.advance(Duration::seconds(50));
        assert_eq!(store.get("k").unwrap(), Some(2));
        assert_eq!(store.incr("k", Duration::seconds(10)).unwrap(), 3);
    }

    #[test]
    fn expire_ignores_missing_and_expired_keys() {
        let (clock, store) = store();
        assert!(!store.expire("missing", Duration::seconds(10)).unwrap());
        store.set("k", 1, Duration::seconds(5)).unwrap();
        clock.advance(Duration::seconds(5));
        assert!(!store.expire("k", Duration::seconds(10)).unwrap());
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let (_, store) = store();
        let store = Arc::new(store);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        store.incr("shared", Duration::minutes(5)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.get("shared").unwrap(), Some(800));
    }
}
