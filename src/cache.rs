/// Time-boxed cache of the course snapshot, keyed by data source
use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::CourseSnapshot;
use crate::storage::{CACHE_KEY_PREFIX, KeyValueStore, get_typed, set_typed};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry<T> {
    pub timestamp: DateTime<Utc>,
    pub data: T,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T, timestamp: DateTime<Utc>) -> Self {
        CacheEntry { timestamp, data }
    }

    /// Top of the hour following the fetch
    pub fn expires_at(&self) -> DateTime<Utc> {
        let hour = Duration::hours(1);
        self.timestamp.duration_trunc(hour).unwrap_or(self.timestamp) + hour
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at()
    }
}

/// Storage key for a given source, so switching sources never serves
/// another source's data
pub fn cache_key(source_id: &str) -> String {
    format!("{}::{}", CACHE_KEY_PREFIX, source_id)
}

pub struct CourseCache<'a, S: KeyValueStore> {
    store: &'a S,
    key: String,
}

impl<'a, S: KeyValueStore> CourseCache<'a, S> {
    pub fn new(store: &'a S, source_id: &str) -> Self {
        CourseCache {
            store,
            key: cache_key(source_id),
        }
    }

    /// The cached courses, if present and not yet expired
    pub async fn get(&self, now: DateTime<Utc>) -> Result<Option<Vec<CourseSnapshot>>> {
        Ok(self
            .entry()
            .await?
            .filter(|entry| entry.is_valid(now))
            .map(|entry| entry.data))
    }

    /// The cached entry regardless of age, used when a refresh fails
    pub async fn entry(&self) -> Result<Option<CacheEntry<Vec<CourseSnapshot>>>> {
        get_typed(self.store, &self.key).await
    }

    pub async fn set(&self, data: Vec<CourseSnapshot>, now: DateTime<Utc>) -> Result<()> {
        set_typed(self.store, &self.key, &CacheEntry::new(data, now)).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.store.remove(&self.key).await
    }
}
