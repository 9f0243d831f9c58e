/// Store and fetcher handed explicitly to every component that loads course data
use chrono::{DateTime, Utc};

use crate::cache::CourseCache;
use crate::error::{Result, SiaError};
use crate::model::CourseSnapshot;
use crate::settings::Settings;
use crate::source::{CourseSource, Fetcher, fetch_courses};
use crate::storage::KeyValueStore;

pub struct ExtensionContext<S: KeyValueStore, F: Fetcher> {
    pub store: S,
    pub fetcher: F,
}

/// What the popup shows: data (possibly stale) plus the error that made it stale
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CourseLoad {
    pub courses: Vec<CourseSnapshot>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub error: Option<SiaError>,
}

/// Name of a setting the configured source cannot work without
pub fn missing_setting(settings: &Settings) -> Option<&'static str> {
    match CourseSource::from_settings(settings) {
        Ok(source) if source.requires_token() && settings.token().is_none() => Some("access token"),
        _ => None,
    }
}

impl<S: KeyValueStore, F: Fetcher> ExtensionContext<S, F> {
    pub fn new(store: S, fetcher: F) -> Self {
        ExtensionContext { store, fetcher }
    }

    pub async fn settings(&self) -> Result<Settings> {
        Settings::load(&self.store).await
    }

    /// Persist new settings. When the data source changes, the old source's
    /// cache entry is dropped.
    pub async fn save_settings(&self, previous: &Settings, next: Settings) -> Result<Settings> {
        let next = next.normalized();
        next.clone().save(&self.store).await?;

        let sources = (
            CourseSource::from_settings(previous),
            CourseSource::from_settings(&next),
        );
        if let (Ok(old), Ok(new)) = sources {
            if old != new {
                log::info!("Data source changed to {}", new.id());
                CourseCache::new(&self.store, old.id()).clear().await?;
            }
        }
        Ok(next)
    }

    /// Fetch from the source and overwrite the cache. A failure leaves the
    /// cache as it was.
    pub async fn refresh(
        &self,
        settings: &Settings,
        now: DateTime<Utc>,
    ) -> Result<Vec<CourseSnapshot>> {
        let source = CourseSource::from_settings(settings)?;
        let courses = fetch_courses(&self.fetcher, &source, settings).await?;
        CourseCache::new(&self.store, source.id())
            .set(courses.clone(), now)
            .await?;
        Ok(courses)
    }

    /// Cached courses while valid, otherwise a fresh fetch. `force` skips the
    /// cache read. When the fetch fails, the last cached data comes back with
    /// the error.
    pub async fn load_courses(
        &self,
        settings: &Settings,
        now: DateTime<Utc>,
        force: bool,
    ) -> CourseLoad {
        let source = match CourseSource::from_settings(settings) {
            Ok(source) => source,
            Err(e) => {
                return CourseLoad {
                    error: Some(e),
                    ..CourseLoad::default()
                };
            }
        };
        let cache = CourseCache::new(&self.store, source.id());

        if !force {
            match cache.entry().await {
                Ok(Some(entry)) if entry.is_valid(now) => {
                    log::debug!("Serving courses cached at {}", entry.timestamp);
                    return CourseLoad {
                        courses: entry.data,
                        fetched_at: Some(entry.timestamp),
                        error: None,
                    };
                }
                Ok(_) => {}
                Err(e) => log::warn!("Cache read failed: {}", e),
            }
        }

        match self.refresh(settings, now).await {
            Ok(courses) => CourseLoad {
                courses,
                fetched_at: Some(now),
                error: None,
            },
            Err(e) => {
                log::error!("Failed to load courses: {}", e);
                let stale = cache.entry().await.ok().flatten();
                CourseLoad {
                    fetched_at: stale.as_ref().map(|entry| entry.timestamp),
                    courses: stale.map(|entry| entry.data).unwrap_or_default(),
                    error: Some(e),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheEntry;
    use crate::model::CourseInfo;
    use crate::source::testing::FakeFetcher;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;
    use futures::executor::block_on;

    const BODY: &str =
        r#"[{"course_info": {"kode": "TI101", "nama": "Algoritma"}, "pertemuan": {}}]"#;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, hour, minute, 0).unwrap()
    }

    fn course(kode: &str) -> CourseSnapshot {
        CourseSnapshot {
            course_info: CourseInfo {
                kode: kode.to_string(),
                nama: "Cached".to_string(),
            },
            meetings: Vec::new(),
        }
    }

    fn seed_cache(store: &MemoryStore, kode: &str, timestamp: DateTime<Utc>) {
        let source = CourseSource::from_settings(&Settings::default()).unwrap();
        let cache = CourseCache::new(store, source.id());
        block_on(cache.set(vec![course(kode)], timestamp)).unwrap();
    }

    #[test]
    fn test_valid_cache_skips_fetch() {
        let ctx = ExtensionContext::new(MemoryStore::new(), FakeFetcher::ok(BODY));
        seed_cache(&ctx.store, "CACHED", at(9, 5));

        let load = block_on(ctx.load_courses(&Settings::default(), at(9, 50), false));

        assert_eq!(load.courses, vec![course("CACHED")]);
        assert_eq!(load.fetched_at, Some(at(9, 5)));
        assert!(ctx.fetcher.requests.borrow().is_empty());
    }

    #[test]
    fn test_expired_cache_refetches_and_stores() {
        let ctx = ExtensionContext::new(MemoryStore::new(), FakeFetcher::ok(BODY));
        seed_cache(&ctx.store, "CACHED", at(8, 59));

        let load = block_on(ctx.load_courses(&Settings::default(), at(9, 1), false));

        assert_eq!(load.error, None);
        assert_eq!(load.courses[0].course_info.kode, "TI101");
        assert_eq!(ctx.fetcher.requests.borrow().len(), 1);

        let source = CourseSource::from_settings(&Settings::default()).unwrap();
        let entry: CacheEntry<Vec<CourseSnapshot>> =
            block_on(CourseCache::new(&ctx.store, source.id()).entry()).unwrap().unwrap();
        assert_eq!(entry.timestamp, at(9, 1));
    }

    #[test]
    fn test_force_bypasses_valid_cache() {
        let ctx = ExtensionContext::new(MemoryStore::new(), FakeFetcher::ok(BODY));
        seed_cache(&ctx.store, "CACHED", at(9, 5));

        let load = block_on(ctx.load_courses(&Settings::default(), at(9, 10), true));

        assert_eq!(load.courses[0].course_info.kode, "TI101");
        assert_eq!(ctx.fetcher.requests.borrow().len(), 1);
    }

    #[test]
    fn test_failed_fetch_returns_stale_data_with_error() {
        let ctx = ExtensionContext::new(MemoryStore::new(), FakeFetcher::respond(503, ""));
        seed_cache(&ctx.store, "STALE", at(6, 0));

        let load = block_on(ctx.load_courses(&Settings::default(), at(9, 0), false));

        assert_eq!(load.courses, vec![course("STALE")]);
        assert_eq!(load.fetched_at, Some(at(6, 0)));
        assert_eq!(load.error, Some(SiaError::Status(503)));
    }

    #[test]
    fn test_failed_fetch_without_cache() {
        let ctx = ExtensionContext::new(
            MemoryStore::new(),
            FakeFetcher::failing(SiaError::Network("offline".to_string())),
        );

        let load = block_on(ctx.load_courses(&Settings::default(), at(9, 0), false));

        assert!(load.courses.is_empty());
        assert_eq!(load.fetched_at, None);
        assert!(matches!(load.error, Some(SiaError::Network(_))));
    }

    #[test]
    fn test_invalid_source_never_fetches() {
        let ctx = ExtensionContext::new(MemoryStore::new(), FakeFetcher::ok(BODY));
        let settings = Settings {
            api_base_url: Some("::nope::".to_string()),
            ..Settings::default()
        };

        let load = block_on(ctx.load_courses(&settings, at(9, 0), false));

        assert!(matches!(load.error, Some(SiaError::InvalidUrl(_))));
        assert!(ctx.fetcher.requests.borrow().is_empty());
    }

    #[test]
    fn test_source_change_drops_old_cache() {
        let ctx = ExtensionContext::new(MemoryStore::new(), FakeFetcher::ok(BODY));
        seed_cache(&ctx.store, "CACHED", at(9, 5));
        let next = Settings {
            api_base_url: Some(" https://sia-api.example.com ".to_string()),
            ..Settings::default()
        };

        let saved = block_on(ctx.save_settings(&Settings::default(), next)).unwrap();

        assert_eq!(saved.api_base_url.as_deref(), Some("https://sia-api.example.com"));
        assert_eq!(block_on(ctx.settings()).unwrap(), saved);
        let old = CourseSource::from_settings(&Settings::default()).unwrap();
        assert_eq!(block_on(CourseCache::new(&ctx.store, old.id()).entry()).unwrap(), None);
    }

    #[test]
    fn test_same_source_keeps_cache() {
        let ctx = ExtensionContext::new(MemoryStore::new(), FakeFetcher::ok(BODY));
        seed_cache(&ctx.store, "CACHED", at(9, 5));
        let next = Settings {
            username: Some("0320220001".to_string()),
            ..Settings::default()
        };

        block_on(ctx.save_settings(&Settings::default(), next)).unwrap();

        let load = block_on(ctx.load_courses(&Settings::default(), at(9, 10), false));
        assert_eq!(load.courses, vec![course("CACHED")]);
    }

    #[test]
    fn test_missing_setting() {
        let github = Settings {
            api_base_url: Some("https://api.github.com/repos/u/r/actions/artifacts".to_string()),
            ..Settings::default()
        };
        let with_token = Settings {
            token: Some("t".to_string()),
            ..github.clone()
        };

        assert_eq!(missing_setting(&github), Some("access token"));
        assert_eq!(missing_setting(&with_token), None);
        assert_eq!(missing_setting(&Settings::default()), None);
    }
}
