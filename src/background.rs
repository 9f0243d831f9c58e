/// Keeps the course cache warm from the extension's background worker
use chrono::{DateTime, Utc};
use wasm_bindgen::prelude::*;

use crate::cache::CourseCache;
use crate::context::ExtensionContext;
use crate::source::{CourseSource, Fetcher};
use crate::storage::KeyValueStore;

pub const REFRESH_ALARM: &str = "sia-hourly-refresh";
pub const REFRESH_PERIOD_MINUTES: f64 = 60.0;

#[wasm_bindgen(module = "/bridge.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn createAlarm(name: &str, period_in_minutes: f64) -> Result<(), JsValue>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackgroundEvent {
    Installed,
    Startup,
    Alarm(String),
}

impl BackgroundEvent {
    /// Map the names the JS listeners report
    pub fn from_js(kind: &str, alarm: Option<String>) -> Option<BackgroundEvent> {
        match kind {
            "installed" => Some(BackgroundEvent::Installed),
            "startup" => Some(BackgroundEvent::Startup),
            "alarm" => Some(BackgroundEvent::Alarm(alarm.unwrap_or_default())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed(usize),
    /// A valid cache entry was already present
    Fresh,
    /// The fetch failed; whatever was cached is still there
    Failed,
    Ignored,
}

async fn refresh<S: KeyValueStore, F: Fetcher>(
    ctx: &ExtensionContext<S, F>,
    now: DateTime<Utc>,
) -> RefreshOutcome {
    let result = match ctx.settings().await {
        Ok(settings) => ctx.refresh(&settings, now).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(courses) => {
            log::info!("Background refresh cached {} courses", courses.len());
            RefreshOutcome::Refreshed(courses.len())
        }
        Err(e) => {
            log::error!("Background refresh failed: {}", e);
            RefreshOutcome::Failed
        }
    }
}

async fn refresh_if_stale<S: KeyValueStore, F: Fetcher>(
    ctx: &ExtensionContext<S, F>,
    now: DateTime<Utc>,
) -> RefreshOutcome {
    let cached = match ctx.settings().await {
        Ok(settings) => match CourseSource::from_settings(&settings) {
            Ok(source) => CourseCache::new(&ctx.store, source.id())
                .get(now)
                .await
                .ok()
                .flatten()
                .is_some(),
            Err(_) => false,
        },
        Err(_) => false,
    };

    if cached {
        log::debug!("Cache still valid, skipping refresh");
        return RefreshOutcome::Fresh;
    }
    refresh(ctx, now).await
}

pub async fn handle_event<S: KeyValueStore, F: Fetcher>(
    ctx: &ExtensionContext<S, F>,
    event: &BackgroundEvent,
    now: DateTime<Utc>,
) -> RefreshOutcome {
    log::debug!("Background event {:?}", event);
    match event {
        BackgroundEvent::Installed | BackgroundEvent::Startup => refresh_if_stale(ctx, now).await,
        BackgroundEvent::Alarm(name) if name == REFRESH_ALARM => refresh(ctx, now).await,
        BackgroundEvent::Alarm(_) => RefreshOutcome::Ignored,
    }
}

/// Register the periodic refresh. Re-creating an existing alarm replaces it.
pub async fn schedule_refresh() {
    if let Err(e) = createAlarm(REFRESH_ALARM, REFRESH_PERIOD_MINUTES).await {
        log::error!("Failed to schedule {}: {:?}", REFRESH_ALARM, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SiaError;
    use crate::model::{CourseInfo, CourseSnapshot};
    use crate::settings::Settings;
    use crate::source::testing::FakeFetcher;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;
    use futures::executor::block_on;

    const BODY: &str = r#"[
        {"course_info": {"kode": "TI101", "nama": "Algoritma"}},
        {"course_info": {"kode": "TI202", "nama": "Basis Data"}}
    ]"#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap()
    }

    fn refresh_alarm() -> BackgroundEvent {
        BackgroundEvent::Alarm(REFRESH_ALARM.to_string())
    }

    fn cache(store: &MemoryStore) -> CourseCache<'_, MemoryStore> {
        let source = CourseSource::from_settings(&Settings::default()).unwrap();
        CourseCache::new(store, source.id())
    }

    fn cached_course() -> Vec<CourseSnapshot> {
        vec![CourseSnapshot {
            course_info: CourseInfo {
                kode: "OLD".to_string(),
                nama: "Lama".to_string(),
            },
            meetings: Vec::new(),
        }]
    }

    #[test]
    fn test_event_names() {
        assert_eq!(BackgroundEvent::from_js("installed", None), Some(BackgroundEvent::Installed));
        assert_eq!(BackgroundEvent::from_js("startup", None), Some(BackgroundEvent::Startup));
        assert_eq!(
            BackgroundEvent::from_js("alarm", Some(REFRESH_ALARM.to_string())),
            Some(BackgroundEvent::Alarm(REFRESH_ALARM.to_string()))
        );
        assert_eq!(BackgroundEvent::from_js("message", None), None);
    }

    #[test]
    fn test_startup_with_empty_cache_fetches() {
        let ctx = ExtensionContext::new(MemoryStore::new(), FakeFetcher::ok(BODY));

        let outcome = block_on(handle_event(&ctx, &BackgroundEvent::Startup, now()));

        assert_eq!(outcome, RefreshOutcome::Refreshed(2));
        let cached = block_on(cache(&ctx.store).get(now())).unwrap().unwrap();
        assert_eq!(cached.len(), 2);
    }

    #[test]
    fn test_install_with_valid_cache_skips_fetch() {
        let ctx = ExtensionContext::new(MemoryStore::new(), FakeFetcher::ok(BODY));
        block_on(cache(&ctx.store).set(cached_course(), now())).unwrap();

        let outcome = block_on(handle_event(&ctx, &BackgroundEvent::Installed, now()));

        assert_eq!(outcome, RefreshOutcome::Fresh);
        assert!(ctx.fetcher.requests.borrow().is_empty());
    }

    #[test]
    fn test_alarm_always_refreshes() {
        let ctx = ExtensionContext::new(MemoryStore::new(), FakeFetcher::ok(BODY));
        block_on(cache(&ctx.store).set(cached_course(), now())).unwrap();

        let outcome = block_on(handle_event(&ctx, &refresh_alarm(), now()));

        assert_eq!(outcome, RefreshOutcome::Refreshed(2));
        assert_eq!(ctx.fetcher.requests.borrow().len(), 1);
    }

    #[test]
    fn test_unknown_alarm_ignored() {
        let ctx = ExtensionContext::new(MemoryStore::new(), FakeFetcher::ok(BODY));

        let other = BackgroundEvent::Alarm("other".to_string());
        let outcome = block_on(handle_event(&ctx, &other, now()));

        assert_eq!(outcome, RefreshOutcome::Ignored);
        assert!(ctx.fetcher.requests.borrow().is_empty());
    }

    #[test]
    fn test_failed_refresh_keeps_cache() {
        let ctx = ExtensionContext::new(
            MemoryStore::new(),
            FakeFetcher::failing(SiaError::Network("offline".to_string())),
        );
        let earlier = Utc.with_ymd_and_hms(2026, 10, 16, 7, 0, 0).unwrap();
        block_on(cache(&ctx.store).set(cached_course(), earlier)).unwrap();

        let outcome = block_on(handle_event(&ctx, &refresh_alarm(), now()));

        assert_eq!(outcome, RefreshOutcome::Failed);
        let entry = block_on(cache(&ctx.store).entry()).unwrap().unwrap();
        assert_eq!(entry.timestamp, earlier);
        assert_eq!(entry.data, cached_course());
    }
}
