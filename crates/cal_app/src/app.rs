use std::path::PathBuf;

use anyhow::{Context, Result};
use cal_core::{StartWeekday, WeekdayNames};
use cal_domain::{CalendarService, CalendarSettings};
use cal_sync::{
    prime_from_cache, HolidayCache, HolidayCacheStore, HolidaySyncEngine, HttpHolidaySource,
    SyncError, SyncStatus, DEFAULT_HOLIDAY_URL,
};
use chrono::{Datelike, NaiveDate};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub(crate) settings_path: Option<PathBuf>,
    pub(crate) start_month: Option<(i32, u32)>,
    pub(crate) first_weekday: Option<StartWeekday>,
    pub(crate) weekday_names: Option<WeekdayNames>,
    pub(crate) holidays_enabled: bool,
    pub(crate) holiday_url: String,
    pub(crate) cache_dir: Option<PathBuf>,
    pub(crate) output: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self::from_lookup(|key| std::env::var(key).ok()))
    }

    /// Builds a config from `lookup`; unparseable values are logged and skipped.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(path) = lookup("CALMAKER_SETTINGS") {
            config.settings_path = Some(PathBuf::from(path));
        }
        if let Some(raw) = lookup("CALMAKER_START_MONTH") {
            match parse_year_month(&raw) {
                Some(value) => config.start_month = Some(value),
                None => warn!(value = %raw, "ignoring CALMAKER_START_MONTH, expected YYYY-MM"),
            }
        }
        if let Some(raw) = lookup("CALMAKER_FIRST_WEEKDAY") {
            match raw.parse::<StartWeekday>() {
                Ok(weekday) => config.first_weekday = Some(weekday),
                Err(err) => warn!(%err, "ignoring CALMAKER_FIRST_WEEKDAY"),
            }
        }
        if let Some(raw) = lookup("CALMAKER_LOCALE") {
            match raw.trim().to_ascii_lowercase().as_str() {
                "en" | "english" => config.weekday_names = Some(WeekdayNames::English),
                "ja" | "japanese" => config.weekday_names = Some(WeekdayNames::Japanese),
                other => warn!(value = %other, "ignoring unknown CALMAKER_LOCALE"),
            }
        }
        if let Some(raw) = lookup("CALMAKER_HOLIDAYS") {
            config.holidays_enabled = !matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "0" | "off" | "false" | "no"
            );
        }
        if let Some(url) = lookup("CALMAKER_HOLIDAY_URL") {
            if !url.trim().is_empty() {
                config.holiday_url = url.trim().to_string();
            }
        }
        if let Some(dir) = lookup("CALMAKER_CACHE_DIR") {
            config.cache_dir = Some(PathBuf::from(dir));
        }
        if let Some(path) = lookup("CALMAKER_OUTPUT") {
            config.output = Some(PathBuf::from(path));
        }
        config
    }

    pub(crate) fn load_settings(&self) -> Result<CalendarSettings> {
        let mut settings = match &self.settings_path {
            Some(path) if path.exists() => {
                info!(path = %path.display(), "loading settings");
                CalendarSettings::load(path)?
            }
            Some(path) => {
                debug!(path = %path.display(), "settings file missing, using defaults");
                CalendarSettings::default()
            }
            None => CalendarSettings::default(),
        };
        if let Some((year, month)) = self.start_month {
            settings.set_start_month(year, month)?;
        }
        if let Some(weekday) = self.first_weekday {
            settings.start_weekday = weekday;
        }
        if let Some(names) = self.weekday_names {
            settings.weekday_names = names;
        }
        Ok(settings)
    }

    pub(crate) fn cache_store(&self) -> Option<HolidayCacheStore> {
        self.cache_dir
            .clone()
            .or_else(|| dirs::data_local_dir().map(|dir| dir.join("CalendarMaker")))
            .map(HolidayCacheStore::in_dir)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            settings_path: None,
            start_month: None,
            first_weekday: None,
            weekday_names: None,
            holidays_enabled: true,
            holiday_url: DEFAULT_HOLIDAY_URL.to_string(),
            cache_dir: None,
            output: None,
        }
    }
}

fn parse_year_month(raw: &str) -> Option<(i32, u32)> {
    let date = NaiveDate::parse_from_str(&format!("{}-01", raw.trim()), "%Y-%m-%d").ok()?;
    Some((date.year(), date.month()))
}

pub fn run(config: AppConfig) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(run_session(config))
}

async fn run_session(config: AppConfig) -> Result<()> {
    let settings = config.load_settings()?;
    let mut service = CalendarService::builder()
        .with_settings(settings)
        .build()
        .context("failed to build calendar pages")?;
    info!(start = %service.settings().start_month(), "calendar session ready");

    if config.holidays_enabled {
        sync_holidays(&config, &mut service).await?;
    }

    // Export works on its own copy of the pages.
    let snapshot = service.snapshot();
    let output = config.output.clone();
    tokio::task::spawn_blocking(move || {
        crate::export::write_text(&snapshot, output.as_deref())
    })
    .await
    .context("export task panicked")??;

    if let Some(path) = &config.output {
        info!(path = %path.display(), pages = service.page_count(), "calendar exported");
    }
    Ok(())
}

async fn sync_holidays(config: &AppConfig, service: &mut CalendarService) -> Result<()> {
    let cache = config.cache_store();
    if let Some(snapshot) = cache.as_ref().and_then(HolidayCacheStore::load) {
        let merge = prime_from_cache(service.settings_mut(), &snapshot);
        debug!(added = merge.added, "primed holidays from cache");
    }

    let source = HttpHolidaySource::new(&config.holiday_url)?;
    let engine = HolidaySyncEngine::new(source);
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    match engine.sync(service.settings_mut(), &cancel).await {
        Ok(report) => {
            if report.status == SyncStatus::Updated {
                if let Some(store) = &cache {
                    save_cache(store, service.settings());
                }
            }
        }
        Err(SyncError::Cancelled) => info!("holiday sync cancelled"),
    }

    service.build_all_pages()?;
    Ok(())
}

fn save_cache(store: &HolidayCacheStore, settings: &CalendarSettings) {
    if let Err(err) = store.save(&HolidayCache::from_settings(settings)) {
        warn!(path = %store.path().display(), err = %format!("{err:#}"), "failed to write holiday cache");
    }
}
