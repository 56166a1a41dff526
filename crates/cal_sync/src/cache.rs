use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cal_domain::holiday::{merge_managed_holidays, Holiday, MergeSummary};
use cal_domain::CalendarSettings;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::engine::apply_holidays;

pub const CACHE_FILE_NAME: &str = "holidays-cache.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct HolidayCache {
    pub source_last_modified: Option<DateTime<Utc>>,
    pub last_fetched: Option<DateTime<Utc>>,
    pub range_start: Option<NaiveDate>,
    pub range_end: Option<NaiveDate>,
    #[serde(default)]
    pub holidays: Vec<HolidayItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct HolidayItem {
    pub date: NaiveDate,
    pub label: String,
}

impl HolidayCache {
    /// Captures the managed holidays and sync timestamps currently held by `settings`.
    pub fn from_settings(settings: &CalendarSettings) -> Self {
        let state = &settings.holiday_sync;
        Self {
            source_last_modified: state.source_last_modified,
            last_fetched: state.last_fetched,
            range_start: state.range_start,
            range_end: state.range_end,
            holidays: settings
                .anniversaries
                .managed_entries()
                .map(|entry| HolidayItem {
                    date: entry.date,
                    label: entry.label.clone(),
                })
                .collect(),
        }
    }

    pub fn covers(&self, start: NaiveDate, end: NaiveDate) -> bool {
        matches!(
            (self.range_start, self.range_end),
            (Some(from), Some(to)) if from <= start && end <= to
        )
    }

    pub fn holidays(&self) -> Vec<Holiday> {
        self.holidays
            .iter()
            .map(|item| Holiday::new(item.date, item.label.clone()))
            .collect()
    }
}

/// Seeds the store from a cached snapshot through the regular merge step.
///
/// The cache's timestamps are adopted only when its range spans the calendar
/// window; otherwise the holidays are merged and the sync state is left as is,
/// so the next sync fetches the whole window.
pub fn prime_from_cache(settings: &mut CalendarSettings, cache: &HolidayCache) -> MergeSummary {
    let Some((start, end)) = settings.holiday_window() else {
        return MergeSummary::default();
    };
    if cache.covers(start, end) {
        let fetched_at = cache.last_fetched.unwrap_or_else(Utc::now);
        return apply_holidays(
            settings,
            &cache.holidays(),
            cache.source_last_modified,
            fetched_at,
        );
    }
    debug!(%start, %end, "holiday cache does not cover the calendar window");
    merge_managed_holidays(&mut settings.anniversaries, &cache.holidays(), start..=end)
}

/// JSON file holding the last holiday feed.
#[derive(Debug, Clone)]
pub struct HolidayCacheStore {
    path: PathBuf,
}

impl HolidayCacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(CACHE_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable caches count as no cache.
    pub fn load(&self) -> Option<HolidayCache> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no holiday cache");
            return None;
        }
        let parsed = fs::read_to_string(&self.path)
            .context("failed to read holiday cache")
            .and_then(|raw| {
                serde_json::from_str::<HolidayCache>(&raw).context("failed to parse holiday cache")
            });
        match parsed {
            Ok(cache) => Some(cache),
            Err(err) => {
                warn!(path = %self.path.display(), err = %format!("{err:#}"), "ignoring holiday cache");
                None
            }
        }
    }

    pub fn save(&self, cache: &HolidayCache) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(cache)?;
        fs::write(&self.path, json)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }
}
