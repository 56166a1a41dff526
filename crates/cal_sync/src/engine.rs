use cal_domain::holiday::{merge_managed_holidays, Holiday, MergeSummary};
use cal_domain::CalendarSettings;
use chrono::{DateTime, Datelike, Utc};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::source::{FetchError, HolidayFetchResult, HolidayRequest, HolidaySource};

/// The only failure a sync surfaces. Fetch errors are logged and swallowed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SyncError {
    #[error("holiday sync was cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Managed holidays were replaced from a fresh feed.
    Updated,
    /// The feed is unchanged and managed holidays are already present.
    NotModified,
    /// The fetch failed; the store is untouched.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub status: SyncStatus,
    pub merge: MergeSummary,
    pub fetched: Option<HolidayFetchResult>,
}

impl SyncReport {
    fn updated(merge: MergeSummary, fetched: HolidayFetchResult) -> Self {
        Self {
            status: SyncStatus::Updated,
            merge,
            fetched: Some(fetched),
        }
    }

    fn not_modified() -> Self {
        Self {
            status: SyncStatus::NotModified,
            merge: MergeSummary::default(),
            fetched: None,
        }
    }

    fn failed() -> Self {
        Self {
            status: SyncStatus::Failed,
            merge: MergeSummary::default(),
            fetched: None,
        }
    }

    pub fn store_changed(&self) -> bool {
        self.merge.changed()
    }
}

/// Pulls the holiday feed into a settings' anniversary store.
///
/// One sync performs a conditional fetch keyed on the stored source timestamp,
/// provided the stored range still spans the calendar window.
/// A "not modified" answer is trusted only while managed holidays are present;
/// with none stored the feed is fetched again unconditionally. Callers are
/// expected to keep at most one sync in flight.
pub struct HolidaySyncEngine<S> {
    source: S,
}

impl<S: HolidaySource> HolidaySyncEngine<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    #[instrument(skip_all, fields(start = %settings.start_month()))]
    pub async fn sync(
        &self,
        settings: &mut CalendarSettings,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        let Some((window_start, window_end)) = settings.holiday_window() else {
            warn!("calendar window is outside the supported date range");
            return Ok(SyncReport::failed());
        };
        // A stored timestamp only describes the range it was fetched for.
        let since = if settings.holiday_sync.covers(window_start, window_end) {
            settings.holiday_sync.source_last_modified
        } else {
            debug!("stored holidays do not cover the calendar window, fetching unconditionally");
            None
        };
        let request = HolidayRequest::new(window_start.year(), window_end.year(), since);

        let mut outcome = self.fetch(&request, cancel).await?;
        if matches!(&outcome, Ok(result) if result.not_modified) {
            if settings.anniversaries.has_managed() {
                settings.holiday_sync.last_fetched = Some(Utc::now());
                info!("holiday feed not modified");
                return Ok(SyncReport::not_modified());
            }
            debug!("feed unchanged but no holidays stored, fetching unconditionally");
            outcome = self.fetch(&request.unconditional(), cancel).await?;
        }

        let result = match outcome {
            Ok(result) if !result.not_modified => result,
            Ok(_) => {
                warn!("holiday feed answered not modified to an unconditional request");
                return Ok(SyncReport::failed());
            }
            Err(err) => {
                warn!(%err, "holiday sync failed");
                return Ok(SyncReport::failed());
            }
        };

        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let merge = apply_holidays(settings, &result.holidays, result.last_modified, Utc::now());
        info!(
            added = merge.added,
            removed = merge.removed,
            "holiday feed merged"
        );
        Ok(SyncReport::updated(merge, result))
    }

    async fn fetch(
        &self,
        request: &HolidayRequest,
        cancel: &CancellationToken,
    ) -> Result<Result<HolidayFetchResult, FetchError>, SyncError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SyncError::Cancelled),
            result = self.source.fetch(request) => Ok(result),
        }
    }
}

/// Merges `holidays` as managed entries for the settings' current window and
/// records the sync timestamps. Also used to replay a cached snapshot.
pub fn apply_holidays(
    settings: &mut CalendarSettings,
    holidays: &[Holiday],
    source_last_modified: Option<DateTime<Utc>>,
    fetched_at: DateTime<Utc>,
) -> MergeSummary {
    let Some((start, end)) = settings.holiday_window() else {
        return MergeSummary::default();
    };
    let merge = merge_managed_holidays(&mut settings.anniversaries, holidays, start..=end);

    let state = &mut settings.holiday_sync;
    state.last_fetched = Some(fetched_at);
    if source_last_modified.is_some() {
        state.source_last_modified = source_last_modified;
    }
    state.range_start = Some(start);
    state.range_end = Some(end);
    merge
}
