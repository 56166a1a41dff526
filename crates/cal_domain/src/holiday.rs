use std::ops::RangeInclusive;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::anniversary::AnniversaryStore;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: String,
}

impl Holiday {
    pub fn new(date: NaiveDate, name: impl Into<String>) -> Self {
        Self {
            date,
            name: name.into(),
        }
    }
}

/// Date ascending, then name by byte order.
pub fn sort_holidays(holidays: &mut [Holiday]) {
    holidays.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.name.as_bytes().cmp(b.name.as_bytes()))
    });
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub removed: usize,
    pub added: usize,
    pub duplicates: usize,
    pub outside_window: usize,
}

impl MergeSummary {
    pub fn changed(&self) -> bool {
        self.removed > 0 || self.added > 0
    }
}

/// Replaces every managed entry in `store` with the holidays that fall inside
/// `window`. A holiday whose date and label already exist in the store is skipped,
/// so a user entry with the same text keeps its provenance.
pub fn merge_managed_holidays(
    store: &mut AnniversaryStore,
    holidays: &[Holiday],
    window: RangeInclusive<NaiveDate>,
) -> MergeSummary {
    let mut summary = MergeSummary {
        removed: store.remove_managed(),
        ..MergeSummary::default()
    };

    for holiday in holidays {
        if !window.contains(&holiday.date) {
            summary.outside_window += 1;
            continue;
        }
        let label = holiday.name.trim();
        if store.contains(holiday.date, label) {
            summary.duplicates += 1;
            continue;
        }
        if store.insert_managed(holiday.date, label).is_ok() {
            summary.added += 1;
        }
    }

    debug!(
        removed = summary.removed,
        added = summary.added,
        duplicates = summary.duplicates,
        outside_window = summary.outside_window,
        "merged holiday feed"
    );
    summary
}
