use std::collections::BTreeMap;

use async_trait::async_trait;
use cal_domain::holiday::{sort_holidays, Holiday};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("holiday request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("holiday source answered with status {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed holiday payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("invalid holiday source url `{0}`")]
    InvalidUrl(String),
}

/// Years to keep from the feed, plus an optional conditional-request hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolidayRequest {
    pub start_year: i32,
    pub end_year: i32,
    pub if_modified_since: Option<DateTime<Utc>>,
}

impl HolidayRequest {
    pub fn new(start_year: i32, end_year: i32, if_modified_since: Option<DateTime<Utc>>) -> Self {
        let (start_year, end_year) = if start_year > end_year {
            (end_year, start_year)
        } else {
            (start_year, end_year)
        };
        Self {
            start_year,
            end_year,
            if_modified_since,
        }
    }

    pub fn unconditional(&self) -> Self {
        Self {
            if_modified_since: None,
            ..self.clone()
        }
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        (self.start_year..=self.end_year).contains(&date.year())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolidayFetchResult {
    pub holidays: Vec<Holiday>,
    pub last_modified: Option<DateTime<Utc>>,
    pub not_modified: bool,
}

impl HolidayFetchResult {
    pub fn not_modified(last_modified: Option<DateTime<Utc>>) -> Self {
        Self {
            holidays: Vec::new(),
            last_modified,
            not_modified: true,
        }
    }

    /// Sorts the holidays by date, then name.
    pub fn modified(mut holidays: Vec<Holiday>, last_modified: Option<DateTime<Utc>>) -> Self {
        sort_holidays(&mut holidays);
        Self {
            holidays,
            last_modified,
            not_modified: false,
        }
    }
}

/// Remote list of public holidays.
#[async_trait]
pub trait HolidaySource: Send + Sync {
    async fn fetch(&self, request: &HolidayRequest) -> Result<HolidayFetchResult, FetchError>;
}

/// Parses a `{"yyyy-MM-dd": "name", ...}` document. Entries with unparseable
/// dates, blank names or years outside the request are dropped.
pub fn parse_holiday_payload(
    body: &[u8],
    request: &HolidayRequest,
) -> Result<Vec<Holiday>, serde_json::Error> {
    let raw: BTreeMap<String, Value> = serde_json::from_slice(body)?;
    let mut holidays: Vec<Holiday> = raw
        .into_iter()
        .filter_map(|(key, value)| {
            let date = NaiveDate::parse_from_str(key.trim(), "%Y-%m-%d").ok()?;
            if !request.covers(date) {
                return None;
            }
            let name = value.as_str()?.trim();
            if name.is_empty() {
                return None;
            }
            Some(Holiday::new(date, name))
        })
        .collect();
    sort_holidays(&mut holidays);
    Ok(holidays)
}
