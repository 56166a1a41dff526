use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CalendarError {
    #[error("month must be within 1..=12, got {0}")]
    InvalidMonth(u32),
    #[error("weekday ordinal must be within 0..=6, got {0}")]
    InvalidWeekday(u32),
    #[error("unrecognised weekday `{0}`")]
    UnknownWeekday(String),
    #[error("{year:04}-{month:02}-{day:02} is outside the supported date range")]
    InvalidDate { year: i32, month: u32, day: u32 },
    #[error(transparent)]
    Era(#[from] EraError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EraError {
    #[error("{0} precedes the first known era")]
    BeforeFirstEra(NaiveDate),
    #[error("era table is empty")]
    UnknownEra,
}
