use cal_core::CalendarError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("anniversary label must not be blank")]
    BlankLabel,
    #[error("month image index {0} is outside 0..12")]
    InvalidImageIndex(usize),
    #[error("no anniversary at index {0}")]
    InvalidAnniversaryIndex(usize),
    #[error("no page at index {0}")]
    InvalidPageIndex(usize),
    #[error("calendar window starting {0} runs past the supported date range")]
    WindowOutOfRange(chrono::NaiveDate),
    #[error(transparent)]
    Calendar(#[from] CalendarError),
}
