pub mod era;
pub mod error;
pub mod grid;
pub mod weekday;

pub use crate::error::CalendarError;
pub use crate::grid::{build_month_grid, AnniversaryIndex, DayCell, GridLayout};
pub use crate::weekday::{build_weekday_labels, StartWeekday, WeekdayNames, WeekdayTone};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// English month name for a 1-based month.
pub fn month_name(month: u32) -> Result<&'static str, CalendarError> {
    if !(1..=12).contains(&month) {
        return Err(CalendarError::InvalidMonth(month));
    }
    Ok(MONTH_NAMES[(month - 1) as usize])
}
