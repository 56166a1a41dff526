use std::collections::HashMap;

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::CalendarError;
use crate::weekday::StartWeekday;

/// Number of anniversary lines a cell can show.
pub const DISPLAY_LINES: usize = 3;
pub const MIN_ROWS: usize = 6;

/// Labels keyed by date. Label order within a date is display order.
pub type AnniversaryIndex = HashMap<NaiveDate, Vec<String>>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayCell {
    pub date: NaiveDate,
    pub is_current_month: bool,
    pub anniversary_lines: Vec<String>,
    pub anniversary_display_lines: [String; DISPLAY_LINES],
    pub row_index: usize,
    pub column_index: usize,
    pub is_last_row: bool,
    pub is_last_column: bool,
}

impl DayCell {
    pub fn has_anniversary(&self) -> bool {
        !self.anniversary_lines.is_empty()
    }

    /// Lines beyond the display limit.
    pub fn hidden_line_count(&self) -> usize {
        self.anniversary_lines.len().saturating_sub(DISPLAY_LINES)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum GridLayout {
    /// At least six rows so every month page has the same height.
    #[default]
    Fixed,
    /// Only the rows the month actually spans.
    Compact,
}

impl GridLayout {
    fn rows_for(self, span: usize) -> usize {
        let needed = span.div_ceil(7);
        match self {
            GridLayout::Fixed => needed.max(MIN_ROWS),
            GridLayout::Compact => needed.max(1),
        }
    }
}

pub fn build_month_grid(
    year: i32,
    month: u32,
    first_weekday: StartWeekday,
    anniversaries: &AnniversaryIndex,
) -> Result<Vec<DayCell>, CalendarError> {
    build_month_grid_with(year, month, first_weekday, anniversaries, GridLayout::Fixed)
}

/// Builds whole weeks around `year`-`month`: trailing days of the previous month,
/// the month itself, then leading days of the next month.
pub fn build_month_grid_with(
    year: i32,
    month: u32,
    first_weekday: StartWeekday,
    anniversaries: &AnniversaryIndex,
    layout: GridLayout,
) -> Result<Vec<DayCell>, CalendarError> {
    let first = first_of_month(year, month)?;
    let days = days_in_month(year, month)? as usize;
    let offset = grid_offset(first, first_weekday);
    let rows = layout.rows_for(offset + days);
    let total = rows * 7;

    let out_of_range = || CalendarError::InvalidDate {
        year,
        month,
        day: 1,
    };
    let grid_start = first
        .checked_sub_days(Days::new(offset as u64))
        .ok_or_else(out_of_range)?;

    let mut cells = Vec::with_capacity(total);
    for position in 0..total {
        let date = grid_start
            .checked_add_days(Days::new(position as u64))
            .ok_or_else(out_of_range)?;
        let row_index = position / 7;
        let column_index = position % 7;
        let anniversary_lines = resolve_labels(anniversaries, date);
        cells.push(DayCell {
            date,
            is_current_month: date.year() == year && date.month() == month,
            anniversary_display_lines: display_lines(&anniversary_lines),
            anniversary_lines,
            row_index,
            column_index,
            is_last_row: row_index == rows - 1,
            is_last_column: column_index == 6,
        });
    }

    Ok(cells)
}

/// Leading cells needed before day 1 of the month.
pub fn grid_offset(first_of_month: NaiveDate, first_weekday: StartWeekday) -> usize {
    let weekday = first_of_month.weekday().num_days_from_sunday() as usize;
    (weekday + 7 - first_weekday as usize) % 7
}

pub fn first_of_month(year: i32, month: u32) -> Result<NaiveDate, CalendarError> {
    if !(1..=12).contains(&month) {
        return Err(CalendarError::InvalidMonth(month));
    }
    NaiveDate::from_ymd_opt(year, month, 1).ok_or(CalendarError::InvalidDate {
        year,
        month,
        day: 1,
    })
}

pub fn days_in_month(year: i32, month: u32) -> Result<u32, CalendarError> {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => Ok(31),
        4 | 6 | 9 | 11 => Ok(30),
        2 if NaiveDate::from_ymd_opt(year, 2, 29).is_some() => Ok(29),
        2 => Ok(28),
        _ => Err(CalendarError::InvalidMonth(month)),
    }
}

fn resolve_labels(anniversaries: &AnniversaryIndex, date: NaiveDate) -> Vec<String> {
    anniversaries
        .get(&date)
        .map(|labels| {
            labels
                .iter()
                .map(|label| label.trim())
                .filter(|label| !label.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn display_lines(lines: &[String]) -> [String; DISPLAY_LINES] {
    std::array::from_fn(|i| lines.get(i).cloned().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn february_2024_sunday_start() {
        let cells =
            build_month_grid(2024, 2, StartWeekday::Sunday, &AnniversaryIndex::new()).unwrap();
        assert_eq!(grid_offset(date(2024, 2, 1), StartWeekday::Sunday), 4);
        assert_eq!(cells.len(), 42);

        let leading: Vec<NaiveDate> = cells[..4].iter().map(|c| c.date).collect();
        assert_eq!(
            leading,
            vec![date(2024, 1, 28), date(2024, 1, 29), date(2024, 1, 30), date(2024, 1, 31)]
        );
        assert!(cells[..4].iter().all(|c| !c.is_current_month));
        assert_eq!(cells.iter().filter(|c| c.is_current_month).count(), 29);
        assert_eq!(cells[4].date, date(2024, 2, 1));
        assert_eq!(cells[32].date, date(2024, 2, 29));
        assert_eq!(cells[33].date, date(2024, 3, 1));
        assert_eq!(cells[41].date, date(2024, 3, 9));
    }

    #[test]
    fn compact_layout_keeps_only_spanned_rows() {
        let cells = build_month_grid_with(
            2024,
            2,
            StartWeekday::Sunday,
            &AnniversaryIndex::new(),
            GridLayout::Compact,
        )
        .unwrap();
        assert_eq!(cells.len(), 35);
        assert_eq!(cells.last().unwrap().row_index, 4);
        assert!(cells.last().unwrap().is_last_row);
        assert_eq!(cells[34].date, date(2024, 3, 2));
    }

    #[test]
    fn month_starting_on_first_weekday_has_no_leading_cells() {
        // 2024-09-01 is a Sunday.
        let cells =
            build_month_grid(2024, 9, StartWeekday::Sunday, &AnniversaryIndex::new()).unwrap();
        assert_eq!(cells[0].date, date(2024, 9, 1));
        assert!(cells[0].is_current_month);

        let monday =
            build_month_grid(2024, 9, StartWeekday::Monday, &AnniversaryIndex::new()).unwrap();
        assert_eq!(grid_offset(date(2024, 9, 1), StartWeekday::Monday), 6);
        assert_eq!(monday[0].date, date(2024, 8, 26));
        assert_eq!(monday[6].date, date(2024, 9, 1));
    }

    #[test]
    fn positions_and_boundary_flags() {
        let cells =
            build_month_grid(2025, 3, StartWeekday::Monday, &AnniversaryIndex::new()).unwrap();
        for (i, cell) in cells.iter().enumerate() {
            assert_eq!(cell.row_index, i / 7);
            assert_eq!(cell.column_index, i % 7);
            assert_eq!(cell.is_last_column, i % 7 == 6);
            assert_eq!(cell.is_last_row, i / 7 == cells.len() / 7 - 1);
        }
    }

    #[test]
    fn display_lines_truncate_and_pad() {
        let mut index = AnniversaryIndex::new();
        index.insert(
            date(2025, 5, 5),
            vec![
                " Children's Day ".into(),
                "   ".into(),
                "Picnic".into(),
                "Dentist".into(),
                "Dinner".into(),
            ],
        );
        index.insert(date(2025, 5, 6), vec!["Substitute holiday".into()]);

        let cells = build_month_grid(2025, 5, StartWeekday::Sunday, &index).unwrap();
        let busy = cells.iter().find(|c| c.date == date(2025, 5, 5)).unwrap();
        assert_eq!(
            busy.anniversary_lines,
            vec!["Children's Day", "Picnic", "Dentist", "Dinner"]
        );
        assert_eq!(
            busy.anniversary_display_lines,
            ["Children's Day".to_string(), "Picnic".into(), "Dentist".into()]
        );
        assert_eq!(busy.hidden_line_count(), 1);

        let single = cells.iter().find(|c| c.date == date(2025, 5, 6)).unwrap();
        assert_eq!(
            single.anniversary_display_lines,
            ["Substitute holiday".to_string(), String::new(), String::new()]
        );

        let empty = cells.iter().find(|c| c.date == date(2025, 5, 7)).unwrap();
        assert!(!empty.has_anniversary());
        assert!(empty.anniversary_display_lines.iter().all(String::is_empty));
    }

    #[test]
    fn anniversaries_on_padding_days_are_resolved() {
        let mut index = AnniversaryIndex::new();
        index.insert(date(2024, 12, 31), vec!["New Year's Eve".into()]);
        let cells = build_month_grid(2025, 1, StartWeekday::Sunday, &index).unwrap();
        let eve = cells.iter().find(|c| c.date == date(2024, 12, 31)).unwrap();
        assert!(!eve.is_current_month);
        assert_eq!(eve.anniversary_lines, vec!["New Year's Eve"]);
    }

    #[test]
    fn rejects_out_of_range_month() {
        let index = AnniversaryIndex::new();
        assert_eq!(
            build_month_grid(2024, 0, StartWeekday::Sunday, &index),
            Err(CalendarError::InvalidMonth(0))
        );
        assert_eq!(
            build_month_grid(2024, 13, StartWeekday::Sunday, &index),
            Err(CalendarError::InvalidMonth(13))
        );
    }

    #[test]
    fn leap_years() {
        assert_eq!(days_in_month(2024, 2).unwrap(), 29);
        assert_eq!(days_in_month(1900, 2).unwrap(), 28);
        assert_eq!(days_in_month(2000, 2).unwrap(), 29);
        assert_eq!(days_in_month(2023, 2).unwrap(), 28);
    }
}
