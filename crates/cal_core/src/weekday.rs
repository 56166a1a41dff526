use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::CalendarError;

/// First column of the month grid. Ordinals follow 0 = Sunday .. 6 = Saturday.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum StartWeekday {
    #[default]
    Sunday = 0,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl StartWeekday {
    pub const ALL: [StartWeekday; 7] = [
        StartWeekday::Sunday,
        StartWeekday::Monday,
        StartWeekday::Tuesday,
        StartWeekday::Wednesday,
        StartWeekday::Thursday,
        StartWeekday::Friday,
        StartWeekday::Saturday,
    ];

    pub fn from_ordinal(ordinal: u32) -> Result<Self, CalendarError> {
        Self::ALL
            .get(ordinal as usize)
            .copied()
            .ok_or(CalendarError::InvalidWeekday(ordinal))
    }

    pub fn ordinal(self) -> u32 {
        self as u32
    }

    pub fn from_chrono(weekday: Weekday) -> Self {
        Self::ALL[weekday.num_days_from_sunday() as usize]
    }

    pub fn to_chrono(self) -> Weekday {
        match self {
            StartWeekday::Sunday => Weekday::Sun,
            StartWeekday::Monday => Weekday::Mon,
            StartWeekday::Tuesday => Weekday::Tue,
            StartWeekday::Wednesday => Weekday::Wed,
            StartWeekday::Thursday => Weekday::Thu,
            StartWeekday::Friday => Weekday::Fri,
            StartWeekday::Saturday => Weekday::Sat,
        }
    }
}

impl fmt::Display for StartWeekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(WeekdayNames::English.base()[*self as usize])
    }
}

impl FromStr for StartWeekday {
    type Err = CalendarError;

    /// Accepts an ordinal (`"1"`), a full english name or its three letter prefix.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if let Ok(ordinal) = trimmed.parse::<u32>() {
            return Self::from_ordinal(ordinal);
        }
        trimmed
            .parse::<Weekday>()
            .map(Self::from_chrono)
            .map_err(|_| CalendarError::UnknownWeekday(trimmed.to_string()))
    }
}

/// Base weekday label sets, Sunday first.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum WeekdayNames {
    English,
    #[default]
    Japanese,
}

impl WeekdayNames {
    pub fn base(self) -> [&'static str; 7] {
        match self {
            WeekdayNames::English => ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"],
            WeekdayNames::Japanese => ["日", "月", "火", "水", "木", "金", "土"],
        }
    }
}

/// Rotates the base names so index 0 is `start`.
pub fn build_weekday_labels(start: StartWeekday, names: WeekdayNames) -> [String; 7] {
    let base = names.base();
    let s = start as usize;
    std::array::from_fn(|i| base[(s + i) % 7].to_string())
}

/// Display class of a weekday column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum WeekdayTone {
    Sunday,
    Saturday,
    Weekday,
}

impl WeekdayTone {
    pub fn for_date(date: NaiveDate) -> Self {
        Self::from_day_index(date.weekday().num_days_from_sunday() as usize)
    }

    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            WeekdayTone::Sunday => (0xCC, 0x00, 0x00),
            WeekdayTone::Saturday => (0x00, 0x66, 0xCC),
            WeekdayTone::Weekday => (0x22, 0x22, 0x22),
        }
    }

    pub fn hex(self) -> String {
        let (r, g, b) = self.rgb();
        format!("#{r:02X}{g:02X}{b:02X}")
    }

    fn from_day_index(index: usize) -> Self {
        match index {
            0 => WeekdayTone::Sunday,
            6 => WeekdayTone::Saturday,
            _ => WeekdayTone::Weekday,
        }
    }
}

/// Tone of grid column `column` when the grid starts on `start`.
pub fn weekday_tone(start: StartWeekday, column: usize) -> WeekdayTone {
    WeekdayTone::from_day_index((start as usize + column) % 7)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monday_start_rotates_left_by_one() {
        let labels = build_weekday_labels(StartWeekday::Monday, WeekdayNames::English);
        assert_eq!(labels, ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]);
    }

    #[test]
    fn successive_starts_rotate_by_one_position() {
        for names in [WeekdayNames::English, WeekdayNames::Japanese] {
            for ordinal in 0..7u32 {
                let current =
                    build_weekday_labels(StartWeekday::from_ordinal(ordinal).unwrap(), names);
                let next = build_weekday_labels(
                    StartWeekday::from_ordinal((ordinal + 1) % 7).unwrap(),
                    names,
                );
                for i in 0..7 {
                    assert_eq!(next[i], current[(i + 1) % 7]);
                }

                let mut sorted: Vec<&str> = current.iter().map(String::as_str).collect();
                sorted.sort();
                let mut expected = names.base().to_vec();
                expected.sort();
                assert_eq!(sorted, expected);
            }
        }
    }

    #[test]
    fn parses_ordinals_and_names() {
        assert_eq!("1".parse::<StartWeekday>().unwrap(), StartWeekday::Monday);
        assert_eq!("saturday".parse::<StartWeekday>().unwrap(), StartWeekday::Saturday);
        assert_eq!("Sun".parse::<StartWeekday>().unwrap(), StartWeekday::Sunday);
        assert!(matches!(
            "7".parse::<StartWeekday>(),
            Err(CalendarError::InvalidWeekday(7))
        ));
        assert!(matches!(
            "someday".parse::<StartWeekday>(),
            Err(CalendarError::UnknownWeekday(_))
        ));
    }

    #[test]
    fn tones_follow_the_rotated_columns() {
        assert_eq!(weekday_tone(StartWeekday::Sunday, 0), WeekdayTone::Sunday);
        assert_eq!(weekday_tone(StartWeekday::Sunday, 6), WeekdayTone::Saturday);
        assert_eq!(weekday_tone(StartWeekday::Monday, 5), WeekdayTone::Saturday);
        assert_eq!(weekday_tone(StartWeekday::Monday, 6), WeekdayTone::Sunday);
        assert_eq!(weekday_tone(StartWeekday::Monday, 0), WeekdayTone::Weekday);
        assert_eq!(WeekdayTone::Sunday.hex(), "#CC0000");
        assert_eq!(WeekdayTone::Saturday.hex(), "#0066CC");
    }

    #[test]
    fn date_tone_matches_weekday() {
        let saturday = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        assert_eq!(WeekdayTone::for_date(saturday), WeekdayTone::Saturday);
    }
}
