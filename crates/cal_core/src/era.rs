use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

pub use crate::error::EraError;

/// Maps a Gregorian date to an era name and year within that era.
pub trait EraCalendar: Send + Sync {
    fn era_of(&self, date: NaiveDate) -> Result<EraYear, EraError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EraYear {
    pub name: String,
    pub year: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EraDefinition {
    pub name: String,
    pub starts_on: NaiveDate,
}

/// Era boundaries in ascending start order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EraTable {
    eras: Vec<EraDefinition>,
}

const JAPANESE_ERAS: [(&str, i32, u32, u32); 5] = [
    ("明治", 1868, 9, 8),
    ("大正", 1912, 7, 30),
    ("昭和", 1926, 12, 25),
    ("平成", 1989, 1, 8),
    ("令和", 2019, 5, 1),
];

impl EraTable {
    pub fn new(mut eras: Vec<EraDefinition>) -> Self {
        eras.sort_by_key(|era| era.starts_on);
        Self { eras }
    }

    pub fn japanese() -> Self {
        let eras = JAPANESE_ERAS
            .iter()
            .filter_map(|&(name, y, m, d)| {
                NaiveDate::from_ymd_opt(y, m, d).map(|starts_on| EraDefinition {
                    name: name.to_string(),
                    starts_on,
                })
            })
            .collect();
        Self::new(eras)
    }

    pub fn eras(&self) -> &[EraDefinition] {
        &self.eras
    }
}

impl Default for EraTable {
    fn default() -> Self {
        Self::japanese()
    }
}

impl EraCalendar for EraTable {
    fn era_of(&self, date: NaiveDate) -> Result<EraYear, EraError> {
        if self.eras.is_empty() {
            return Err(EraError::UnknownEra);
        }
        let era = self
            .eras
            .iter()
            .rev()
            .find(|era| era.starts_on <= date)
            .ok_or(EraError::BeforeFirstEra(date))?;
        Ok(EraYear {
            name: era.name.clone(),
            year: (date.year() - era.starts_on.year() + 1) as u32,
        })
    }
}

/// Header text such as `2025年（令和7年）`. The first year of an era reads `元年`.
pub fn format_era_text(date: NaiveDate, calendar: &dyn EraCalendar) -> Result<String, EraError> {
    let era = calendar.era_of(date)?;
    let era_year = if era.year == 1 {
        "元".to_string()
    } else {
        era.year.to_string()
    };
    Ok(format!("{}年（{}{}年）", date.year(), era.name, era_year))
}
