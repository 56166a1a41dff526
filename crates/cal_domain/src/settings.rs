use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use cal_core::grid::first_of_month;
use cal_core::{GridLayout, StartWeekday, WeekdayNames};
use chrono::{DateTime, Datelike, Days, Local, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::anniversary::AnniversaryStore;
use crate::error::DomainError;

pub const MONTHS_PER_CALENDAR: usize = 12;

/// Photos are printed at 3:2.
pub const TARGET_ASPECT_RATIO: f64 = 3.0 / 2.0;

const MIN_CROP_EXTENT: f64 = 0.01;

/// Crop region in image-relative coordinates (0..=1 on both axes).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRect {
    pub const FULL: CropRect = CropRect {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };

    /// Keeps the rectangle inside the unit square.
    pub fn normalized(self) -> Self {
        let or = |value: f64, fallback: f64| if value.is_nan() { fallback } else { value };
        let mut x = or(self.x, 0.0);
        let mut y = or(self.y, 0.0);
        let mut width = or(self.width, 1.0);
        let mut height = or(self.height, 1.0);

        if width <= 0.0 {
            width = MIN_CROP_EXTENT;
        }
        if height <= 0.0 {
            height = MIN_CROP_EXTENT;
        }
        width = width.min(1.0);
        height = height.min(1.0);

        x = x.max(0.0);
        y = y.max(0.0);
        if x + width > 1.0 {
            x = (1.0 - width).max(0.0);
        }
        if y + height > 1.0 {
            y = (1.0 - height).max(0.0);
        }

        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Largest centred 3:2 region for an image with the given width/height ratio.
    pub fn centered_for_aspect(aspect_ratio: Option<f64>) -> Self {
        let Some(ratio) = aspect_ratio.filter(|r| r.is_finite() && *r > 0.0) else {
            return Self::FULL;
        };
        if ratio >= TARGET_ASPECT_RATIO {
            let width = TARGET_ASPECT_RATIO / ratio;
            Self {
                x: (1.0 - width) / 2.0,
                y: 0.0,
                width,
                height: 1.0,
            }
        } else {
            let height = ratio / TARGET_ASPECT_RATIO;
            Self {
                x: 0.0,
                y: (1.0 - height) / 2.0,
                width: 1.0,
                height,
            }
        }
    }
}

impl Default for CropRect {
    fn default() -> Self {
        Self::FULL
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MonthImage {
    pub path: String,
    pub aspect_ratio: Option<f64>,
    pub crop: CropRect,
}

impl MonthImage {
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HolidaySyncState {
    pub last_fetched: Option<DateTime<Utc>>,
    pub source_last_modified: Option<DateTime<Utc>>,
    pub range_start: Option<NaiveDate>,
    pub range_end: Option<NaiveDate>,
}

impl HolidaySyncState {
    /// Whether the recorded sync range spans `start..=end`.
    pub fn covers(&self, start: NaiveDate, end: NaiveDate) -> bool {
        matches!(
            (self.range_start, self.range_end),
            (Some(from), Some(to)) if from <= start && end <= to
        )
    }
}

/// Everything a calendar build reads. Owned by the application session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CalendarSettings {
    start_month: NaiveDate,
    pub start_weekday: StartWeekday,
    pub anniversaries: AnniversaryStore,
    month_images: [MonthImage; MONTHS_PER_CALENDAR],
    pub holiday_sync: HolidaySyncState,
    pub grid_layout: GridLayout,
    pub weekday_names: WeekdayNames,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        let today = Local::now().date_naive();
        Self {
            start_month: today.with_day(1).unwrap_or(today),
            start_weekday: StartWeekday::default(),
            anniversaries: AnniversaryStore::default(),
            month_images: Default::default(),
            holiday_sync: HolidaySyncState::default(),
            grid_layout: GridLayout::default(),
            weekday_names: WeekdayNames::default(),
        }
    }
}

impl CalendarSettings {
    pub fn starting_at(year: i32, month: u32) -> Result<Self, DomainError> {
        let mut settings = Self::default();
        settings.set_start_month(year, month)?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings {}", path.display()))?;
        let settings = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse settings {}", path.display()))?;
        Ok(settings)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("failed to write settings {}", path.display()))?;
        Ok(())
    }

    /// First day of the first calendar month.
    pub fn start_month(&self) -> NaiveDate {
        self.start_month.with_day(1).unwrap_or(self.start_month)
    }

    pub fn set_start_month(&mut self, year: i32, month: u32) -> Result<(), DomainError> {
        self.start_month = first_of_month(year, month)?;
        Ok(())
    }

    /// First day of the `offset`-th month after the start month.
    pub fn month_at(&self, offset: usize) -> Option<NaiveDate> {
        self.start_month()
            .checked_add_months(Months::new(offset as u32))
    }

    /// Inclusive date range covered by the twelve pages.
    pub fn holiday_window(&self) -> Option<(NaiveDate, NaiveDate)> {
        let start = self.start_month();
        let end = start
            .checked_add_months(Months::new(MONTHS_PER_CALENDAR as u32))?
            .checked_sub_days(Days::new(1))?;
        Some((start, end))
    }

    pub fn month_images(&self) -> &[MonthImage; MONTHS_PER_CALENDAR] {
        &self.month_images
    }

    pub fn month_image(&self, index: usize) -> Option<&MonthImage> {
        self.month_images.get(index)
    }

    /// Replaces the image path and resets its crop. Aspect ratio becomes unknown.
    pub fn set_month_image_path(&mut self, index: usize, path: &str) -> Result<(), DomainError> {
        self.set_month_image(index, path, None)
    }

    pub fn set_month_image(
        &mut self,
        index: usize,
        path: &str,
        aspect_ratio: Option<f64>,
    ) -> Result<(), DomainError> {
        let slot = self
            .month_images
            .get_mut(index)
            .ok_or(DomainError::InvalidImageIndex(index))?;
        *slot = MonthImage {
            path: path.to_string(),
            aspect_ratio,
            crop: CropRect::centered_for_aspect(aspect_ratio),
        };
        Ok(())
    }

    pub fn set_month_image_crop(&mut self, index: usize, crop: CropRect) -> Result<(), DomainError> {
        let slot = self
            .month_images
            .get_mut(index)
            .ok_or(DomainError::InvalidImageIndex(index))?;
        slot.crop = crop.normalized();
        Ok(())
    }

    pub fn swap_month_images(&mut self, a: usize, b: usize) -> Result<(), DomainError> {
        for index in [a, b] {
            if index >= MONTHS_PER_CALENDAR {
                return Err(DomainError::InvalidImageIndex(index));
            }
        }
        self.month_images.swap(a, b);
        Ok(())
    }
}
