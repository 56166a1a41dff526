use std::sync::Arc;

use cal_core::era::{format_era_text, EraCalendar, EraTable};
use cal_core::grid::build_month_grid_with;
use cal_core::{build_weekday_labels, month_name, DayCell, StartWeekday};
use chrono::{Datelike, NaiveDate};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::DomainError;
use crate::settings::{CalendarSettings, CropRect, MONTHS_PER_CALENDAR};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MonthPage {
    pub year: i32,
    pub month: u32,
    pub month_name: String,
    pub header_era_text: String,
    pub cells: Vec<DayCell>,
    pub weekday_labels: [String; 7],
    pub start_weekday: StartWeekday,
    pub image_path: String,
    pub image_aspect_ratio: Option<f64>,
    pub image_crop: CropRect,
}

impl MonthPage {
    pub fn row_count(&self) -> usize {
        self.cells.len() / 7
    }

    pub fn weeks(&self) -> impl Iterator<Item = &[DayCell]> {
        self.cells.chunks(7)
    }
}

/// Immutable page sequence handed to exporters and printers.
pub type PageSnapshot = Arc<[MonthPage]>;

#[derive(Debug, Clone)]
struct PageState {
    pages: PageSnapshot,
    selected: Option<usize>,
}

/// Owns the settings of one calendar session and the pages built from them.
pub struct CalendarService {
    settings: CalendarSettings,
    era_calendar: Box<dyn EraCalendar>,
    state: RwLock<PageState>,
}

pub struct CalendarServiceBuilder {
    settings: Option<CalendarSettings>,
    era_calendar: Option<Box<dyn EraCalendar>>,
}

impl CalendarServiceBuilder {
    pub fn new() -> Self {
        Self {
            settings: None,
            era_calendar: None,
        }
    }

    pub fn with_settings(mut self, settings: CalendarSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn with_era_calendar(mut self, calendar: Box<dyn EraCalendar>) -> Self {
        self.era_calendar = Some(calendar);
        self
    }

    pub fn build(self) -> Result<CalendarService, DomainError> {
        let service = CalendarService {
            settings: self.settings.unwrap_or_default(),
            era_calendar: self
                .era_calendar
                .unwrap_or_else(|| Box::new(EraTable::japanese())),
            state: RwLock::new(PageState {
                pages: Arc::from(Vec::new()),
                selected: None,
            }),
        };
        service.build_all_pages()?;
        Ok(service)
    }
}

impl Default for CalendarServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CalendarService {
    pub fn builder() -> CalendarServiceBuilder {
        CalendarServiceBuilder::new()
    }

    pub fn settings(&self) -> &CalendarSettings {
        &self.settings
    }

    /// Direct access for bulk edits. Pages are stale until the next
    /// [`CalendarService::build_all_pages`].
    pub fn settings_mut(&mut self) -> &mut CalendarSettings {
        &mut self.settings
    }

    /// Applies `edit` and rebuilds once afterwards. Settings are rolled back
    /// when either step fails, so they always match the current pages.
    pub fn update_settings<R>(
        &mut self,
        edit: impl FnOnce(&mut CalendarSettings) -> Result<R, DomainError>,
    ) -> Result<R, DomainError> {
        let previous = self.settings.clone();
        let outcome = edit(&mut self.settings)
            .and_then(|result| self.build_all_pages().map(|()| result));
        if outcome.is_err() {
            self.settings = previous;
        }
        outcome
    }

    /// Regenerates all twelve pages from the current settings and swaps them in.
    /// The previously selected month stays selected when it is still present.
    pub fn build_all_pages(&self) -> Result<(), DomainError> {
        let anniversaries = self.settings.anniversaries.group_by_date();
        let previously_selected = self.selected_month();
        let weekday_labels =
            build_weekday_labels(self.settings.start_weekday, self.settings.weekday_names);

        let mut pages = Vec::with_capacity(MONTHS_PER_CALENDAR);
        for (index, image) in self.settings.month_images().iter().enumerate() {
            let first = self
                .settings
                .month_at(index)
                .ok_or(DomainError::WindowOutOfRange(self.settings.start_month()))?;
            let cells = build_month_grid_with(
                first.year(),
                first.month(),
                self.settings.start_weekday,
                &anniversaries,
                self.settings.grid_layout,
            )?;
            pages.push(MonthPage {
                year: first.year(),
                month: first.month(),
                month_name: month_name(first.month())?.to_string(),
                header_era_text: self.header_text(first),
                cells,
                weekday_labels: weekday_labels.clone(),
                start_weekday: self.settings.start_weekday,
                image_path: image.path.clone(),
                image_aspect_ratio: image.aspect_ratio,
                image_crop: image.crop,
            });
        }

        let selected = if pages.is_empty() {
            None
        } else {
            previously_selected
                .and_then(|(year, month)| {
                    pages
                        .iter()
                        .position(|page| page.year == year && page.month == month)
                })
                .or(Some(0))
        };

        debug!(
            start = %self.settings.start_month(),
            pages = pages.len(),
            ?selected,
            "rebuilt calendar pages"
        );
        *self.state.write() = PageState {
            pages: Arc::from(pages),
            selected,
        };
        Ok(())
    }

    fn header_text(&self, first: NaiveDate) -> String {
        match format_era_text(first, self.era_calendar.as_ref()) {
            Ok(text) => text,
            Err(err) => {
                warn!(%err, date = %first, "falling back to plain year header");
                format!("{}年", first.year())
            }
        }
    }

    /// Current pages. The returned snapshot is unaffected by later rebuilds.
    pub fn snapshot(&self) -> PageSnapshot {
        self.state.read().pages.clone()
    }

    pub fn page(&self, index: usize) -> Option<MonthPage> {
        self.state.read().pages.get(index).cloned()
    }

    pub fn pages(&self) -> Vec<MonthPage> {
        self.state.read().pages.to_vec()
    }

    pub fn page_count(&self) -> usize {
        self.state.read().pages.len()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.state.read().selected
    }

    pub fn select_page(&self, index: usize) -> Result<(), DomainError> {
        let mut state = self.state.write();
        if index >= state.pages.len() {
            return Err(DomainError::InvalidPageIndex(index));
        }
        state.selected = Some(index);
        Ok(())
    }

    pub fn current_page(&self) -> Option<MonthPage> {
        let state = self.state.read();
        state
            .selected
            .and_then(|index| state.pages.get(index))
            .cloned()
    }

    fn selected_month(&self) -> Option<(i32, u32)> {
        let state = self.state.read();
        state
            .selected
            .and_then(|index| state.pages.get(index))
            .map(|page| (page.year, page.month))
    }

    pub fn add_anniversary(&mut self, date: NaiveDate, label: &str) -> Result<(), DomainError> {
        self.update_settings(|settings| settings.anniversaries.add_user(date, label).map(|_| ()))
    }

    pub fn remove_anniversary(&mut self, index: usize) -> Result<(), DomainError> {
        self.update_settings(|settings| settings.anniversaries.remove(index).map(|_| ()))
    }

    pub fn set_start_month(&mut self, year: i32, month: u32) -> Result<(), DomainError> {
        self.update_settings(|settings| settings.set_start_month(year, month))
    }

    pub fn set_start_weekday(&mut self, weekday: StartWeekday) -> Result<(), DomainError> {
        self.update_settings(|settings| {
            settings.start_weekday = weekday;
            Ok(())
        })
    }

    pub fn set_month_image(
        &mut self,
        index: usize,
        path: &str,
        aspect_ratio: Option<f64>,
    ) -> Result<(), DomainError> {
        self.update_settings(|settings| settings.set_month_image(index, path, aspect_ratio))
    }

    pub fn set_month_image_crop(&mut self, index: usize, crop: CropRect) -> Result<(), DomainError> {
        self.update_settings(|settings| settings.set_month_image_crop(index, crop))
    }

    /// Swaps image slot `index` with the one before it. Returns false at the top.
    pub fn move_image_up(&mut self, index: usize) -> Result<bool, DomainError> {
        if index == 0 || index >= MONTHS_PER_CALENDAR {
            return Ok(false);
        }
        self.update_settings(|settings| settings.swap_month_images(index, index - 1))?;
        Ok(true)
    }

    pub fn move_image_down(&mut self, index: usize) -> Result<bool, DomainError> {
        if index + 1 >= MONTHS_PER_CALENDAR {
            return Ok(false);
        }
        self.update_settings(|settings| settings.swap_month_images(index, index + 1))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cal_core::era::EraYear;
    use cal_core::error::EraError;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn service_starting(year: i32, month: u32) -> CalendarService {
        CalendarService::builder()
            .with_settings(CalendarSettings::starting_at(year, month).unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn builds_twelve_consecutive_pages() {
        let service = service_starting(2025, 11);
        let pages = service.snapshot();
        assert_eq!(pages.len(), 12);
        let months: Vec<(i32, u32)> = pages.iter().map(|p| (p.year, p.month)).collect();
        assert_eq!(months[0], (2025, 11));
        assert_eq!(months[1], (2025, 12));
        assert_eq!(months[2], (2026, 1));
        assert_eq!(months[11], (2026, 10));
        assert_eq!(pages[0].month_name, "November");
        assert_eq!(pages[0].header_era_text, "2025年（令和7年）");
        assert_eq!(service.selected_index(), Some(0));
    }

    #[test]
    fn keeps_selected_month_across_rebuilds() {
        let mut service = service_starting(2025, 1);
        service.select_page(5).unwrap();
        service
            .add_anniversary(date(2025, 6, 10), "Birthday")
            .unwrap();
        assert_eq!(service.selected_index(), Some(5));
        assert_eq!(service.current_page().unwrap().month, 6);

        service.set_start_month(2025, 4).unwrap();
        assert_eq!(service.selected_index(), Some(2));
        assert_eq!(service.current_page().unwrap().month, 6);

        service.set_start_month(2026, 1).unwrap();
        assert_eq!(service.selected_index(), Some(0));
    }

    #[test]
    fn failed_rebuild_rolls_back_settings() {
        let mut service = service_starting(2024, 1);
        let before = service.snapshot();
        let last_year = NaiveDate::MAX.year();

        let err = service.set_start_month(last_year, 6).unwrap_err();
        assert!(matches!(
            err,
            DomainError::WindowOutOfRange(_) | DomainError::Calendar(_)
        ));
        assert_eq!(service.settings().start_month(), date(2024, 1, 1));
        assert_eq!(service.snapshot(), before);

        let err = service
            .update_settings(|settings| {
                settings.start_weekday = StartWeekday::Monday;
                Err::<(), _>(DomainError::BlankLabel)
            })
            .unwrap_err();
        assert_eq!(err, DomainError::BlankLabel);
        assert_eq!(service.settings().start_weekday, StartWeekday::Sunday);
    }

    #[test]
    fn rebuild_is_idempotent() {
        let mut service = service_starting(2024, 1);
        service
            .add_anniversary(date(2024, 2, 3), "Setsubun")
            .unwrap();
        let first = service.snapshot();
        service.build_all_pages().unwrap();
        let second = service.snapshot();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first, second);
        assert_eq!(service.pages(), second.to_vec());
        assert_eq!(service.page(11).map(|page| page.month), Some(12));
        assert!(service.page(12).is_none());
    }

    #[test]
    fn snapshot_is_isolated_from_later_rebuilds() {
        let mut service = service_starting(2024, 1);
        let before = service.snapshot();
        service.set_start_weekday(StartWeekday::Monday).unwrap();
        assert_eq!(before[0].start_weekday, StartWeekday::Sunday);
        assert_eq!(service.snapshot()[0].start_weekday, StartWeekday::Monday);
        assert_eq!(service.snapshot()[0].weekday_labels[0], "月");
    }

    #[test]
    fn anniversaries_reach_the_cells() {
        let mut service = service_starting(2024, 1);
        service.add_anniversary(date(2024, 3, 14), "White Day").unwrap();
        let pages = service.snapshot();
        let march = pages.iter().find(|p| p.month == 3).unwrap();
        let cell = march.cells.iter().find(|c| c.date == date(2024, 3, 14)).unwrap();
        assert_eq!(cell.anniversary_display_lines[0], "White Day");

        service.remove_anniversary(0).unwrap();
        let pages = service.snapshot();
        let march = pages.iter().find(|p| p.month == 3).unwrap();
        assert!(march.cells.iter().all(|c| !c.has_anniversary()));
    }

    #[test]
    fn image_slots_map_to_page_positions() {
        let mut service = service_starting(2024, 4);
        service.set_month_image(0, "april.jpg", Some(1.5)).unwrap();
        service.set_month_image(1, "may.jpg", None).unwrap();
        assert!(service.move_image_down(0).unwrap());
        let pages = service.snapshot();
        assert_eq!(pages[0].image_path, "may.jpg");
        assert_eq!(pages[1].image_path, "april.jpg");
        assert_eq!(pages[1].image_aspect_ratio, Some(1.5));
        assert!(pages[2].image_path.is_empty());

        assert!(!service.move_image_up(0).unwrap());
        assert!(!service.move_image_down(11).unwrap());
        assert_eq!(
            service.set_month_image(12, "x.jpg", None),
            Err(DomainError::InvalidImageIndex(12))
        );
    }

    #[test]
    fn invalid_page_selection_is_rejected() {
        let service = service_starting(2024, 1);
        assert_eq!(service.select_page(12), Err(DomainError::InvalidPageIndex(12)));
        assert_eq!(service.selected_index(), Some(0));
    }

    struct NoEras;

    impl EraCalendar for NoEras {
        fn era_of(&self, _date: NaiveDate) -> Result<EraYear, EraError> {
            Err(EraError::UnknownEra)
        }
    }

    #[test]
    fn era_failures_fall_back_to_plain_year() {
        let service = CalendarService::builder()
            .with_settings(CalendarSettings::starting_at(2024, 12).unwrap())
            .with_era_calendar(Box::new(NoEras))
            .build()
            .unwrap();
        let pages = service.snapshot();
        assert_eq!(pages[0].header_era_text, "2024年");
        assert_eq!(pages[1].header_era_text, "2025年");
    }
}
