use std::fmt::Write as _;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use cal_core::weekday::{weekday_tone, WeekdayTone};
use cal_domain::MonthPage;
use chrono::Datelike;

const CELL_WIDTH: usize = 5;

/// Renders pages in order as plain-text month blocks.
pub fn render_text(pages: &[MonthPage]) -> String {
    let mut out = String::new();
    for (index, page) in pages.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        render_page(&mut out, page);
    }
    out
}

fn render_page(out: &mut String, page: &MonthPage) {
    let _ = writeln!(
        out,
        "== {} {} / {} ==",
        page.month_name, page.year, page.header_era_text
    );
    if !page.image_path.is_empty() {
        let _ = writeln!(out, "image: {}", page.image_path);
    }

    for (column, label) in page.weekday_labels.iter().enumerate() {
        let marker = match weekday_tone(page.start_weekday, column) {
            WeekdayTone::Sunday | WeekdayTone::Saturday => "*",
            WeekdayTone::Weekday => "",
        };
        let _ = write!(out, "{:>width$}", format!("{label}{marker}"), width = CELL_WIDTH);
    }
    out.push('\n');

    for week in page.weeks() {
        for cell in week {
            let day = if cell.is_current_month {
                cell.date.day().to_string()
            } else {
                format!("({})", cell.date.day())
            };
            let flag = if cell.has_anniversary() && cell.is_current_month {
                "+"
            } else {
                ""
            };
            let _ = write!(out, "{:>width$}", format!("{day}{flag}"), width = CELL_WIDTH);
        }
        out.push('\n');
    }

    for cell in page.cells.iter().filter(|c| c.is_current_month) {
        for line in cell.anniversary_display_lines.iter().filter(|l| !l.is_empty()) {
            let _ = writeln!(out, "  {:02}/{:02} {}", cell.date.month(), cell.date.day(), line);
        }
        if cell.hidden_line_count() > 0 {
            let _ = writeln!(
                out,
                "  {:02}/{:02} (+{} more)",
                cell.date.month(),
                cell.date.day(),
                cell.hidden_line_count()
            );
        }
    }
}

/// Writes the rendering to `path`, or stdout when no path is given.
pub fn write_text(pages: &[MonthPage], path: Option<&Path>) -> Result<()> {
    let text = render_text(pages);
    match path {
        Some(path) => fs::write(path, text)
            .with_context(|| format!("failed to write export {}", path.display()))?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cal_core::{StartWeekday, WeekdayNames};
    use cal_domain::{CalendarService, CalendarSettings};
    use chrono::NaiveDate;

    fn pages_for(settings: CalendarSettings) -> Vec<MonthPage> {
        CalendarService::builder()
            .with_settings(settings)
            .build()
            .unwrap()
            .snapshot()
            .to_vec()
    }

    #[test]
    fn renders_header_weekdays_and_padding_days() {
        let mut settings = CalendarSettings::starting_at(2024, 2).unwrap();
        settings.weekday_names = WeekdayNames::English;
        settings.start_weekday = StartWeekday::Sunday;
        settings
            .anniversaries
            .add_user(NaiveDate::from_ymd_opt(2024, 2, 14).unwrap(), "Valentine")
            .unwrap();
        let pages = pages_for(settings);
        let text = render_text(&pages[..1]);

        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("== February 2024 / 2024年（令和6年） =="));
        assert_eq!(lines.next(), Some(" Sun*  Mon  Tue  Wed  Thu  Fri Sat*"));
        assert_eq!(lines.next(), Some(" (28) (29) (30) (31)    1    2    3"));
        assert!(text.contains("  14+"));
        assert!(text.contains("  02/14 Valentine"));
    }

    #[test]
    fn renders_every_page_in_order() {
        let pages = pages_for(CalendarSettings::starting_at(2025, 12).unwrap());
        let text = render_text(&pages);
        let december = text.find("== December 2025").unwrap();
        let january = text.find("== January 2026").unwrap();
        assert!(december < january);
        assert_eq!(text.matches("== ").count(), 12);
    }

    #[test]
    fn writes_to_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calendar.txt");
        let pages = pages_for(CalendarSettings::starting_at(2025, 1).unwrap());
        write_text(&pages, Some(&path)).unwrap();
        let written = fs::read_to_string(path).unwrap();
        assert!(written.starts_with("== January 2025"));
    }
}
