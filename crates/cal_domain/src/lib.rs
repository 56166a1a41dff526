pub mod anniversary;
pub mod error;
pub mod holiday;
pub mod service;
pub mod settings;

pub use crate::error::DomainError;
pub use crate::service::{CalendarService, CalendarServiceBuilder, MonthPage, PageSnapshot};
pub use crate::settings::CalendarSettings;
