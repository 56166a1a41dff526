pub mod cache;
pub mod engine;
pub mod http;
pub mod source;

pub use crate::cache::{prime_from_cache, HolidayCache, HolidayCacheStore, HolidayItem};
pub use crate::engine::{apply_holidays, HolidaySyncEngine, SyncError, SyncReport, SyncStatus};
pub use crate::http::{HttpHolidaySource, DEFAULT_HOLIDAY_URL};
pub use crate::source::{FetchError, HolidayFetchResult, HolidayRequest, HolidaySource};
