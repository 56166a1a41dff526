use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderName, DATE, IF_MODIFIED_SINCE, LAST_MODIFIED};
use reqwest::{StatusCode, Url};
use tracing::debug;

use crate::source::{
    parse_holiday_payload, FetchError, HolidayFetchResult, HolidayRequest, HolidaySource,
};

pub const DEFAULT_HOLIDAY_URL: &str = "https://holidays-jp.github.io/api/v1/date.json";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Holiday feed served as a single JSON object over HTTP.
pub struct HttpHolidaySource {
    client: reqwest::Client,
    url: Url,
}

impl HttpHolidaySource {
    pub fn new(url: &str) -> Result<Self, FetchError> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let url = Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("calendar-maker/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl HolidaySource for HttpHolidaySource {
    async fn fetch(&self, request: &HolidayRequest) -> Result<HolidayFetchResult, FetchError> {
        let mut builder = self.client.get(self.url.clone());
        if let Some(since) = request.if_modified_since {
            builder = builder.header(IF_MODIFIED_SINCE, to_http_date(since));
        }

        let response = builder.send().await?;
        let status = response.status();
        debug!(url = %self.url, %status, "holiday feed responded");

        if status == StatusCode::NOT_MODIFIED {
            return Ok(HolidayFetchResult::not_modified(request.if_modified_since));
        }
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let last_modified = header_date(response.headers(), LAST_MODIFIED)
            .or_else(|| header_date(response.headers(), DATE));
        let body = response.bytes().await?;
        let holidays = parse_holiday_payload(&body, request)?;
        Ok(HolidayFetchResult::modified(holidays, last_modified))
    }
}

/// IMF-fixdate, as used by `If-Modified-Since`.
pub fn to_http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

fn header_date(headers: &HeaderMap, name: HeaderName) -> Option<DateTime<Utc>> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_http_date)
}
