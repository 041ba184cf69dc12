//! Prayer-time gateway backed by the Aladhan API.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use tracing::debug;

use crate::error::GatewayError;
use crate::retry::{with_retries, RetryPolicy};

/// Location and calculation settings for a timings lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrayerQuery {
    pub city: String,
    pub country: String,
    /// Calculation-method id as documented by the time source.
    pub method: i64,
}

/// One day of prayer instants plus the secondary-calendar label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrayerTimes {
    pub fajr: NaiveTime,
    pub dhuhr: NaiveTime,
    pub asr: NaiveTime,
    pub maghrib: NaiveTime,
    pub isha: NaiveTime,
    /// Human-readable Hijri date (e.g., "15 Rajab 1447 AH").
    pub hijri_date: String,
}

/// Trait for fetching a group's daily prayer times.
///
/// Abstracted so tests can substitute a static source.
#[async_trait]
pub trait PrayerTimesSource: Send + Sync {
    /// Fetch the five prayer instants for `date` at the queried location.
    async fn daily_times(
        &self,
        query: &PrayerQuery,
        date: NaiveDate,
    ) -> Result<PrayerTimes, GatewayError>;
}

/// Configuration for the Aladhan client.
#[derive(Debug, Clone)]
pub struct AladhanConfig {
    /// API base URL (e.g., "https://api.aladhan.com/v1").
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: std::time::Duration,
}

impl Default for AladhanConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.aladhan.com/v1".to_string(),
            timeout: std::time::Duration::from_secs(10),
        }
    }
}

impl AladhanConfig {
    /// Get the timings-by-city endpoint URL for a query and date.
    pub fn timings_url(&self, query: &PrayerQuery, date: NaiveDate) -> String {
        format!(
            "{}/timingsByCity/{}?city={}&country={}&method={}",
            self.base_url,
            date.format("%d-%m-%Y"),
            urlencoding::encode(&query.city),
            urlencoding::encode(&query.country),
            query.method
        )
    }
}

/// Response envelope from the Aladhan API.
#[derive(Debug, Deserialize)]
struct AladhanResponse {
    code: i64,
    data: AladhanData,
}

#[derive(Debug, Deserialize)]
struct AladhanData {
    timings: AladhanTimings,
    date: AladhanDate,
}

#[derive(Debug, Deserialize)]
struct AladhanTimings {
    #[serde(rename = "Fajr")]
    fajr: String,
    #[serde(rename = "Dhuhr")]
    dhuhr: String,
    #[serde(rename = "Asr")]
    asr: String,
    #[serde(rename = "Maghrib")]
    maghrib: String,
    #[serde(rename = "Isha")]
    isha: String,
}

#[derive(Debug, Deserialize)]
struct AladhanDate {
    hijri: AladhanHijri,
}

#[derive(Debug, Deserialize)]
struct AladhanHijri {
    day: String,
    month: AladhanHijriMonth,
    year: String,
}

#[derive(Debug, Deserialize)]
struct AladhanHijriMonth {
    en: String,
}

/// Parse a timing value, tolerating suffixes like "05:21 (EET)".
fn parse_timing(raw: &str) -> Result<NaiveTime, GatewayError> {
    let clock = raw.split_whitespace().next().unwrap_or(raw);
    NaiveTime::parse_from_str(clock, "%H:%M")
        .map_err(|_| GatewayError::InvalidInput(format!("unparseable prayer time: {}", raw)))
}

fn hijri_label(hijri: &AladhanHijri) -> String {
    format!("{} {} {} AH", hijri.day, hijri.month.en, hijri.year)
}

/// Prayer-time client for the Aladhan API.
pub struct AladhanClient {
    http: reqwest::Client,
    config: AladhanConfig,
    retry: RetryPolicy,
}

impl AladhanClient {
    /// Create a client with the default retry policy.
    pub fn new(config: AladhanConfig) -> Self {
        Self::with_retry(config, RetryPolicy::default())
    }

    /// Create a client with a custom retry policy.
    pub fn with_retry(config: AladhanConfig, retry: RetryPolicy) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("MinaretBot/1.0")
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { http, config, retry }
    }

    async fn fetch_times(
        &self,
        query: &PrayerQuery,
        date: NaiveDate,
    ) -> Result<PrayerTimes, GatewayError> {
        let url = self.config.timings_url(query, date);
        debug!("Fetching prayer times from: {}", url);

        let response = self.http.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound(format!(
                "no timings for {}, {}",
                query.city, query.country
            )));
        }
        if response.status().is_client_error() {
            return Err(GatewayError::InvalidInput(format!(
                "timings request rejected: {}",
                response.status()
            )));
        }
        if !response.status().is_success() {
            return Err(GatewayError::Transient(format!(
                "time source returned {}",
                response.status()
            )));
        }

        let body: AladhanResponse = response.json().await?;
        if body.code != 200 {
            return Err(GatewayError::Transient(format!(
                "time source returned code {}",
                body.code
            )));
        }

        Ok(PrayerTimes {
            fajr: parse_timing(&body.data.timings.fajr)?,
            dhuhr: parse_timing(&body.data.timings.dhuhr)?,
            asr: parse_timing(&body.data.timings.asr)?,
            maghrib: parse_timing(&body.data.timings.maghrib)?,
            isha: parse_timing(&body.data.timings.isha)?,
            hijri_date: hijri_label(&body.data.date.hijri),
        })
    }
}

#[async_trait]
impl PrayerTimesSource for AladhanClient {
    async fn daily_times(
        &self,
        query: &PrayerQuery,
        date: NaiveDate,
    ) -> Result<PrayerTimes, GatewayError> {
        with_retries(&self.retry, "timings lookup", || self.fetch_times(query, date)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timing() {
        assert_eq!(
            parse_timing("05:21").unwrap(),
            NaiveTime::from_hms_opt(5, 21, 0).unwrap()
        );
        assert_eq!(
            parse_timing("19:03 (EET)").unwrap(),
            NaiveTime::from_hms_opt(19, 3, 0).unwrap()
        );

        assert!(matches!(
            parse_timing("soon"),
            Err(GatewayError::InvalidInput(_))
        ));
        assert!(matches!(parse_timing(""), Err(GatewayError::InvalidInput(_))));
    }

    #[test]
    fn test_timings_url_encodes_query() {
        let config = AladhanConfig::default();
        let query = PrayerQuery {
            city: "Kuala Lumpur".to_string(),
            country: "Malaysia".to_string(),
            method: 3,
        };
        let date = NaiveDate::from_ymd_opt(2026, 1, 16).unwrap();

        assert_eq!(
            config.timings_url(&query, date),
            "https://api.aladhan.com/v1/timingsByCity/16-01-2026?city=Kuala%20Lumpur&country=Malaysia&method=3"
        );
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{
            "code": 200,
            "status": "OK",
            "data": {
                "timings": {
                    "Fajr": "05:21",
                    "Sunrise": "06:51",
                    "Dhuhr": "12:05",
                    "Asr": "15:10",
                    "Sunset": "17:20",
                    "Maghrib": "17:20",
                    "Isha": "18:41"
                },
                "date": {
                    "readable": "16 Jan 2026",
                    "hijri": {
                        "date": "27-07-1447",
                        "day": "27",
                        "month": { "number": 7, "en": "Rajab" },
                        "year": "1447"
                    }
                }
            }
        }"#;

        let parsed: AladhanResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.code, 200);
        assert_eq!(parsed.data.timings.fajr, "05:21");
        assert_eq!(hijri_label(&parsed.data.date.hijri), "27 Rajab 1447 AH");
    }

    #[tokio::test]
    #[ignore] // Requires network
    async fn test_live_timings_lookup() {
        let client = AladhanClient::new(AladhanConfig::default());
        let query = PrayerQuery {
            city: "Cairo".to_string(),
            country: "Egypt".to_string(),
            method: 5,
        };
        let date = chrono::Utc::now().date_naive();

        let times = client.daily_times(&query, date).await.unwrap();
        assert!(times.fajr < times.dhuhr);
        assert!(times.dhuhr < times.asr);
        assert!(!times.hijri_date.is_empty());
    }
}
