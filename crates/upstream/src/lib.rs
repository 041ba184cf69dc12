//! Upstream gateway clients for Minaret.
//!
//! Wraps the two external data sources the engine depends on, the
//! prayer-time source (Aladhan) and the content source (HadeethEnc), behind
//! trait seams with bounded retry, exponential backoff, and typed failures.
//!
//! # Example
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use upstream::{AladhanClient, AladhanConfig, PrayerQuery, PrayerTimesSource};
//!
//! # async fn example() -> Result<(), upstream::GatewayError> {
//! let client = AladhanClient::new(AladhanConfig::default());
//! let query = PrayerQuery {
//!     city: "Cairo".to_string(),
//!     country: "Egypt".to_string(),
//!     method: 5,
//! };
//! let date = NaiveDate::from_ymd_opt(2026, 1, 16).unwrap();
//! let times = client.daily_times(&query, date).await?;
//! println!("Fajr at {} ({})", times.fajr, times.hijri_date);
//! # Ok(())
//! # }
//! ```

pub mod content;
pub mod error;
pub mod prayer;
pub mod retry;

pub use content::{CategorySummary, ContentItem, ContentSource, HadeethClient, HadeethConfig};
pub use error::GatewayError;
pub use prayer::{AladhanClient, AladhanConfig, PrayerQuery, PrayerTimes, PrayerTimesSource};
pub use retry::{with_retries, RetryPolicy};
