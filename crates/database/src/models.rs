//! Database models.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A recipient group, identified by its transport channel id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Group {
    /// Opaque recipient-channel id as issued by the chat transport.
    pub id: String,
    /// City used for prayer-time lookups.
    pub city: String,
    /// Country used for prayer-time lookups.
    pub country: String,
    /// IANA timezone name (e.g., "Africa/Cairo").
    pub timezone: String,
    /// Calculation-method id as defined by the time source.
    pub method: i64,
    /// Soft-disable flag. Inactive groups are never scheduled or sent to.
    pub active: bool,
    /// Whether the group has notifications switched on.
    pub notifications_enabled: bool,
    /// Creation timestamp.
    pub created_at: String,
    /// Last settings change.
    pub updated_at: String,
}

/// Fields required to register a new group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGroup {
    pub id: String,
    pub city: String,
    pub country: String,
    pub timezone: String,
    pub method: i64,
}

/// The five prayer instants for one (group, date), plus the Hijri label.
///
/// At most one row exists per (group, date); once stored, the row is treated
/// as immutable for that date unless a reschedule forces a re-fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DailyPrayerSchedule {
    pub id: i64,
    pub group_id: String,
    /// Group-local calendar date the instants belong to.
    pub date: NaiveDate,
    pub fajr: NaiveTime,
    pub dhuhr: NaiveTime,
    pub asr: NaiveTime,
    pub maghrib: NaiveTime,
    pub isha: NaiveTime,
    /// Secondary-calendar label carried into alert payloads.
    pub hijri_date: String,
}

/// Fields required to store a day's prayer times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDailySchedule {
    pub group_id: String,
    pub date: NaiveDate,
    pub fajr: NaiveTime,
    pub dhuhr: NaiveTime,
    pub asr: NaiveTime,
    pub maghrib: NaiveTime,
    pub isha: NaiveTime,
    pub hijri_date: String,
}

/// The kind of delivery occasion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OccasionKind {
    /// A prayer-time alert.
    Alert,
    /// A content message inside a time window.
    Content,
}

impl OccasionKind {
    /// Stable string form used in the delivery ledger.
    pub fn as_str(&self) -> &'static str {
        match self {
            OccasionKind::Alert => "alert",
            OccasionKind::Content => "content",
        }
    }
}

/// Final state of a claimed occasion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Transport accepted the message.
    Delivered,
    /// Send was attempted and gave up, or the job was abandoned.
    Failed,
    /// Claimed but intentionally not sent (no eligible content).
    Skipped,
}

impl DeliveryOutcome {
    /// Stable string form used in the delivery ledger.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryOutcome::Delivered => "delivered",
            DeliveryOutcome::Failed => "failed",
            DeliveryOutcome::Skipped => "skipped",
        }
    }
}

/// One row of the delivery ledger.
///
/// The (group_id, kind, occasion_key) triple is unique; inserting it is the
/// claim that gates every send. `outcome` starts as `pending` and receives
/// exactly one update once the attempt finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DeliveryLedgerEntry {
    pub id: i64,
    pub group_id: String,
    /// Occasion kind, `alert` or `content`.
    pub kind: String,
    /// Prayer name + date for alerts, window name + date for content.
    pub occasion_key: String,
    /// Group-local date of the occasion.
    pub local_date: NaiveDate,
    /// Selected category, filled in for content occasions.
    pub category_id: Option<String>,
    /// `pending`, `delivered`, `failed`, or `skipped`.
    pub outcome: String,
    /// Claim time.
    pub created_at: DateTime<Utc>,
    /// When the final outcome was recorded.
    pub completed_at: Option<DateTime<Utc>>,
}

/// A cached content item, keyed by the upstream content id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ContentCacheEntry {
    /// Upstream content identifier.
    pub id: String,
    pub category_id: String,
    /// Content body text.
    pub body: String,
    /// Narrator/collection attribution line.
    pub attribution: String,
    /// Authenticity grade.
    pub grade: String,
    /// Link back to the upstream source.
    pub source_url: String,
    /// How many times this entry has been selected.
    pub usage_count: i64,
    /// Last selection time, if ever selected.
    pub last_used_at: Option<DateTime<Utc>>,
    /// When the entry was fetched (freshness marker).
    pub created_at: DateTime<Utc>,
}

/// Fields required to cache a fetched content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCacheEntry {
    pub id: String,
    pub category_id: String,
    pub body: String,
    pub attribution: String,
    pub grade: String,
    pub source_url: String,
}

/// A catalog category with its ingest-time window tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Category {
    /// Upstream category identifier.
    pub id: String,
    pub title: String,
    /// Time-window tag resolved from the title at sync time
    /// (`morning`, `midday`, `afternoon`, `evening`, or `general`).
    pub window_tag: String,
    pub active: bool,
}

/// Per-(group, category) selection weight.
///
/// Lower weight means recently served; selection probability recovers toward
/// neutral 1.0 as `updated_at` ages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CategoryAffinity {
    pub group_id: String,
    pub category_id: String,
    pub weight: f64,
    pub updated_at: DateTime<Utc>,
}
