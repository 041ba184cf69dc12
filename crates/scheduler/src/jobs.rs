//! Delivery occasions and the in-memory registry of armed timers.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use database::models::DailyPrayerSchedule;
use database::OccasionKind;
use selection::WindowName;

/// The five daily prayers, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prayer {
    Fajr,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl Prayer {
    /// All prayers in daily order.
    pub const ALL: [Prayer; 5] = [
        Prayer::Fajr,
        Prayer::Dhuhr,
        Prayer::Asr,
        Prayer::Maghrib,
        Prayer::Isha,
    ];

    /// Stable string form used in occasion keys and payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Prayer::Fajr => "fajr",
            Prayer::Dhuhr => "dhuhr",
            Prayer::Asr => "asr",
            Prayer::Maghrib => "maghrib",
            Prayer::Isha => "isha",
        }
    }

    /// This prayer's instant within a stored daily schedule.
    pub fn time_in(&self, schedule: &DailyPrayerSchedule) -> NaiveTime {
        match self {
            Prayer::Fajr => schedule.fajr,
            Prayer::Dhuhr => schedule.dhuhr,
            Prayer::Asr => schedule.asr,
            Prayer::Maghrib => schedule.maghrib,
            Prayer::Isha => schedule.isha,
        }
    }
}

/// What a job fires for: one prayer alert or one content window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Occasion {
    Alert(Prayer),
    Content(WindowName),
}

impl Occasion {
    /// The ledger kind this occasion claims under.
    pub fn kind(&self) -> OccasionKind {
        match self {
            Occasion::Alert(_) => OccasionKind::Alert,
            Occasion::Content(_) => OccasionKind::Content,
        }
    }

    /// Ledger occasion key for a group-local date, e.g. `fajr-2026-01-16`
    /// or `morning-2026-01-16`.
    pub fn occasion_key(&self, date: NaiveDate) -> String {
        match self {
            Occasion::Alert(prayer) => format!("{}-{}", prayer.as_str(), date),
            Occasion::Content(window) => window.occasion_key(date),
        }
    }
}

/// One armed delivery job.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub group_id: String,
    pub occasion: Occasion,
    /// Group-local date the occasion belongs to.
    pub local_date: NaiveDate,
    /// UTC instant the timer fires.
    pub fire_at: DateTime<Utc>,
}

impl JobSpec {
    /// Registry key for this job.
    pub fn key(&self) -> JobKey {
        JobKey {
            group_id: self.group_id.clone(),
            occasion: self.occasion,
            local_date: self.local_date,
        }
    }
}

/// Registry key: one timer per (group, occasion, local date).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobKey {
    pub group_id: String,
    pub occasion: Occasion,
    pub local_date: NaiveDate,
}

/// Armed timers, keyed by occasion.
///
/// Arming over an existing key aborts the old timer. Cancellation is
/// advisory only: a task that has already fired runs to completion, and the
/// ledger claim keeps the stale run harmless.
#[derive(Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<JobKey, JoinHandle<()>>>,
}

impl JobRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a timer, aborting any previous one for the same key.
    pub async fn insert(&self, key: JobKey, handle: JoinHandle<()>) {
        let mut jobs = self.jobs.lock().await;
        if let Some(old) = jobs.insert(key, handle) {
            old.abort();
        }
    }

    /// Drop a finished job's entry. Fired tasks call this on themselves.
    pub async fn remove(&self, key: &JobKey) {
        self.jobs.lock().await.remove(key);
    }

    /// Abort all armed timers for one group, returning how many there were.
    pub async fn cancel_group(&self, group_id: &str) -> usize {
        let mut jobs = self.jobs.lock().await;
        let keys: Vec<JobKey> = jobs
            .keys()
            .filter(|k| k.group_id == group_id)
            .cloned()
            .collect();
        for key in &keys {
            if let Some(handle) = jobs.remove(key) {
                handle.abort();
            }
        }
        keys.len()
    }

    /// Abort every armed timer. Used at shutdown.
    pub async fn cancel_all(&self) -> usize {
        let mut jobs = self.jobs.lock().await;
        let count = jobs.len();
        for (_, handle) in jobs.drain() {
            handle.abort();
        }
        count
    }

    /// Number of armed timers.
    pub async fn len(&self) -> usize {
        self.jobs.lock().await.len()
    }

    /// Whether no timers are armed.
    pub async fn is_empty(&self) -> bool {
        self.jobs.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(group_id: &str, occasion: Occasion) -> JobKey {
        JobKey {
            group_id: group_id.to_string(),
            occasion,
            local_date: NaiveDate::from_ymd_opt(2026, 1, 16).unwrap(),
        }
    }

    fn parked_task() -> JoinHandle<()> {
        tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        })
    }

    #[test]
    fn test_occasion_keys() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 16).unwrap();
        assert_eq!(
            Occasion::Alert(Prayer::Fajr).occasion_key(date),
            "fajr-2026-01-16"
        );
        assert_eq!(
            Occasion::Content(WindowName::Morning).occasion_key(date),
            "morning-2026-01-16"
        );
        assert_eq!(Occasion::Alert(Prayer::Fajr).kind(), OccasionKind::Alert);
        assert_eq!(
            Occasion::Content(WindowName::Evening).kind(),
            OccasionKind::Content
        );
    }

    #[tokio::test]
    async fn test_insert_replaces_existing_timer() {
        let registry = JobRegistry::new();
        let k = key("g1", Occasion::Alert(Prayer::Fajr));

        let first = parked_task();
        registry.insert(k.clone(), first).await;
        registry.insert(k.clone(), parked_task()).await;
        assert_eq!(registry.len().await, 1);

        registry.remove(&k).await;
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_cancel_group_only_touches_that_group() {
        let registry = JobRegistry::new();
        for prayer in Prayer::ALL {
            registry
                .insert(key("g1", Occasion::Alert(prayer)), parked_task())
                .await;
        }
        registry
            .insert(key("g2", Occasion::Alert(Prayer::Fajr)), parked_task())
            .await;

        assert_eq!(registry.cancel_group("g1").await, 5);
        assert_eq!(registry.len().await, 1);

        assert_eq!(registry.cancel_all().await, 1);
        assert!(registry.is_empty().await);
    }
}
