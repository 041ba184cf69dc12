//! Timer computation, arming, and the daily rebuild loop.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use sqlx::SqlitePool;
use tracing::{debug, error, info, warn};

use database::models::{DailyPrayerSchedule, Group, NewDailySchedule};
use database::{group, schedule, DatabaseError};
use upstream::{PrayerQuery, PrayerTimesSource};

use crate::clock::Clock;
use crate::config::SchedulerConfig;
use crate::error::{Result, SchedulerError};
use crate::executor::Executor;
use crate::jobs::{JobRegistry, JobSpec, Occasion, Prayer};

/// Counts from one rebuild pass over all schedulable groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildSummary {
    pub groups_armed: usize,
    pub groups_failed: usize,
    pub timers_armed: usize,
}

/// Computes each group's remaining occasions for its local day and arms
/// one timer per occasion.
pub struct Scheduler {
    pool: SqlitePool,
    prayer_source: Arc<dyn PrayerTimesSource>,
    executor: Arc<Executor>,
    registry: Arc<JobRegistry>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
}

impl Scheduler {
    /// Create a scheduler sharing the executor's registry and clock.
    pub fn new(
        pool: SqlitePool,
        prayer_source: Arc<dyn PrayerTimesSource>,
        executor: Arc<Executor>,
        registry: Arc<JobRegistry>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Self {
        Self { pool, prayer_source, executor, registry, clock, config }
    }

    /// Rebuild timers for every schedulable group.
    ///
    /// A group that fails (bad timezone, gateway outage with no stored
    /// schedule) is logged and skipped; the rest of the fleet still gets
    /// its timers.
    pub async fn rebuild(&self) -> Result<RebuildSummary> {
        let as_of = self.clock.now_utc();
        let groups = group::list_active_groups(&self.pool).await?;
        info!("Rebuilding timers for {} groups", groups.len());

        let mut summary = RebuildSummary::default();
        for group in &groups {
            match self.compute_and_arm(group, as_of).await {
                Ok(count) => {
                    summary.groups_armed += 1;
                    summary.timers_armed += count;
                }
                Err(e) => {
                    warn!("Skipping group {} this cycle: {}", group.id, e);
                    summary.groups_failed += 1;
                }
            }
        }

        info!(
            "Rebuild complete: {} timers across {} groups, {} groups failed",
            summary.timers_armed, summary.groups_armed, summary.groups_failed
        );
        Ok(summary)
    }

    /// Arm the remainder of one group's local day: future prayer alerts plus
    /// one random minute inside each content window still ahead.
    pub async fn compute_and_arm(&self, group: &Group, as_of: DateTime<Utc>) -> Result<usize> {
        let tz: Tz = group
            .timezone
            .parse()
            .map_err(|_| SchedulerError::InvalidTimezone(group.timezone.clone()))?;
        let today = as_of.with_timezone(&tz).date_naive();

        let stored = match schedule::get_schedule(&self.pool, &group.id, today).await? {
            Some(stored) => stored,
            None => self.fetch_and_store(group, today).await?,
        };

        // Old timers are dropped only once today's schedule is in hand, so a
        // gateway outage leaves whatever is already armed running.
        self.registry.cancel_group(&group.id).await;

        let mut armed = 0;

        for prayer in Prayer::ALL {
            let time = prayer.time_in(&stored);
            let Some(fire_at) = to_utc_instant(tz, today, time) else {
                warn!(
                    "{} at {} falls in a DST gap for group {}, skipping",
                    prayer.as_str(),
                    time,
                    group.id
                );
                continue;
            };
            if fire_at <= as_of {
                debug!("{} already passed for group {}", prayer.as_str(), group.id);
                continue;
            }
            self.arm(JobSpec {
                group_id: group.id.clone(),
                occasion: Occasion::Alert(prayer),
                local_date: today,
                fire_at,
            })
            .await;
            armed += 1;
        }

        for window in &self.config.windows {
            if window.end_minute <= window.start_minute {
                warn!("Window {} has empty bounds, skipping", window.name.as_str());
                continue;
            }
            let minute = {
                let mut rng = SmallRng::from_entropy();
                rng.gen_range(window.start_minute..window.end_minute)
            };
            let Some(time) = NaiveTime::from_hms_opt(minute / 60, minute % 60, 0) else {
                warn!(
                    "Window {} drew out-of-range minute {}, skipping",
                    window.name.as_str(),
                    minute
                );
                continue;
            };
            let Some(fire_at) = to_utc_instant(tz, today, time) else {
                warn!(
                    "Window {} at {} falls in a DST gap for group {}, skipping",
                    window.name.as_str(),
                    time,
                    group.id
                );
                continue;
            };
            if fire_at <= as_of {
                debug!(
                    "Window {} already passed for group {}",
                    window.name.as_str(),
                    group.id
                );
                continue;
            }
            self.arm(JobSpec {
                group_id: group.id.clone(),
                occasion: Occasion::Content(window.name),
                local_date: today,
                fire_at,
            })
            .await;
            armed += 1;
        }

        debug!("Armed {} timers for group {} on {}", armed, group.id, today);
        Ok(armed)
    }

    /// Re-fetch and re-arm one group after its settings changed.
    ///
    /// The stored schedule is refreshed unconditionally because a location or
    /// method change invalidates it. An inactive group just loses its timers.
    pub async fn reschedule(&self, group_id: &str) -> Result<usize> {
        let group = group::get_group(&self.pool, group_id).await?;
        if !group.active {
            let cancelled = self.registry.cancel_group(group_id).await;
            info!("Group {} is inactive, cancelled {} timers", group_id, cancelled);
            return Ok(0);
        }

        let as_of = self.clock.now_utc();
        let tz: Tz = group
            .timezone
            .parse()
            .map_err(|_| SchedulerError::InvalidTimezone(group.timezone.clone()))?;
        let today = as_of.with_timezone(&tz).date_naive();

        self.fetch_and_store(&group, today).await?;
        self.compute_and_arm(&group, as_of).await
    }

    /// Sleep until each next UTC midnight, then rebuild. Runs until the
    /// process exits.
    pub async fn run_daily(&self) {
        loop {
            let now = self.clock.now_utc();
            let next = next_utc_midnight(now);
            let delay = (next - now).to_std().unwrap_or(StdDuration::ZERO);
            info!("Next full rebuild at {}", next);
            tokio::time::sleep(delay).await;

            if let Err(e) = self.rebuild().await {
                error!("Daily rebuild failed: {}", e);
            }
        }
    }

    async fn fetch_and_store(&self, group: &Group, date: NaiveDate) -> Result<DailyPrayerSchedule> {
        let query = PrayerQuery {
            city: group.city.clone(),
            country: group.country.clone(),
            method: group.method,
        };
        let times = self.prayer_source.daily_times(&query, date).await?;

        schedule::upsert_schedule(
            &self.pool,
            &NewDailySchedule {
                group_id: group.id.clone(),
                date,
                fajr: times.fajr,
                dhuhr: times.dhuhr,
                asr: times.asr,
                maghrib: times.maghrib,
                isha: times.isha,
                hijri_date: times.hijri_date,
            },
        )
        .await?;

        let stored = schedule::get_schedule(&self.pool, &group.id, date)
            .await?
            .ok_or_else(|| DatabaseError::NotFound {
                entity: "DailyPrayerSchedule",
                id: format!("{}/{}", group.id, date),
            })?;
        Ok(stored)
    }

    /// Spawn the sleep-then-execute task for one occasion and register it.
    async fn arm(&self, spec: JobSpec) {
        let delay = (spec.fire_at - self.clock.now_utc())
            .to_std()
            .unwrap_or(StdDuration::ZERO);
        let key = spec.key();
        let registry_key = key.clone();
        let executor = self.executor.clone();
        let registry = self.registry.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let occasion_key = spec.occasion.occasion_key(spec.local_date);
            match executor.execute(&spec).await {
                Ok(outcome) => debug!("Job {} finished: {:?}", occasion_key, outcome),
                Err(e) => error!("Job {} errored: {}", occasion_key, e),
            }
            registry.remove(&registry_key).await;
        });

        self.registry.insert(key, handle).await;
    }
}

fn next_utc_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    (now + Duration::days(1))
        .date_naive()
        .and_time(NaiveTime::MIN)
        .and_utc()
}

/// Resolve a group-local wall time to a UTC instant.
///
/// `None` when the time falls into a spring-forward gap; ambiguous
/// fall-back times resolve to the earlier of the two instants.
fn to_utc_instant(tz: Tz, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&date.and_time(time)) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earlier, _) => Some(earlier.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}
