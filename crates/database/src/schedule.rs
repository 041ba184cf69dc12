//! Daily prayer schedule storage.

use chrono::NaiveDate;
use sqlx::SqlitePool;

use crate::models::{DailyPrayerSchedule, NewDailySchedule};
use crate::Result;

/// Store a day's prayer times for a group, replacing any previous row for
/// the same date.
///
/// The replace path only runs on a forced reschedule (settings change); the
/// normal rebuild reads the existing row and never calls this twice for one
/// (group, date).
pub async fn upsert_schedule(pool: &SqlitePool, schedule: &NewDailySchedule) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO prayer_schedules
            (group_id, date, fajr, dhuhr, asr, maghrib, isha, hijri_date)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(group_id, date) DO UPDATE SET
            fajr = excluded.fajr,
            dhuhr = excluded.dhuhr,
            asr = excluded.asr,
            maghrib = excluded.maghrib,
            isha = excluded.isha,
            hijri_date = excluded.hijri_date
        "#,
    )
    .bind(&schedule.group_id)
    .bind(schedule.date)
    .bind(schedule.fajr)
    .bind(schedule.dhuhr)
    .bind(schedule.asr)
    .bind(schedule.maghrib)
    .bind(schedule.isha)
    .bind(&schedule.hijri_date)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get the stored schedule for a (group, date), if one exists.
pub async fn get_schedule(
    pool: &SqlitePool,
    group_id: &str,
    date: NaiveDate,
) -> Result<Option<DailyPrayerSchedule>> {
    let schedule = sqlx::query_as::<_, DailyPrayerSchedule>(
        r#"
        SELECT id, group_id, date, fajr, dhuhr, asr, maghrib, isha, hijri_date
        FROM prayer_schedules
        WHERE group_id = ? AND date = ?
        "#,
    )
    .bind(group_id)
    .bind(date)
    .fetch_optional(pool)
    .await?;

    Ok(schedule)
}
