//! Delivery ledger: the dedup log that gates every send.
//!
//! A delivery occasion is claimed by inserting its (group, kind, key) row;
//! the UNIQUE constraint makes the insert atomic, so exactly one of any
//! number of concurrent claimants wins. Never check-then-insert here.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{DeliveryLedgerEntry, DeliveryOutcome, OccasionKind};

/// Result of a claim attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// This caller owns the occasion and may send.
    Claimed,
    /// Someone already claimed it; the caller must not send.
    AlreadyClaimed,
}

/// Atomically claim a delivery occasion.
///
/// Inserts the ledger row with outcome `pending`. Must be called before any
/// externally visible side effect; a claim that comes back `AlreadyClaimed`
/// means a duplicate timer, a process-restart replay, or a racing reschedule
/// got there first, and the send must be skipped entirely.
pub async fn try_claim(
    pool: &SqlitePool,
    group_id: &str,
    kind: OccasionKind,
    occasion_key: &str,
    local_date: NaiveDate,
    now: DateTime<Utc>,
) -> Result<ClaimOutcome> {
    let result = sqlx::query(
        r#"
        INSERT INTO delivery_log (group_id, kind, occasion_key, local_date, outcome, created_at)
        VALUES (?, ?, ?, ?, 'pending', ?)
        "#,
    )
    .bind(group_id)
    .bind(kind.as_str())
    .bind(occasion_key)
    .bind(local_date)
    .bind(now)
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(ClaimOutcome::Claimed),
        Err(e) => {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.is_unique_violation() {
                    return Ok(ClaimOutcome::AlreadyClaimed);
                }
            }
            Err(DatabaseError::Sqlx(e))
        }
    }
}

/// Record the final outcome on a claimed occasion.
///
/// The claim's key fields are never touched; this is the single permitted
/// update per row.
pub async fn record_outcome(
    pool: &SqlitePool,
    group_id: &str,
    kind: OccasionKind,
    occasion_key: &str,
    outcome: DeliveryOutcome,
    category_id: Option<&str>,
    now: DateTime<Utc>,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE delivery_log
        SET outcome = ?, category_id = ?, completed_at = ?
        WHERE group_id = ? AND kind = ? AND occasion_key = ?
        "#,
    )
    .bind(outcome.as_str())
    .bind(category_id)
    .bind(now)
    .bind(group_id)
    .bind(kind.as_str())
    .bind(occasion_key)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "DeliveryLedgerEntry",
            id: format!("{}/{}/{}", group_id, kind.as_str(), occasion_key),
        });
    }

    Ok(())
}

/// Count occasions of a kind that consumed their slot on a group-local day.
///
/// `delivered` and `failed` both count (a failed send spent the occasion);
/// `pending` and `skipped` do not. Used to enforce the daily content quota.
pub async fn delivered_count_on(
    pool: &SqlitePool,
    group_id: &str,
    kind: OccasionKind,
    local_date: NaiveDate,
) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM delivery_log
        WHERE group_id = ? AND kind = ? AND local_date = ?
          AND outcome IN ('delivered', 'failed')
        "#,
    )
    .bind(group_id)
    .bind(kind.as_str())
    .bind(local_date)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// When a category was last delivered to a group, if ever.
pub async fn last_delivery_time(
    pool: &SqlitePool,
    group_id: &str,
    category_id: &str,
) -> Result<Option<DateTime<Utc>>> {
    let time = sqlx::query_scalar::<_, DateTime<Utc>>(
        r#"
        SELECT created_at
        FROM delivery_log
        WHERE group_id = ? AND category_id = ?
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(group_id)
    .bind(category_id)
    .fetch_optional(pool)
    .await?;

    Ok(time)
}

/// Categories delivered to a group since `cutoff`. Used for cooldown checks.
pub async fn categories_used_since(
    pool: &SqlitePool,
    group_id: &str,
    cutoff: DateTime<Utc>,
) -> Result<Vec<String>> {
    let categories = sqlx::query_scalar::<_, String>(
        r#"
        SELECT DISTINCT category_id
        FROM delivery_log
        WHERE group_id = ? AND category_id IS NOT NULL AND created_at >= ?
        "#,
    )
    .bind(group_id)
    .bind(cutoff)
    .fetch_all(pool)
    .await?;

    Ok(categories)
}

/// Get a ledger entry by its occasion triple.
pub async fn get_entry(
    pool: &SqlitePool,
    group_id: &str,
    kind: OccasionKind,
    occasion_key: &str,
) -> Result<DeliveryLedgerEntry> {
    sqlx::query_as::<_, DeliveryLedgerEntry>(
        r#"
        SELECT id, group_id, kind, occasion_key, local_date, category_id,
               outcome, created_at, completed_at
        FROM delivery_log
        WHERE group_id = ? AND kind = ? AND occasion_key = ?
        "#,
    )
    .bind(group_id)
    .bind(kind.as_str())
    .bind(occasion_key)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "DeliveryLedgerEntry",
        id: format!("{}/{}/{}", group_id, kind.as_str(), occasion_key),
    })
}

/// All ledger entries for a group, newest first.
pub async fn list_entries(pool: &SqlitePool, group_id: &str) -> Result<Vec<DeliveryLedgerEntry>> {
    let entries = sqlx::query_as::<_, DeliveryLedgerEntry>(
        r#"
        SELECT id, group_id, kind, occasion_key, local_date, category_id,
               outcome, created_at, completed_at
        FROM delivery_log
        WHERE group_id = ?
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(group_id)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use chrono::{Duration, TimeZone};

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 16).unwrap()
    }

    fn at(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 16, hour, min, 0).unwrap()
    }

    #[tokio::test]
    async fn test_claim_is_once_only() {
        let db = test_db().await;

        let first = try_claim(db.pool(), "g1", OccasionKind::Alert, "fajr-2026-01-16", day(), at(5, 10))
            .await
            .unwrap();
        assert_eq!(first, ClaimOutcome::Claimed);

        let second = try_claim(db.pool(), "g1", OccasionKind::Alert, "fajr-2026-01-16", day(), at(5, 11))
            .await
            .unwrap();
        assert_eq!(second, ClaimOutcome::AlreadyClaimed);

        // Different key, kind, or group claims independently
        let other_key = try_claim(db.pool(), "g1", OccasionKind::Alert, "dhuhr-2026-01-16", day(), at(12, 0))
            .await
            .unwrap();
        assert_eq!(other_key, ClaimOutcome::Claimed);

        let other_group = try_claim(db.pool(), "g2", OccasionKind::Alert, "fajr-2026-01-16", day(), at(5, 10))
            .await
            .unwrap();
        assert_eq!(other_group, ClaimOutcome::Claimed);

        let entry = get_entry(db.pool(), "g1", OccasionKind::Alert, "fajr-2026-01-16")
            .await
            .unwrap();
        assert_eq!(entry.outcome, "pending");
        assert_eq!(entry.local_date, day());
    }

    #[tokio::test]
    async fn test_record_outcome() {
        let db = test_db().await;

        try_claim(db.pool(), "g1", OccasionKind::Content, "morning-2026-01-16", day(), at(7, 0))
            .await
            .unwrap();
        record_outcome(
            db.pool(),
            "g1",
            OccasionKind::Content,
            "morning-2026-01-16",
            DeliveryOutcome::Delivered,
            Some("cat-7"),
            at(7, 0),
        )
        .await
        .unwrap();

        let entry = get_entry(db.pool(), "g1", OccasionKind::Content, "morning-2026-01-16")
            .await
            .unwrap();
        assert_eq!(entry.outcome, "delivered");
        assert_eq!(entry.category_id.as_deref(), Some("cat-7"));
        assert!(entry.completed_at.is_some());

        // Recording on an unclaimed occasion is an error
        let result = record_outcome(
            db.pool(),
            "g1",
            OccasionKind::Content,
            "evening-2026-01-16",
            DeliveryOutcome::Delivered,
            None,
            at(19, 0),
        )
        .await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_quota_counting_rules() {
        let db = test_db().await;

        // delivered and failed consume quota; skipped and pending do not
        for (key, outcome) in [
            ("morning-2026-01-16", Some(DeliveryOutcome::Delivered)),
            ("midday-2026-01-16", Some(DeliveryOutcome::Failed)),
            ("afternoon-2026-01-16", Some(DeliveryOutcome::Skipped)),
            ("evening-2026-01-16", None),
        ] {
            try_claim(db.pool(), "g1", OccasionKind::Content, key, day(), at(6, 0))
                .await
                .unwrap();
            if let Some(outcome) = outcome {
                record_outcome(db.pool(), "g1", OccasionKind::Content, key, outcome, None, at(6, 1))
                    .await
                    .unwrap();
            }
        }

        let count = delivered_count_on(db.pool(), "g1", OccasionKind::Content, day())
            .await
            .unwrap();
        assert_eq!(count, 2);

        // Alerts are counted separately
        let alerts = delivered_count_on(db.pool(), "g1", OccasionKind::Alert, day())
            .await
            .unwrap();
        assert_eq!(alerts, 0);
    }

    #[tokio::test]
    async fn test_cooldown_queries() {
        let db = test_db().await;

        for (key, category, claimed_at) in [
            ("morning-2026-01-16", "cat-1", at(7, 0)),
            ("midday-2026-01-16", "cat-2", at(12, 0)),
        ] {
            try_claim(db.pool(), "g1", OccasionKind::Content, key, day(), claimed_at)
                .await
                .unwrap();
            record_outcome(
                db.pool(),
                "g1",
                OccasionKind::Content,
                key,
                DeliveryOutcome::Delivered,
                Some(category),
                claimed_at,
            )
            .await
            .unwrap();
        }

        let last = last_delivery_time(db.pool(), "g1", "cat-1").await.unwrap();
        assert_eq!(last, Some(at(7, 0)));
        assert_eq!(last_delivery_time(db.pool(), "g1", "cat-9").await.unwrap(), None);

        // Only cat-2 falls inside a cutoff at 11:30
        let recent = categories_used_since(db.pool(), "g1", at(11, 30)).await.unwrap();
        assert_eq!(recent, vec!["cat-2".to_string()]);

        let all = categories_used_since(db.pool(), "g1", at(7, 0) - Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }
}
