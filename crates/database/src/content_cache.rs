//! Content cache storage with usage-based retention.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{ContentCacheEntry, NewCacheEntry};

/// Cache a batch of fetched content items.
///
/// Re-fetching an item refreshes its text and its freshness marker but keeps
/// the usage counter and last-used time, so rotation history survives.
pub async fn store_items(
    pool: &SqlitePool,
    items: &[NewCacheEntry],
    now: DateTime<Utc>,
) -> Result<()> {
    for item in items {
        sqlx::query(
            r#"
            INSERT INTO content_cache
                (id, category_id, body, attribution, grade, source_url, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                category_id = excluded.category_id,
                body = excluded.body,
                attribution = excluded.attribution,
                grade = excluded.grade,
                source_url = excluded.source_url,
                created_at = excluded.created_at
            "#,
        )
        .bind(&item.id)
        .bind(&item.category_id)
        .bind(&item.body)
        .bind(&item.attribution)
        .bind(&item.grade)
        .bind(&item.source_url)
        .bind(now)
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Pick the next cache entry for a category among entries fetched at or
/// after `fresh_cutoff`.
///
/// Lowest usage count wins; ties go to the least recently used, with
/// never-used entries first (NULL sorts first in ascending order).
pub async fn least_used_fresh(
    pool: &SqlitePool,
    category_id: &str,
    fresh_cutoff: DateTime<Utc>,
) -> Result<Option<ContentCacheEntry>> {
    let entry = sqlx::query_as::<_, ContentCacheEntry>(
        r#"
        SELECT id, category_id, body, attribution, grade, source_url,
               usage_count, last_used_at, created_at
        FROM content_cache
        WHERE category_id = ? AND created_at >= ?
        ORDER BY usage_count ASC, last_used_at ASC
        LIMIT 1
        "#,
    )
    .bind(category_id)
    .bind(fresh_cutoff)
    .fetch_optional(pool)
    .await?;

    Ok(entry)
}

/// Pick the next cache entry for a category regardless of freshness.
///
/// Fallback path when the content gateway is down.
pub async fn any_cached(pool: &SqlitePool, category_id: &str) -> Result<Option<ContentCacheEntry>> {
    let entry = sqlx::query_as::<_, ContentCacheEntry>(
        r#"
        SELECT id, category_id, body, attribution, grade, source_url,
               usage_count, last_used_at, created_at
        FROM content_cache
        WHERE category_id = ?
        ORDER BY usage_count ASC, last_used_at ASC
        LIMIT 1
        "#,
    )
    .bind(category_id)
    .fetch_optional(pool)
    .await?;

    Ok(entry)
}

/// Bump an entry's usage counter and refresh its last-used time.
pub async fn touch_usage(pool: &SqlitePool, id: &str, now: DateTime<Utc>) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE content_cache
        SET usage_count = usage_count + 1, last_used_at = ?
        WHERE id = ?
        "#,
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "ContentCacheEntry",
            id: id.to_string(),
        });
    }

    Ok(())
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

    fn item(id: &str, category_id: &str) -> NewCacheEntry {
        NewCacheEntry {
            id: id.to_string(),
            category_id: category_id.to_string(),
            body: format!("body of {}", id),
            attribution: "Narrated by Abu Hurairah".to_string(),
            grade: "Sahih".to_string(),
            source_url: format!("https://example.org/{}", id),
        }
    }

    fn at_noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 16, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_least_used_then_lru_ordering() {
        let db = test_db().await;
        let now = at_noon();
        store_items(db.pool(), &[item("h1", "c1"), item("h2", "c1"), item("h3", "c1")], now)
            .await
            .unwrap();

        // h1 used twice, h2 used once (earlier), h3 never used
        touch_usage(db.pool(), "h1", now).await.unwrap();
        touch_usage(db.pool(), "h1", now + Duration::minutes(5)).await.unwrap();
        touch_usage(db.pool(), "h2", now + Duration::minutes(1)).await.unwrap();

        let picked = least_used_fresh(db.pool(), "c1", now - Duration::hours(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(picked.id, "h3");

        // With h3 used most recently, the lowest-count tie goes to h2
        touch_usage(db.pool(), "h3", now + Duration::minutes(10)).await.unwrap();
        touch_usage(db.pool(), "h3", now + Duration::minutes(11)).await.unwrap();
        let picked = least_used_fresh(db.pool(), "c1", now - Duration::hours(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(picked.id, "h2");
    }

    #[tokio::test]
    async fn test_freshness_cutoff_and_fallback() {
        let db = test_db().await;
        let fetched_at = at_noon() - Duration::days(10);
        store_items(db.pool(), &[item("h1", "c1")], fetched_at).await.unwrap();

        // Too old for the fresh query
        let fresh = least_used_fresh(db.pool(), "c1", at_noon() - Duration::days(7))
            .await
            .unwrap();
        assert!(fresh.is_none());

        // Still reachable through the fallback
        let fallback = any_cached(db.pool(), "c1").await.unwrap().unwrap();
        assert_eq!(fallback.id, "h1");

        // Unknown category has neither
        assert!(any_cached(db.pool(), "c9").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_refetch_keeps_usage() {
        let db = test_db().await;
        let now = at_noon();
        store_items(db.pool(), &[item("h1", "c1")], now).await.unwrap();
        touch_usage(db.pool(), "h1", now).await.unwrap();

        let mut updated = item("h1", "c1");
        updated.body = "revised body".to_string();
        store_items(db.pool(), &[updated], now + Duration::days(1)).await.unwrap();

        let entry = any_cached(db.pool(), "c1").await.unwrap().unwrap();
        assert_eq!(entry.body, "revised body");
        assert_eq!(entry.usage_count, 1);
        assert_eq!(entry.created_at, now + Duration::days(1));

        assert!(matches!(
            touch_usage(db.pool(), "missing", now).await,
            Err(DatabaseError::NotFound { .. })
        ));
    }
}
