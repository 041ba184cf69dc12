//! Per-group category affinity weights.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::models::CategoryAffinity;
use crate::Result;

/// All stored weights for a group.
///
/// Categories with no row are at neutral weight; the selection engine treats
/// absence as 1.0.
pub async fn weights_for_group(pool: &SqlitePool, group_id: &str) -> Result<Vec<CategoryAffinity>> {
    let weights = sqlx::query_as::<_, CategoryAffinity>(
        r#"
        SELECT group_id, category_id, weight, updated_at
        FROM category_affinity
        WHERE group_id = ?
        "#,
    )
    .bind(group_id)
    .fetch_all(pool)
    .await?;

    Ok(weights)
}

/// Get one (group, category) weight, if a selection ever recorded it.
pub async fn get_affinity(
    pool: &SqlitePool,
    group_id: &str,
    category_id: &str,
) -> Result<Option<CategoryAffinity>> {
    let affinity = sqlx::query_as::<_, CategoryAffinity>(
        r#"
        SELECT group_id, category_id, weight, updated_at
        FROM category_affinity
        WHERE group_id = ? AND category_id = ?
        "#,
    )
    .bind(group_id)
    .bind(category_id)
    .fetch_optional(pool)
    .await?;

    Ok(affinity)
}

/// Store the post-selection weight for a (group, category).
///
/// The decay policy lives in the selection engine; this just persists the
/// computed weight and stamps the selection time.
pub async fn set_weight(
    pool: &SqlitePool,
    group_id: &str,
    category_id: &str,
    weight: f64,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO category_affinity (group_id, category_id, weight, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(group_id, category_id) DO UPDATE SET
            weight = excluded.weight,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(group_id)
    .bind(category_id)
    .bind(weight)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use chrono::TimeZone;

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_set_and_read_weights() {
        let db = test_db().await;
        let now = Utc.with_ymd_and_hms(2026, 1, 16, 7, 0, 0).unwrap();

        assert!(get_affinity(db.pool(), "g1", "c1").await.unwrap().is_none());

        set_weight(db.pool(), "g1", "c1", 0.5, now).await.unwrap();
        set_weight(db.pool(), "g1", "c2", 0.25, now).await.unwrap();
        set_weight(db.pool(), "g2", "c1", 0.05, now).await.unwrap();

        let weights = weights_for_group(db.pool(), "g1").await.unwrap();
        assert_eq!(weights.len(), 2);

        // Upsert overwrites
        set_weight(db.pool(), "g1", "c1", 0.25, now).await.unwrap();
        let affinity = get_affinity(db.pool(), "g1", "c1").await.unwrap().unwrap();
        assert_eq!(affinity.weight, 0.25);
        assert_eq!(affinity.updated_at, now);
    }
}
