//! Category catalog storage.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::Category;

/// Insert or update a catalog category.
///
/// Sync runs repeatedly; the active flag is left alone on update so a
/// manually disabled category stays disabled.
pub async fn upsert_category(
    pool: &SqlitePool,
    id: &str,
    title: &str,
    window_tag: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO categories (id, title, window_tag)
        VALUES (?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            window_tag = excluded.window_tag
        "#,
    )
    .bind(id)
    .bind(title)
    .bind(window_tag)
    .execute(pool)
    .await?;

    Ok(())
}

/// Active categories eligible for a window: the window's own tag plus
/// `general`.
pub async fn categories_for_window(pool: &SqlitePool, window_tag: &str) -> Result<Vec<Category>> {
    let categories = sqlx::query_as::<_, Category>(
        r#"
        SELECT id, title, window_tag, active
        FROM categories
        WHERE active = 1 AND (window_tag = ? OR window_tag = 'general')
        ORDER BY id
        "#,
    )
    .bind(window_tag)
    .fetch_all(pool)
    .await?;

    Ok(categories)
}

/// List the whole catalog.
pub async fn list_categories(pool: &SqlitePool) -> Result<Vec<Category>> {
    let categories = sqlx::query_as::<_, Category>(
        r#"
        SELECT id, title, window_tag, active
        FROM categories
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(categories)
}

/// Enable or disable a category.
pub async fn set_category_active(pool: &SqlitePool, id: &str, active: bool) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE categories
        SET active = ?
        WHERE id = ?
        "#,
    )
    .bind(active)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Category",
            id: id.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_window_eligibility() {
        let db = test_db().await;
        upsert_category(db.pool(), "c1", "Morning remembrance", "morning").await.unwrap();
        upsert_category(db.pool(), "c2", "Night prayers", "evening").await.unwrap();
        upsert_category(db.pool(), "c3", "Good character", "general").await.unwrap();

        let morning = categories_for_window(db.pool(), "morning").await.unwrap();
        let ids: Vec<&str> = morning.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c3"]);

        // Disabled categories drop out
        set_category_active(db.pool(), "c3", false).await.unwrap();
        let morning = categories_for_window(db.pool(), "morning").await.unwrap();
        assert_eq!(morning.len(), 1);
        assert_eq!(morning[0].id, "c1");
    }

    #[tokio::test]
    async fn test_sync_preserves_active_flag() {
        let db = test_db().await;
        upsert_category(db.pool(), "c1", "Misc", "general").await.unwrap();
        set_category_active(db.pool(), "c1", false).await.unwrap();

        // Re-sync with a corrected tag
        upsert_category(db.pool(), "c1", "Evening remembrance", "evening").await.unwrap();

        let all = list_categories(db.pool()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].window_tag, "evening");
        assert!(!all[0].active);
    }
}
