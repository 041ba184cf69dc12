//! Group CRUD and settings operations.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{Group, NewGroup};
use crate::validation;

/// Register a new group with default flags (active, notifications on).
pub async fn create_group(pool: &SqlitePool, group: &NewGroup) -> Result<()> {
    validation::validate_place("city", &group.city)?;
    validation::validate_place("country", &group.country)?;
    validation::validate_timezone(&group.timezone)?;
    validation::validate_method(group.method)?;

    sqlx::query(
        r#"
        INSERT INTO groups (id, city, country, timezone, method)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&group.id)
    .bind(group.city.trim())
    .bind(group.country.trim())
    .bind(group.timezone.trim())
    .bind(group.method)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return DatabaseError::AlreadyExists {
                    entity: "Group",
                    id: group.id.clone(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    Ok(())
}

/// Get a group by id.
pub async fn get_group(pool: &SqlitePool, id: &str) -> Result<Group> {
    sqlx::query_as::<_, Group>(
        r#"
        SELECT id, city, country, timezone, method, active,
               notifications_enabled, created_at, updated_at
        FROM groups
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Group",
        id: id.to_string(),
    })
}

/// List all groups.
pub async fn list_groups(pool: &SqlitePool) -> Result<Vec<Group>> {
    let groups = sqlx::query_as::<_, Group>(
        r#"
        SELECT id, city, country, timezone, method, active,
               notifications_enabled, created_at, updated_at
        FROM groups
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(groups)
}

/// List groups that should be scheduled. Muted groups are included; the
/// notification flag is checked at fire time, so unmuting restores
/// delivery without waiting for the next rebuild.
pub async fn list_active_groups(pool: &SqlitePool) -> Result<Vec<Group>> {
    let groups = sqlx::query_as::<_, Group>(
        r#"
        SELECT id, city, country, timezone, method, active,
               notifications_enabled, created_at, updated_at
        FROM groups
        WHERE active = 1
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(groups)
}

/// Update a group's location.
pub async fn update_location(
    pool: &SqlitePool,
    id: &str,
    city: &str,
    country: &str,
) -> Result<()> {
    validation::validate_place("city", city)?;
    validation::validate_place("country", country)?;

    let result = sqlx::query(
        r#"
        UPDATE groups
        SET city = ?, country = ?, updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(city.trim())
    .bind(country.trim())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Group",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Update a group's timezone.
pub async fn update_timezone(pool: &SqlitePool, id: &str, timezone: &str) -> Result<()> {
    validation::validate_timezone(timezone)?;

    let result = sqlx::query(
        r#"
        UPDATE groups
        SET timezone = ?, updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(timezone.trim())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Group",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Update a group's calculation method.
pub async fn update_method(pool: &SqlitePool, id: &str, method: i64) -> Result<()> {
    validation::validate_method(method)?;

    let result = sqlx::query(
        r#"
        UPDATE groups
        SET method = ?, updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(method)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Group",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Set the active flag. Used to soft-disable a group when the transport
/// reports it unreachable; the row is kept for audit and re-enable.
pub async fn set_active(pool: &SqlitePool, id: &str, active: bool) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE groups
        SET active = ?, updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(active)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Group",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Switch notifications on or off for a group.
pub async fn set_notifications_enabled(pool: &SqlitePool, id: &str, enabled: bool) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE groups
        SET notifications_enabled = ?, updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(enabled)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Group",
            id: id.to_string(),
        });
    }

    Ok(())
}
