//! SQLite persistence layer for Minaret.
//!
//! This crate provides async database operations for recipient groups, daily
//! prayer schedules, the delivery ledger, and the content cache using SQLx
//! with SQLite.
//!
//! # Example
//!
//! ```no_run
//! use database::{group, models::NewGroup, Database};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:minaret.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     // Register a group
//!     let group = NewGroup {
//!         id: "-1001234567890".to_string(),
//!         city: "Cairo".to_string(),
//!         country: "Egypt".to_string(),
//!         timezone: "Africa/Cairo".to_string(),
//!         method: 5,
//!     };
//!     group::create_group(db.pool(), &group).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod affinity;
pub mod category;
pub mod content_cache;
pub mod error;
pub mod group;
pub mod ledger;
pub mod models;
pub mod schedule;
pub mod validation;

pub use error::{DatabaseError, Result};
pub use ledger::ClaimOutcome;
pub use models::{
    Category, CategoryAffinity, ContentCacheEntry, DailyPrayerSchedule, DeliveryLedgerEntry,
    DeliveryOutcome, Group, NewCacheEntry, NewDailySchedule, NewGroup, OccasionKind,
};
pub use validation::ValidationError;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    /// Set high enough to handle many delivery jobs firing at the same instant.
    const DEFAULT_POOL_SIZE: u32 = 20;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `?mode=rwc` to create the database file if it doesn't exist.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example() -> database::Result<()> {
    /// // File database
    /// let db = database::Database::connect("sqlite:data/minaret.db?mode=rwc").await?;
    ///
    /// // In-memory database (for testing)
    /// let db = database::Database::connect("sqlite::memory:").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    ///
    /// The database runs in WAL journal mode so delivery jobs can keep
    /// reading while the scheduler writes a rebuilt day.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!(
            "Connected to database: {} (pool size: {})",
            url,
            pool_size
        );

        Ok(Self { pool })
    }

    /// Run database migrations.
    ///
    /// This should be called once after connecting to ensure the schema is up to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_group_crud() {
        let db = test_db().await;

        // Create
        let new_group = NewGroup {
            id: "-100200300".to_string(),
            city: "Cairo".to_string(),
            country: "Egypt".to_string(),
            timezone: "Africa/Cairo".to_string(),
            method: 5,
        };
        group::create_group(db.pool(), &new_group).await.unwrap();

        // Read
        let fetched = group::get_group(db.pool(), &new_group.id).await.unwrap();
        assert_eq!(fetched.city, "Cairo");
        assert!(fetched.active);
        assert!(fetched.notifications_enabled);

        // Update settings
        group::update_location(db.pool(), &new_group.id, "Alexandria", "Egypt")
            .await
            .unwrap();
        let fetched = group::get_group(db.pool(), &new_group.id).await.unwrap();
        assert_eq!(fetched.city, "Alexandria");

        // Soft-disable
        group::set_active(db.pool(), &new_group.id, false).await.unwrap();
        let fetched = group::get_group(db.pool(), &new_group.id).await.unwrap();
        assert!(!fetched.active);
        assert!(group::list_active_groups(db.pool()).await.unwrap().is_empty());

        // Duplicate create is rejected
        let result = group::create_group(db.pool(), &new_group).await;
        assert!(matches!(result, Err(DatabaseError::AlreadyExists { .. })));
    }
}
