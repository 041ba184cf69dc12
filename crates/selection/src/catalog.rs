//! Category catalog sync.

use sqlx::SqlitePool;
use tracing::{debug, info};
use upstream::ContentSource;

use database::category;

use crate::error::Result;
use crate::tagging::tag_for_title;

/// Fetch the category catalog from the content source and upsert it into the
/// store, tagging each title with its delivery window.
///
/// Safe to run repeatedly; returns the number of categories synced.
pub async fn sync_categories(pool: &SqlitePool, source: &dyn ContentSource) -> Result<usize> {
    let listed = source.list_categories().await?;

    for summary in &listed {
        let tag = tag_for_title(&summary.title);
        debug!("Category {} ({}) tagged {}", summary.id, summary.title, tag);
        category::upsert_category(pool, &summary.id, &summary.title, tag).await?;
    }

    info!("Synced {} categories from content source", listed.len());
    Ok(listed.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::Database;
    use upstream::{CategorySummary, ContentItem, GatewayError};

    struct StaticCatalog {
        categories: Vec<CategorySummary>,
    }

    #[async_trait::async_trait]
    impl ContentSource for StaticCatalog {
        async fn fetch_by_category(
            &self,
            _category_id: &str,
        ) -> std::result::Result<Vec<ContentItem>, GatewayError> {
            Ok(Vec::new())
        }

        async fn list_categories(
            &self,
        ) -> std::result::Result<Vec<CategorySummary>, GatewayError> {
            Ok(self.categories.clone())
        }
    }

    fn summary(id: &str, title: &str) -> CategorySummary {
        CategorySummary {
            id: id.to_string(),
            title: title.to_string(),
        }
    }

    #[tokio::test]
    async fn test_sync_tags_and_upserts() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();

        let source = StaticCatalog {
            categories: vec![
                summary("1", "أذكار الصباح"),
                summary("2", "آداب النوم"),
                summary("3", "الفضائل والآداب"),
            ],
        };

        let synced = sync_categories(db.pool(), &source).await.unwrap();
        assert_eq!(synced, 3);

        let stored = category::list_categories(db.pool()).await.unwrap();
        let tags: Vec<(&str, &str)> = stored
            .iter()
            .map(|c| (c.id.as_str(), c.window_tag.as_str()))
            .collect();
        assert_eq!(
            tags,
            vec![("1", "morning"), ("2", "evening"), ("3", "general")]
        );

        // A second sync with a renamed title re-tags in place
        let source = StaticCatalog {
            categories: vec![summary("3", "أذكار المساء")],
        };
        sync_categories(db.pool(), &source).await.unwrap();

        let stored = category::list_categories(db.pool()).await.unwrap();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[2].window_tag, "evening");
    }
}
