//! Content gateway backed by the HadeethEnc API.

use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::GatewayError;
use crate::retry::{with_retries, RetryPolicy};

/// A content item ready for caching and delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    /// Upstream content identifier.
    pub id: String,
    pub category_id: String,
    /// Content body text.
    pub body: String,
    /// Narrator/collection attribution line. Empty when the source omits it.
    pub attribution: String,
    /// Authenticity grade. Empty when the source omits it.
    pub grade: String,
    /// Link back to the upstream source page.
    pub source_url: String,
}

/// A catalog category as listed by the content source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySummary {
    pub id: String,
    pub title: String,
}

/// Trait for fetching content items and the category catalog.
///
/// Abstracted so tests can substitute a static source.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch a batch of items from one category.
    ///
    /// Returns the items whose details could be loaded; an empty vec means
    /// the category had nothing to offer, not a failure.
    async fn fetch_by_category(&self, category_id: &str) -> Result<Vec<ContentItem>, GatewayError>;

    /// List the full category catalog.
    async fn list_categories(&self) -> Result<Vec<CategorySummary>, GatewayError>;
}

/// Configuration for the HadeethEnc client.
#[derive(Debug, Clone)]
pub struct HadeethConfig {
    /// API base URL (e.g., "https://hadeethenc.com/api/v1").
    pub base_url: String,
    /// Public site URL used to build source links.
    pub site_url: String,
    /// Two-letter content language code.
    pub language: String,
    /// Page size for list requests.
    pub per_page: i64,
    /// Upper bound for the randomly picked list page.
    pub max_random_page: i64,
    /// How many listed items to load details for per fetch.
    pub details_per_fetch: usize,
    /// Per-request timeout.
    pub timeout: std::time::Duration,
}

impl Default for HadeethConfig {
    fn default() -> Self {
        Self {
            base_url: "https://hadeethenc.com/api/v1".to_string(),
            site_url: "https://hadeethenc.com".to_string(),
            language: "ar".to_string(),
            per_page: 20,
            max_random_page: 5,
            details_per_fetch: 10,
            timeout: std::time::Duration::from_secs(10),
        }
    }
}

impl HadeethConfig {
    /// Get the paginated list endpoint URL for a category.
    pub fn list_url(&self, category_id: &str, page: i64) -> String {
        format!(
            "{}/hadeeths/list/?language={}&category_id={}&page={}&per_page={}",
            self.base_url,
            self.language,
            urlencoding::encode(category_id),
            page,
            self.per_page
        )
    }

    /// Get the single-item details endpoint URL.
    pub fn details_url(&self, id: &str) -> String {
        format!(
            "{}/hadeeths/one/?language={}&id={}",
            self.base_url,
            self.language,
            urlencoding::encode(id)
        )
    }

    /// Get the category catalog endpoint URL.
    pub fn categories_url(&self) -> String {
        format!("{}/categories/list/?language={}", self.base_url, self.language)
    }

    /// Get the public browse URL for an item, used as its source link.
    pub fn browse_url(&self, id: &str) -> String {
        format!(
            "{}/{}/browse/hadith/{}",
            self.site_url,
            self.language,
            urlencoding::encode(id)
        )
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    data: Vec<ListedItem>,
}

#[derive(Debug, Deserialize)]
struct ListedItem {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ItemDetails {
    id: String,
    hadeeth: String,
    #[serde(default)]
    attribution: Option<String>,
    #[serde(default)]
    grade: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListedCategory {
    id: String,
    title: String,
}

/// Pick a list page in `1..=max_random_page`.
fn pick_page(max_random_page: i64) -> i64 {
    rand::thread_rng().gen_range(1..=max_random_page.max(1))
}

/// Content client for the HadeethEnc API.
pub struct HadeethClient {
    http: reqwest::Client,
    config: HadeethConfig,
    retry: RetryPolicy,
}

impl HadeethClient {
    /// Create a client with the default retry policy.
    pub fn new(config: HadeethConfig) -> Self {
        Self::with_retry(config, RetryPolicy::default())
    }

    /// Create a client with a custom retry policy.
    pub fn with_retry(config: HadeethConfig, retry: RetryPolicy) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("MinaretBot/1.0")
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { http, config, retry }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, GatewayError> {
        let response = self.http.get(url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound(format!("no resource at {}", url)));
        }
        if response.status().is_client_error() {
            return Err(GatewayError::InvalidInput(format!(
                "content request rejected: {}",
                response.status()
            )));
        }
        if !response.status().is_success() {
            return Err(GatewayError::Transient(format!(
                "content source returned {}",
                response.status()
            )));
        }

        Ok(response.json().await?)
    }

    /// List item ids on one page of a category.
    async fn list_page(&self, category_id: &str, page: i64) -> Result<Vec<String>, GatewayError> {
        let url = self.config.list_url(category_id, page);
        debug!("Listing content from: {}", url);

        let body: ListResponse = with_retries(&self.retry, "content list", || {
            self.get_json(&url)
        })
        .await?;

        Ok(body.data.into_iter().map(|item| item.id).collect())
    }

    /// Load full details for one item.
    async fn item_details(&self, id: &str) -> Result<ItemDetails, GatewayError> {
        let url = self.config.details_url(id);

        with_retries(&self.retry, "content details", || self.get_json(&url)).await
    }
}

#[async_trait]
impl ContentSource for HadeethClient {
    async fn fetch_by_category(&self, category_id: &str) -> Result<Vec<ContentItem>, GatewayError> {
        // Random page keeps repeat fetches from always returning the same
        // head of the category. Out-of-range pages come back empty, so fall
        // back to the first page before concluding the category is empty.
        let page = pick_page(self.config.max_random_page);
        let mut ids = self.list_page(category_id, page).await?;
        if ids.is_empty() && page != 1 {
            ids = self.list_page(category_id, 1).await?;
        }
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut items = Vec::new();
        for id in ids.iter().take(self.config.details_per_fetch) {
            match self.item_details(id).await {
                Ok(details) => {
                    let source_url = self.config.browse_url(&details.id);
                    items.push(ContentItem {
                        id: details.id,
                        category_id: category_id.to_string(),
                        body: details.hadeeth,
                        attribution: details.attribution.unwrap_or_default(),
                        grade: details.grade.unwrap_or_default(),
                        source_url,
                    });
                }
                Err(e) => {
                    warn!("Skipping content item {}: {}", id, e);
                }
            }
        }

        // Every detail lookup failing on a non-empty listing means the
        // source is unhealthy rather than the category being empty.
        if items.is_empty() {
            return Err(GatewayError::Transient(format!(
                "no item details could be loaded for category {}",
                category_id
            )));
        }

        Ok(items)
    }

    async fn list_categories(&self) -> Result<Vec<CategorySummary>, GatewayError> {
        let url = self.config.categories_url();
        debug!("Listing categories from: {}", url);

        let listed: Vec<ListedCategory> = with_retries(&self.retry, "category list", || {
            self.get_json(&url)
        })
        .await?;

        Ok(listed
            .into_iter()
            .map(|c| CategorySummary {
                id: c.id,
                title: c.title,
            })
            .collect())
    }
}
