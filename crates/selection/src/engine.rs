//! Content selection: picks what to send for a group's time window.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rand::Rng;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use database::models::{CategoryAffinity, ContentCacheEntry, Group, NewCacheEntry, OccasionKind};
use database::{affinity, category, content_cache, ledger};
use upstream::ContentSource;

use crate::error::Result;
use crate::windows::WindowName;

/// Tunables for content selection.
#[derive(Debug, Clone)]
pub struct SelectionConfig {
    /// Minimum gap before a category may be reselected for the same group.
    pub cooldown: Duration,
    /// Maximum content deliveries per group per local calendar day.
    pub daily_quota: i64,
    /// Cache entries older than this are not served before consulting the
    /// content source again.
    pub cache_ttl: Duration,
    /// Multiplier applied to a category's weight when it is selected.
    pub affinity_decay: f64,
    /// Lowest weight a selection can leave behind.
    pub affinity_floor: f64,
    /// Time for a decayed weight to recover to neutral 1.0.
    pub affinity_recovery: Duration,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::minutes(60),
            daily_quota: 5,
            cache_ttl: Duration::days(7),
            affinity_decay: 0.5,
            affinity_floor: 0.05,
            affinity_recovery: Duration::hours(24),
        }
    }
}

impl SelectionConfig {
    /// Set the category cooldown.
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Set the daily content quota.
    pub fn with_daily_quota(mut self, quota: i64) -> Self {
        self.daily_quota = quota;
        self
    }
}

/// Content selection engine.
///
/// Stateless between calls; every decision input lives in the store, so
/// concurrent jobs and process restarts see the same history.
pub struct SelectionEngine {
    pool: SqlitePool,
    source: Arc<dyn ContentSource>,
    config: SelectionConfig,
}

impl SelectionEngine {
    /// Create an engine over a store pool and a content source.
    pub fn new(pool: SqlitePool, source: Arc<dyn ContentSource>, config: SelectionConfig) -> Self {
        Self { pool, source, config }
    }

    /// Pick a content item for one group and window.
    ///
    /// `Ok(None)` means nothing should be sent: quota reached, every eligible
    /// category cooling down, or no resolvable content. Callers record that
    /// as a skip, not a failure. Only store errors propagate.
    pub async fn select_for_window(
        &self,
        group: &Group,
        window: WindowName,
        now: DateTime<Utc>,
    ) -> Result<Option<ContentCacheEntry>> {
        let local_date = local_date_for(group, now);

        // Categories admitted by the window, minus those still cooling down.
        let eligible = category::categories_for_window(&self.pool, window.as_str()).await?;
        let cooling =
            ledger::categories_used_since(&self.pool, &group.id, now - self.config.cooldown)
                .await?;
        let candidates: Vec<_> = eligible
            .into_iter()
            .filter(|c| !cooling.contains(&c.id))
            .collect();

        if candidates.is_empty() {
            debug!(
                "No eligible categories for group {} in window {}",
                group.id,
                window.as_str()
            );
            return Ok(None);
        }

        let sent_today =
            ledger::delivered_count_on(&self.pool, &group.id, OccasionKind::Content, local_date)
                .await?;
        if sent_today >= self.config.daily_quota {
            debug!(
                "Group {} reached its daily content quota ({}/{})",
                group.id, sent_today, self.config.daily_quota
            );
            return Ok(None);
        }

        // Weight by affinity, recovered toward neutral since last use.
        // Categories never selected before sit at 1.0.
        let stored = affinity::weights_for_group(&self.pool, &group.id).await?;
        let weights: Vec<f64> = candidates
            .iter()
            .map(|c| {
                stored
                    .iter()
                    .find(|a| a.category_id == c.id)
                    .map(|a| effective_weight(a, now, &self.config))
                    .unwrap_or(1.0)
            })
            .collect();

        let picked = {
            let mut rng = SmallRng::from_entropy();
            &candidates[weighted_pick(&mut rng, &weights)]
        };

        let entry = match self.resolve_item(&picked.id, now).await? {
            Some(entry) => entry,
            None => {
                debug!("Category {} has no resolvable content", picked.id);
                return Ok(None);
            }
        };

        // Post-selection bookkeeping: spread future picks away from this
        // entry and this category.
        content_cache::touch_usage(&self.pool, &entry.id, now).await?;

        let current = stored
            .iter()
            .find(|a| a.category_id == picked.id)
            .map(|a| effective_weight(a, now, &self.config))
            .unwrap_or(1.0);
        let decayed = (current * self.config.affinity_decay).max(self.config.affinity_floor);
        affinity::set_weight(&self.pool, &group.id, &picked.id, decayed, now).await?;

        Ok(Some(entry))
    }

    /// Resolve a concrete item for a category: fresh cache first, then the
    /// content source, then stale cache.
    async fn resolve_item(
        &self,
        category_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ContentCacheEntry>> {
        let fresh_cutoff = now - self.config.cache_ttl;

        if let Some(entry) =
            content_cache::least_used_fresh(&self.pool, category_id, fresh_cutoff).await?
        {
            return Ok(Some(entry));
        }

        match self.source.fetch_by_category(category_id).await {
            Ok(items) if !items.is_empty() => {
                let entries: Vec<NewCacheEntry> = items
                    .into_iter()
                    .map(|item| NewCacheEntry {
                        id: item.id,
                        category_id: item.category_id,
                        body: item.body,
                        attribution: item.attribution,
                        grade: item.grade,
                        source_url: item.source_url,
                    })
                    .collect();
                content_cache::store_items(&self.pool, &entries, now).await?;

                Ok(content_cache::least_used_fresh(&self.pool, category_id, fresh_cutoff).await?)
            }
            Ok(_) => {
                debug!("Content source returned no items for category {}", category_id);
                Ok(content_cache::any_cached(&self.pool, category_id).await?)
            }
            Err(e) => {
                warn!(
                    "Content fetch failed for category {}, serving from cache: {}",
                    category_id, e
                );
                Ok(content_cache::any_cached(&self.pool, category_id).await?)
            }
        }
    }
}

/// The group-local calendar date for a UTC instant.
///
/// Timezones are validated at the store boundary; an unparseable stored
/// value falls back to the UTC date.
fn local_date_for(group: &Group, now: DateTime<Utc>) -> NaiveDate {
    match group.timezone.parse::<Tz>() {
        Ok(tz) => now.with_timezone(&tz).date_naive(),
        Err(_) => {
            warn!(
                "Group {} has unparseable timezone {}, using UTC date",
                group.id, group.timezone
            );
            now.date_naive()
        }
    }
}

/// A stored weight, recovered linearly toward neutral 1.0 by elapsed time.
fn effective_weight(affinity: &CategoryAffinity, now: DateTime<Utc>, config: &SelectionConfig) -> f64 {
    let elapsed = now - affinity.updated_at;
    if elapsed >= config.affinity_recovery {
        return 1.0;
    }
    if elapsed < Duration::zero() {
        return affinity.weight;
    }

    let frac = elapsed.num_seconds() as f64 / config.affinity_recovery.num_seconds() as f64;
    affinity.weight + (1.0 - affinity.weight) * frac
}

/// Pick an index into `weights`, proportionally.
///
/// Degenerate weights (all zero) fall back to the first index. Callers
/// guarantee `weights` is non-empty.
fn weighted_pick<R: Rng>(rng: &mut R, weights: &[f64]) -> usize {
    match WeightedIndex::new(weights) {
        Ok(dist) => dist.sample(rng),
        Err(_) => 0,
    }
}
