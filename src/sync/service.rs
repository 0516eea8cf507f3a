//! Sync service over a [`PageStore`]
//!
//! Upserts are serialised per keyword inside this process, so two concurrent
//! syncs of the same keyword through one service never both create a page.
//! Separate processes sharing a database can still race and create
//! duplicates; the store offers no conditional write to prevent it.
//!
//! Batches run sequentially with a fixed pause between items. A failed item
//! is recorded in the [`BatchReport`] and the loop moves on; a cancellation
//! signal stops the loop before the next item.

use chrono::{Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tracing::{debug, info, warn};

use super::property::{Page, Properties};
use super::schema::{self, CompetitorReport};
use super::store::{Filter, PageStore, Sort, SortDirection};
use super::{DatabaseKind, NotionClient, StoreError};
use crate::config::{DatabaseIds, StoreConfig};
use crate::metrics;
use crate::models::{
    MultiPortalResult, Portal, Prediction, RecommendationCandidate, SearchIntent,
    SeasonalProfile, TrendAnalysis, TrendDirection, TrendPoint,
};

/// Result of one keyword upsert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub page_id: String,
    /// False when an existing page was updated
    pub created: bool,
}

/// Outcome of a best-effort batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub attempted: usize,
    pub succeeded: usize,
    /// Item index and error message of every failed item
    pub failed: Vec<(usize, String)>,
    /// Set when the loop stopped early on a cancellation signal
    pub cancelled: bool,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.failed.is_empty()
    }
}

pub struct SyncService {
    store: Arc<dyn PageStore>,
    databases: DatabaseIds,
    batch_delay: Duration,
    multi_select_cap: usize,
    keyword_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl SyncService {
    pub fn new(store: Arc<dyn PageStore>, config: &StoreConfig) -> Self {
        Self {
            store,
            databases: config.databases.clone(),
            batch_delay: config.batch_delay(),
            multi_select_cap: config.multi_select_cap,
            keyword_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Service backed by the HTTP page store
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidConfig` if the client cannot be built.
    pub fn notion(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = NotionClient::new(config)?;
        Ok(Self::new(Arc::new(client), config))
    }

    pub fn store(&self) -> &Arc<dyn PageStore> {
        &self.store
    }

    fn database(&self, kind: DatabaseKind) -> Result<&str, StoreError> {
        self.databases
            .get(kind)
            .ok_or(StoreError::MissingDatabase(kind))
    }

    /// Claim the keyword's upsert lock; the map entry goes away with the last claim
    fn keyword_slot<'a>(&'a self, keyword: &'a str) -> KeywordSlot<'a> {
        let mut locks = self
            .keyword_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let lock = locks.entry(keyword.to_string()).or_default().clone();
        KeywordSlot {
            locks: &self.keyword_locks,
            keyword,
            lock,
        }
    }

    // ==================== Keyword Analysis ====================

    /// Create or update the keyword analysis page for `result.keyword`
    ///
    /// Looks the page up by exact title; updates it in place when found and
    /// creates it otherwise.
    pub async fn sync_keyword_analysis(
        &self,
        result: &MultiPortalResult,
    ) -> Result<SyncOutcome, StoreError> {
        let slot = self.keyword_slot(&result.keyword);
        let outcome = {
            let _guard = slot.lock.lock().await;
            self.upsert_keyword_analysis(result).await
        };
        drop(slot);

        let label = match &outcome {
            Ok(SyncOutcome { created: true, .. }) => "created",
            Ok(_) => "updated",
            Err(_) => "failed",
        };
        metrics::record_sync(DatabaseKind::KeywordAnalysis, label);
        outcome
    }

    async fn upsert_keyword_analysis(
        &self,
        result: &MultiPortalResult,
    ) -> Result<SyncOutcome, StoreError> {
        let database_id = self.database(DatabaseKind::KeywordAnalysis)?;
        let properties = schema::keyword_analysis(result, self.multi_select_cap);

        match self.get_keyword_analysis(&result.keyword).await? {
            Some(existing) => {
                self.store.update_page(&existing.id, &properties).await?;
                info!(keyword = %result.keyword, page_id = %existing.id, "Updated keyword analysis");
                Ok(SyncOutcome {
                    page_id: existing.id,
                    created: false,
                })
            }
            None => {
                let page = self.store.create_page(database_id, &properties).await?;
                info!(keyword = %result.keyword, page_id = %page.id, "Created keyword analysis");
                Ok(SyncOutcome {
                    page_id: page.id,
                    created: true,
                })
            }
        }
    }

    /// Create a keyword analysis page without checking for an existing one
    pub async fn add_keyword_analysis(&self, result: &MultiPortalResult) -> Result<Page, StoreError> {
        let database_id = self.database(DatabaseKind::KeywordAnalysis)?;
        let properties = schema::keyword_analysis(result, self.multi_select_cap);
        self.store.create_page(database_id, &properties).await
    }

    pub async fn get_keyword_analysis(&self, keyword: &str) -> Result<Option<Page>, StoreError> {
        let database_id = self.database(DatabaseKind::KeywordAnalysis)?;
        let filter = Filter::title_equals(schema::KEYWORD, keyword);
        let pages = self.store.query(database_id, Some(&filter), &[]).await?;
        Ok(pages.into_iter().next())
    }

    /// Active keywords, most recently edited first
    pub async fn get_all_keywords(&self, limit: usize) -> Result<Vec<Page>, StoreError> {
        let database_id = self.database(DatabaseKind::KeywordAnalysis)?;
        let filter = Filter::select_equals(schema::STATUS, schema::STATUS_ACTIVE);
        let sorts = [Sort::LastEdited(SortDirection::Descending)];

        let mut pages = self.store.query(database_id, Some(&filter), &sorts).await?;
        pages.truncate(limit);
        Ok(pages)
    }

    pub async fn update_keyword_analysis(
        &self,
        page_id: &str,
        properties: &Properties,
    ) -> Result<Page, StoreError> {
        self.store.update_page(page_id, properties).await
    }

    // ==================== Trend Data ====================

    pub async fn add_trend_point(
        &self,
        keyword_page_id: &str,
        point: &TrendPoint,
        portal: Portal,
        direction: TrendDirection,
        peak_day: bool,
    ) -> Result<Page, StoreError> {
        let database_id = self.database(DatabaseKind::TrendData)?;
        let properties = schema::trend_point(keyword_page_id, point, portal, direction, peak_day);
        self.store.create_page(database_id, &properties).await
    }

    /// Write every point of a trend analysis, flagging the peak day
    pub async fn batch_add_trend_points(
        &self,
        keyword_page_id: &str,
        analysis: &TrendAnalysis,
        portal: Portal,
        cancel: Option<&watch::Receiver<bool>>,
    ) -> BatchReport {
        self.run_batch(DatabaseKind::TrendData, &analysis.points, cancel, |point| {
            let peak_day = analysis.peak_date == Some(point.date);
            self.add_trend_point(keyword_page_id, point, portal, analysis.direction, peak_day)
        })
        .await
    }

    /// Trend points of the last `days` days, oldest first
    pub async fn get_trend_history(
        &self,
        keyword_page_id: &str,
        days: u32,
    ) -> Result<Vec<Page>, StoreError> {
        let database_id = self.database(DatabaseKind::TrendData)?;
        let since = (Utc::now() - ChronoDuration::days(i64::from(days)))
            .date_naive()
            .to_string();
        let filter = Filter::And(vec![
            Filter::relation_contains(schema::KEYWORD, keyword_page_id),
            Filter::date_after(schema::DATE, &since),
        ]);
        let sorts = [Sort::property(schema::DATE, SortDirection::Ascending)];

        self.store.query(database_id, Some(&filter), &sorts).await
    }

    // ==================== Recommendations ====================

    pub async fn add_recommendation(
        &self,
        base_keyword_id: &str,
        candidate: &RecommendationCandidate,
    ) -> Result<Page, StoreError> {
        let database_id = self.database(DatabaseKind::Recommendations)?;
        let properties = schema::recommendation(base_keyword_id, candidate);
        self.store.create_page(database_id, &properties).await
    }

    pub async fn batch_add_recommendations(
        &self,
        base_keyword_id: &str,
        candidates: &[RecommendationCandidate],
        cancel: Option<&watch::Receiver<bool>>,
    ) -> BatchReport {
        self.run_batch(DatabaseKind::Recommendations, candidates, cancel, |candidate| {
            self.add_recommendation(base_keyword_id, candidate)
        })
        .await
    }

    /// Upsert the base keyword, then attach every recommendation to it
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Cancelled` without writing anything when the
    /// signal is already raised.
    pub async fn sync_recommendations(
        &self,
        base: &MultiPortalResult,
        candidates: &[RecommendationCandidate],
        cancel: Option<&watch::Receiver<bool>>,
    ) -> Result<BatchReport, StoreError> {
        if is_cancelled(cancel) {
            return Err(StoreError::Cancelled);
        }
        let outcome = self.sync_keyword_analysis(base).await?;
        Ok(self
            .batch_add_recommendations(&outcome.page_id, candidates, cancel)
            .await)
    }

    /// Open recommendations of a base keyword, best score first
    pub async fn get_recommendations(
        &self,
        base_keyword_id: &str,
        limit: usize,
    ) -> Result<Vec<Page>, StoreError> {
        let database_id = self.database(DatabaseKind::Recommendations)?;
        let filter = Filter::And(vec![
            Filter::relation_contains(schema::BASE_KEYWORD, base_keyword_id),
            Filter::select_equals(schema::STATUS, schema::STATUS_RECOMMENDED),
        ]);
        let sorts = [Sort::property(schema::SCORE, SortDirection::Descending)];

        let mut pages = self.store.query(database_id, Some(&filter), &sorts).await?;
        pages.truncate(limit);
        Ok(pages)
    }

    // ==================== Other Records ====================

    pub async fn add_competitor_analysis(
        &self,
        report: &CompetitorReport,
    ) -> Result<Page, StoreError> {
        let database_id = self.database(DatabaseKind::CompetitorAnalysis)?;
        let properties = schema::competitor_analysis(report, Utc::now(), self.multi_select_cap);
        self.record(DatabaseKind::CompetitorAnalysis, database_id, &properties)
            .await
    }

    pub async fn add_search_intent(
        &self,
        keyword_page_id: &str,
        intent: &SearchIntent,
    ) -> Result<Page, StoreError> {
        let database_id = self.database(DatabaseKind::SearchIntent)?;
        let properties = schema::search_intent(keyword_page_id, intent);
        self.record(DatabaseKind::SearchIntent, database_id, &properties)
            .await
    }

    pub async fn add_performance_prediction(
        &self,
        keyword_page_id: &str,
        prediction: &Prediction,
        profile: Option<&SeasonalProfile>,
    ) -> Result<Page, StoreError> {
        let database_id = self.database(DatabaseKind::PerformancePrediction)?;
        let properties = schema::performance_prediction(keyword_page_id, prediction, profile);
        self.record(DatabaseKind::PerformancePrediction, database_id, &properties)
            .await
    }

    /// Create one page and count the outcome
    async fn record(
        &self,
        kind: DatabaseKind,
        database_id: &str,
        properties: &Properties,
    ) -> Result<Page, StoreError> {
        let result = self.store.create_page(database_id, properties).await;
        metrics::record_sync(kind, if result.is_ok() { "created" } else { "failed" });
        result
    }

    /// Sequential best-effort loop with an inter-item delay
    async fn run_batch<'a, T, F, Fut>(
        &'a self,
        kind: DatabaseKind,
        items: &'a [T],
        cancel: Option<&watch::Receiver<bool>>,
        op: F,
    ) -> BatchReport
    where
        F: Fn(&'a T) -> Fut,
        Fut: Future<Output = Result<Page, StoreError>>,
    {
        let mut report = BatchReport::default();

        for (index, item) in items.iter().enumerate() {
            if index > 0 && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }
            if is_cancelled(cancel) {
                warn!(
                    database = %kind,
                    remaining = items.len() - index,
                    "Batch cancelled"
                );
                report.cancelled = true;
                break;
            }

            report.attempted += 1;
            match op(item).await {
                Ok(page) => {
                    debug!(database = %kind, index, page_id = %page.id, "Batch item stored");
                    report.succeeded += 1;
                    metrics::record_sync(kind, "created");
                }
                Err(e) => {
                    warn!(database = %kind, index, error = %e, "Batch item failed");
                    report.failed.push((index, e.to_string()));
                    metrics::record_sync(kind, "failed");
                }
            }
        }

        info!(
            database = %kind,
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failed.len(),
            cancelled = report.cancelled,
            "Batch finished"
        );
        report
    }
}

fn is_cancelled(cancel: Option<&watch::Receiver<bool>>) -> bool {
    cancel.is_some_and(|rx| *rx.borrow())
}

/// Handle on a per-keyword upsert lock
///
/// Dropping it removes the map entry when no other task holds the lock, so
/// an upsert future dropped mid-await leaves nothing behind.
struct KeywordSlot<'a> {
    locks: &'a Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    keyword: &'a str,
    lock: Arc<AsyncMutex<()>>,
}

impl Drop for KeywordSlot<'_> {
    fn drop(&mut self) {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // One reference in the map plus ours
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(self.keyword);
        }
    }
}
