//! Multi-portal keyword orchestrator
//!
//! [`KeywordAnalyzer`] is the entry point the CLI and HTTP API call into. It
//! validates caller input, runs the estimator and analytics, applies the
//! configured clamps and records each portal analysis in the optional
//! history store. History writes run on the blocking pool when a Tokio runtime
//! is present and never delay or affect the returned value; call
//! [`KeywordAnalyzer::flush_history`] before exiting to wait for them.

use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, Utc};
use futures::future::join_all;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::analytics::competitor::{competitor_gap, GapThresholds};
use crate::analytics::prediction::{predict_from_history, synthetic_history, DEFAULT_DEGREE};
use crate::analytics::recommend::{analyze_short_long, rank_recommendations};
use crate::analytics::seasonality::detect_seasonality;
use crate::analytics::trends::{analyze_series, generate_series, SeriesParams};
use crate::config::{AnalysisConfig, Config};
use crate::error::{Error, Result};
use crate::estimator::enrichment::{PortalEnricher, RelatedTermsSource};
use crate::estimator::Estimator;
use crate::metrics;
use crate::models::{
    CompetitorGapResult, DifficultyLevel, EnrichmentStatus, KeywordComparison, KeywordMetric,
    MultiPortalResult, Portal, PortalAnalysis, Prediction, RecommendationCandidate,
    SearchIntent, SeasonalProfile, ShortLongAnalysis, TrendAnalysis,
};
use crate::storage::history::{open_history, AnalysisRecord, SharedHistoryStore};
use crate::utils::{keyword_seed, normalize_keyword, normalize_keywords};

pub struct KeywordAnalyzer {
    estimator: Estimator,
    config: AnalysisConfig,
    history: Option<SharedHistoryStore>,
    enricher: Option<Arc<dyn RelatedTermsSource>>,
    pending_writes: Mutex<Vec<JoinHandle<()>>>,
}

impl KeywordAnalyzer {
    /// Analyzer without history or live enrichment
    pub fn new(estimator: Estimator, config: AnalysisConfig) -> Self {
        Self {
            estimator,
            config,
            history: None,
            enricher: None,
            pending_writes: Mutex::new(Vec::new()),
        }
    }

    /// Build from the full configuration
    ///
    /// A history store that fails to open is logged and left out; an
    /// enrichment client that cannot be built is an error.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut analyzer = Self::new(
            Estimator::new(config.estimator.clone()),
            config.analysis.clone(),
        );

        match open_history(&config.history) {
            Ok(history) => analyzer.history = history,
            Err(e) => warn!(error = %e, "History store unavailable, continuing without it"),
        }

        if config.enrichment.enabled {
            let enricher = PortalEnricher::new(&config.enrichment)?;
            analyzer.enricher = Some(Arc::new(enricher));
        }

        Ok(analyzer)
    }

    pub fn with_history(mut self, history: SharedHistoryStore) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_enricher(mut self, enricher: Arc<dyn RelatedTermsSource>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn estimator(&self) -> &Estimator {
        &self.estimator
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn history(&self) -> Option<&SharedHistoryStore> {
        self.history.as_ref()
    }

    /// Seeded per keyword when a seed is configured, otherwise from entropy
    fn rng_for(&self, keyword: &str) -> ChaCha8Rng {
        match self.config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed ^ keyword_seed(keyword)),
            None => ChaCha8Rng::from_entropy(),
        }
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    /// Run a history write off the caller's path
    ///
    /// Inside a Tokio runtime the write goes to the blocking pool; without one
    /// it runs inline.
    fn write_history<F>(&self, write: F)
    where
        F: FnOnce(&SharedHistoryStore) + Send + 'static,
    {
        let Some(history) = self.history.clone() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let task = handle.spawn_blocking(move || write(&history));
                let mut pending = self
                    .pending_writes
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                pending.retain(|t| !t.is_finished());
                pending.push(task);
            }
            Err(_) => write(&history),
        }
    }

    /// Wait for every history write started so far
    pub async fn flush_history(&self) {
        let pending = std::mem::take(
            &mut *self
                .pending_writes
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        );
        for result in join_all(pending).await {
            if let Err(e) = result {
                warn!(error = %e, "History write task failed");
            }
        }
    }

    fn record_metrics(&self, batch: Vec<KeywordMetric>) {
        self.write_history(move |history| {
            let at = Utc::now();
            for metric in &batch {
                let record = AnalysisRecord::from_metric(metric, at);
                if let Err(e) = history.save_analysis(&record) {
                    warn!(keyword = %metric.keyword, portal = %metric.portal, error = %e, "Failed to record analysis");
                }
            }
        });
    }

    fn record_recommendations(&self, base_keyword: &str, candidates: &[RecommendationCandidate]) {
        let base_keyword = base_keyword.to_string();
        let candidates = candidates.to_vec();
        self.write_history(move |history| {
            for candidate in &candidates {
                if let Err(e) = history.save_recommendation(&base_keyword, candidate) {
                    warn!(base_keyword = %base_keyword, keyword = %candidate.keyword, error = %e, "Failed to record recommendation");
                }
            }
        });
    }

    // ==================== Portal Analyses ====================

    async fn portal_analysis(&self, keyword: &str, portal: Portal) -> PortalAnalysis {
        let mut metric = self.estimator.metric(keyword, portal);

        let enrichment = match &self.enricher {
            None => EnrichmentStatus::Skipped,
            Some(source) => match source.related_terms(keyword, portal).await {
                Ok(terms) if !terms.is_empty() => {
                    let count = terms.len();
                    metric.related = terms;
                    EnrichmentStatus::Available { terms: count }
                }
                Ok(_) => EnrichmentStatus::Available { terms: 0 },
                Err(e) => {
                    warn!(keyword, %portal, error = %e, "Related-terms lookup failed, using heuristics");
                    metrics::record_enrichment_fallback(portal);
                    EnrichmentStatus::Error {
                        message: e.to_string(),
                    }
                }
            },
        };

        let search_intent =
            (portal == Portal::Google).then(|| self.estimator.search_intent(keyword));

        PortalAnalysis {
            monthly_searches: metric.volume.saturating_mul(30),
            opportunity_score: self.estimator.opportunity_score(keyword, portal),
            difficulty_level: DifficultyLevel::from_difficulty(metric.difficulty),
            search_intent,
            enrichment,
            metric,
        }
    }

    /// Analyse one keyword on one portal
    pub async fn analyze_portal(&self, keyword: &str, portal: Portal) -> Result<PortalAnalysis> {
        let keyword = normalize_keyword(keyword)?;
        let _timer = metrics::start_analysis_timer("analyze_portal");

        let analysis = self.portal_analysis(&keyword, portal).await;
        self.record_metrics(vec![analysis.metric.clone()]);
        Ok(analysis)
    }

    /// Analyse one keyword on every portal
    pub async fn analyze_multi_portal(&self, keyword: &str) -> Result<MultiPortalResult> {
        let result = self.estimate_multi_portal(keyword).await?;
        self.record_metrics(
            result
                .portals
                .values()
                .map(|analysis| analysis.metric.clone())
                .collect(),
        );
        Ok(result)
    }

    /// Same analysis as [`Self::analyze_multi_portal`] without a history record
    ///
    /// For follow-up work on a keyword the caller has already analysed.
    pub async fn estimate_multi_portal(&self, keyword: &str) -> Result<MultiPortalResult> {
        let keyword = normalize_keyword(keyword)?;
        let _timer = metrics::start_analysis_timer("analyze");

        let analyses = join_all(
            Portal::all()
                .into_iter()
                .map(|portal| self.portal_analysis(&keyword, portal)),
        )
        .await;

        info!(keyword = %keyword, portals = analyses.len(), "Multi-portal analysis complete");
        Ok(MultiPortalResult {
            keyword,
            timestamp: Utc::now(),
            portals: analyses
                .into_iter()
                .map(|analysis| (analysis.metric.portal, analysis))
                .collect(),
        })
    }

    /// Side-by-side heuristic comparison of up to `max_compare_keywords`
    /// keywords; extra inputs are dropped
    pub fn compare_keywords<S: AsRef<str>>(&self, keywords: &[S]) -> Result<Vec<KeywordComparison>> {
        let mut keywords = normalize_keywords(keywords)?;
        if keywords.len() > self.config.max_compare_keywords {
            debug!(
                given = keywords.len(),
                kept = self.config.max_compare_keywords,
                "Dropping extra comparison keywords"
            );
            keywords.truncate(self.config.max_compare_keywords);
        }
        let _timer = metrics::start_analysis_timer("compare");

        let e = &self.estimator;
        Ok(keywords
            .into_iter()
            .map(|keyword| KeywordComparison {
                google_volume: e.volume(&keyword, Portal::Google),
                naver_volume: e.volume(&keyword, Portal::Naver),
                daum_volume: e.volume(&keyword, Portal::Daum),
                youtube_volume: e.volume(&keyword, Portal::YouTube),
                difficulty: e.difficulty(&keyword),
                google_cpc: e.cpc(&keyword, Portal::Google),
                competition: e.competition(&keyword),
                trend: e.trend(&keyword),
                opportunity_score: e.opportunity_score(&keyword, Portal::Google),
                keyword,
            })
            .collect())
    }

    pub fn analyze_short_long(&self, keyword: &str) -> Result<ShortLongAnalysis> {
        let keyword = normalize_keyword(keyword)?;
        let _timer = metrics::start_analysis_timer("short_long");
        Ok(analyze_short_long(&self.estimator, &keyword))
    }

    /// Ranked recommendations across base keywords
    ///
    /// Every returned candidate is recorded against the first base keyword.
    pub fn recommendations<S: AsRef<str>>(
        &self,
        keywords: &[S],
        channel_topic: Option<&str>,
    ) -> Result<Vec<RecommendationCandidate>> {
        let keywords = normalize_keywords(keywords)?;
        let channel_topic = channel_topic.map(str::trim).filter(|t| !t.is_empty());
        let _timer = metrics::start_analysis_timer("recommendations");

        let ranked = rank_recommendations(
            &self.estimator,
            &keywords,
            channel_topic,
            self.config.recommendations_per_keyword,
            self.config.max_recommendations,
            &self.config.score_weights,
        );

        self.record_recommendations(&keywords[0], &ranked);
        Ok(ranked)
    }

    pub fn competitor_gap<S: AsRef<str>, T: AsRef<str>>(
        &self,
        competitor_keywords: &[S],
        your_keywords: &[T],
    ) -> CompetitorGapResult {
        let _timer = metrics::start_analysis_timer("competitor_gap");
        competitor_gap(
            &self.estimator,
            competitor_keywords,
            your_keywords,
            GapThresholds {
                min_volume: self.config.min_opportunity_volume,
                max_difficulty: self.config.max_opportunity_difficulty,
            },
        )
    }

    pub fn search_intent(&self, keyword: &str) -> Result<SearchIntent> {
        let keyword = normalize_keyword(keyword)?;
        let _timer = metrics::start_analysis_timer("search_intent");
        Ok(self.estimator.search_intent(&keyword))
    }

    // ==================== Time Series ====================

    /// Synthetic daily trend over the last `days` days, clamped to the
    /// configured range
    pub fn trend_analysis(&self, keyword: &str, days: Option<u32>) -> Result<TrendAnalysis> {
        let keyword = normalize_keyword(keyword)?;
        let days = self
            .config
            .clamp_days(days.unwrap_or(self.config.default_trend_days));
        let _timer = metrics::start_analysis_timer("trend_analysis");

        let params = SeriesParams::from(&self.config);
        let mut rng = self.rng_for(&keyword);
        let points = generate_series(
            days,
            Self::today(),
            &params,
            self.config.trend_noise_ratio,
            &mut rng,
        );

        Ok(analyze_series(&keyword, points))
    }

    /// Monthly and weekday profile over the configured seasonality window
    pub fn seasonality(&self, keyword: &str) -> Result<SeasonalProfile> {
        let keyword = normalize_keyword(keyword)?;
        let _timer = metrics::start_analysis_timer("seasonality");

        let params = SeriesParams::from(&self.config);
        detect_seasonality(&keyword, self.config.seasonality_days, Self::today(), &params)
            .ok_or_else(|| Error::config("seasonality window is empty"))
    }

    /// Project demand `months` ahead, clamped to the configured range
    pub fn predict(&self, keyword: &str, months: Option<u32>) -> Result<Prediction> {
        let keyword = normalize_keyword(keyword)?;
        let months = self
            .config
            .clamp_months(months.unwrap_or(self.config.default_prediction_months));
        let _timer = metrics::start_analysis_timer("predict");

        let base = self.estimator.volume(&keyword, Portal::Google) as f64 / 2.0;
        let mut rng = self.rng_for(&keyword);
        let history = synthetic_history(
            base,
            self.config.prediction_history_days as usize,
            self.config.prediction_noise_ratio,
            &mut rng,
        );

        predict_from_history(&keyword, &history, months, DEFAULT_DEGREE, Self::today())
            .ok_or_else(|| Error::config("prediction history is too short for the fit"))
    }
}
