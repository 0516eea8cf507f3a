//! Configuration management for keyword-radar
//!
//! Configuration is layered: built-in defaults, an optional TOML file, then
//! environment variables (`RADAR_*` for the engine, `NOTION_*` for the
//! external page store).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::analytics::recommend::ScoreWeights;
use crate::estimator::HeuristicConfig;
use crate::sync::DatabaseKind;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Heuristic constants for estimators and candidate generators
    pub estimator: HeuristicConfig,

    /// Time-series, prediction and ranking parameters
    pub analysis: AnalysisConfig,

    /// Local analysis history
    pub history: HistoryConfig,

    /// External page store
    pub store: StoreConfig,

    /// Live related-terms lookup
    pub enrichment: EnrichmentConfig,

    /// HTTP API server
    pub server: ServerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Analysis windows, ranking caps and randomness
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Trend analysis window bounds and default, in days
    pub min_trend_days: u32,
    pub max_trend_days: u32,
    pub default_trend_days: u32,

    /// Prediction horizon bounds and default, in months
    pub min_prediction_months: u32,
    pub max_prediction_months: u32,
    pub default_prediction_months: u32,

    /// Window used for seasonality detection
    pub seasonality_days: u32,

    /// Length of the synthetic history the predictor fits
    pub prediction_history_days: u32,

    /// Base volume of the synthetic seasonal signal
    pub series_base_volume: f64,
    pub monthly_amplitude: f64,
    pub weekday_amplitude: f64,

    /// Gaussian noise added to trend-analysis points, as a share of the signal
    pub trend_noise_ratio: f64,

    /// Gaussian noise added to predictor history, as a share of the base
    pub prediction_noise_ratio: f64,

    pub recommendations_per_keyword: usize,
    pub max_recommendations: usize,
    pub max_compare_keywords: usize,

    /// Competitor keywords need more volume and less difficulty than these
    pub min_opportunity_volume: u64,
    pub max_opportunity_difficulty: u8,

    pub score_weights: ScoreWeights,

    /// Fixed seed for reproducible synthetic series
    pub seed: Option<u64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_trend_days: 7,
            max_trend_days: 90,
            default_trend_days: 30,
            min_prediction_months: 1,
            max_prediction_months: 6,
            default_prediction_months: 3,
            seasonality_days: 365,
            prediction_history_days: 90,
            series_base_volume: 100.0,
            monthly_amplitude: 0.3,
            weekday_amplitude: 0.1,
            trend_noise_ratio: 0.0,
            prediction_noise_ratio: 0.1,
            recommendations_per_keyword: 5,
            max_recommendations: 20,
            max_compare_keywords: 5,
            min_opportunity_volume: 100,
            max_opportunity_difficulty: 50,
            score_weights: ScoreWeights::default(),
            seed: None,
        }
    }
}

impl AnalysisConfig {
    /// Clamp a requested trend window into the configured range
    #[must_use]
    pub fn clamp_days(&self, days: u32) -> u32 {
        days.clamp(self.min_trend_days, self.max_trend_days)
    }

    /// Clamp a requested prediction horizon into the configured range
    #[must_use]
    pub fn clamp_months(&self, months: u32) -> u32 {
        months.clamp(self.min_prediction_months, self.max_prediction_months)
    }
}

/// Local history store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Record every analysis call
    pub enabled: bool,

    /// SQLite database path
    pub sqlite_path: PathBuf,

    /// Default lookback for history queries
    pub default_days: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sqlite_path: PathBuf::from("data/keyword_history.db"),
            default_days: 30,
        }
    }
}

/// Database identifier per record kind
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseIds {
    pub keyword_analysis: Option<String>,
    pub trend_data: Option<String>,
    pub recommendations: Option<String>,
    pub competitor_analysis: Option<String>,
    pub search_intent: Option<String>,
    pub performance_prediction: Option<String>,
}

impl DatabaseIds {
    /// Configured, non-empty identifier for `kind`
    pub fn get(&self, kind: DatabaseKind) -> Option<&str> {
        let id = match kind {
            DatabaseKind::KeywordAnalysis => &self.keyword_analysis,
            DatabaseKind::TrendData => &self.trend_data,
            DatabaseKind::Recommendations => &self.recommendations,
            DatabaseKind::CompetitorAnalysis => &self.competitor_analysis,
            DatabaseKind::SearchIntent => &self.search_intent,
            DatabaseKind::PerformancePrediction => &self.performance_prediction,
        };
        id.as_deref().filter(|s| !s.trim().is_empty())
    }

    fn slot(&mut self, kind: DatabaseKind) -> &mut Option<String> {
        match kind {
            DatabaseKind::KeywordAnalysis => &mut self.keyword_analysis,
            DatabaseKind::TrendData => &mut self.trend_data,
            DatabaseKind::Recommendations => &mut self.recommendations,
            DatabaseKind::CompetitorAnalysis => &mut self.competitor_analysis,
            DatabaseKind::SearchIntent => &mut self.search_intent,
            DatabaseKind::PerformancePrediction => &mut self.performance_prediction,
        }
    }
}

/// External page store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// REST endpoint root
    pub base_url: String,

    /// Integration token sent as a bearer credential
    pub api_token: Option<String>,

    /// Value of the `Notion-Version` header
    pub api_version: String,

    pub databases: DatabaseIds,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Pause between items of a batch, in milliseconds
    pub batch_delay_ms: u64,

    pub max_retries: u32,
    pub retry_base_delay_ms: u64,

    /// Maximum number of labels written to a multi-select column
    pub multi_select_cap: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("https://api.notion.com/v1"),
            api_token: None,
            api_version: String::from("2022-06-28"),
            databases: DatabaseIds::default(),
            request_timeout_secs: 30,
            batch_delay_ms: 300,
            max_retries: 3,
            retry_base_delay_ms: 500,
            multi_select_cap: 5,
        }
    }
}

impl StoreConfig {
    /// True when a token and the keyword analysis database are both set
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.api_token.as_deref().is_some_and(|t| !t.is_empty())
            && self.databases.get(DatabaseKind::KeywordAnalysis).is_some()
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}

/// Live related-terms lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub enabled: bool,

    /// Rate limit (requests per second) shared across portals
    pub requests_per_second: u32,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    pub max_retries: u32,
    pub retry_base_delay_ms: u64,

    /// Maximum related terms kept per lookup
    pub max_terms: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_second: 2,
            request_timeout_secs: 5,
            max_retries: 2,
            retry_base_delay_ms: 500,
            max_terms: 10,
        }
    }
}

/// HTTP API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Push analyses to the external store after responding
    pub background_sync: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 8000,
            background_sync: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

/// Non-empty environment variable
fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_var(name).and_then(|v| v.parse::<T>().ok())
}

impl Config {
    /// Load configuration from defaults and environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self::default().apply_env())
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load an optional file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = base.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Override fields from `RADAR_*` and `NOTION_*` environment variables
    #[must_use]
    pub fn apply_env(mut self) -> Self {
        if let Some(level) = env_var("RADAR_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = env_var("RADAR_LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Some(path) = env_var("RADAR_HISTORY_PATH") {
            self.history.sqlite_path = PathBuf::from(path);
        }
        if let Some(enabled) = env_parse::<bool>("RADAR_HISTORY_ENABLED") {
            self.history.enabled = enabled;
        }
        if let Some(seed) = env_parse::<u64>("RADAR_SEED") {
            self.analysis.seed = Some(seed);
        }
        if let Some(enabled) = env_parse::<bool>("RADAR_ENRICHMENT_ENABLED") {
            self.enrichment.enabled = enabled;
        }
        if let Some(host) = env_var("RADAR_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse::<u16>("RADAR_PORT") {
            self.server.port = port;
        }

        if let Some(token) = env_var("NOTION_API_TOKEN") {
            self.store.api_token = Some(token);
        }
        if let Some(url) = env_var("NOTION_BASE_URL") {
            self.store.base_url = url;
        }

        let database_vars = [
            (DatabaseKind::KeywordAnalysis, "NOTION_DB_KEYWORD_ANALYSIS"),
            (DatabaseKind::TrendData, "NOTION_DB_TREND_DATA"),
            (DatabaseKind::Recommendations, "NOTION_DB_RECOMMENDATIONS"),
            (DatabaseKind::CompetitorAnalysis, "NOTION_DB_COMPETITOR"),
            (DatabaseKind::SearchIntent, "NOTION_DB_INTENT"),
            (DatabaseKind::PerformancePrediction, "NOTION_DB_PREDICTION"),
        ];
        for (kind, var) in database_vars {
            if let Some(id) = env_var(var) {
                *self.store.databases.slot(kind) = Some(id);
            }
        }

        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.estimator
            .validate()
            .map_err(|e| anyhow::anyhow!("estimator: {e}"))?;

        let a = &self.analysis;
        a.score_weights
            .validate()
            .map_err(|e| anyhow::anyhow!("analysis: {e}"))?;
        if a.min_trend_days == 0 || a.min_trend_days > a.max_trend_days {
            anyhow::bail!("trend day range must be non-empty and start above zero");
        }
        if a.min_prediction_months == 0 || a.min_prediction_months > a.max_prediction_months {
            anyhow::bail!("prediction month range must be non-empty and start above zero");
        }
        if a.seasonality_days == 0 || a.prediction_history_days < 3 {
            anyhow::bail!("series windows are too short");
        }
        if a.series_base_volume < 0.0 || a.trend_noise_ratio < 0.0 || a.prediction_noise_ratio < 0.0
        {
            anyhow::bail!("series volume and noise ratios must be non-negative");
        }
        if a.recommendations_per_keyword == 0 || a.max_recommendations == 0 {
            anyhow::bail!("recommendation caps must be greater than 0");
        }
        if a.max_compare_keywords == 0 {
            anyhow::bail!("max_compare_keywords must be greater than 0");
        }

        if self.store.request_timeout_secs == 0 {
            anyhow::bail!("store.request_timeout_secs must be greater than 0");
        }
        if self.store.multi_select_cap == 0 {
            anyhow::bail!("store.multi_select_cap must be greater than 0");
        }
        if self.enrichment.request_timeout_secs == 0 {
            anyhow::bail!("enrichment.request_timeout_secs must be greater than 0");
        }
        if self.enrichment.requests_per_second == 0 {
            anyhow::bail!("enrichment.requests_per_second must be greater than 0");
        }

        match self.logging.format.as_str() {
            "text" | "pretty" | "json" => {}
            other => anyhow::bail!("unknown log format: {other}"),
        }

        Ok(())
    }
}
