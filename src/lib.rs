//! keyword-radar - Keyword Intelligence Engine
//!
//! Estimates and ranks keyword opportunity signals across search portals,
//! forecasts short-term demand and syncs the results to a Notion-style page
//! store.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Layered configuration (defaults, TOML file, environment)
//! - [`estimator`] - Scalar estimators, candidate generators, live enrichment
//! - [`analytics`] - Trends, seasonality, prediction, scoring, competitor gaps
//! - [`analyzer`] - Multi-portal orchestrator used by the CLI and API
//! - [`models`] - Core data structures and types
//! - [`storage`] - Local analysis history (SQLite) and JSON export
//! - [`sync`] - External page store sync layer
//! - [`server`] - HTTP JSON API
//! - [`metrics`] - Prometheus counters
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use keyword_radar::analyzer::KeywordAnalyzer;
//! use keyword_radar::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let analyzer = KeywordAnalyzer::from_config(&config)?;
//!     let result = analyzer.analyze_multi_portal("python tutorial").await?;
//!     println!("{}", serde_json::to_string_pretty(&result)?);
//!     Ok(())
//! }
//! ```

pub mod analytics;
pub mod analyzer;
pub mod config;
pub mod error;
pub mod estimator;
pub mod metrics;
pub mod models;
pub mod server;
pub mod storage;
pub mod sync;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::analyzer::KeywordAnalyzer;
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, RadarErrorTrait, Result};
    pub use crate::estimator::{Estimator, HeuristicConfig};
    pub use crate::models::{
        KeywordMetric, MultiPortalResult, Portal, Prediction, RecommendationCandidate,
        SeasonalProfile, TrendAnalysis,
    };
    pub use crate::storage::{Exporter, HistoryStore};
    pub use crate::sync::{PageStore, SyncService};
}

// Direct re-exports for convenience
pub use models::{KeywordMetric, MultiPortalResult, Portal};
