//! External page store synchronisation
//!
//! Analysis records are projected onto typed page properties and written to a
//! Notion-style database API. The layer is split into:
//!
//! - [`property`] - typed property values and their JSON codec
//! - [`schema`] - column layout of each logical database
//! - [`store`] - the [`PageStore`] trait, filters and sorts
//! - [`notion`] - HTTP implementation of [`PageStore`]
//! - [`memory`] - in-process implementation for tests and offline runs
//! - [`service`] - upsert, batch loops and cancellation

pub mod error;
pub mod memory;
pub mod notion;
pub mod property;
pub mod schema;
pub mod service;
pub mod store;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use error::StoreError;
pub use memory::InMemoryPageStore;
pub use notion::NotionClient;
pub use property::{Page, Properties, PropertyValue};
pub use service::{BatchReport, SyncOutcome, SyncService};
pub use store::{Filter, PageStore, Sort, SortDirection};

/// Logical database an analysis record is written to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseKind {
    KeywordAnalysis,
    TrendData,
    Recommendations,
    CompetitorAnalysis,
    SearchIntent,
    PerformancePrediction,
}

impl DatabaseKind {
    pub fn all() -> [Self; 6] {
        [
            Self::KeywordAnalysis,
            Self::TrendData,
            Self::Recommendations,
            Self::CompetitorAnalysis,
            Self::SearchIntent,
            Self::PerformancePrediction,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KeywordAnalysis => "keyword_analysis",
            Self::TrendData => "trend_data",
            Self::Recommendations => "recommendations",
            Self::CompetitorAnalysis => "competitor_analysis",
            Self::SearchIntent => "search_intent",
            Self::PerformancePrediction => "performance_prediction",
        }
    }
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
