//! Local analysis history
//!
//! Every portal analysis and recommendation served can be recorded here so
//! later runs can list a keyword's past metrics or the most analysed
//! keywords. The store is a side channel: callers log and drop its errors.
//!
//! ```text
//! KeywordAnalyzer ──► HistoryStore ──┬──► SqliteHistoryStore (WAL)
//!                                    └──► InMemoryHistoryStore
//! ```

use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::config::HistoryConfig;
use crate::error::{Error, Result};
use crate::models::{Competition, KeywordMetric, Portal, RecommendationCandidate, TrendLabel};

// ============================================================================
// Core Types
// ============================================================================

/// One recorded portal analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub keyword: String,
    pub portal: Portal,
    pub volume: u64,
    pub difficulty: u8,
    pub cpc: f64,
    pub competition: Competition,
    pub trend: TrendLabel,
    pub analyzed_at: DateTime<Utc>,
}

impl AnalysisRecord {
    pub fn from_metric(metric: &KeywordMetric, analyzed_at: DateTime<Utc>) -> Self {
        Self {
            keyword: metric.keyword.clone(),
            portal: metric.portal,
            volume: metric.volume,
            difficulty: metric.difficulty,
            cpc: metric.cpc,
            competition: metric.competition,
            trend: metric.trend,
            analyzed_at,
        }
    }
}

/// Keyword ranked by how often it was analysed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopKeyword {
    pub keyword: String,
    pub count: u64,
    pub average_volume: f64,
}

// ============================================================================
// Store Trait
// ============================================================================

pub trait HistoryStore: Send + Sync {
    fn save_analysis(&self, record: &AnalysisRecord) -> Result<()>;

    fn save_recommendation(
        &self,
        base_keyword: &str,
        candidate: &RecommendationCandidate,
    ) -> Result<()>;

    /// Records of `keyword` from the last `days` days, newest first
    fn get_analysis_history(&self, keyword: &str, days: u32) -> Result<Vec<AnalysisRecord>>;

    /// Most analysed keywords, ties broken alphabetically
    fn get_top_keywords(&self, limit: usize) -> Result<Vec<TopKeyword>>;
}

pub type SharedHistoryStore = Arc<dyn HistoryStore>;

/// Open the configured store, or `None` when history is disabled
pub fn open_history(config: &HistoryConfig) -> Result<Option<SharedHistoryStore>> {
    if !config.enabled {
        return Ok(None);
    }
    let store = SqliteHistoryStore::new(&config.sqlite_path)?;
    Ok(Some(Arc::new(store)))
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn cutoff(days: u32) -> DateTime<Utc> {
    Utc::now() - Duration::days(i64::from(days))
}

fn encode<T: Serialize>(value: &T) -> Result<String> {
    match serde_json::to_value(value)? {
        serde_json::Value::String(s) => Ok(s),
        other => Ok(other.to_string()),
    }
}

fn decode<T: for<'de> Deserialize<'de>>(value: &str) -> Result<T> {
    Ok(serde_json::from_value(serde_json::Value::String(
        value.to_string(),
    ))?)
}

// ============================================================================
// SQLite Implementation
// ============================================================================

/// How long a write waits on another connection's lock before failing
const BUSY_TIMEOUT: std::time::Duration = std::time::Duration::from_millis(250);

pub struct SqliteHistoryStore {
    conn: Mutex<Connection>,
}

impl SqliteHistoryStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_schema()?;

        tracing::info!(path = %path.display(), "History store initialized");
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_schema()?;
        Ok(store)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn create_schema(&self) -> Result<()> {
        self.lock().execute_batch(
            r#"
                CREATE TABLE IF NOT EXISTS keyword_analysis (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    keyword TEXT NOT NULL,
                    portal TEXT NOT NULL,
                    volume INTEGER NOT NULL,
                    difficulty INTEGER NOT NULL,
                    cpc REAL NOT NULL,
                    competition TEXT NOT NULL,
                    trend TEXT NOT NULL,
                    analyzed_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_keyword_analysis_keyword
                    ON keyword_analysis(keyword, analyzed_at);

                CREATE TABLE IF NOT EXISTS recommendations (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    base_keyword TEXT NOT NULL,
                    keyword TEXT NOT NULL,
                    kind TEXT NOT NULL,
                    volume INTEGER NOT NULL,
                    difficulty INTEGER NOT NULL,
                    score REAL NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_recommendations_base
                    ON recommendations(base_keyword);
                "#,
        )?;
        Ok(())
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn save_analysis(&self, record: &AnalysisRecord) -> Result<()> {
        self.lock().execute(
            "INSERT INTO keyword_analysis
                (keyword, portal, volume, difficulty, cpc, competition, trend, analyzed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.keyword,
                encode(&record.portal)?,
                record.volume as i64,
                record.difficulty,
                record.cpc,
                encode(&record.competition)?,
                encode(&record.trend)?,
                timestamp(record.analyzed_at),
            ],
        )?;
        Ok(())
    }

    fn save_recommendation(
        &self,
        base_keyword: &str,
        candidate: &RecommendationCandidate,
    ) -> Result<()> {
        self.lock().execute(
            "INSERT INTO recommendations
                (base_keyword, keyword, kind, volume, difficulty, score, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                base_keyword,
                candidate.keyword,
                candidate.kind.as_str(),
                candidate.volume as i64,
                candidate.difficulty,
                candidate.score,
                timestamp(Utc::now()),
            ],
        )?;
        Ok(())
    }

    fn get_analysis_history(&self, keyword: &str, days: u32) -> Result<Vec<AnalysisRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT keyword, portal, volume, difficulty, cpc, competition, trend, analyzed_at
             FROM keyword_analysis
             WHERE keyword = ?1 AND analyzed_at >= ?2
             ORDER BY analyzed_at DESC, id DESC",
        )?;

        let rows = stmt.query_map(params![keyword, timestamp(cutoff(days))], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, u8>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (keyword, portal, volume, difficulty, cpc, competition, trend, analyzed_at) = row?;
            let analyzed_at = DateTime::parse_from_rfc3339(&analyzed_at)
                .map_err(|e| Error::with_source("invalid analyzed_at in history", e))?
                .with_timezone(&Utc);
            records.push(AnalysisRecord {
                keyword,
                portal: decode(&portal)?,
                volume: u64::try_from(volume).unwrap_or(0),
                difficulty,
                cpc,
                competition: decode(&competition)?,
                trend: decode(&trend)?,
                analyzed_at,
            });
        }
        Ok(records)
    }

    fn get_top_keywords(&self, limit: usize) -> Result<Vec<TopKeyword>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT keyword, COUNT(*) AS analyses, AVG(volume)
             FROM keyword_analysis
             GROUP BY keyword
             ORDER BY analyses DESC, keyword ASC
             LIMIT ?1",
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let top = stmt
            .query_map(params![limit], |row| {
                Ok(TopKeyword {
                    keyword: row.get(0)?,
                    count: u64::try_from(row.get::<_, i64>(1)?).unwrap_or(0),
                    average_volume: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(top)
    }
}

// ============================================================================
// In-Memory Implementation
// ============================================================================

#[derive(Debug, Clone)]
struct StoredRecommendation {
    base_keyword: String,
    candidate: RecommendationCandidate,
}

/// History kept in process memory
#[derive(Default)]
pub struct InMemoryHistoryStore {
    analyses: RwLock<Vec<AnalysisRecord>>,
    recommendations: RwLock<Vec<StoredRecommendation>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.analyses.read().map(|a| a.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Recommendations saved against `base_keyword`, in insertion order
    pub fn recommendations_for(&self, base_keyword: &str) -> Vec<RecommendationCandidate> {
        self.recommendations
            .read()
            .map(|recs| {
                recs.iter()
                    .filter(|r| r.base_keyword == base_keyword)
                    .map(|r| r.candidate.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn poisoned<T>(_: T) -> Error {
    Error::other("history lock poisoned")
}

impl HistoryStore for InMemoryHistoryStore {
    fn save_analysis(&self, record: &AnalysisRecord) -> Result<()> {
        self.analyses.write().map_err(poisoned)?.push(record.clone());
        Ok(())
    }

    fn save_recommendation(
        &self,
        base_keyword: &str,
        candidate: &RecommendationCandidate,
    ) -> Result<()> {
        self.recommendations
            .write()
            .map_err(poisoned)?
            .push(StoredRecommendation {
                base_keyword: base_keyword.to_string(),
                candidate: candidate.clone(),
            });
        Ok(())
    }

    fn get_analysis_history(&self, keyword: &str, days: u32) -> Result<Vec<AnalysisRecord>> {
        let since = cutoff(days);
        let analyses = self.analyses.read().map_err(poisoned)?;

        let mut records: Vec<AnalysisRecord> = analyses
            .iter()
            .filter(|r| r.keyword == keyword && r.analyzed_at >= since)
            .cloned()
            .collect();
        // Reverse first so equal timestamps keep newest-inserted first
        records.reverse();
        records.sort_by(|a, b| b.analyzed_at.cmp(&a.analyzed_at));
        Ok(records)
    }

    fn get_top_keywords(&self, limit: usize) -> Result<Vec<TopKeyword>> {
        let analyses = self.analyses.read().map_err(poisoned)?;

        let mut totals: std::collections::BTreeMap<&str, (u64, u64)> = Default::default();
        for record in analyses.iter() {
            let entry = totals.entry(record.keyword.as_str()).or_default();
            entry.0 += 1;
            entry.1 += record.volume;
        }

        let mut top: Vec<TopKeyword> = totals
            .into_iter()
            .map(|(keyword, (count, volume))| TopKeyword {
                keyword: keyword.to_string(),
                count,
                average_volume: volume as f64 / count as f64,
            })
            .collect();
        // BTreeMap order is alphabetical, the stable sort keeps it for ties
        top.sort_by(|a, b| b.count.cmp(&a.count));
        top.truncate(limit);
        Ok(top)
    }
}

// ============================================================================
// Tests
// ============================================================================
