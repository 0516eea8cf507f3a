// Core data structures for keyword-radar

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Search surface for which metrics are estimated independently
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Portal {
    Google,
    Naver,
    Daum,
    YouTube,
}

impl Portal {
    /// Get all portals in analysis order
    pub fn all() -> [Self; 4] {
        [Self::Google, Self::Naver, Self::Daum, Self::YouTube]
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "Google",
            Self::Naver => "Naver",
            Self::Daum => "Daum",
            Self::YouTube => "YouTube",
        }
    }

    /// Get Korean name
    pub fn korean_name(&self) -> &'static str {
        match self {
            Self::Google => "구글",
            Self::Naver => "네이버",
            Self::Daum => "다음",
            Self::YouTube => "유튜브",
        }
    }

    /// Create from string (supports both English and Korean names)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "google" | "구글" => Some(Self::Google),
            "naver" | "네이버" => Some(Self::Naver),
            "daum" | "다음" => Some(Self::Daum),
            "youtube" | "유튜브" => Some(Self::YouTube),
            _ => None,
        }
    }
}

impl std::fmt::Display for Portal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Competition bucket derived from keyword difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Competition {
    Low,
    Medium,
    High,
}

impl Competition {
    /// Bucket a 0-100 difficulty score
    pub fn from_difficulty(difficulty: u8) -> Self {
        if difficulty < 30 {
            Self::Low
        } else if difficulty < 60 {
            Self::Medium
        } else {
            Self::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

/// Human-facing difficulty level shown next to portal metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DifficultyLevel {
    Easy,
    Medium,
    Hard,
}

impl DifficultyLevel {
    pub fn from_difficulty(difficulty: u8) -> Self {
        match Competition::from_difficulty(difficulty) {
            Competition::Low => Self::Easy,
            Competition::Medium => Self::Medium,
            Competition::High => Self::Hard,
        }
    }
}

/// Text-signal trend label of a keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendLabel {
    Rising,
    Stable,
    Declining,
}

impl TrendLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rising => "rising",
            Self::Stable => "stable",
            Self::Declining => "declining",
        }
    }
}

/// Portal-specific metrics estimated for one keyword
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordMetric {
    pub keyword: String,
    pub portal: Portal,
    #[serde(rename = "estimated_search_volume")]
    pub volume: u64,
    pub difficulty: u8,
    pub cpc: f64,
    #[serde(rename = "competition_level")]
    pub competition: Competition,
    pub trend: TrendLabel,
    #[serde(rename = "related_keywords")]
    pub related: Vec<String>,
}

/// Outcome of the optional live related-terms lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EnrichmentStatus {
    /// No live lookup configured for this call
    Skipped,
    /// Related terms replaced with live results
    Available { terms: usize },
    /// Lookup failed; heuristic related terms were kept
    Error { message: String },
}

/// Search intent category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Informational,
    Navigational,
    Commercial,
    Transactional,
}

impl Intent {
    pub fn all() -> [Self; 4] {
        [
            Self::Informational,
            Self::Navigational,
            Self::Commercial,
            Self::Transactional,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Informational => "informational",
            Self::Navigational => "navigational",
            Self::Commercial => "commercial",
            Self::Transactional => "transactional",
        }
    }

    /// Content format best matching this intent
    pub fn suggested_format(&self) -> &'static str {
        match self {
            Self::Informational => "tutorial",
            Self::Navigational => "channel trailer",
            Self::Commercial => "review",
            Self::Transactional => "product demo",
        }
    }

    /// Content types worth producing for this intent
    pub fn content_types(&self) -> Vec<String> {
        let types: &[&str] = match self {
            Self::Informational => &["how-to", "explainer", "guide", "shorts"],
            Self::Navigational => &["channel trailer", "playlist", "community post"],
            Self::Commercial => &["review", "comparison", "top list", "unboxing"],
            Self::Transactional => &["product demo", "deal roundup", "walkthrough"],
        };
        types.iter().map(|t| (*t).to_string()).collect()
    }
}

/// Token-vote search intent classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchIntent {
    pub keyword: String,
    #[serde(rename = "primary_intent")]
    pub primary: Intent,
    #[serde(rename = "intent_scores")]
    pub scores: BTreeMap<Intent, u32>,
    pub confidence: f64,
    pub suggested_format: String,
    pub content_types: Vec<String>,
}

impl SearchIntent {
    pub fn score(&self, intent: Intent) -> u32 {
        self.scores.get(&intent).copied().unwrap_or(0)
    }
}

/// Full single-portal analysis as returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalAnalysis {
    #[serde(flatten)]
    pub metric: KeywordMetric,
    pub monthly_searches: u64,
    pub opportunity_score: f64,
    pub difficulty_level: DifficultyLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_intent: Option<SearchIntent>,
    pub enrichment: EnrichmentStatus,
}

/// Aggregate of one keyword analysed across every portal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiPortalResult {
    pub keyword: String,
    pub timestamp: DateTime<Utc>,
    pub portals: BTreeMap<Portal, PortalAnalysis>,
}

impl MultiPortalResult {
    /// Metric for one portal, if it was analysed
    pub fn metric(&self, portal: Portal) -> Option<&KeywordMetric> {
        self.portals.get(&portal).map(|analysis| &analysis.metric)
    }
}

/// One row of a side-by-side keyword comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordComparison {
    pub keyword: String,
    pub google_volume: u64,
    pub naver_volume: u64,
    pub daum_volume: u64,
    pub youtube_volume: u64,
    pub difficulty: u8,
    pub google_cpc: f64,
    pub competition: Competition,
    pub trend: TrendLabel,
    pub opportunity_score: f64,
}

/// Day-over-day movement of a trend point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointDirection {
    Up,
    Down,
}

/// One synthetic daily observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub search_volume: u64,
    pub interest_level: u8,
    pub direction: PointDirection,
}

/// Fold over a trend point sequence
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub average_volume: f64,
    pub peak_volume: f64,
    pub min_volume: f64,
    pub average_interest: f64,
    pub volatility: f64,
}

/// Slope-based direction of a whole series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Rising,
    SlightlyRising,
    Stable,
    SlightlyFalling,
    Falling,
}

impl TrendDirection {
    /// Classify a normalized velocity in `[-1.0, 1.0]`
    ///
    /// - `velocity > 0.3`: Rising
    /// - `0.1 < velocity <= 0.3`: SlightlyRising
    /// - `-0.1 <= velocity <= 0.1`: Stable
    /// - `-0.3 <= velocity < -0.1`: SlightlyFalling
    /// - `velocity < -0.3`: Falling
    #[must_use]
    pub fn from_velocity(velocity: f64) -> Self {
        if velocity > 0.3 {
            Self::Rising
        } else if velocity > 0.1 {
            Self::SlightlyRising
        } else if velocity >= -0.1 {
            Self::Stable
        } else if velocity >= -0.3 {
            Self::SlightlyFalling
        } else {
            Self::Falling
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rising => "rising",
            Self::SlightlyRising => "slightly_rising",
            Self::Stable => "stable",
            Self::SlightlyFalling => "slightly_falling",
            Self::Falling => "falling",
        }
    }
}

/// Windowed trend analysis of a keyword
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub keyword: String,
    pub days: u32,
    pub points: Vec<TrendPoint>,
    pub summary: TrendSummary,
    pub direction: TrendDirection,
    pub velocity: f64,
    pub peak_date: Option<NaiveDate>,
}

/// Posting schedule derived from a seasonal profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingSchedule {
    pub best_month: String,
    pub best_day: String,
    pub avoid_months: Vec<String>,
    pub posting_frequency: PostingFrequency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostingFrequency {
    Daily,
    Regular,
}

impl PostingFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "Daily",
            Self::Regular => "Regular",
        }
    }
}

/// Monthly and weekday demand profile of a keyword
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalProfile {
    pub keyword: String,
    /// Month (1-12) to average volume
    pub monthly_pattern: BTreeMap<u32, f64>,
    /// Weekday (0 = Monday .. 6 = Sunday) to average volume
    pub daily_pattern: BTreeMap<u32, f64>,
    pub seasonality_strength: f64,
    pub peak_months: Vec<u32>,
    pub low_months: Vec<u32>,
    pub recommendation: PostingSchedule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictedTrend {
    Increasing,
    Decreasing,
}

impl PredictedTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Increasing => "increasing",
            Self::Decreasing => "decreasing",
        }
    }
}

/// Polynomial projection of future daily volume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub keyword: String,
    pub current_volume: f64,
    pub predicted_volumes: Vec<f64>,
    pub predicted_trend: PredictedTrend,
    pub confidence: f64,
    pub prediction_dates: Vec<NaiveDate>,
}

impl Prediction {
    /// Projected volume at the end of month `n` (1-based)
    pub fn volume_after_months(&self, n: usize) -> Option<f64> {
        n.checked_mul(30)
            .and_then(|day| day.checked_sub(1))
            .and_then(|idx| self.predicted_volumes.get(idx))
            .copied()
    }

    /// Percentage change from the current volume to the last projection
    pub fn growth_rate(&self) -> f64 {
        match self.predicted_volumes.last() {
            Some(last) if self.current_volume > 0.0 => {
                (last - self.current_volume) / self.current_volume * 100.0
            }
            _ => 0.0,
        }
    }

    /// Bucketed confidence label
    pub fn confidence_level(&self) -> &'static str {
        if self.confidence >= 80.0 {
            "high"
        } else if self.confidence >= 50.0 {
            "medium"
        } else {
            "low"
        }
    }
}

/// Generator family a recommendation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    RelatedCombination,
    Trending,
    Niche,
    LowCompetition,
    ShortTail,
    LongTail,
}

impl CandidateKind {
    /// Short explanation attached to synced recommendations
    pub fn reason(&self) -> &'static str {
        match self {
            Self::RelatedCombination => "Common modifier combined with the base keyword",
            Self::Trending => "Year-anchored variant riding current interest",
            Self::Niche => "Segment-specific variant with higher conversion",
            Self::LowCompetition => "Specific variant with low estimated difficulty",
            Self::ShortTail => "Broad head term with the highest volume",
            Self::LongTail => "Specific phrase with lower competition",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RelatedCombination => "related_combination",
            Self::Trending => "trending",
            Self::Niche => "niche",
            Self::LowCompetition => "low_competition",
            Self::ShortTail => "short_tail",
            Self::LongTail => "long_tail",
        }
    }
}

/// Derived keyword with attached estimator outputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationCandidate {
    pub keyword: String,
    pub volume: u64,
    pub difficulty: u8,
    pub trend: TrendLabel,
    #[serde(rename = "type")]
    pub kind: CandidateKind,
    pub conversion_potential: f64,
    /// Weighted score, filled in by the scorer
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordTypeAdvice {
    FocusShortTail,
    FocusLongTail,
    Mix,
}

impl KeywordTypeAdvice {
    pub fn message(&self) -> &'static str {
        match self {
            Self::FocusShortTail => "Focus on short-tail keywords for higher volume",
            Self::FocusLongTail => "Focus on long-tail keywords for lower competition",
            Self::Mix => "Mix both short and long-tail keywords",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortLongComparison {
    pub short_tail_avg_volume: f64,
    pub long_tail_avg_volume: f64,
    pub short_tail_avg_difficulty: f64,
    pub long_tail_avg_difficulty: f64,
    pub recommendation: KeywordTypeAdvice,
}

/// Short-tail versus long-tail decomposition report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortLongAnalysis {
    pub original_keyword: String,
    pub short_keywords: Vec<RecommendationCandidate>,
    pub long_keywords: Vec<RecommendationCandidate>,
    pub comparison: ShortLongComparison,
}

/// Competitor keyword worth targeting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub keyword: String,
    pub volume: u64,
    pub difficulty: u8,
    pub opportunity_score: f64,
}

/// Set algebra between competitor and own keyword collections
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompetitorGapResult {
    #[serde(rename = "overlap_keywords")]
    pub overlap: BTreeSet<String>,
    pub competitor_unique: BTreeSet<String>,
    pub your_unique: BTreeSet<String>,
    pub opportunities: Vec<Opportunity>,
}
