//! Scalar keyword estimators
//!
//! Pure functions of `(keyword, portal)` turning keyword text into volume,
//! difficulty, CPC, competition, trend and search-intent signals. Every
//! constant lives in [`HeuristicConfig`] so callers and tests can override it.
//!
//! # Example
//!
//! ```
//! use keyword_radar::estimator::{Estimator, HeuristicConfig};
//! use keyword_radar::models::Portal;
//!
//! let estimator = Estimator::new(HeuristicConfig::for_year(2025));
//! let metric = estimator.metric("python tutorial", Portal::Google);
//! assert_eq!(metric.volume, 1600);
//! assert_eq!(metric.difficulty, 30);
//! ```

pub mod candidates;
pub mod enrichment;

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{Competition, Intent, KeywordMetric, Portal, SearchIntent, TrendLabel};
use crate::utils::{contains_any, count_matches, round2, word_count};

pub use enrichment::{PortalEnricher, RelatedTermsSource};

/// Volume and CPC constants for one portal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortalHeuristics {
    /// Base daily volume before word-count scaling
    pub base_volume: f64,

    /// Volume multiplier per word
    pub word_factor: f64,

    /// Multiplier applied when a recency token is present
    pub trending_boost: f64,

    /// Base cost per click
    pub base_cpc: f64,
}

/// Token lists voting for each search intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentSignals {
    pub informational: Vec<String>,
    pub navigational: Vec<String>,
    pub commercial: Vec<String>,
    pub transactional: Vec<String>,
}

impl IntentSignals {
    /// Signal list for one intent
    pub fn signals(&self, intent: Intent) -> &[String] {
        match intent {
            Intent::Informational => &self.informational,
            Intent::Navigational => &self.navigational,
            Intent::Commercial => &self.commercial,
            Intent::Transactional => &self.transactional,
        }
    }
}

impl Default for IntentSignals {
    fn default() -> Self {
        Self {
            informational: strings(&["what", "how", "why", "guide", "tutorial", "방법", "뜻"]),
            navigational: strings(&["site", "page", "app", "channel", "채널", "사이트"]),
            commercial: strings(&["best", "review", "vs", "comparison", "top", "추천", "비교"]),
            transactional: strings(&["buy", "order", "download", "discount", "구매", "다운로드"]),
        }
    }
}

/// Every heuristic constant used by the estimators and candidate generators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicConfig {
    pub google: PortalHeuristics,
    pub naver: PortalHeuristics,
    pub daum: PortalHeuristics,
    pub youtube: PortalHeuristics,

    /// Starting difficulty before adjustments
    pub difficulty_base: i32,
    /// Subtracted when the keyword has more than three words
    pub long_query_discount: i32,
    /// Subtracted when the keyword has exactly three words
    pub medium_query_discount: i32,
    /// Added when a recency token is present
    pub recency_penalty: i32,
    /// Added when a common query word is present
    pub common_word_penalty: i32,

    pub cpc_per_word: f64,
    pub cpc_commercial_bonus: f64,

    /// Year and freshness tokens ("2025", "new", "latest") that boost volume
    /// and mark a keyword as rising
    pub recency_tokens: Vec<String>,
    /// Year and freshness tokens that raise difficulty; "latest" is not one
    pub difficulty_recency_tokens: Vec<String>,
    /// Tokens that mark a keyword as rising alongside the recency tokens
    pub superlative_tokens: Vec<String>,
    /// Tokens that mark a keyword as declining
    pub decay_tokens: Vec<String>,
    pub common_query_tokens: Vec<String>,
    pub commercial_tokens: Vec<String>,
    pub conversion_tokens: Vec<String>,
    pub conversion_weight: f64,
    pub intent_signals: IntentSignals,

    /// Prefixes for related combinations
    pub related_modifiers: Vec<String>,
    /// Year suffixes for trending variants
    pub trending_years: Vec<String>,
    /// Prefixes for niche variants
    pub niche_modifiers: Vec<String>,
    pub niche_conversion: f64,
    /// Suffixes for low-competition variants
    pub specificity_modifiers: Vec<String>,
    /// Low-competition variants at or above this difficulty are dropped
    pub low_competition_threshold: u8,
}

impl HeuristicConfig {
    /// Defaults with year tokens anchored on `year`
    pub fn for_year(year: i32) -> Self {
        let this_year = year.to_string();
        let next_year = (year + 1).to_string();

        Self {
            google: PortalHeuristics {
                base_volume: 1000.0,
                word_factor: 0.3,
                trending_boost: 1.5,
                base_cpc: 1.5,
            },
            naver: PortalHeuristics {
                base_volume: 800.0,
                word_factor: 0.25,
                trending_boost: 1.0,
                base_cpc: 1.0,
            },
            daum: PortalHeuristics {
                base_volume: 600.0,
                word_factor: 0.2,
                trending_boost: 1.0,
                base_cpc: 1.0,
            },
            youtube: PortalHeuristics {
                base_volume: 1200.0,
                word_factor: 0.35,
                trending_boost: 1.5,
                base_cpc: 1.0,
            },
            difficulty_base: 30,
            long_query_discount: 10,
            medium_query_discount: 5,
            recency_penalty: 15,
            common_word_penalty: 10,
            cpc_per_word: 0.2,
            cpc_commercial_bonus: 0.5,
            recency_tokens: vec![
                this_year.clone(),
                next_year.clone(),
                "new".to_string(),
                "latest".to_string(),
            ],
            difficulty_recency_tokens: vec![this_year.clone(), next_year.clone(), "new".to_string()],
            superlative_tokens: strings(&["best", "top", "trending"]),
            decay_tokens: strings(&["old", "outdated", "legacy"]),
            common_query_tokens: strings(&["how", "what", "best", "top"]),
            commercial_tokens: strings(&["buy", "price", "best", "review"]),
            conversion_tokens: strings(&["buy", "how to", "best", "review", "price"]),
            conversion_weight: 0.2,
            intent_signals: IntentSignals::default(),
            related_modifiers: strings(&[
                "best",
                "how to",
                "guide",
                "tutorial",
                "tips",
                "for beginners",
            ]),
            trending_years: vec![this_year, next_year],
            niche_modifiers: strings(&["advanced", "professional", "enterprise", "startup"]),
            niche_conversion: 0.7,
            specificity_modifiers: strings(&["specific", "exact", "detailed", "comprehensive"]),
            low_competition_threshold: 40,
        }
    }

    /// Constants for one portal
    pub fn portal(&self, portal: Portal) -> &PortalHeuristics {
        match portal {
            Portal::Google => &self.google,
            Portal::Naver => &self.naver,
            Portal::Daum => &self.daum,
            Portal::YouTube => &self.youtube,
        }
    }

    /// Check that every list and factor is usable
    pub fn validate(&self) -> Result<(), String> {
        for portal in Portal::all() {
            let h = self.portal(portal);
            if h.base_volume < 0.0 || h.word_factor < 0.0 || h.trending_boost < 0.0 {
                return Err(format!("{portal} volume constants must be non-negative"));
            }
            if h.base_cpc < 0.0 {
                return Err(format!("{portal} base_cpc must be non-negative"));
            }
        }

        let lists = [
            ("related_modifiers", &self.related_modifiers),
            ("trending_years", &self.trending_years),
            ("niche_modifiers", &self.niche_modifiers),
            ("specificity_modifiers", &self.specificity_modifiers),
        ];
        for (name, list) in lists {
            if list.is_empty() {
                return Err(format!("{name} must not be empty"));
            }
        }

        if !(0.0..=1.0).contains(&self.niche_conversion) {
            return Err("niche_conversion must be within 0..=1".to_string());
        }

        Ok(())
    }
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self::for_year(chrono::Local::now().year())
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// Stateless estimator over a fixed set of heuristic constants
#[derive(Debug, Clone, Default)]
pub struct Estimator {
    config: HeuristicConfig,
}

impl Estimator {
    pub fn new(config: HeuristicConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HeuristicConfig {
        &self.config
    }

    /// Estimated daily search volume on `portal`
    pub fn volume(&self, keyword: &str, portal: Portal) -> u64 {
        let h = self.config.portal(portal);
        let words = word_count(keyword) as f64;
        let boost = if contains_any(keyword, &self.config.recency_tokens) {
            h.trending_boost
        } else {
            1.0
        };

        let volume = h.base_volume * (1.0 + words * h.word_factor) * boost;
        // Truncation toward zero; negative products collapse to zero.
        volume.max(0.0) as u64
    }

    /// Keyword difficulty in `0..=100`
    pub fn difficulty(&self, keyword: &str) -> u8 {
        let c = &self.config;
        let mut difficulty = c.difficulty_base;

        let words = word_count(keyword);
        if words > 3 {
            difficulty -= c.long_query_discount;
        } else if words > 2 {
            difficulty -= c.medium_query_discount;
        }

        if contains_any(keyword, &c.difficulty_recency_tokens) {
            difficulty += c.recency_penalty;
        }
        if contains_any(keyword, &c.common_query_tokens) {
            difficulty += c.common_word_penalty;
        }

        difficulty.clamp(0, 100) as u8
    }

    /// Estimated cost per click on `portal`, rounded to cents
    pub fn cpc(&self, keyword: &str, portal: Portal) -> f64 {
        let c = &self.config;
        let base = c.portal(portal).base_cpc;
        let words = word_count(keyword) as f64 * c.cpc_per_word;
        let commercial = if contains_any(keyword, &c.commercial_tokens) {
            c.cpc_commercial_bonus
        } else {
            0.0
        };

        round2((base + words + commercial).max(0.0))
    }

    pub fn competition(&self, keyword: &str) -> Competition {
        Competition::from_difficulty(self.difficulty(keyword))
    }

    /// Text-signal trend: recency or superlative tokens win over decay tokens
    pub fn trend(&self, keyword: &str) -> TrendLabel {
        let c = &self.config;
        if contains_any(keyword, &c.recency_tokens) || contains_any(keyword, &c.superlative_tokens)
        {
            TrendLabel::Rising
        } else if contains_any(keyword, &c.decay_tokens) {
            TrendLabel::Declining
        } else {
            TrendLabel::Stable
        }
    }

    /// Token-vote intent classification
    ///
    /// Ties resolve to the first intent in declaration order, so a keyword
    /// with no signal tokens is informational with zero confidence.
    pub fn search_intent(&self, keyword: &str) -> SearchIntent {
        let scores: BTreeMap<Intent, u32> = Intent::all()
            .into_iter()
            .map(|intent| {
                let votes = count_matches(keyword, self.config.intent_signals.signals(intent));
                (intent, votes as u32)
            })
            .collect();

        let mut primary = Intent::Informational;
        let mut best = 0;
        for intent in Intent::all() {
            let votes = scores.get(&intent).copied().unwrap_or(0);
            if votes > best {
                best = votes;
                primary = intent;
            }
        }

        let total: u32 = scores.values().sum();
        let confidence = f64::from(best) / f64::from(total + 1);

        SearchIntent {
            keyword: keyword.to_string(),
            primary,
            scores,
            confidence,
            suggested_format: primary.suggested_format().to_string(),
            content_types: primary.content_types(),
        }
    }

    /// Conversion potential in `0..=1` from commercial-indicator tokens
    pub fn conversion_potential(&self, keyword: &str) -> f64 {
        let c = &self.config;
        let hits = count_matches(keyword, &c.conversion_tokens) as f64;
        (hits * c.conversion_weight).min(1.0)
    }

    /// Reward/cost ratio shown next to portal metrics
    pub fn opportunity_score(&self, keyword: &str, portal: Portal) -> f64 {
        let volume = self.volume(keyword, portal) as f64;
        let difficulty = f64::from(self.difficulty(keyword));
        (volume / 100.0) / (difficulty / 50.0 + 1.0)
    }

    /// Heuristic related terms used when no live lookup is available
    pub fn related_terms(&self, keyword: &str) -> Vec<String> {
        vec![
            format!("{keyword} tutorial"),
            format!("{keyword} guide"),
            format!("best {keyword}"),
            format!("{keyword} for beginners"),
            format!("{keyword} tips"),
        ]
    }

    /// Full heuristic metric for one portal
    pub fn metric(&self, keyword: &str, portal: Portal) -> KeywordMetric {
        let difficulty = self.difficulty(keyword);

        KeywordMetric {
            keyword: keyword.to_string(),
            portal,
            volume: self.volume(keyword, portal),
            difficulty,
            cpc: self.cpc(keyword, portal),
            competition: Competition::from_difficulty(difficulty),
            trend: self.trend(keyword),
            related: self.related_terms(keyword),
        }
    }
}
