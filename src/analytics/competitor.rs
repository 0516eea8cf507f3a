//! Competitor keyword gap analysis

use std::collections::BTreeSet;

use crate::estimator::Estimator;
use crate::models::{CompetitorGapResult, Opportunity, Portal};

/// Thresholds a competitor-only keyword must pass to become an opportunity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapThresholds {
    /// Volume must be strictly above this
    pub min_volume: u64,
    /// Difficulty must be strictly below this
    pub max_difficulty: u8,
}

impl Default for GapThresholds {
    fn default() -> Self {
        Self {
            min_volume: 100,
            max_difficulty: 50,
        }
    }
}

/// Set algebra over both keyword collections plus ranked opportunities
///
/// Opportunity score is `volume / (difficulty + 1)`, highest first; ties are
/// ordered by keyword.
pub fn competitor_gap<S: AsRef<str>, T: AsRef<str>>(
    estimator: &Estimator,
    competitor_keywords: &[S],
    your_keywords: &[T],
    thresholds: GapThresholds,
) -> CompetitorGapResult {
    let competitor: BTreeSet<String> = collect_set(competitor_keywords);
    let yours: BTreeSet<String> = collect_set(your_keywords);

    let overlap: BTreeSet<String> = competitor.intersection(&yours).cloned().collect();
    let competitor_unique: BTreeSet<String> = competitor.difference(&yours).cloned().collect();
    let your_unique: BTreeSet<String> = yours.difference(&competitor).cloned().collect();

    let mut opportunities: Vec<Opportunity> = competitor_unique
        .iter()
        .filter_map(|keyword| {
            let volume = estimator.volume(keyword, Portal::Google);
            let difficulty = estimator.difficulty(keyword);
            if volume <= thresholds.min_volume || difficulty >= thresholds.max_difficulty {
                return None;
            }
            Some(Opportunity {
                keyword: keyword.clone(),
                volume,
                difficulty,
                opportunity_score: volume as f64 / (f64::from(difficulty) + 1.0),
            })
        })
        .collect();

    opportunities.sort_by(|a, b| b.opportunity_score.total_cmp(&a.opportunity_score));

    CompetitorGapResult {
        overlap,
        competitor_unique,
        your_unique,
        opportunities,
    }
}

/// Trimmed, non-empty keywords as a set
fn collect_set<S: AsRef<str>>(keywords: &[S]) -> BTreeSet<String> {
    keywords
        .iter()
        .map(|k| k.as_ref().trim())
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}
