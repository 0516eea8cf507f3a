//! Recommendation scoring and short/long-tail reports

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::estimator::Estimator;
use crate::models::{
    KeywordTypeAdvice, RecommendationCandidate, ShortLongAnalysis, ShortLongComparison, TrendLabel,
};

/// Ratio one tail family must exceed the other by to be recommended alone
const TAIL_DOMINANCE: f64 = 1.5;

/// Weights of the multi-factor recommendation score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub volume_divisor: f64,
    pub volume_weight: f64,
    pub difficulty_weight: f64,
    pub rising_bonus: f64,
    pub stable_bonus: f64,
    pub conversion_weight: f64,
    pub max_score: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            volume_divisor: 10_000.0,
            volume_weight: 30.0,
            difficulty_weight: 0.3,
            rising_bonus: 20.0,
            stable_bonus: 10.0,
            conversion_weight: 20.0,
            max_score: 100.0,
        }
    }
}

impl ScoreWeights {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.volume_divisor > 0.0 && self.volume_divisor.is_finite()) {
            return Err("score_weights.volume_divisor must be positive".to_string());
        }
        let weights = [
            self.volume_weight,
            self.difficulty_weight,
            self.rising_bonus,
            self.stable_bonus,
            self.conversion_weight,
        ];
        if weights.iter().any(|w| *w < 0.0 || !w.is_finite()) {
            return Err("score weights must be finite and non-negative".to_string());
        }
        if !(self.max_score > 0.0 && self.max_score.is_finite()) {
            return Err("score_weights.max_score must be positive".to_string());
        }
        Ok(())
    }
}

/// Weighted score of one candidate, capped at `weights.max_score`
///
/// Non-decreasing in volume and conversion potential, non-increasing in
/// difficulty.
pub fn score_candidate(candidate: &RecommendationCandidate, weights: &ScoreWeights) -> f64 {
    let volume_term = candidate.volume as f64 / weights.volume_divisor * weights.volume_weight;
    let difficulty_term =
        (100.0 - f64::from(candidate.difficulty)).max(0.0) * weights.difficulty_weight;
    let trend_term = match candidate.trend {
        TrendLabel::Rising => weights.rising_bonus,
        TrendLabel::Stable => weights.stable_bonus,
        TrendLabel::Declining => 0.0,
    };
    let conversion_term = candidate.conversion_potential * weights.conversion_weight;

    (volume_term + difficulty_term + trend_term + conversion_term).min(weights.max_score)
}

/// Fill in scores and sort descending; ties keep generation order
pub fn score_candidates(
    mut candidates: Vec<RecommendationCandidate>,
    weights: &ScoreWeights,
) -> Vec<RecommendationCandidate> {
    for candidate in &mut candidates {
        candidate.score = score_candidate(candidate, weights);
    }
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    candidates
}

/// Top `per_keyword` candidates of each base keyword, then the global top `limit`
pub fn rank_recommendations<S: AsRef<str>>(
    estimator: &Estimator,
    keywords: &[S],
    channel_topic: Option<&str>,
    per_keyword: usize,
    limit: usize,
    weights: &ScoreWeights,
) -> Vec<RecommendationCandidate> {
    let mut ranked: Vec<RecommendationCandidate> = keywords
        .iter()
        .flat_map(|keyword| {
            let pool = estimator.recommendation_pool(keyword.as_ref(), channel_topic);
            let mut scored = score_candidates(pool, weights);
            scored.truncate(per_keyword);
            scored
        })
        .collect();

    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(limit);
    ranked
}

/// Short-tail versus long-tail decomposition with averaged metrics
pub fn analyze_short_long(estimator: &Estimator, keyword: &str) -> ShortLongAnalysis {
    let short_keywords = estimator.short_tail(keyword);
    let long_keywords = estimator.long_tail(keyword);

    let short_tail_avg_volume = average(short_keywords.iter().map(|c| c.volume as f64));
    let long_tail_avg_volume = average(long_keywords.iter().map(|c| c.volume as f64));
    let short_tail_avg_difficulty =
        average(short_keywords.iter().map(|c| f64::from(c.difficulty)));
    let long_tail_avg_difficulty =
        average(long_keywords.iter().map(|c| f64::from(c.difficulty)));

    let recommendation = if short_tail_avg_volume > long_tail_avg_volume * TAIL_DOMINANCE {
        KeywordTypeAdvice::FocusShortTail
    } else if long_tail_avg_volume > short_tail_avg_volume * TAIL_DOMINANCE {
        KeywordTypeAdvice::FocusLongTail
    } else {
        KeywordTypeAdvice::Mix
    };

    ShortLongAnalysis {
        original_keyword: keyword.to_string(),
        short_keywords,
        long_keywords,
        comparison: ShortLongComparison {
            short_tail_avg_volume,
            long_tail_avg_volume,
            short_tail_avg_difficulty,
            long_tail_avg_difficulty,
            recommendation,
        },
    }
}

/// Mean of the values, zero when there are none
fn average(values: impl Iterator<Item = f64>) -> f64 {
    let values: Vec<f64> = values.collect();
    if values.is_empty() {
        0.0
    } else {
        values.iter().mean()
    }
}
