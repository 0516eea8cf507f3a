//! Candidate keyword generators
//!
//! Each generator derives keyword strings from a base keyword and attaches
//! Google-family volume and difficulty estimates. Scores are left at zero for
//! the recommendation scorer to fill in.

use super::Estimator;
use crate::models::{CandidateKind, Portal, RecommendationCandidate, TrendLabel};
use crate::utils::words;

impl Estimator {
    /// Candidate with estimator outputs attached and neutral trend/conversion
    fn candidate(&self, keyword: String, kind: CandidateKind) -> RecommendationCandidate {
        RecommendationCandidate {
            volume: self.volume(&keyword, Portal::Google),
            difficulty: self.difficulty(&keyword),
            trend: TrendLabel::Stable,
            kind,
            conversion_potential: 0.0,
            score: 0.0,
            keyword,
        }
    }

    /// First word and first two words of the keyword, without duplicates
    pub fn short_tail(&self, keyword: &str) -> Vec<RecommendationCandidate> {
        let words = words(keyword);
        let mut keywords: Vec<String> = Vec::with_capacity(2);
        for n in [1, 2] {
            if words.len() < n && !keywords.is_empty() {
                break;
            }
            let prefix = words[..n.min(words.len())].join(" ");
            if !prefix.is_empty() && !keywords.contains(&prefix) {
                keywords.push(prefix);
            }
        }

        keywords
            .into_iter()
            .map(|kw| self.candidate(kw, CandidateKind::ShortTail))
            .collect()
    }

    /// Every contiguous three-word window of the keyword
    pub fn long_tail(&self, keyword: &str) -> Vec<RecommendationCandidate> {
        words(keyword)
            .windows(3)
            .map(|window| {
                let kw = window.join(" ");
                let conversion = self.conversion_potential(&kw);
                let mut candidate = self.candidate(kw, CandidateKind::LongTail);
                candidate.conversion_potential = conversion;
                candidate
            })
            .collect()
    }

    /// Keyword prefixed with each related modifier
    pub fn related_combinations(&self, keyword: &str) -> Vec<RecommendationCandidate> {
        self.config()
            .related_modifiers
            .iter()
            .map(|modifier| {
                self.candidate(
                    format!("{modifier} {keyword}"),
                    CandidateKind::RelatedCombination,
                )
            })
            .collect()
    }

    /// Keyword suffixed with each trending year, always rising
    pub fn trending_variants(&self, keyword: &str) -> Vec<RecommendationCandidate> {
        self.config()
            .trending_years
            .iter()
            .map(|year| {
                let mut candidate =
                    self.candidate(format!("{keyword} {year}"), CandidateKind::Trending);
                candidate.trend = TrendLabel::Rising;
                candidate
            })
            .collect()
    }

    /// Keyword prefixed with segment modifiers, plus the channel topic if given
    pub fn niche_variants(
        &self,
        keyword: &str,
        channel_topic: Option<&str>,
    ) -> Vec<RecommendationCandidate> {
        let config = self.config();
        let mut keywords: Vec<String> = config
            .niche_modifiers
            .iter()
            .map(|modifier| format!("{modifier} {keyword}"))
            .collect();

        if let Some(topic) = channel_topic.map(str::trim).filter(|t| !t.is_empty()) {
            let topical = format!("{topic} {keyword}");
            if !keywords.contains(&topical) {
                keywords.push(topical);
            }
        }

        keywords
            .into_iter()
            .map(|kw| {
                let mut candidate = self.candidate(kw, CandidateKind::Niche);
                candidate.conversion_potential = config.niche_conversion;
                candidate
            })
            .collect()
    }

    /// Keyword suffixed with specificity modifiers, dropping difficult results
    pub fn low_competition_variants(&self, keyword: &str) -> Vec<RecommendationCandidate> {
        let threshold = self.config().low_competition_threshold;

        self.config()
            .specificity_modifiers
            .iter()
            .map(|modifier| {
                self.candidate(
                    format!("{keyword} {modifier}"),
                    CandidateKind::LowCompetition,
                )
            })
            .filter(|candidate| candidate.difficulty < threshold)
            .collect()
    }

    /// All four recommendation families for one base keyword
    pub fn recommendation_pool(
        &self,
        keyword: &str,
        channel_topic: Option<&str>,
    ) -> Vec<RecommendationCandidate> {
        let mut pool = self.related_combinations(keyword);
        pool.extend(self.trending_variants(keyword));
        pool.extend(self.niche_variants(keyword, channel_topic));
        pool.extend(self.low_competition_variants(keyword));
        pool
    }
}

#[cfg(test)]
mod tests {
    use crate::estimator::{Estimator, HeuristicConfig};
    use crate::models::{CandidateKind, TrendLabel};

    fn estimator() -> Estimator {
        Estimator::new(HeuristicConfig::for_year(2025))
    }

    fn keywords(candidates: &[crate::models::RecommendationCandidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.keyword.as_str()).collect()
    }

    #[test]
    fn test_short_long_decomposition() {
        let e = estimator();
        assert_eq!(keywords(&e.short_tail("a b c d")), vec!["a", "a b"]);
        assert_eq!(keywords(&e.long_tail("a b c d")), vec!["a b c", "b c d"]);
    }

    #[test]
    fn test_short_tail_single_word_is_deduplicated() {
        let e = estimator();
        assert_eq!(keywords(&e.short_tail("rust")), vec!["rust"]);
        assert!(e.long_tail("rust").is_empty());
        assert!(e.long_tail("learn rust").is_empty());
    }

    #[test]
    fn test_long_tail_conversion_potential() {
        let e = estimator();
        let long = e.long_tail("buy best rust book");
        assert_eq!(long.len(), 2);
        // "buy best rust" hits buy + best
        assert!((long[0].conversion_potential - 0.4).abs() < 1e-9);
        assert_eq!(long[0].kind, CandidateKind::LongTail);
    }

    #[test]
    fn test_related_combinations_prefix() {
        let e = estimator();
        let related = e.related_combinations("rust");
        assert_eq!(related.len(), 6);
        assert_eq!(related[1].keyword, "how to rust");
        assert!(related.iter().all(|c| c.kind == CandidateKind::RelatedCombination));
    }

    #[test]
    fn test_trending_variants_are_rising() {
        let e = estimator();
        let trending = e.trending_variants("rust");
        assert_eq!(keywords(&trending), vec!["rust 2025", "rust 2026"]);
        assert!(trending.iter().all(|c| c.trend == TrendLabel::Rising));
    }

    #[test]
    fn test_niche_variants_with_topic() {
        let e = estimator();
        assert_eq!(e.niche_variants("rust", None).len(), 4);

        let niche = e.niche_variants("rust", Some("gamedev"));
        assert_eq!(niche.len(), 5);
        assert_eq!(niche[4].keyword, "gamedev rust");
        assert!(niche.iter().all(|c| (c.conversion_potential - 0.7).abs() < 1e-9));
    }

    #[test]
    fn test_low_competition_threshold_drops_candidates() {
        let e = estimator();
        assert_eq!(e.low_competition_variants("rust").len(), 4);
        // "best new rust exact": 4 words (20) + recency (15) + common (10) = 45
        assert!(e.low_competition_variants("best new rust").is_empty());

        let mut config = HeuristicConfig::for_year(2025);
        config.low_competition_threshold = 30;
        let e = Estimator::new(config);
        // "rust exact" keeps difficulty 30, which is no longer below the threshold
        assert!(e.low_competition_variants("rust").is_empty());
    }
}
