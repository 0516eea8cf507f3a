//! Column layout of each logical database
//!
//! Every function here is a pure projection of an analysis record onto page
//! properties. Multi-select columns are truncated to the given cap, so callers
//! must not assume every label survives.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::property::{Properties, PropertyValue};
use crate::analytics::seasonality::month_name;
use crate::models::{
    CompetitorGapResult, Intent, MultiPortalResult, Portal, Prediction, RecommendationCandidate,
    SearchIntent, SeasonalProfile, TrendDirection, TrendLabel, TrendPoint,
};
use crate::utils::round2;

pub const KEYWORD: &str = "Keyword";
pub const STATUS: &str = "Status";
pub const DATE: &str = "Date";
pub const SCORE: &str = "Score";
pub const BASE_KEYWORD: &str = "Base Keyword";
pub const RELATED_KEYWORDS: &str = "Related Keywords";

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_RECOMMENDED: &str = "recommended";

/// Priority written with every new recommendation
pub const DEFAULT_PRIORITY: f64 = 3.0;

/// Days between a competitor analysis and its next review
pub const REVIEW_INTERVAL_DAYS: i64 = 30;

/// Content types kept on a search intent page
pub const CONTENT_TYPE_CAP: usize = 4;

/// Peak and low months kept on a prediction page
pub const SEASON_CAP: usize = 2;

/// Competitor analysis as recorded in the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorReport {
    pub name: String,
    pub competitor: String,
    pub our_channel: String,
    pub competitor_keywords: Vec<String>,
    pub our_keywords: Vec<String>,
    pub result: CompetitorGapResult,
}

impl CompetitorReport {
    /// Top opportunities as one line of text
    pub fn recommendations(&self, limit: usize) -> String {
        self.result
            .opportunities
            .iter()
            .take(limit)
            .map(|o| format!("{} ({:.1})", o.keyword, o.opportunity_score))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn number(value: impl Into<f64>) -> PropertyValue {
    PropertyValue::Number(value.into())
}

fn select(value: &str) -> PropertyValue {
    PropertyValue::Select(value.to_string())
}

fn relation(page_id: &str) -> PropertyValue {
    PropertyValue::Relation(vec![page_id.to_string()])
}

fn insert(properties: &mut Properties, name: &str, value: PropertyValue) {
    properties.insert(name.to_string(), value);
}

/// One row per keyword with per-portal volumes and Google-family scores
pub fn keyword_analysis(result: &MultiPortalResult, multi_select_cap: usize) -> Properties {
    let google = result.portals.get(&Portal::Google);
    let volume = |portal: Portal| result.metric(portal).map_or(0, |m| m.volume) as f64;
    let trend = |portal: Portal| {
        result
            .metric(portal)
            .map_or(TrendLabel::Stable, |m| m.trend)
            .as_str()
    };
    let cpc = |portal: Portal| result.metric(portal).map_or(0.0, |m| m.cpc);
    let intent = google
        .and_then(|a| a.search_intent.as_ref())
        .map_or(Intent::Informational, |i| i.primary);

    let mut p = Properties::new();
    insert(&mut p, KEYWORD, PropertyValue::Title(result.keyword.clone()));
    insert(&mut p, "Google Volume", number(volume(Portal::Google)));
    insert(&mut p, "Naver Volume", number(volume(Portal::Naver)));
    insert(&mut p, "Daum Volume", number(volume(Portal::Daum)));
    insert(&mut p, "YouTube Volume", number(volume(Portal::YouTube)));
    insert(
        &mut p,
        "Difficulty Score",
        number(google.map_or(0, |a| a.metric.difficulty)),
    );
    insert(&mut p, "Google CPC", number(cpc(Portal::Google)));
    insert(&mut p, "Naver CPC", number(cpc(Portal::Naver)));
    insert(
        &mut p,
        "Opportunity Score",
        number(round2(google.map_or(0.0, |a| a.opportunity_score))),
    );
    insert(&mut p, "Google Trend", select(trend(Portal::Google)));
    insert(&mut p, "Naver Trend", select(trend(Portal::Naver)));
    insert(&mut p, "Search Intent", select(intent.as_str()));
    insert(&mut p, STATUS, select(STATUS_ACTIVE));
    if let Some(related) = google.map(|a| &a.metric.related) {
        insert(
            &mut p,
            RELATED_KEYWORDS,
            PropertyValue::multi_select_capped(related, multi_select_cap),
        );
    }
    p
}

/// One daily observation linked to its keyword page
pub fn trend_point(
    keyword_page_id: &str,
    point: &TrendPoint,
    portal: Portal,
    direction: TrendDirection,
    peak_day: bool,
) -> Properties {
    let mut p = Properties::new();
    insert(&mut p, DATE, PropertyValue::Date(point.date.to_string()));
    insert(&mut p, KEYWORD, relation(keyword_page_id));
    insert(&mut p, "Search Volume", number(point.search_volume as f64));
    insert(&mut p, "Interest Level", number(point.interest_level));
    insert(&mut p, "Trend Direction", select(direction.as_str()));
    insert(&mut p, "Portal", select(portal.as_str()));
    insert(&mut p, "Peak Day", PropertyValue::Checkbox(peak_day));
    p
}

/// A scored recommendation linked to its base keyword page
pub fn recommendation(base_keyword_id: &str, candidate: &RecommendationCandidate) -> Properties {
    let mut p = Properties::new();
    insert(
        &mut p,
        "Recommendation",
        PropertyValue::Title(candidate.keyword.clone()),
    );
    insert(&mut p, BASE_KEYWORD, relation(base_keyword_id));
    insert(&mut p, SCORE, number(round2(candidate.score)));
    insert(&mut p, "Type", select(candidate.kind.as_str()));
    insert(&mut p, "Estimated Volume", number(candidate.volume as f64));
    insert(&mut p, "Difficulty", number(candidate.difficulty));
    insert(&mut p, "Trend", select(candidate.trend.as_str()));
    insert(
        &mut p,
        "Conversion Potential",
        number(candidate.conversion_potential),
    );
    insert(&mut p, STATUS, select(STATUS_RECOMMENDED));
    insert(&mut p, "Priority", number(DEFAULT_PRIORITY));
    insert(
        &mut p,
        "Reason",
        PropertyValue::RichText(candidate.kind.reason().to_string()),
    );
    p
}

/// Competitor gap summary with a follow-up review date
pub fn competitor_analysis(
    report: &CompetitorReport,
    analysed_at: DateTime<Utc>,
    multi_select_cap: usize,
) -> Properties {
    let next_review = analysed_at + Duration::days(REVIEW_INTERVAL_DAYS);

    let mut p = Properties::new();
    insert(
        &mut p,
        "Analysis Name",
        PropertyValue::Title(report.name.clone()),
    );
    insert(
        &mut p,
        "Competitor Name",
        PropertyValue::RichText(report.competitor.clone()),
    );
    insert(
        &mut p,
        "Our Channel Name",
        PropertyValue::RichText(report.our_channel.clone()),
    );
    insert(
        &mut p,
        "Total Opportunities",
        number(report.result.opportunities.len() as f64),
    );
    insert(
        &mut p,
        "Analysis Date",
        PropertyValue::Date(analysed_at.to_rfc3339()),
    );
    insert(
        &mut p,
        "Next Review",
        PropertyValue::Date(next_review.to_rfc3339()),
    );
    insert(
        &mut p,
        "Our Keywords",
        PropertyValue::multi_select_capped(&report.our_keywords, multi_select_cap),
    );
    insert(
        &mut p,
        "Competitor Keywords",
        PropertyValue::multi_select_capped(&report.competitor_keywords, multi_select_cap),
    );
    insert(
        &mut p,
        "Recommendations",
        PropertyValue::RichText(report.recommendations(multi_select_cap)),
    );
    p
}

/// Intent vote breakdown linked to its keyword page
pub fn search_intent(keyword_page_id: &str, intent: &SearchIntent) -> Properties {
    let mut p = Properties::new();
    insert(&mut p, KEYWORD, relation(keyword_page_id));
    insert(&mut p, "Primary Intent", select(intent.primary.as_str()));
    insert(&mut p, "Intent Confidence", number(round2(intent.confidence)));
    for (column, kind) in [
        ("Informational Score", Intent::Informational),
        ("Navigational Score", Intent::Navigational),
        ("Commercial Score", Intent::Commercial),
        ("Transactional Score", Intent::Transactional),
    ] {
        insert(&mut p, column, number(intent.score(kind)));
    }
    insert(&mut p, "Suggested Format", select(&intent.suggested_format));
    insert(
        &mut p,
        "Content Type Recommendation",
        PropertyValue::multi_select_capped(&intent.content_types, CONTENT_TYPE_CAP),
    );
    p
}

/// Forecast and posting schedule linked to its keyword page
///
/// Seasonal columns are written only when a profile is supplied.
pub fn performance_prediction(
    keyword_page_id: &str,
    prediction: &Prediction,
    profile: Option<&SeasonalProfile>,
) -> Properties {
    let growth_rate = prediction.growth_rate();

    let mut p = Properties::new();
    insert(&mut p, KEYWORD, relation(keyword_page_id));
    insert(
        &mut p,
        "Current Volume",
        number(round2(prediction.current_volume)),
    );
    for (column, months) in [
        ("Predicted 1M Volume", 1),
        ("Predicted 2M Volume", 2),
        ("Predicted 3M Volume", 3),
    ] {
        let volume = prediction.volume_after_months(months).unwrap_or(0.0);
        insert(&mut p, column, number(round2(volume.max(0.0))));
    }
    insert(
        &mut p,
        "Predicted Trend",
        select(prediction.predicted_trend.as_str()),
    );
    insert(&mut p, "Growth Rate", number(round2(growth_rate)));
    insert(
        &mut p,
        "Confidence Level",
        select(prediction.confidence_level()),
    );
    insert(
        &mut p,
        "Confidence Score",
        number(round2(prediction.confidence)),
    );
    insert(
        &mut p,
        "ROI Estimate",
        number(round2(growth_rate * prediction.confidence / 100.0)),
    );

    if let Some(profile) = profile {
        let schedule = &profile.recommendation;
        insert(
            &mut p,
            "Seasonality Strength",
            number(round2(profile.seasonality_strength)),
        );
        insert(&mut p, "Best Posting Day", select(&schedule.best_day));
        insert(&mut p, "Best Posting Month", select(&schedule.best_month));
        insert(
            &mut p,
            "Posting Frequency",
            select(schedule.posting_frequency.as_str()),
        );
        let months = |list: &[u32]| -> Vec<String> {
            list.iter().map(|m| month_name(*m).to_string()).collect()
        };
        insert(
            &mut p,
            "Peak Season",
            PropertyValue::multi_select_capped(&months(profile.peak_months.as_slice()), SEASON_CAP),
        );
        insert(
            &mut p,
            "Low Season",
            PropertyValue::multi_select_capped(&months(profile.low_months.as_slice()), SEASON_CAP),
        );
    }
    p
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CandidateKind, Opportunity, PointDirection, PredictedTrend};
    use chrono::{NaiveDate, TimeZone};

    #[test]
    fn test_recommendation_columns() {
        let candidate = RecommendationCandidate {
            keyword: "rust 2025".to_string(),
            volume: 2850,
            difficulty: 45,
            trend: TrendLabel::Rising,
            kind: CandidateKind::Trending,
            conversion_potential: 0.0,
            score: 45.126,
        };
        let p = recommendation("base-1", &candidate);

        assert_eq!(p["Recommendation"], PropertyValue::Title("rust 2025".into()));
        assert_eq!(p[BASE_KEYWORD], PropertyValue::Relation(vec!["base-1".into()]));
        assert_eq!(p[SCORE], PropertyValue::Number(45.13));
        assert_eq!(p["Type"], PropertyValue::Select("trending".into()));
        assert_eq!(p[STATUS], PropertyValue::Select("recommended".into()));
        assert_eq!(p["Priority"], PropertyValue::Number(3.0));
    }

    #[test]
    fn test_trend_point_columns() {
        let point = TrendPoint {
            date: NaiveDate::from_ymd_opt(2025, 2, 3).unwrap(),
            search_volume: 120,
            interest_level: 92,
            direction: PointDirection::Up,
        };
        let p = trend_point("kw-1", &point, Portal::Naver, TrendDirection::Stable, true);
        assert_eq!(p[DATE], PropertyValue::Date("2025-02-03".into()));
        assert_eq!(p["Portal"], PropertyValue::Select("Naver".into()));
        assert_eq!(p["Peak Day"], PropertyValue::Checkbox(true));
        assert_eq!(p["Trend Direction"], PropertyValue::Select("stable".into()));
    }

    #[test]
    fn test_competitor_caps_and_review_date() {
        let keywords: Vec<String> = (0..8).map(|i| format!("k{i}")).collect();
        let report = CompetitorReport {
            name: "Q1 gap".into(),
            competitor: "them".into(),
            our_channel: "us".into(),
            competitor_keywords: keywords.clone(),
            our_keywords: keywords,
            result: CompetitorGapResult {
                opportunities: vec![Opportunity {
                    keyword: "x".into(),
                    volume: 1300,
                    difficulty: 30,
                    opportunity_score: 41.94,
                }],
                ..CompetitorGapResult::default()
            },
        };
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let p = competitor_analysis(&report, at, 5);

        assert_eq!(
            p["Our Keywords"].as_list().map(<[String]>::len),
            Some(5)
        );
        assert_eq!(p["Total Opportunities"], PropertyValue::Number(1.0));
        assert_eq!(
            p["Next Review"],
            PropertyValue::Date("2025-01-31T00:00:00+00:00".into())
        );
        assert_eq!(p["Recommendations"], PropertyValue::RichText("x (41.9)".into()));
    }

    #[test]
    fn test_prediction_columns() {
        let prediction = Prediction {
            keyword: "rust".into(),
            current_volume: 100.0,
            predicted_volumes: (1..=90).map(f64::from).collect(),
            predicted_trend: PredictedTrend::Decreasing,
            confidence: 85.0,
            prediction_dates: Vec::new(),
        };
        let p = performance_prediction("kw-1", &prediction, None);

        assert_eq!(p["Predicted 1M Volume"], PropertyValue::Number(30.0));
        assert_eq!(p["Predicted 3M Volume"], PropertyValue::Number(90.0));
        assert_eq!(p["Growth Rate"], PropertyValue::Number(-10.0));
        assert_eq!(p["Confidence Level"], PropertyValue::Select("high".into()));
        assert!(!p.contains_key("Best Posting Day"));
    }
}
