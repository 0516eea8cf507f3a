//! End-to-end analyzer flows

mod common;

use keyword_radar::models::{KeywordTypeAdvice, Portal};
use keyword_radar::storage::Exporter;

use common::{create_test_analyzer, create_test_config};

#[tokio::test]
async fn test_multi_portal_analysis() {
    let analyzer = create_test_analyzer();
    let result = analyzer.analyze_multi_portal("python tutorial").await.unwrap();

    assert_eq!(result.keyword, "python tutorial");
    assert_eq!(result.portals.len(), 4);

    for portal in Portal::all() {
        let analysis = &result.portals[&portal];
        assert_eq!(analysis.metric.portal, portal);
        assert!(analysis.metric.difficulty <= 100);
        assert_eq!(analysis.monthly_searches, analysis.metric.volume * 30);
        assert!(analysis.opportunity_score >= 0.0);
    }
    assert!(result.portals[&Portal::Google].search_intent.is_some());
    assert!(result.portals[&Portal::Daum].search_intent.is_none());
}

#[tokio::test]
async fn test_analyze_portal_matches_multi_portal() {
    let analyzer = create_test_analyzer();
    let single = analyzer
        .analyze_portal("rust web framework", Portal::Naver)
        .await
        .unwrap();
    let multi = analyzer
        .analyze_multi_portal("rust web framework")
        .await
        .unwrap();

    assert_eq!(&single.metric, multi.metric(Portal::Naver).unwrap());
}

#[test]
fn test_from_config_without_history() {
    let analyzer =
        keyword_radar::analyzer::KeywordAnalyzer::from_config(&create_test_config()).unwrap();
    assert!(analyzer.history().is_none());
}

#[test]
fn test_seeded_series_are_reproducible() {
    let a = create_test_analyzer();
    let b = create_test_analyzer();

    assert_eq!(
        a.trend_analysis("rust", Some(14)).unwrap(),
        b.trend_analysis("rust", Some(14)).unwrap()
    );
    assert_eq!(
        a.predict("rust", Some(2)).unwrap().predicted_volumes,
        b.predict("rust", Some(2)).unwrap().predicted_volumes
    );
}

#[test]
fn test_recommendations_are_ranked_and_capped() {
    let analyzer = create_test_analyzer();
    let keywords = ["rust", "python", "go", "java", "kotlin"];
    let candidates = analyzer.recommendations(&keywords, Some("coding")).unwrap();

    assert!(!candidates.is_empty());
    assert!(candidates.len() <= analyzer.config().max_recommendations);
    assert!(candidates.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn test_short_long_report() {
    let analyzer = create_test_analyzer();
    let report = analyzer.analyze_short_long("rust").unwrap();

    assert_eq!(report.original_keyword, "rust");
    assert!(!report.short_keywords.is_empty());
    assert!(!report.long_keywords.is_empty());
    let c = &report.comparison;
    match c.recommendation {
        KeywordTypeAdvice::FocusShortTail => {
            assert!(c.short_tail_avg_volume > 1.5 * c.long_tail_avg_volume)
        }
        KeywordTypeAdvice::FocusLongTail => {
            assert!(c.long_tail_avg_volume > 1.5 * c.short_tail_avg_volume)
        }
        KeywordTypeAdvice::Mix => {}
    }
}

#[test]
fn test_seasonality_profile() {
    let analyzer = create_test_analyzer();
    let profile = analyzer.seasonality("rust").unwrap();

    assert_eq!(profile.monthly_pattern.len(), 12);
    assert_eq!(profile.daily_pattern.len(), 7);
    assert!(!profile.peak_months.is_empty());
    assert!(profile
        .peak_months
        .iter()
        .all(|m| !profile.low_months.contains(m)));
}

#[tokio::test]
async fn test_export_analysis() {
    let dir = tempfile::tempdir().unwrap();
    let analyzer = create_test_analyzer();
    let result = analyzer.analyze_multi_portal("rust").await.unwrap();

    let exporter = Exporter::new(dir.path());
    let path = exporter.generate_report(&result, "report.json").unwrap();

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(written["analysis"]["keyword"], "rust");
    assert!(written["generated_at"].is_string());
}
