//! Common test utilities

use keyword_radar::analyzer::KeywordAnalyzer;
use keyword_radar::config::{AnalysisConfig, Config, StoreConfig};
use keyword_radar::estimator::{Estimator, HeuristicConfig};

/// Configuration with history off and a fixed seed
#[allow(dead_code)]
pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.history.enabled = false;
    config.analysis.seed = Some(42);
    config
}

/// Analyzer without history or enrichment
#[allow(dead_code)]
pub fn create_test_analyzer() -> KeywordAnalyzer {
    let analysis = AnalysisConfig {
        seed: Some(42),
        ..AnalysisConfig::default()
    };
    KeywordAnalyzer::new(Estimator::new(HeuristicConfig::default()), analysis)
}

/// Store configuration with every database id set and no inter-call delay
#[allow(dead_code)]
pub fn create_store_config(base_url: &str) -> StoreConfig {
    let mut config = StoreConfig {
        base_url: base_url.to_string(),
        api_token: Some("secret_test_token".to_string()),
        batch_delay_ms: 0,
        max_retries: 2,
        retry_base_delay_ms: 10,
        request_timeout_secs: 5,
        ..StoreConfig::default()
    };
    config.databases.keyword_analysis = Some("db-keywords".to_string());
    config.databases.trend_data = Some("db-trends".to_string());
    config.databases.recommendations = Some("db-recs".to_string());
    config.databases.competitor_analysis = Some("db-competitor".to_string());
    config.databases.search_intent = Some("db-intent".to_string());
    config.databases.performance_prediction = Some("db-prediction".to_string());
    config
}

/// Minimal page object as returned by the store API
#[allow(dead_code)]
pub fn page_json(id: &str, keyword: &str) -> serde_json::Value {
    serde_json::json!({
        "object": "page",
        "id": id,
        "created_time": "2025-01-01T00:00:00.000Z",
        "last_edited_time": "2025-01-02T00:00:00.000Z",
        "properties": {
            "Keyword": {
                "id": "title",
                "type": "title",
                "title": [{"type": "text", "plain_text": keyword, "text": {"content": keyword}}]
            },
            "Search Volume": {"id": "a", "type": "number", "number": 1500},
            "Status": {"id": "b", "type": "select", "select": {"name": "active"}}
        }
    })
}
