use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;

use keyword_radar::config::Config;
use keyword_radar::storage::Exporter;

use super::{build_analyzer, print_json};

pub async fn analyze(config: &Config, keyword: &str) -> Result<()> {
    let analyzer = build_analyzer(config)?;
    let result = analyzer
        .analyze_multi_portal(keyword)
        .await
        .with_context(|| format!("Failed to analyse '{keyword}'"))?;
    analyzer.flush_history().await;
    print_json(&result)
}

pub fn compare(config: &Config, keywords: &[String]) -> Result<()> {
    let analyzer = build_analyzer(config)?;
    if keywords.len() > analyzer.config().max_compare_keywords {
        tracing::warn!(
            requested = keywords.len(),
            max = analyzer.config().max_compare_keywords,
            "Only the first keywords are compared"
        );
    }
    print_json(&analyzer.compare_keywords(keywords)?)
}

pub fn short_long(config: &Config, keyword: &str) -> Result<()> {
    let analyzer = build_analyzer(config)?;
    print_json(&analyzer.analyze_short_long(keyword)?)
}

pub async fn recommend(config: &Config, keywords: &[String], topic: Option<&str>) -> Result<()> {
    let analyzer = build_analyzer(config)?;
    let candidates = analyzer.recommendations(keywords, topic)?;
    analyzer.flush_history().await;
    print_json(&candidates)
}

pub fn intent(config: &Config, keyword: &str) -> Result<()> {
    let analyzer = build_analyzer(config)?;
    print_json(&analyzer.search_intent(keyword)?)
}

pub fn trends(config: &Config, keyword: &str, days: Option<u32>) -> Result<()> {
    let analyzer = build_analyzer(config)?;
    print_json(&analyzer.trend_analysis(keyword, days)?)
}

pub fn seasonality(config: &Config, keyword: &str) -> Result<()> {
    let analyzer = build_analyzer(config)?;
    print_json(&analyzer.seasonality(keyword)?)
}

pub fn predict(config: &Config, keyword: &str, months: Option<u32>) -> Result<()> {
    let analyzer = build_analyzer(config)?;
    print_json(&analyzer.predict(keyword, months)?)
}

pub async fn export(
    config: &Config,
    keyword: &str,
    output: Option<PathBuf>,
    report: bool,
) -> Result<()> {
    let analyzer = build_analyzer(config)?;
    let result = analyzer.analyze_multi_portal(keyword).await?;
    analyzer.flush_history().await;

    let target =
        output.unwrap_or_else(|| PathBuf::from(Exporter::default_file_name(&result.keyword, Utc::now())));
    let exporter = Exporter::default();
    let path = if report {
        exporter.generate_report(&result, &target)?
    } else {
        exporter.export_json(&result, &target)?
    };

    println!("Analysis exported to {}", path.display());
    Ok(())
}
