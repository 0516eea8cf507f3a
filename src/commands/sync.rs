use anyhow::{bail, Context, Result};
use tokio::sync::watch;

use keyword_radar::config::Config;
use keyword_radar::models::Portal;
use keyword_radar::sync::schema::CompetitorReport;
use keyword_radar::sync::{BatchReport, SyncService};

use super::{build_analyzer, print_json};

/// Parameters for the sync command
pub struct SyncParams {
    pub keyword: String,
    pub trends: bool,
    pub recommendations: bool,
    pub intent: bool,
    pub prediction: bool,
    pub days: Option<u32>,
}

/// Parameters for the competitor command
pub struct CompetitorParams {
    pub competitor: Vec<String>,
    pub yours: Vec<String>,
    pub sync: bool,
    pub name: Option<String>,
    pub competitor_name: Option<String>,
    pub channel: Option<String>,
}

fn sync_service(config: &Config) -> Result<SyncService> {
    if !config.store.is_configured() {
        bail!("Page store is not configured (set NOTION_API_TOKEN and the database ids)");
    }
    SyncService::notion(&config.store).context("Failed to create page store client")
}

/// Flip the returned receiver to `true` on Ctrl+C so batch loops stop early
fn cancel_on_ctrl_c() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping after the current item");
            let _ = tx.send(true);
        }
    });
    rx
}

fn log_report(label: &str, report: &BatchReport) {
    for (index, message) in &report.failed {
        tracing::warn!(label, index, error = %message, "Item failed");
    }
    println!(
        "{label}: {}/{} written{}",
        report.succeeded,
        report.attempted,
        if report.cancelled { " (cancelled)" } else { "" }
    );
}

pub async fn sync(config: &Config, params: SyncParams) -> Result<()> {
    let analyzer = build_analyzer(config)?;
    let service = sync_service(config)?;
    let cancel = cancel_on_ctrl_c();

    let analysis = analyzer.analyze_multi_portal(&params.keyword).await?;
    let outcome = service
        .sync_keyword_analysis(&analysis)
        .await
        .with_context(|| format!("Failed to sync '{}'", analysis.keyword))?;
    println!(
        "{} keyword analysis for '{}' ({})",
        if outcome.created { "Created" } else { "Updated" },
        analysis.keyword,
        outcome.page_id
    );

    if params.trends {
        let trend = analyzer.trend_analysis(&analysis.keyword, params.days)?;
        let report = service
            .batch_add_trend_points(&outcome.page_id, &trend, Portal::Google, Some(&cancel))
            .await;
        log_report("Trend points", &report);
    }

    if params.recommendations && !*cancel.borrow() {
        let candidates = analyzer.recommendations(&[analysis.keyword.as_str()], None)?;
        let report = service
            .batch_add_recommendations(&outcome.page_id, &candidates, Some(&cancel))
            .await;
        log_report("Recommendations", &report);
    }

    if params.intent && !*cancel.borrow() {
        let intent = analyzer.search_intent(&analysis.keyword)?;
        let page = service.add_search_intent(&outcome.page_id, &intent).await?;
        println!("Search intent recorded ({})", page.id);
    }

    if params.prediction && !*cancel.borrow() {
        let prediction = analyzer.predict(&analysis.keyword, None)?;
        let profile = match analyzer.seasonality(&analysis.keyword) {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::warn!(error = %e, "Seasonality unavailable, prediction recorded without it");
                None
            }
        };
        let page = service
            .add_performance_prediction(&outcome.page_id, &prediction, profile.as_ref())
            .await?;
        println!("Performance prediction recorded ({})", page.id);
    }

    analyzer.flush_history().await;
    Ok(())
}

pub async fn competitor(config: &Config, params: CompetitorParams) -> Result<()> {
    let analyzer = build_analyzer(config)?;
    let result = analyzer.competitor_gap(&params.competitor, &params.yours);
    print_json(&result)?;

    if params.sync {
        let service = sync_service(config)?;
        let competitor = params
            .competitor_name
            .unwrap_or_else(|| "competitor".to_string());
        let report = CompetitorReport {
            name: params
                .name
                .unwrap_or_else(|| format!("Gap analysis vs {competitor}")),
            competitor,
            our_channel: params.channel.unwrap_or_default(),
            competitor_keywords: params.competitor,
            our_keywords: params.yours,
            result,
        };
        let page = service.add_competitor_analysis(&report).await?;
        tracing::info!(page_id = %page.id, "Recorded competitor analysis");
    }

    Ok(())
}
