use anyhow::{bail, Context, Result};

use keyword_radar::config::Config;
use keyword_radar::storage::{open_history, SharedHistoryStore};

use super::print_json;

fn open_store(config: &Config) -> Result<SharedHistoryStore> {
    match open_history(&config.history).context("Failed to open history database")? {
        Some(store) => Ok(store),
        None => bail!("History is disabled (set history.enabled = true)"),
    }
}

pub fn history(config: &Config, keyword: &str, days: Option<u32>) -> Result<()> {
    let store = open_store(config)?;
    let days = days.unwrap_or(config.history.default_days);
    let records = store.get_analysis_history(keyword.trim(), days)?;
    tracing::debug!(keyword, days, count = records.len(), "Loaded analysis history");
    print_json(&records)
}

pub fn top(config: &Config, limit: usize) -> Result<()> {
    let store = open_store(config)?;
    print_json(&store.get_top_keywords(limit)?)
}
