pub mod analyze;
pub mod history;
pub mod serve;
pub mod sync;

use anyhow::{Context, Result};
use serde::Serialize;

use keyword_radar::analyzer::KeywordAnalyzer;
use keyword_radar::config::Config;

/// Pretty-print a result on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let body = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{body}");
    Ok(())
}

pub fn build_analyzer(config: &Config) -> Result<KeywordAnalyzer> {
    KeywordAnalyzer::from_config(config).context("Failed to build keyword analyzer")
}
