//! JSON export of analysis results

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::error::Result;

/// Writes pretty-printed JSON files under an output directory
#[derive(Debug, Clone)]
pub struct Exporter {
    output_dir: PathBuf,
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new(".")
    }
}

impl Exporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// `analysis_{keyword}_{YYYYmmdd_HHMMSS}.json`, with path separators
    /// and whitespace in the keyword replaced by underscores
    pub fn default_file_name(keyword: &str, at: DateTime<Utc>) -> String {
        let safe: String = keyword
            .chars()
            .map(|c| {
                if c.is_whitespace() || matches!(c, '/' | '\\' | ':') {
                    '_'
                } else {
                    c
                }
            })
            .collect();
        format!("analysis_{}_{}.json", safe, at.format("%Y%m%d_%H%M%S"))
    }

    /// Serialize `value` to `path` (relative paths land under the output
    /// directory) and return the written path
    pub fn export_json<T: Serialize + ?Sized>(&self, value: &T, path: impl AsRef<Path>) -> Result<PathBuf> {
        let target = self.output_dir.join(path);
        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let body = serde_json::to_string_pretty(value)?;
        fs::write(&target, body)?;

        tracing::info!(path = %target.display(), "Exported analysis");
        Ok(target)
    }

    /// Export `analysis` wrapped with a `generated_at` timestamp
    pub fn generate_report<T: Serialize + ?Sized>(
        &self,
        analysis: &T,
        path: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        let report = json!({
            "generated_at": Utc::now().to_rfc3339(),
            "analysis": serde_json::to_value(analysis)?,
        });
        self.export_json(&report, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_file_name() {
        let at = Utc.with_ymd_and_hms(2025, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            Exporter::default_file_name("rust web/api", at),
            "analysis_rust_web_api_20250309_140507.json"
        );
    }

    #[test]
    fn test_export_and_report() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(dir.path());

        let written = exporter
            .export_json(&json!({"keyword": "rust"}), "nested/out.json")
            .unwrap();
        let text = fs::read_to_string(&written).unwrap();
        assert!(text.contains("\"keyword\": \"rust\""));

        let report = exporter.generate_report(&json!({"score": 1}), "report.json").unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(report).unwrap()).unwrap();
        assert!(value["generated_at"].is_string());
        assert_eq!(value["analysis"]["score"], 1);
    }

    #[test]
    fn test_export_failure_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();

        let exporter = Exporter::new(&blocker);
        assert!(exporter.export_json(&json!({}), "out.json").is_err());
    }
}
