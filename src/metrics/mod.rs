//! Prometheus counters and histograms
//!
//! Everything lives in a dedicated registry with the `keyword_radar_` prefix,
//! exposed by `GET /metrics`. Recorders are no-ops until [`init_metrics`]
//! succeeds, so library users and tests that never initialize pay nothing.

use std::sync::OnceLock;

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};

use crate::error::{Error, Result};
use crate::models::Portal;
use crate::sync::DatabaseKind;

const ANALYSIS_BUCKETS: &[f64] = &[0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0];
const API_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

struct RadarMetrics {
    registry: Registry,
    analyses: CounterVec,
    analysis_duration: HistogramVec,
    sync_writes: CounterVec,
    api_requests: CounterVec,
    api_duration: HistogramVec,
    enrichment_fallbacks: CounterVec,
}

impl RadarMetrics {
    fn register() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some("keyword_radar".to_string()), None)?;

        let counter = |name: &str, help: &str, labels: &[&str]| -> prometheus::Result<CounterVec> {
            let c = CounterVec::new(Opts::new(name, help), labels)?;
            registry.register(Box::new(c.clone()))?;
            Ok(c)
        };
        let histogram = |name: &str,
                         help: &str,
                         labels: &[&str],
                         buckets: &[f64]|
         -> prometheus::Result<HistogramVec> {
            let h = HistogramVec::new(
                HistogramOpts::new(name, help).buckets(buckets.to_vec()),
                labels,
            )?;
            registry.register(Box::new(h.clone()))?;
            Ok(h)
        };

        let analyses = counter("analyses_total", "Analyses served by operation", &["operation"])?;
        let analysis_duration = histogram(
            "analysis_duration_seconds",
            "Analysis wall time",
            &["operation"],
            ANALYSIS_BUCKETS,
        )?;
        let sync_writes = counter(
            "sync_operations_total",
            "Page store writes by database and outcome",
            &["database", "outcome"],
        )?;
        let api_requests = counter(
            "api_requests_total",
            "HTTP requests by endpoint and status",
            &["endpoint", "status"],
        )?;
        let api_duration = histogram(
            "api_request_duration_seconds",
            "HTTP request wall time",
            &["endpoint"],
            API_BUCKETS,
        )?;
        let enrichment_fallbacks = counter(
            "enrichment_fallbacks_total",
            "Live related-terms lookups that fell back to heuristics",
            &["portal"],
        )?;

        Ok(Self {
            registry,
            analyses,
            analysis_duration,
            sync_writes,
            api_requests,
            api_duration,
            enrichment_fallbacks,
        })
    }
}

static METRICS: OnceLock<std::result::Result<RadarMetrics, String>> = OnceLock::new();

fn metrics() -> Option<&'static RadarMetrics> {
    METRICS.get().and_then(|m| m.as_ref().ok())
}

/// Register every metric; later calls report the outcome of the first one
pub fn init_metrics() -> Result<()> {
    let outcome = METRICS.get_or_init(|| {
        let registered = RadarMetrics::register().map_err(|e| e.to_string());
        if registered.is_ok() {
            tracing::info!("Prometheus metrics initialized");
        }
        registered
    });

    match outcome {
        Ok(_) => Ok(()),
        Err(e) => Err(Error::other(format!("metrics registration failed: {e}"))),
    }
}

/// Text exposition of the registry; empty before initialization
pub fn encode_metrics() -> Result<String> {
    let Some(m) = metrics() else {
        return Ok(String::new());
    };

    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&m.registry.gather(), &mut buffer)
        .map_err(|e| Error::with_source("encoding metrics", e))?;
    String::from_utf8(buffer).map_err(|e| Error::with_source("metrics are not UTF-8", e))
}

pub fn record_analysis(operation: &str) {
    if let Some(m) = metrics() {
        m.analyses.with_label_values(&[operation]).inc();
    }
}

/// `outcome` is created, updated or failed
pub fn record_sync(database: DatabaseKind, outcome: &str) {
    if let Some(m) = metrics() {
        m.sync_writes
            .with_label_values(&[database.as_str(), outcome])
            .inc();
    }
}

pub fn record_api_request(endpoint: &str, status: u16, duration_secs: f64) {
    if let Some(m) = metrics() {
        m.api_requests
            .with_label_values(&[endpoint, &status.to_string()])
            .inc();
        m.api_duration
            .with_label_values(&[endpoint])
            .observe(duration_secs);
    }
}

pub fn record_enrichment_fallback(portal: Portal) {
    if let Some(m) = metrics() {
        m.enrichment_fallbacks
            .with_label_values(&[portal.as_str()])
            .inc();
    }
}

/// Observes the analysis duration when dropped
pub struct AnalysisTimer(Option<prometheus::HistogramTimer>);

impl Drop for AnalysisTimer {
    fn drop(&mut self) {
        if let Some(timer) = self.0.take() {
            timer.observe_duration();
        }
    }
}

/// Count an analysis and time it until the guard drops
pub fn start_analysis_timer(operation: &str) -> AnalysisTimer {
    record_analysis(operation);
    AnalysisTimer(metrics().map(|m| {
        m.analysis_duration
            .with_label_values(&[operation])
            .start_timer()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_repeatable() {
        assert!(init_metrics().is_ok());
        assert!(init_metrics().is_ok());
        assert!(metrics().is_some());
    }

    #[test]
    fn test_exposition_uses_prefix() {
        init_metrics().unwrap();
        record_analysis("analyze");
        record_sync(DatabaseKind::TrendData, "created");

        let text = encode_metrics().unwrap();
        assert!(text.contains("keyword_radar_analyses_total"));
        assert!(text.contains("database=\"trend_data\""));
    }

    #[test]
    fn test_timer_records_on_drop() {
        init_metrics().unwrap();
        drop(start_analysis_timer("predict"));
        record_api_request("/api/prediction", 200, 0.004);
        record_enrichment_fallback(Portal::Naver);

        let text = encode_metrics().unwrap();
        assert!(text.contains("keyword_radar_analysis_duration_seconds_count{operation=\"predict\"}"));
    }
}
