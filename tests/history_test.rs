//! History store tests against SQLite files on disk

mod common;

use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};

use chrono::{Duration, Utc};
use tokio_test::assert_ok;

use keyword_radar::config::HistoryConfig;
use keyword_radar::storage::{open_history, AnalysisRecord, HistoryStore, SqliteHistoryStore};

use common::create_test_analyzer;

fn record(keyword: &str, volume: u64, days_ago: i64) -> AnalysisRecord {
    let analyzer = create_test_analyzer();
    let metric = analyzer
        .estimator()
        .metric(keyword, keyword_radar::Portal::Naver);
    let mut record = AnalysisRecord::from_metric(&metric, Utc::now() - Duration::days(days_ago));
    record.volume = volume;
    record
}

#[test]
fn test_history_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("history.db");

    {
        let store = assert_ok!(SqliteHistoryStore::new(&path));
        assert_ok!(store.save_analysis(&record("rust", 1000, 0)));
        assert_ok!(store.save_analysis(&record("rust", 2000, 1)));
    }

    let reopened = SqliteHistoryStore::new(&path).unwrap();
    let history = reopened.get_analysis_history("rust", 30).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].volume, 1000, "newest record first");
    assert_eq!(history[0].portal, keyword_radar::Portal::Naver);
}

#[test]
fn test_history_window_and_top_keywords() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteHistoryStore::new(dir.path().join("history.db")).unwrap();

    store.save_analysis(&record("rust", 100, 0)).unwrap();
    store.save_analysis(&record("rust", 300, 2)).unwrap();
    store.save_analysis(&record("rust", 500, 60)).unwrap();
    store.save_analysis(&record("go", 50, 0)).unwrap();

    assert_eq!(store.get_analysis_history("rust", 30).unwrap().len(), 2);
    assert_eq!(store.get_analysis_history("rust", 90).unwrap().len(), 3);
    assert!(store.get_analysis_history("python", 90).unwrap().is_empty());

    let top = store.get_top_keywords(10).unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].keyword, "rust");
    assert_eq!(top[0].count, 3);
    assert!((top[0].average_volume - 300.0).abs() < 1e-9);

    assert_eq!(store.get_top_keywords(1).unwrap().len(), 1);
}

#[test]
fn test_open_history_disabled() {
    let config = HistoryConfig {
        enabled: false,
        ..HistoryConfig::default()
    };
    assert!(open_history(&config).unwrap().is_none());
}

#[tokio::test]
async fn test_analyzer_records_every_portal() {
    let dir = tempfile::tempdir().unwrap();
    let config = HistoryConfig {
        enabled: true,
        sqlite_path: dir.path().join("history.db"),
        default_days: 30,
    };
    let store = open_history(&config).unwrap().unwrap();
    let analyzer = create_test_analyzer().with_history(Arc::clone(&store));

    let result = analyzer
        .analyze_multi_portal("  python tutorial ")
        .await
        .unwrap();
    assert_eq!(result.keyword, "python tutorial");
    analyzer.flush_history().await;

    let history = store.get_analysis_history("python tutorial", 1).unwrap();
    assert_eq!(history.len(), 4);

    analyzer
        .recommendations(&["python tutorial"], Some("coding"))
        .unwrap();
    analyzer.flush_history().await;
    let top = store.get_top_keywords(5).unwrap();
    assert_eq!(top[0].keyword, "python tutorial");
}

#[tokio::test]
async fn test_locked_history_does_not_delay_analysis() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.db");
    let store: keyword_radar::storage::SharedHistoryStore =
        Arc::new(SqliteHistoryStore::new(&path).unwrap());
    let analyzer = create_test_analyzer().with_history(Arc::clone(&store));

    let blocker = rusqlite::Connection::open(&path).unwrap();
    blocker.execute_batch("BEGIN EXCLUSIVE;").unwrap();

    let started = Instant::now();
    let result = analyzer.analyze_multi_portal("rust").await.unwrap();
    assert_eq!(result.portals.len(), 4);
    assert!(
        started.elapsed() < StdDuration::from_millis(500),
        "analysis waited {:?} on the history lock",
        started.elapsed()
    );

    // Writes give up after the busy timeout and are only logged
    analyzer.flush_history().await;
    blocker.execute_batch("COMMIT;").unwrap();
    assert!(store.get_analysis_history("rust", 1).unwrap().is_empty());
}
