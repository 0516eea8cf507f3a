//! Local persistence: analysis history and JSON export

pub mod export;
pub mod history;

pub use export::Exporter;
pub use history::{
    open_history, AnalysisRecord, HistoryStore, InMemoryHistoryStore, SharedHistoryStore,
    SqliteHistoryStore, TopKeyword,
};
