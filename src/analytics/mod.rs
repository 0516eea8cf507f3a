//! Analytics over estimator outputs
//!
//! Trend series, seasonal profiles, polynomial prediction, recommendation
//! scoring and competitor gaps. Everything here is synchronous and takes its
//! randomness and reference date as arguments.

pub mod competitor;
pub mod prediction;
pub mod recommend;
pub mod seasonality;
pub mod trends;

pub use competitor::{competitor_gap, GapThresholds};
pub use prediction::{predict_from_history, synthetic_history, Polynomial};
pub use recommend::{analyze_short_long, rank_recommendations, score_candidate, ScoreWeights};
pub use seasonality::{detect_seasonality, recommend_posting_schedule};
pub use trends::{analyze_series, generate_series, summarize, SeriesParams};
