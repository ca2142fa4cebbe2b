//! M-statistic: mutual-revert conflict scoring.
//!
//! ```text
//! PageTrace → EditHistory → RevertClassifier → RevertTally → MStatResult
//!                                  ↓
//!                           MStatTimeSeries (one point per edit)
//! ```

pub mod classify;
pub mod engine;
pub mod timeseries;

pub use classify::{
    Classification, EditorIx, EditorTable, RevertClassifier, RevertTally, TallySummary,
    score_histogram,
};
pub use engine::{EditHistory, ScoreSummary, m_statistic, score_trace, score_trace_stream};
pub use timeseries::{MStatTimeSeries, write_time_series};
