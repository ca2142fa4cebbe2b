//! # wiki-mstat
//!
//! Edit-war detection for MediaWiki revision-history dumps.
//!
//! The crate answers one question per article:
//!
//! > How much do its editors revert *each other*?
//!
//! ## Core Contract
//!
//! 1. Stream an arbitrarily large history dump and write a compact trace per
//!    page, holding at most `page_chunk` pages in memory
//! 2. Score each page trace with the M-statistic
//! 3. Optionally replay one page edit by edit and emit the running score
//!
//! ## Architecture
//!
//! ```text
//! Dump XML → DumpReader → PageBatch → CompactEncoder → TraceStore (light-dump-*.txt)
//!                                                           ↓
//!                                   PageTraceReader → EditHistory → m_statistic
//!                                                           ↓
//!                                                    MStatTimeSeries
//! ```
//!
//! ## Compact Trace Format
//!
//! ```text
//! <page title>
//! ^^^_<timestamp> <revert 0|1> <content id> <editor>    (newest first)
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Revisions are ordered by timestamp; ties keep dump order
//! - Content ids are assigned in first-seen chronological order
//! - Trace output does not depend on `page_chunk`
//! - Scoring the same trace twice gives the same result

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod config;
pub mod dump;
pub mod trace;
pub mod mstat;
pub mod pipeline;

// Re-exports
pub use types::{
    Page, Revision, Contributor, ContentKey, EditorId, UNKNOWN_EDITOR,
    CompactEvent, PageTrace, EventParseError, TRACE_MARKER,
    MStatResult, MStatRow, TimeSeriesPoint,
};
pub use config::{
    PipelineConfig, ProcessParams, MStatParams, ExtractParams, OverTimeParams,
    OutputFormat, MissingEditorPolicy, Tag, ConfigError,
};
pub use dump::{
    DumpReader, DumpError, PageBatch, PageBatches,
    BatchEncoder, CompactEncoder, TabularEncoder, EncodeStats, ContentRegistry,
};
pub use trace::{
    TraceStore, PageTraceReader, TraceError, ExtractSummary,
    extract_articles, write_page_trace,
};
pub use mstat::{
    Classification, RevertClassifier, RevertTally, EditHistory, MStatTimeSeries, ScoreSummary,
    m_statistic, score_trace, score_trace_stream, write_time_series,
};
pub use pipeline::{PipelineError, Target, ConvertSummary};

/// Pages per batch when none is configured.
pub const DEFAULT_PAGE_CHUNK: usize = 10;

/// Page count between progress log lines.
pub const PROGRESS_INTERVAL: u64 = 100_000;
