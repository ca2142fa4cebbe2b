//! Core types shared by the converter and the scorer.

pub mod page;
pub mod event;
pub mod stats;

pub use page::{Page, Revision, Contributor, ContentKey, EditorId, UNKNOWN_EDITOR};
pub use event::{CompactEvent, PageTrace, EventParseError, TRACE_MARKER};
pub use stats::{MStatResult, MStatRow, TimeSeriesPoint};
