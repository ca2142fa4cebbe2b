//! Streaming conversion of MediaWiki history dumps.
//!
//! ## Architecture
//!
//! ```text
//! XML stream → DumpReader → PageBatches → BatchEncoder → trace / rows
//!                 (one page)   (≤ page_chunk pages)   (batch dropped after write)
//! ```
//!
//! At most one batch of pages is alive at a time, whatever the size of the
//! dump. Revision text is reduced to a 64-bit content key as soon as its
//! element closes.

pub mod reader;
pub mod encoder;

pub use reader::{DumpReader, PageBatch, PageBatches};
pub use encoder::{BatchEncoder, CompactEncoder, TabularEncoder, EncodeStats, ContentRegistry};

/// Error type for dump conversion. Every variant is fatal for the file.
#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    /// XML syntax error.
    #[error("XML error at byte {position}: {source}")]
    Xml {
        /// Byte offset in the input.
        position: u64,
        /// Parser error.
        source: quick_xml::Error,
    },
    /// Input ended inside an element.
    #[error("Unexpected end of input inside <{0}>")]
    UnexpectedEof(&'static str),
    /// An element appeared where only text is allowed.
    #[error("Unexpected element <{found}> inside <{parent}>")]
    UnexpectedElement {
        /// Enclosing text element.
        parent: &'static str,
        /// Element found.
        found: String,
    },
    /// A required child element is missing.
    #[error("<{element}> is missing required <{field}>")]
    MissingField {
        /// Element that was incomplete.
        element: &'static str,
        /// Missing child.
        field: &'static str,
    },
    /// A numeric field did not parse.
    #[error("Invalid {field}: {value:?}")]
    InvalidNumber {
        /// Field name.
        field: &'static str,
        /// Raw text.
        value: String,
    },
    /// A timestamp did not parse as ISO-8601.
    #[error("Invalid timestamp in revision {revision}: {value:?}")]
    InvalidTimestamp {
        /// Revision id.
        revision: u64,
        /// Raw text.
        value: String,
    },
    /// A revision has no editor identity and the policy is `reject`.
    #[error("Revision {revision} of page {page:?} has neither username nor IP")]
    MissingEditor {
        /// Page title.
        page: String,
        /// Revision id.
        revision: u64,
    },
    /// Output could not be written.
    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
    /// Tabular row could not be serialized.
    #[error("Row serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
