//! Compact trace files.
//!
//! One trace file per source dump, append-only while a conversion runs.
//! Readers stream it one page at a time and hand pages out in ascending
//! chronological order.

pub mod store;
pub mod reader;
pub mod extract;

use std::io::{self, Write};

use crate::types::PageTrace;

pub use store::TraceStore;
pub use reader::PageTraceReader;
pub use extract::{extract_articles, ExtractSummary};

/// Error type for reading trace files.
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    /// Read or write failure.
    #[error("Trace I/O error: {0}")]
    Io(#[from] io::Error),
    /// Event line that does not parse.
    #[error("Malformed event on line {line}: {source}")]
    Malformed {
        /// 1-based line number.
        line: u64,
        /// Parse failure.
        source: crate::types::EventParseError,
    },
    /// Event line before any title line.
    #[error("Event on line {line} precedes any page title")]
    OrphanEvent {
        /// 1-based line number.
        line: u64,
    },
    /// A single-page trace was required.
    #[error("Expected a single-page trace, found another page {title:?}")]
    MultiplePages {
        /// Title of the unexpected page.
        title: String,
    },
    /// A single-page trace was required but the input is empty.
    #[error("Trace contains no page")]
    Empty,
}

/// Write a page: title line, then events newest-first.
pub fn write_page_trace<W: Write + ?Sized>(trace: &PageTrace, out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", trace.title)?;
    for event in trace.newest_first() {
        writeln!(out, "{}", event)?;
    }
    Ok(())
}

/// Trace file name for a dump file: `light-dump-<name, '.'→'-'>.txt`.
pub fn trace_file_name(dump_file: &str) -> String {
    format!("light-dump-{}.txt", dump_file.replace('.', "-"))
}

/// Trace file name for one extracted article: spaces become `-` and path
/// separators are percent-encoded, so every title maps to a file directly
/// under the output directory.
pub fn article_file_name(title: &str) -> String {
    format!("light-dump-{}.txt", title.replace(' ', "-").replace('/', "%2F"))
}

/// Score table name for a trace file.
pub fn m_stat_file_name(trace_file: &str) -> String {
    format!("m-stat-{}.jsonl", trace_stem(trace_file))
}

/// Time-series file name for a single-article trace file.
pub fn over_time_file_name(trace_file: &str) -> String {
    format!("overtime-{}.jsonl", trace_stem(trace_file))
}

fn trace_stem(trace_file: &str) -> &str {
    let name = trace_file.strip_suffix(".txt").unwrap_or(trace_file);
    name.strip_prefix("light-dump-").unwrap_or(name)
}
