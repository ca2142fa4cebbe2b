//! Compact edit events and per-page traces.
//!
//! ## Line Format
//!
//! ```text
//! Anarchism
//! ^^^_2019-05-17T01:24:12Z 0 493 JJMC89
//! ^^^_2019-05-16T22:03:51Z 1 488 203.0.113.9
//! ```
//!
//! A title line opens a page; every following marker line is one edit,
//! newest first.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::page::EditorId;

/// Prefix that distinguishes an event line from a title line.
pub const TRACE_MARKER: &str = "^^^_";

/// Why an event line could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventParseError {
    /// Line does not start with the event marker.
    #[error("missing event marker")]
    MissingMarker,
    /// Wrong number of whitespace-separated fields.
    #[error("expected 4 fields, found {0}")]
    FieldCount(usize),
    /// Revert flag is not `0` or `1`.
    #[error("invalid revert flag: {0}")]
    RevertFlag(String),
    /// Content id is not a positive integer.
    #[error("invalid content id: {0}")]
    ContentId(String),
}

/// One edit of a page in compact form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactEvent {
    /// Timestamp as written in the dump (ISO-8601).
    pub timestamp: String,
    /// Whether the content matches an earlier revision of the page.
    pub reverted: bool,
    /// Per-page content id, 1-based in first-seen order.
    pub content_id: u32,
    /// Editor who made the edit.
    pub editor: EditorId,
}

impl CompactEvent {
    /// Parse a marker line (trailing whitespace ignored).
    pub fn parse_line(line: &str) -> Result<Self, EventParseError> {
        let body = line
            .strip_prefix(TRACE_MARKER)
            .ok_or(EventParseError::MissingMarker)?;
        let fields: Vec<&str> = body.split_whitespace().collect();
        if fields.len() != 4 {
            return Err(EventParseError::FieldCount(fields.len()));
        }

        let reverted = match fields[1] {
            "0" => false,
            "1" => true,
            other => return Err(EventParseError::RevertFlag(other.to_string())),
        };
        let content_id = fields[2]
            .parse::<u32>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| EventParseError::ContentId(fields[2].to_string()))?;
        // split_whitespace guarantees a non-empty token
        let editor = EditorId::new(fields[3]).ok_or(EventParseError::FieldCount(3))?;

        Ok(Self {
            timestamp: fields[0].to_string(),
            reverted,
            content_id,
            editor,
        })
    }

    /// Check whether a raw line is an event line.
    pub fn is_event_line(line: &str) -> bool {
        line.starts_with(TRACE_MARKER)
    }
}

impl fmt::Display for CompactEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{} {} {} {}",
            TRACE_MARKER,
            self.timestamp,
            u8::from(self.reverted),
            self.content_id,
            self.editor
        )
    }
}

/// The compact history of one page.
///
/// `events` are in ascending chronological order. The on-disk form is
/// newest-first; the trace reader and writer do the reversal.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageTrace {
    /// Page title.
    pub title: String,
    /// Edits, oldest first.
    pub events: Vec<CompactEvent>,
}

impl PageTrace {
    /// Create an empty trace for a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            events: Vec::new(),
        }
    }

    /// Number of edits.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if the trace has no edits.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Edits newest first, as they are persisted.
    pub fn newest_first(&self) -> impl Iterator<Item = &CompactEvent> {
        self.events.iter().rev()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(ts: &str, reverted: bool, id: u32, editor: &str) -> CompactEvent {
        CompactEvent {
            timestamp: ts.to_string(),
            reverted,
            content_id: id,
            editor: EditorId::new(editor).unwrap(),
        }
    }

    #[test]
    fn test_display_line() {
        let e = event("2019-05-17T01:24:12Z", false, 493, "JJMC89");
        assert_eq!(e.to_string(), "^^^_2019-05-17T01:24:12Z 0 493 JJMC89");

        let r = event("2019-05-17T01:24:12Z", true, 2, "Some_User");
        assert_eq!(r.to_string(), "^^^_2019-05-17T01:24:12Z 1 2 Some_User");
    }

    #[test]
    fn test_parse_line() {
        let e = CompactEvent::parse_line("^^^_2019-05-17T01:24:12Z 1 488 203.0.113.9\n").unwrap();
        assert_eq!(e, event("2019-05-17T01:24:12Z", true, 488, "203.0.113.9"));
    }

    #[test]
    fn test_parse_rejects_bad_lines() {
        assert_eq!(
            CompactEvent::parse_line("Anarchism"),
            Err(EventParseError::MissingMarker)
        );
        assert_eq!(
            CompactEvent::parse_line("^^^_2019-05-17T01:24:12Z 0 4"),
            Err(EventParseError::FieldCount(3))
        );
        assert!(matches!(
            CompactEvent::parse_line("^^^_2019-05-17T01:24:12Z 2 4 A"),
            Err(EventParseError::RevertFlag(_))
        ));
        assert!(matches!(
            CompactEvent::parse_line("^^^_2019-05-17T01:24:12Z 0 0 A"),
            Err(EventParseError::ContentId(_))
        ));
        assert!(matches!(
            CompactEvent::parse_line("^^^_2019-05-17T01:24:12Z 0 x A"),
            Err(EventParseError::ContentId(_))
        ));
    }

    #[test]
    fn test_newest_first() {
        let mut trace = PageTrace::new("Page");
        trace.events.push(event("2001-01-01T00:00:00Z", false, 1, "A"));
        trace.events.push(event("2002-01-01T00:00:00Z", false, 2, "B"));

        let order: Vec<u32> = trace.newest_first().map(|e| e.content_id).collect();
        assert_eq!(order, vec![2, 1]);
    }
}
