//! Streaming trace reader.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::TraceError;
use crate::types::{CompactEvent, PageTrace};

/// Reads a trace file one page at a time.
///
/// Pages come out with events in ascending chronological order, i.e. the
/// reverse of the on-disk order. Blank lines are ignored.
pub struct PageTraceReader<R: BufRead> {
    input: R,
    line: String,
    line_no: u64,
    /// Title line that opened the next page.
    pending_title: Option<String>,
    done: bool,
}

impl PageTraceReader<BufReader<File>> {
    /// Open a trace file.
    pub fn open(path: &Path) -> Result<Self, TraceError> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> PageTraceReader<R> {
    /// Wrap a buffered reader.
    pub fn new(input: R) -> Self {
        Self {
            input,
            line: String::new(),
            line_no: 0,
            pending_title: None,
            done: false,
        }
    }

    /// Number of lines consumed.
    pub fn lines_read(&self) -> u64 {
        self.line_no
    }

    /// Read the next page, or `None` at end of input.
    pub fn next_page(&mut self) -> Result<Option<PageTrace>, TraceError> {
        if self.done {
            return Ok(None);
        }

        let mut current = self.pending_title.take().map(PageTrace::new);

        loop {
            self.line.clear();
            if self.input.read_line(&mut self.line)? == 0 {
                self.done = true;
                break;
            }
            self.line_no += 1;

            let line = self.line.trim_end_matches(['\n', '\r']);
            if line.trim().is_empty() {
                continue;
            }

            if CompactEvent::is_event_line(line) {
                let event = CompactEvent::parse_line(line).map_err(|source| TraceError::Malformed {
                    line: self.line_no,
                    source,
                })?;
                match current.as_mut() {
                    Some(page) => page.events.push(event),
                    None => return Err(TraceError::OrphanEvent { line: self.line_no }),
                }
            } else if current.is_some() {
                self.pending_title = Some(line.to_string());
                break;
            } else {
                current = Some(PageTrace::new(line));
            }
        }

        // On disk newest-first; hand out oldest-first.
        Ok(current.map(|mut page| {
            page.events.reverse();
            page
        }))
    }

    /// Read a trace that must hold exactly one page.
    pub fn single_page(mut self) -> Result<PageTrace, TraceError> {
        let page = self.next_page()?.ok_or(TraceError::Empty)?;
        if let Some(extra) = self.next_page()? {
            return Err(TraceError::MultiplePages { title: extra.title });
        }
        Ok(page)
    }
}

impl<R: BufRead> Iterator for PageTraceReader<R> {
    type Item = Result<PageTrace, TraceError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_page() {
            Ok(page) => page.map(Ok),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACE: &str = "Anarchism\n\
        ^^^_2003-01-01T00:00:00Z 1 1 Carol\n\
        ^^^_2002-01-01T00:00:00Z 0 2 Bob\n\
        ^^^_2001-01-01T00:00:00Z 0 1 Alice\n\
        Empty Page\n\
        \n\
        Autism\n\
        ^^^_2005-01-01T00:00:00Z 0 1 Dan\n";

    #[test]
    fn test_reads_pages_oldest_first() {
        let pages: Vec<PageTrace> = PageTraceReader::new(TRACE.as_bytes())
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(pages.len(), 3);

        assert_eq!(pages[0].title, "Anarchism");
        let editors: Vec<&str> = pages[0].events.iter().map(|e| e.editor.as_str()).collect();
        assert_eq!(editors, vec!["Alice", "Bob", "Carol"]);
        assert!(pages[0].events[2].reverted);

        assert_eq!(pages[1].title, "Empty Page");
        assert!(pages[1].is_empty());

        assert_eq!(pages[2].title, "Autism");
        assert_eq!(pages[2].len(), 1);
    }

    #[test]
    fn test_orphan_event_is_error() {
        let mut reader = PageTraceReader::new("^^^_2001-01-01T00:00:00Z 0 1 A\n".as_bytes());
        assert!(matches!(reader.next_page(), Err(TraceError::OrphanEvent { line: 1 })));
    }

    #[test]
    fn test_malformed_event_reports_line() {
        let input = "Page\n^^^_2001-01-01T00:00:00Z 0 1 A\n^^^_2001-01-02T00:00:00Z 0 B\n";
        let result: Result<Vec<PageTrace>, TraceError> = PageTraceReader::new(input.as_bytes()).collect();
        assert!(matches!(result, Err(TraceError::Malformed { line: 3, .. })));
    }

    #[test]
    fn test_single_page() {
        let one = "Solo\n^^^_2001-01-01T00:00:00Z 0 1 A\n";
        let page = PageTraceReader::new(one.as_bytes()).single_page().unwrap();
        assert_eq!(page.title, "Solo");

        let err = PageTraceReader::new(TRACE.as_bytes()).single_page().unwrap_err();
        assert!(matches!(err, TraceError::MultiplePages { .. }));

        let err = PageTraceReader::new("".as_bytes()).single_page().unwrap_err();
        assert!(matches!(err, TraceError::Empty));
    }
}
