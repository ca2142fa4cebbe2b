//! Running M-statistic over a growing history.
//!
//! Events are applied oldest-to-newest and a score is emitted after each
//! one. Deciding whether a revert is a [`Classification::Duplicate`] needs
//! the following event, so the latest matched revert is held back as
//! provisional: it counts toward the emitted score, and is either recorded
//! or dropped when the next event arrives. After the last event the score
//! equals [`super::m_statistic`] over the whole history.

use std::io::{BufRead, Write};

use super::classify::{Classification, EditorIx, EditorTable, RevertClassifier, RevertTally};
use crate::trace::{PageTraceReader, TraceError};
use crate::types::{CompactEvent, MStatResult, TimeSeriesPoint};

/// Incremental scorer for one page.
#[derive(Debug, Clone, Default)]
pub struct MStatTimeSeries {
    classifier: RevertClassifier,
    tally: RevertTally,
    editors: EditorTable,
    last_content_id: Option<u32>,
    provisional: Option<(EditorIx, EditorIx)>,
}

impl MStatTimeSeries {
    /// Create a scorer for a fresh page.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply the next (later) edit and return the running score.
    pub fn push(&mut self, event: &CompactEvent) -> TimeSeriesPoint {
        let editor = self.editors.record_edit(&event.editor);

        if let Some((reverter, reverted)) = self.provisional.take() {
            // Same content again: the held revert was a duplicate signal.
            if self.last_content_id != Some(event.content_id) {
                self.tally.record(reverter, reverted);
            }
        }

        if let Classification::Matched { reverter, reverted } =
            self.classifier.classify(event.content_id, editor, None)
        {
            self.provisional = Some((reverter, reverted));
        }
        self.last_content_id = Some(event.content_id);

        TimeSeriesPoint {
            timestamp: event.timestamp.clone(),
            m_statistic: self.score(),
        }
    }

    /// Score over the edits applied so far.
    pub fn score(&self) -> u64 {
        self.tally.summarize(self.editors.edit_counts(), self.provisional).score
    }

    /// Full result over the edits applied so far.
    pub fn result(&self) -> MStatResult {
        let summary = self.tally.summarize(self.editors.edit_counts(), self.provisional);
        MStatResult {
            score: summary.score,
            edit_count: self.classifier.len(),
            revert_count: summary.reverts,
            editor_count: self.editors.len(),
            mutual_editor_count: summary.mutual_editors,
        }
    }
}

/// Write the running score of a single-page trace as JSON rows, oldest
/// edit first. Returns the number of rows written.
pub fn write_time_series<R: BufRead, W: Write>(
    reader: PageTraceReader<R>,
    out: &mut W,
) -> Result<usize, TraceError> {
    let page = reader.single_page()?;
    let mut series = MStatTimeSeries::new();
    for event in &page.events {
        let point = series.push(event);
        serde_json::to_writer(&mut *out, &point).map_err(std::io::Error::from)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(page.len())
}
