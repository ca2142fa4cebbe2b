//! One-shot M-statistic computation.
//!
//! ## Algorithm
//!
//! Walk the history oldest-to-newest with a [`RevertClassifier`]. Every
//! counted revert contributes `min(edits[reverter], edits[reverted])` to a
//! histogram. The largest-strength bucket is removed and the remaining
//! weighted sum is multiplied by the number of mutual reverters.

use std::io::{BufRead, Write};
use tracing::{info, trace};

use super::classify::{Classification, EditorIx, EditorTable, RevertClassifier, RevertTally};
use crate::trace::{PageTraceReader, TraceError};
use crate::types::{EditorId, MStatResult, MStatRow, PageTrace};
use crate::PROGRESS_INTERVAL;

/// Ascending-chronological history of one page, ready for scoring.
#[derive(Debug, Clone, Default)]
pub struct EditHistory {
    revision_order: Vec<u32>,
    editor_order: Vec<EditorIx>,
    editors: EditorTable,
}

impl EditHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the next (later) edit.
    pub fn push(&mut self, content_id: u32, editor: &EditorId) {
        let ix = self.editors.record_edit(editor);
        self.revision_order.push(content_id);
        self.editor_order.push(ix);
    }

    /// Build from a chronological trace.
    pub fn from_trace(trace: &PageTrace) -> Self {
        let mut history = Self::new();
        for event in &trace.events {
            history.push(event.content_id, &event.editor);
        }
        history
    }

    /// Content ids, oldest first.
    pub fn revision_order(&self) -> &[u32] {
        &self.revision_order
    }

    /// Editor indices, oldest first.
    pub fn editor_order(&self) -> &[EditorIx] {
        &self.editor_order
    }

    /// Edits per editor index.
    pub fn edit_counts(&self) -> &[u64] {
        self.editors.edit_counts()
    }

    /// Number of edits.
    pub fn len(&self) -> usize {
        self.revision_order.len()
    }

    /// Check if the history has no edits.
    pub fn is_empty(&self) -> bool {
        self.revision_order.is_empty()
    }

    /// Classify every position, oldest first.
    pub fn classify(&self) -> Vec<Classification> {
        let mut classifier = RevertClassifier::new();
        (0..self.len())
            .map(|i| {
                let next = self.revision_order.get(i + 1).copied();
                classifier.classify(self.revision_order[i], self.editor_order[i], next)
            })
            .collect()
    }
}

/// Compute the M-statistic of a history.
pub fn m_statistic(history: &EditHistory) -> MStatResult {
    let mut tally = RevertTally::new();
    for outcome in history.classify() {
        match outcome {
            Classification::Matched { reverter, reverted } => tally.record(reverter, reverted),
            Classification::Unmatched => trace!("Revert to a content id that was never current"),
            Classification::NewContent | Classification::SelfRevert { .. } | Classification::Duplicate => {}
        }
    }

    let summary = tally.summarize(history.edit_counts(), None);
    MStatResult {
        score: summary.score,
        edit_count: history.len(),
        revert_count: summary.reverts,
        editor_count: history.editors.len(),
        mutual_editor_count: summary.mutual_editors,
    }
}

/// Compute the M-statistic of a chronological page trace.
pub fn score_trace(trace: &PageTrace) -> MStatResult {
    m_statistic(&EditHistory::from_trace(trace))
}

/// Counters for a scored trace stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreSummary {
    /// Pages scored.
    pub pages: u64,
    /// Pages with a non-zero score.
    pub conflicted_pages: u64,
}

/// Score every page of a trace stream, writing one JSON row per page.
///
/// Page indices start at `first_index` so several files of one run share
/// a numbering.
pub fn score_trace_stream<R: BufRead, W: Write>(
    reader: PageTraceReader<R>,
    out: &mut W,
    first_index: u64,
    extra_stats: bool,
) -> Result<ScoreSummary, TraceError> {
    let mut summary = ScoreSummary::default();
    for page in reader {
        let page = page?;
        let result = score_trace(&page);
        let row = MStatRow::new(first_index + summary.pages, page.title, &result, extra_stats);
        serde_json::to_writer(&mut *out, &row).map_err(std::io::Error::from)?;
        out.write_all(b"\n")?;

        summary.pages += 1;
        if result.score > 0 {
            summary.conflicted_pages += 1;
        }
        if summary.pages % PROGRESS_INTERVAL == 0 {
            info!(pages = summary.pages, "Scored pages");
        }
    }
    out.flush()?;
    Ok(summary)
}
