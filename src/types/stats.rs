//! Output records for M-statistic scoring.

use serde::{Deserialize, Serialize};

/// M-statistic of one page plus the counts it was derived from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MStatResult {
    /// Conflict score (0 when nobody mutually reverts).
    pub score: u64,
    /// Number of edits in the history.
    pub edit_count: usize,
    /// Number of reverts that counted toward the histogram.
    pub revert_count: usize,
    /// Number of distinct editors.
    pub editor_count: usize,
    /// Number of editors engaged in mutual reverting.
    pub mutual_editor_count: usize,
}

/// One row of the per-dump M-statistic table (JSON Lines).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MStatRow {
    /// Running page index across all files of a run.
    pub page_index: u64,
    /// Page title.
    pub title: String,
    /// Conflict score.
    pub m_statistic: u64,
    /// Edit count (extra stats only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_count: Option<usize>,
    /// Counted revert count (extra stats only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revert_count: Option<usize>,
    /// Distinct editor count (extra stats only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor_count: Option<usize>,
    /// Mutual reverter count (extra stats only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutual_editor_count: Option<usize>,
}

impl MStatRow {
    /// Build a row, including auxiliary counts when `extra_stats` is set.
    pub fn new(page_index: u64, title: String, result: &MStatResult, extra_stats: bool) -> Self {
        let extra = |v: usize| extra_stats.then_some(v);
        Self {
            page_index,
            title,
            m_statistic: result.score,
            edit_count: extra(result.edit_count),
            revert_count: extra(result.revert_count),
            editor_count: extra(result.editor_count),
            mutual_editor_count: extra(result.mutual_editor_count),
        }
    }
}

/// Score of a page after one more edit (time-series output).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    /// Timestamp of the edit just applied.
    pub timestamp: String,
    /// Score over all edits up to and including this one.
    pub m_statistic: u64,
}
