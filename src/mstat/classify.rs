//! Revert classification and tallying.
//!
//! Both the one-shot engine and the time series drive the same
//! [`RevertClassifier`] oldest-to-newest and feed counted reverts into a
//! [`RevertTally`].

use std::collections::{BTreeMap, HashMap};

use crate::types::EditorId;

/// Dense per-page editor index.
pub type EditorIx = usize;

/// Outcome of classifying one position of a page history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Introduces the next content state.
    NewContent,
    /// A revert that counts toward the score.
    Matched {
        /// Editor making the revert.
        reverter: EditorIx,
        /// Editor who first moved the page away from the restored state.
        reverted: EditorIx,
    },
    /// The reverter undid their own change.
    SelfRevert {
        /// The editor.
        editor: EditorIx,
    },
    /// The next position restores the same state; one semantic revert is
    /// counted once, at the last position.
    Duplicate,
    /// The restored content id was never established as current.
    Unmatched,
}

impl Classification {
    /// Whether the position restores an earlier state.
    pub fn is_revert(&self) -> bool {
        !matches!(self, Self::NewContent)
    }

    /// The counted pair, if any.
    pub fn matched_pair(&self) -> Option<(EditorIx, EditorIx)> {
        match *self {
            Self::Matched { reverter, reverted } => Some((reverter, reverted)),
            _ => None,
        }
    }
}

/// Per-page classification state.
#[derive(Debug, Clone)]
pub struct RevertClassifier {
    next_content_id: u32,
    /// Position at which each content id became current.
    established: HashMap<u32, usize>,
    /// Editor at each position seen so far.
    editors: Vec<EditorIx>,
}

impl Default for RevertClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl RevertClassifier {
    /// Create a classifier for a fresh page.
    pub fn new() -> Self {
        Self {
            next_content_id: 1,
            established: HashMap::new(),
            editors: Vec::new(),
        }
    }

    /// Number of positions classified.
    pub fn len(&self) -> usize {
        self.editors.len()
    }

    /// Check if nothing has been classified.
    pub fn is_empty(&self) -> bool {
        self.editors.is_empty()
    }

    /// Classify the next position.
    ///
    /// `next_content_id` is the content id of the following position, when
    /// known; it only decides [`Classification::Duplicate`].
    pub fn classify(
        &mut self,
        content_id: u32,
        editor: EditorIx,
        next_content_id: Option<u32>,
    ) -> Classification {
        let position = self.editors.len();
        self.editors.push(editor);

        if content_id >= self.next_content_id {
            self.established.insert(content_id, position);
            self.next_content_id += 1;
            return Classification::NewContent;
        }

        let Some(&established) = self.established.get(&content_id) else {
            return Classification::Unmatched;
        };
        if next_content_id == Some(content_id) {
            return Classification::Duplicate;
        }

        // established < position, so the index is in bounds.
        let reverted = self.editors[established + 1];
        if reverted == editor {
            Classification::SelfRevert { editor }
        } else {
            Classification::Matched { reverter: editor, reverted }
        }
    }
}

/// Score and counts derived from a tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TallySummary {
    /// M-statistic.
    pub score: u64,
    /// Counted reverts.
    pub reverts: usize,
    /// Editors engaged in mutual reverting.
    pub mutual_editors: usize,
}

/// Counted reverts of one page, keyed by (reverter, reverted).
///
/// Pair strengths are evaluated at summary time against the edit counts
/// supplied then, so a growing prefix always scores with its own counts.
#[derive(Debug, Clone, Default)]
pub struct RevertTally {
    pairs: BTreeMap<(EditorIx, EditorIx), u64>,
    reverts: usize,
}

impl RevertTally {
    /// Create an empty tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a counted revert.
    pub fn record(&mut self, reverter: EditorIx, reverted: EditorIx) {
        *self.pairs.entry((reverter, reverted)).or_insert(0) += 1;
        self.reverts += 1;
    }

    /// Number of counted reverts.
    pub fn reverts(&self) -> usize {
        self.reverts
    }

    /// Score the tally, optionally including one provisional revert that
    /// is not recorded.
    pub fn summarize(&self, edit_counts: &[u64], provisional: Option<(EditorIx, EditorIx)>) -> TallySummary {
        let counted = || {
            self.pairs
                .iter()
                .map(|(pair, count)| (*pair, *count))
                .chain(provisional.map(|pair| (pair, 1)))
        };
        let has_pair = |pair: (EditorIx, EditorIx)| self.pairs.contains_key(&pair) || provisional == Some(pair);

        let mut histogram: BTreeMap<u64, u64> = BTreeMap::new();
        let mut mutual: Vec<EditorIx> = Vec::new();
        for ((reverter, reverted), count) in counted() {
            let strength = edit_count(edit_counts, reverter).min(edit_count(edit_counts, reverted));
            *histogram.entry(strength).or_insert(0) += count;
            if has_pair((reverted, reverter)) {
                mutual.push(reverter);
                mutual.push(reverted);
            }
        }
        mutual.sort_unstable();
        mutual.dedup();

        TallySummary {
            score: score_histogram(histogram, mutual.len()),
            reverts: self.reverts + usize::from(provisional.is_some()),
            mutual_editors: mutual.len(),
        }
    }
}

fn edit_count(edit_counts: &[u64], editor: EditorIx) -> u64 {
    edit_counts.get(editor).copied().unwrap_or(0)
}

/// Apply the M-statistic formula to a pair-strength histogram.
///
/// The bucket of the largest strength is dropped entirely, however many
/// reverts it holds; the remaining weighted sum is scaled by the number of
/// mutual reverters.
pub fn score_histogram(mut histogram: BTreeMap<u64, u64>, mutual_editors: usize) -> u64 {
    let Some(&max_strength) = histogram.keys().next_back() else {
        return 0;
    };
    histogram.remove(&max_strength);
    let weighted: u64 = histogram.iter().map(|(strength, count)| strength * count).sum();
    weighted * mutual_editors as u64
}

/// Interns editors and counts their edits.
#[derive(Debug, Clone, Default)]
pub struct EditorTable {
    index: HashMap<EditorId, EditorIx>,
    edit_counts: Vec<u64>,
}

impl EditorTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one edit by `editor` and return its index.
    pub fn record_edit(&mut self, editor: &EditorId) -> EditorIx {
        let ix = match self.index.get(editor) {
            Some(&ix) => ix,
            None => {
                let ix = self.edit_counts.len();
                self.index.insert(editor.clone(), ix);
                self.edit_counts.push(0);
                ix
            }
        };
        self.edit_counts[ix] += 1;
        ix
    }

    /// Edits per editor index.
    pub fn edit_counts(&self) -> &[u64] {
        &self.edit_counts
    }

    /// Number of distinct editors.
    pub fn len(&self) -> usize {
        self.edit_counts.len()
    }

    /// Check if no editor has been seen.
    pub fn is_empty(&self) -> bool {
        self.edit_counts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: EditorIx = 0;
    const B: EditorIx = 1;
    const C: EditorIx = 2;

    #[test]
    fn test_new_content_advances() {
        let mut c = RevertClassifier::new();
        assert_eq!(c.classify(1, A, Some(2)), Classification::NewContent);
        assert_eq!(c.classify(2, B, None), Classification::NewContent);
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn test_reverted_editor_is_one_after_established() {
        // A writes 1, B writes 2, A restores 1: B is the reverted editor.
        let mut c = RevertClassifier::new();
        c.classify(1, A, Some(2));
        c.classify(2, B, Some(1));
        assert_eq!(c.classify(1, A, None), Classification::Matched { reverter: A, reverted: B });
    }

    #[test]
    fn test_self_revert() {
        let mut c = RevertClassifier::new();
        c.classify(1, A, Some(2));
        c.classify(2, B, Some(1));
        assert_eq!(c.classify(1, B, None), Classification::SelfRevert { editor: B });
    }

    #[test]
    fn test_duplicate_uses_lookahead() {
        let mut c = RevertClassifier::new();
        c.classify(1, A, Some(2));
        c.classify(2, B, Some(1));
        assert_eq!(c.classify(1, C, Some(1)), Classification::Duplicate);
        assert_eq!(c.classify(1, C, None), Classification::Matched { reverter: C, reverted: B });
    }

    #[test]
    fn test_unmatched_when_never_established() {
        // Ids skip 2: id 2 is below next_content_id but never current.
        let mut c = RevertClassifier::new();
        c.classify(1, A, Some(3));
        c.classify(3, B, Some(2));
        assert_eq!(c.classify(2, C, None), Classification::Unmatched);
        assert!(Classification::Unmatched.is_revert());
        assert_eq!(Classification::Unmatched.matched_pair(), None);
    }

    #[test]
    fn test_score_histogram_drops_max_bucket_once() {
        let histogram = BTreeMap::from([(2, 3), (5, 4)]);
        assert_eq!(score_histogram(histogram, 2), 12);

        let single = BTreeMap::from([(3, 1)]);
        assert_eq!(score_histogram(single, 4), 0);

        assert_eq!(score_histogram(BTreeMap::new(), 4), 0);
    }

    #[test]
    fn test_tally_mutual_and_strength() {
        let counts = [5, 2, 3];
        let mut tally = RevertTally::new();
        tally.record(A, B); // min(5, 2) = 2
        tally.record(B, A); // 2, makes A and B mutual
        tally.record(C, A); // min(3, 5) = 3, the max bucket

        let summary = tally.summarize(&counts, None);
        assert_eq!(summary.reverts, 3);
        assert_eq!(summary.mutual_editors, 2);
        assert_eq!(summary.score, (2 * 2) * 2);
    }

    #[test]
    fn test_tally_provisional_not_recorded() {
        let counts = [4, 4, 1];
        let mut tally = RevertTally::new();
        tally.record(A, B);
        tally.record(C, A);

        let with = tally.summarize(&counts, Some((B, A)));
        assert_eq!(with.reverts, 3);
        assert_eq!(with.mutual_editors, 2);
        // Buckets {4: 2, 1: 1}; drop 4 → 1 × 2.
        assert_eq!(with.score, 2);

        let without = tally.summarize(&counts, None);
        assert_eq!(without.reverts, 2);
        assert_eq!(without.mutual_editors, 0);
        assert_eq!(without.score, 0);
    }

    #[test]
    fn test_editor_table() {
        let mut table = EditorTable::new();
        let alice = EditorId::new("Alice").unwrap();
        let bob = EditorId::new("Bob").unwrap();
        assert_eq!(table.record_edit(&alice), 0);
        assert_eq!(table.record_edit(&bob), 1);
        assert_eq!(table.record_edit(&alice), 0);
        assert_eq!(table.edit_counts(), &[2, 1]);
        assert_eq!(table.len(), 2);
    }
}
