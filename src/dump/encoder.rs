//! Batch encoders: compact trace and tabular projection.
//!
//! ## Compact Algorithm
//!
//! 1. Collect (timestamp, content key, editor) for every revision
//! 2. Stable-sort ascending by timestamp; ties keep dump order
//! 3. Walk ascending with a [`ContentRegistry`]: a repeated key is a revert
//!    and reuses its id, a new key gets the next id
//! 4. Write the title line, then the events newest-first

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use std::io::Write;
use tracing::warn;

use super::{DumpError, PageBatch};
use crate::config::{MissingEditorPolicy, Tag};
use crate::trace::write_page_trace;
use crate::types::{CompactEvent, ContentKey, EditorId, Page, PageTrace, Revision};

/// Counters for one encoded batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeStats {
    /// Pages written.
    pub pages: usize,
    /// Revisions written (events or rows).
    pub revisions: usize,
    /// Revisions attributed to the unknown-editor sentinel.
    pub unknown_editors: usize,
}

impl EncodeStats {
    /// Add another batch's counters.
    pub fn merge(&mut self, other: EncodeStats) {
        self.pages += other.pages;
        self.revisions += other.revisions;
        self.unknown_editors += other.unknown_editors;
    }
}

/// Writes one batch of pages in some output format.
///
/// The batch is taken by value and dropped once written.
pub trait BatchEncoder {
    /// Encode every page of the batch into `out`.
    fn encode_batch(&mut self, batch: PageBatch, out: &mut dyn Write) -> Result<EncodeStats, DumpError>;
}

/// First-seen content ids for one page.
#[derive(Debug, Default)]
pub struct ContentRegistry {
    ids: HashMap<ContentKey, u32>,
}

impl ContentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `key` and whether it was seen before.
    pub fn observe(&mut self, key: ContentKey) -> (u32, bool) {
        let next = self.ids.len() as u32 + 1;
        match self.ids.get(&key) {
            Some(&id) => (id, true),
            None => {
                self.ids.insert(key, next);
                (next, false)
            }
        }
    }

    /// Number of distinct contents seen.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if nothing has been observed.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Encoder for the compact trace format.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompactEncoder {
    missing_editor: MissingEditorPolicy,
}

impl CompactEncoder {
    /// Create an encoder with a missing-editor policy.
    pub fn new(missing_editor: MissingEditorPolicy) -> Self {
        Self { missing_editor }
    }

    /// Build the chronological trace of one page.
    pub fn encode_page(&self, page: &Page) -> Result<PageTrace, DumpError> {
        let mut ordered: Vec<&Revision> = page.revisions.iter().collect();
        // Stable: equal timestamps keep dump order.
        ordered.sort_by_key(|rev| rev.time);

        let mut registry = ContentRegistry::new();
        let mut trace = PageTrace::new(page.title.clone());
        trace.events.reserve(ordered.len());

        for rev in ordered {
            let editor = self.resolve_editor(page, rev)?;
            let (content_id, reverted) = registry.observe(rev.content);
            trace.events.push(CompactEvent {
                timestamp: rev.timestamp.clone(),
                reverted,
                content_id,
                editor,
            });
        }
        Ok(trace)
    }

    fn resolve_editor(&self, page: &Page, rev: &Revision) -> Result<EditorId, DumpError> {
        match rev.contributor.editor_id() {
            Some(editor) => Ok(editor),
            None => match self.missing_editor {
                MissingEditorPolicy::Sentinel => Ok(EditorId::unknown()),
                MissingEditorPolicy::Reject => Err(DumpError::MissingEditor {
                    page: page.title.clone(),
                    revision: rev.id,
                }),
            },
        }
    }
}

impl BatchEncoder for CompactEncoder {
    fn encode_batch(&mut self, batch: PageBatch, out: &mut dyn Write) -> Result<EncodeStats, DumpError> {
        let mut stats = EncodeStats::default();
        for page in batch.pages {
            let trace = self.encode_page(&page)?;
            let unknown = page
                .revisions
                .iter()
                .filter(|rev| rev.contributor.editor_id().is_none())
                .count();
            if unknown > 0 {
                warn!(page = %page.title, revisions = unknown, "Revisions without editor identity");
            }

            write_page_trace(&trace, out)?;
            stats.pages += 1;
            stats.revisions += trace.len();
            stats.unknown_editors += unknown;
        }
        Ok(stats)
    }
}

/// Encoder projecting selected attributes into one JSON object per revision.
#[derive(Debug, Clone)]
pub struct TabularEncoder {
    tags: Vec<Tag>,
}

impl TabularEncoder {
    /// Create an encoder for `tags`, in the given column order.
    /// Repeated tags are kept once.
    pub fn new(tags: &[Tag]) -> Self {
        let mut unique = Vec::with_capacity(tags.len());
        for tag in tags {
            if !unique.contains(tag) {
                unique.push(*tag);
            }
        }
        Self { tags: unique }
    }

    /// Projected columns.
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    fn project(&self, page: &Page, rev: &Revision) -> Vec<(&'static str, Value)> {
        self.tags
            .iter()
            .map(|tag| {
                let value = match tag {
                    Tag::PageId => Value::from(page.id),
                    Tag::PageTitle => Value::from(page.title.as_str()),
                    Tag::RevId => Value::from(rev.id),
                    Tag::ParentId => Value::from(rev.parent_id),
                    Tag::Timestamp => Value::from(rev.timestamp.as_str()),
                    Tag::Comment => Value::from(rev.comment.as_deref()),
                    Tag::Model => Value::from(rev.model.as_deref()),
                    Tag::Format => Value::from(rev.format.as_deref()),
                    Tag::Sha1 => Value::from(rev.sha1.as_deref()),
                    Tag::Username => Value::from(rev.contributor.username()),
                    Tag::UserId => Value::from(rev.contributor.user_id()),
                    Tag::UserIp => Value::from(rev.contributor.ip()),
                };
                (tag.as_str(), value)
            })
            .collect()
    }
}

/// Ordered columns serialized as a JSON object.
struct Row<'a>(&'a [(&'static str, Value)]);

impl Serialize for Row<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl BatchEncoder for TabularEncoder {
    fn encode_batch(&mut self, batch: PageBatch, out: &mut dyn Write) -> Result<EncodeStats, DumpError> {
        let mut stats = EncodeStats::default();
        for page in batch.pages {
            for rev in &page.revisions {
                let columns = self.project(&page, rev);
                serde_json::to_writer(&mut *out, &Row(&columns))?;
                out.write_all(b"\n")?;
                stats.revisions += 1;
            }
            stats.pages += 1;
        }
        Ok(stats)
    }
}
