//! Page and revision records materialized from a history dump.
//!
//! These values are short-lived: the reader builds them one batch at a time
//! and the encoder drops them once the batch is written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Seed for content-identity hashing. Changing it changes every content key.
const CONTENT_KEY_SEED: u64 = 0;

/// Editor id written when a contributor carries neither a username nor an IP.
pub const UNKNOWN_EDITOR: &str = "__unknown_editor__";

/// Stand-in for the full revision text.
///
/// Two revisions of a page share a key iff their text (or, lacking text,
/// their sha1) is byte-identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentKey(u64);

impl ContentKey {
    /// Key for a revision's content signal.
    pub fn from_text(text: &str) -> Self {
        Self(xxh64(text.as_bytes(), CONTENT_KEY_SEED))
    }

    /// Key when only a sha1 digest is available.
    ///
    /// Digests are namespaced so a text that happens to equal a digest
    /// string never collides with it.
    pub fn from_sha1(sha1: &str) -> Self {
        Self(xxh64(sha1.as_bytes(), CONTENT_KEY_SEED ^ 0x5348_4131))
    }

    /// Key shared by every revision with no content signal at all.
    pub fn empty() -> Self {
        Self::from_text("")
    }

    /// Raw hash value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Resolved editor identity, safe to write as a single trace token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EditorId(String);

impl EditorId {
    /// Normalize a username or IP: every whitespace character becomes an
    /// underscore, so the id is always a single trace token. Runs are not
    /// collapsed: `"A  B"` becomes `A__B`.
    ///
    /// Returns `None` for an empty name.
    pub fn new(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }
        let id = raw
            .chars()
            .map(|c| if c.is_whitespace() { '_' } else { c })
            .collect();
        Some(Self(id))
    }

    /// The sentinel identity for suppressed contributors.
    pub fn unknown() -> Self {
        Self(UNKNOWN_EDITOR.to_string())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EditorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Author of a revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Contributor {
    /// Registered account.
    User {
        /// Account name as it appears in the dump.
        username: String,
        /// Numeric account id, if exported.
        id: Option<u64>,
    },
    /// Logged-out edit identified by address.
    Anonymous {
        /// IPv4 or IPv6 address.
        ip: String,
    },
    /// Suppressed or otherwise missing contributor.
    Unknown,
}

impl Contributor {
    /// Resolve the editor id: username first, then IP.
    ///
    /// `Unknown` contributors and empty names resolve to `None`; the
    /// caller decides the policy.
    pub fn editor_id(&self) -> Option<EditorId> {
        match self {
            Self::User { username, .. } => EditorId::new(username),
            Self::Anonymous { ip } => EditorId::new(ip),
            Self::Unknown => None,
        }
    }

    /// Username, if this is a registered account.
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::User { username, .. } => Some(username.as_str()),
            _ => None,
        }
    }

    /// Account id, if exported.
    pub fn user_id(&self) -> Option<u64> {
        match self {
            Self::User { id, .. } => *id,
            _ => None,
        }
    }

    /// IP address, if this is an anonymous edit.
    pub fn ip(&self) -> Option<&str> {
        match self {
            Self::Anonymous { ip } => Some(ip.as_str()),
            _ => None,
        }
    }
}

impl Default for Contributor {
    fn default() -> Self {
        Self::Unknown
    }
}

/// One revision of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    /// Dump-global revision id.
    pub id: u64,
    /// Id of the revision this one was based on.
    pub parent_id: Option<u64>,
    /// Timestamp exactly as written in the dump.
    pub timestamp: String,
    /// Parsed timestamp, used for ordering.
    pub time: DateTime<Utc>,
    /// Edit summary.
    pub comment: Option<String>,
    /// Content model (e.g. `wikitext`).
    pub model: Option<String>,
    /// Content format (e.g. `text/x-wiki`).
    pub format: Option<String>,
    /// Base-36 sha1 of the text, if exported.
    pub sha1: Option<String>,
    /// Identity of the revision content.
    pub content: ContentKey,
    /// Who made the edit.
    pub contributor: Contributor,
}

/// A page with its revisions in dump order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Page id.
    pub id: u64,
    /// Page title.
    pub title: String,
    /// Revisions in the order they appear in the dump (not chronological).
    pub revisions: Vec<Revision>,
}

impl Page {
    /// Number of revisions.
    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    /// Check if the page has no revisions.
    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_editor_id_replaces_spaces() {
        let id = EditorId::new("Jimbo Wales").unwrap();
        assert_eq!(id.as_str(), "Jimbo_Wales");
    }

    #[test]
    fn test_editor_id_keeps_every_space() {
        assert_eq!(EditorId::new("A  B").unwrap().as_str(), "A__B");
        assert_eq!(EditorId::new("tab\there").unwrap().as_str(), "tab_there");
        assert!(EditorId::new("").is_none());
    }

    #[test]
    fn test_contributor_resolution_order() {
        let user = Contributor::User { username: "Some User".into(), id: Some(7) };
        assert_eq!(user.editor_id().unwrap().as_str(), "Some_User");

        let anon = Contributor::Anonymous { ip: "10.0.0.1".into() };
        assert_eq!(anon.editor_id().unwrap().as_str(), "10.0.0.1");

        assert!(Contributor::Unknown.editor_id().is_none());
    }

    #[test]
    fn test_content_key_identity() {
        assert_eq!(ContentKey::from_text("abc"), ContentKey::from_text("abc"));
        assert_ne!(ContentKey::from_text("abc"), ContentKey::from_text("abd"));
        assert_eq!(ContentKey::empty(), ContentKey::from_text(""));
        assert_ne!(ContentKey::from_sha1("abc"), ContentKey::from_text("abc"));
    }
}
