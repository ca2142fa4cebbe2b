//! Forward-only dump reader and page batching.

use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::BufRead;
use tracing::debug;

use super::DumpError;
use crate::types::{ContentKey, Contributor, Page, Revision};

/// Owned view of one pull-parser event.
///
/// Element names are local names, so every export schema version and
/// namespace prefix is accepted.
enum Node {
    Open(Vec<u8>),
    Close,
    Leaf(Vec<u8>),
    Text(String),
    Eof,
    Other,
}

/// Pull reader yielding one [`Page`] at a time.
///
/// Revision text is hashed exactly as exported. Only identifier-like
/// fields (ids, timestamp, contributor, model, format, sha1) are trimmed.
pub struct DumpReader<R: BufRead> {
    xml: Reader<R>,
    buf: Vec<u8>,
    pages_read: u64,
    /// Wrapper elements (`<mediawiki>`) opened but not yet closed.
    open_wrappers: usize,
}

impl<R: BufRead> DumpReader<R> {
    /// Wrap a buffered byte stream.
    pub fn new(input: R) -> Self {
        Self {
            xml: Reader::from_reader(input),
            buf: Vec::new(),
            pages_read: 0,
            open_wrappers: 0,
        }
    }

    /// Number of pages returned so far.
    pub fn pages_read(&self) -> u64 {
        self.pages_read
    }

    /// Group the remaining pages into batches of `page_chunk`.
    ///
    /// A `page_chunk` of 0 is treated as 1.
    pub fn batches(self, page_chunk: usize) -> PageBatches<R> {
        PageBatches {
            reader: self,
            page_chunk: page_chunk.max(1),
            done: false,
        }
    }

    /// Read the next page, or `None` at end of input.
    pub fn next_page(&mut self) -> Result<Option<Page>, DumpError> {
        loop {
            match self.next_node()? {
                Node::Open(name) => match name.as_slice() {
                    b"page" => {
                        let page = self.read_page()?;
                        self.pages_read += 1;
                        return Ok(Some(page));
                    }
                    b"siteinfo" => self.skip_element("siteinfo")?,
                    // Descend into <mediawiki> and any other wrapper.
                    _ => self.open_wrappers += 1,
                },
                Node::Close => self.open_wrappers = self.open_wrappers.saturating_sub(1),
                // A dump cut off between pages is as invalid as one cut
                // off inside a page.
                Node::Eof if self.open_wrappers > 0 => {
                    return Err(DumpError::UnexpectedEof("mediawiki"))
                }
                Node::Eof => return Ok(None),
                Node::Leaf(_) | Node::Text(_) | Node::Other => {}
            }
        }
    }

    fn next_node(&mut self) -> Result<Node, DumpError> {
        self.buf.clear();
        let event = self
            .xml
            .read_event_into(&mut self.buf)
            .map_err(|source| DumpError::Xml {
                position: self.xml.buffer_position() as u64,
                source,
            })?;
        let node = match event {
            Event::Start(e) => Node::Open(e.local_name().as_ref().to_vec()),
            Event::End(_) => Node::Close,
            Event::Empty(e) => Node::Leaf(e.local_name().as_ref().to_vec()),
            Event::Text(t) => {
                let text = t.unescape().map_err(|source| DumpError::Xml {
                    position: self.xml.buffer_position() as u64,
                    source,
                })?;
                Node::Text(text.into_owned())
            }
            Event::CData(c) => Node::Text(String::from_utf8_lossy(&c).into_owned()),
            Event::Eof => Node::Eof,
            _ => Node::Other,
        };
        Ok(node)
    }

    /// Consume the rest of an element whose start tag was just read.
    fn skip_element(&mut self, context: &'static str) -> Result<(), DumpError> {
        let mut depth = 1usize;
        loop {
            self.buf.clear();
            let event = self
                .xml
                .read_event_into(&mut self.buf)
                .map_err(|source| DumpError::Xml {
                    position: self.xml.buffer_position() as u64,
                    source,
                })?;
            match event {
                Event::Start(_) => depth += 1,
                Event::End(_) => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Event::Eof => return Err(DumpError::UnexpectedEof(context)),
                _ => {}
            }
        }
    }

    /// Collect the text of an element whose start tag was just read.
    fn read_text(&mut self, element: &'static str) -> Result<String, DumpError> {
        let mut text = String::new();
        loop {
            match self.next_node()? {
                Node::Text(t) => text.push_str(&t),
                Node::Close => return Ok(text),
                Node::Open(found) | Node::Leaf(found) => {
                    return Err(DumpError::UnexpectedElement {
                        parent: element,
                        found: String::from_utf8_lossy(&found).into_owned(),
                    })
                }
                Node::Eof => return Err(DumpError::UnexpectedEof(element)),
                Node::Other => {}
            }
        }
    }

    fn read_page(&mut self) -> Result<Page, DumpError> {
        let mut title = None;
        let mut id = None;
        let mut revisions = Vec::new();

        loop {
            match self.next_node()? {
                Node::Open(name) => match name.as_slice() {
                    b"title" => title = Some(self.read_text("title")?),
                    b"id" => id = Some(parse_u64("page id", &self.read_text("id")?)?),
                    b"revision" => revisions.push(self.read_revision()?),
                    _ => self.skip_element("page")?,
                },
                Node::Close => break,
                Node::Eof => return Err(DumpError::UnexpectedEof("page")),
                Node::Leaf(_) | Node::Text(_) | Node::Other => {}
            }
        }

        let title = title.ok_or(DumpError::MissingField { element: "page", field: "title" })?;
        let id = id.ok_or(DumpError::MissingField { element: "page", field: "id" })?;
        Ok(Page { id, title, revisions })
    }

    fn read_revision(&mut self) -> Result<Revision, DumpError> {
        let mut id = None;
        let mut parent_id = None;
        let mut timestamp = None;
        let mut comment = None;
        let mut model = None;
        let mut format = None;
        let mut sha1 = None;
        let mut text_key = None;
        let mut contributor = Contributor::Unknown;

        loop {
            match self.next_node()? {
                Node::Open(name) => match name.as_slice() {
                    b"id" => id = Some(parse_u64("revision id", &self.read_text("id")?)?),
                    b"parentid" => {
                        parent_id = Some(parse_u64("parent id", &self.read_text("parentid")?)?)
                    }
                    b"timestamp" => {
                        timestamp = Some(self.read_text("timestamp")?.trim().to_string())
                    }
                    b"comment" => comment = non_empty(&self.read_text("comment")?),
                    b"model" => model = non_empty(self.read_text("model")?.trim()),
                    b"format" => format = non_empty(self.read_text("format")?.trim()),
                    b"sha1" => sha1 = non_empty(self.read_text("sha1")?.trim()),
                    b"text" => {
                        let text = self.read_text("text")?;
                        if !text.is_empty() {
                            text_key = Some(ContentKey::from_text(&text));
                        }
                    }
                    b"contributor" => contributor = self.read_contributor()?,
                    _ => self.skip_element("revision")?,
                },
                Node::Close => break,
                Node::Eof => return Err(DumpError::UnexpectedEof("revision")),
                // <contributor deleted="deleted"/>, <text bytes="0"/>, <minor/>
                Node::Leaf(_) | Node::Text(_) | Node::Other => {}
            }
        }

        let id = id.ok_or(DumpError::MissingField { element: "revision", field: "id" })?;
        let timestamp =
            timestamp.ok_or(DumpError::MissingField { element: "revision", field: "timestamp" })?;
        let time = DateTime::parse_from_rfc3339(&timestamp)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| DumpError::InvalidTimestamp { revision: id, value: timestamp.clone() })?;

        let content = text_key
            .or_else(|| sha1.as_deref().map(ContentKey::from_sha1))
            .unwrap_or_else(ContentKey::empty);

        Ok(Revision {
            id,
            parent_id,
            timestamp,
            time,
            comment,
            model,
            format,
            sha1,
            content,
            contributor,
        })
    }

    fn read_contributor(&mut self) -> Result<Contributor, DumpError> {
        let mut username = None;
        let mut user_id = None;
        let mut ip = None;

        loop {
            match self.next_node()? {
                Node::Open(name) => match name.as_slice() {
                    b"username" => username = non_empty(self.read_text("username")?.trim()),
                    b"id" => user_id = Some(parse_u64("user id", &self.read_text("id")?)?),
                    b"ip" => ip = non_empty(self.read_text("ip")?.trim()),
                    _ => self.skip_element("contributor")?,
                },
                Node::Close => break,
                Node::Eof => return Err(DumpError::UnexpectedEof("contributor")),
                Node::Leaf(_) | Node::Text(_) | Node::Other => {}
            }
        }

        Ok(match (username, ip) {
            (Some(username), _) => Contributor::User { username, id: user_id },
            (None, Some(ip)) => Contributor::Anonymous { ip },
            (None, None) => Contributor::Unknown,
        })
    }
}

fn parse_u64(field: &'static str, raw: &str) -> Result<u64, DumpError> {
    raw.trim().parse().map_err(|_| DumpError::InvalidNumber {
        field,
        value: raw.to_string(),
    })
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Up to `page_chunk` pages, owned by whoever encodes them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageBatch {
    /// Pages in dump order.
    pub pages: Vec<Page>,
    /// Number of pages read before this batch.
    pub first_page: u64,
}

impl PageBatch {
    /// Number of pages in the batch.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Check if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Number of pages read once this batch is done.
    pub fn last_page(&self) -> u64 {
        self.first_page + self.pages.len() as u64
    }
}

/// Bounded batching over a [`DumpReader`].
pub struct PageBatches<R: BufRead> {
    reader: DumpReader<R>,
    page_chunk: usize,
    done: bool,
}

impl<R: BufRead> PageBatches<R> {
    /// Configured batch size.
    pub fn page_chunk(&self) -> usize {
        self.page_chunk
    }

    /// Read the next batch. The final batch may be short; an exhausted
    /// stream yields `None`.
    pub fn next_batch(&mut self) -> Result<Option<PageBatch>, DumpError> {
        if self.done {
            return Ok(None);
        }

        let first_page = self.reader.pages_read();
        let mut pages = Vec::with_capacity(self.page_chunk);
        while pages.len() < self.page_chunk {
            match self.reader.next_page() {
                Ok(Some(page)) => pages.push(page),
                Ok(None) => {
                    self.done = true;
                    break;
                }
                Err(e) => {
                    self.done = true;
                    return Err(e);
                }
            }
        }

        if pages.is_empty() {
            return Ok(None);
        }
        debug!(first_page, pages = pages.len(), "Read page batch");
        Ok(Some(PageBatch { pages, first_page }))
    }
}

impl<R: BufRead> Iterator for PageBatches<R> {
    type Item = Result<PageBatch, DumpError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_batch().transpose()
    }
}
