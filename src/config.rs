//! Pipeline parameters.
//!
//! Parameters are loaded from a JSON file with one optional section per
//! stage. Missing sections and fields take the defaults below.
//!
//! ```json
//! {
//!   "data_dir": "data/",
//!   "process": { "fps": ["enwiki-20200101-pages-meta-history1.xml-p10p1036"], "page_chunk": 10 },
//!   "m_stat": { "fps": ["light-dump-enwiki-20200101-pages-meta-history1-xml-p10p1036.txt"], "extra_stats": true }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::DEFAULT_PAGE_CHUNK;

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Params file could not be read.
    #[error("Failed to read params file {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// Params file is not valid JSON for this schema.
    #[error("Invalid params JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A field holds a value outside its domain.
    #[error("Invalid {field}: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// Output format of the conversion stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Line-oriented compact trace (input of the scorer).
    #[default]
    Compact,
    /// One JSON object per revision with the selected tags.
    Tabular,
}

/// What to do with a revision whose contributor has no username or IP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingEditorPolicy {
    /// Attribute the edit to [`crate::types::UNKNOWN_EDITOR`].
    #[default]
    Sentinel,
    /// Fail the file.
    Reject,
}

/// Attribute that the tabular format can project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tag {
    /// Page id.
    PageId,
    /// Page title.
    PageTitle,
    /// Revision id.
    RevId,
    /// Parent revision id.
    ParentId,
    /// Revision timestamp.
    Timestamp,
    /// Edit summary.
    Comment,
    /// Content model.
    Model,
    /// Content format.
    Format,
    /// Text sha1.
    Sha1,
    /// Contributor username.
    Username,
    /// Contributor account id.
    UserId,
    /// Contributor IP.
    UserIp,
}

impl Tag {
    /// Column name in tabular output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PageId => "page_id",
            Self::PageTitle => "page_title",
            Self::RevId => "rev_id",
            Self::ParentId => "parent_id",
            Self::Timestamp => "timestamp",
            Self::Comment => "comment",
            Self::Model => "model",
            Self::Format => "format",
            Self::Sha1 => "sha1",
            Self::Username => "username",
            Self::UserId => "user_id",
            Self::UserIp => "user_ip",
        }
    }

    /// Tags projected when none are configured.
    pub fn default_set() -> Vec<Tag> {
        vec![Tag::PageTitle, Tag::RevId, Tag::ParentId, Tag::Username, Tag::UserIp]
    }
}

/// Parameters of the dump conversion stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessParams {
    /// Decompressed dump files, relative to `<data_dir>/temp/`.
    pub fps: Vec<String>,
    /// Pages held in memory before a batch is encoded and flushed.
    pub page_chunk: usize,
    /// Output format.
    pub out_format: OutputFormat,
    /// Tags for tabular output.
    pub tags: Vec<Tag>,
    /// Handling of revisions without editor identity.
    pub missing_editor: MissingEditorPolicy,
}

impl Default for ProcessParams {
    fn default() -> Self {
        Self {
            fps: Vec::new(),
            page_chunk: DEFAULT_PAGE_CHUNK,
            out_format: OutputFormat::default(),
            tags: Tag::default_set(),
            missing_editor: MissingEditorPolicy::default(),
        }
    }
}

/// Parameters of the batch scoring stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MStatParams {
    /// Trace files, relative to `<data_dir>/out/`.
    pub fps: Vec<String>,
    /// Report edit, revert, editor and mutual-editor counts.
    pub extra_stats: bool,
}

/// Parameters of the article extraction stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractParams {
    /// Trace files to search, relative to `<data_dir>/out/`.
    pub fps: Vec<String>,
    /// Titles to extract.
    pub desired_articles: Vec<String>,
}

/// Parameters of the time-series stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverTimeParams {
    /// Single-article trace files, relative to `<data_dir>/out/`.
    pub fps: Vec<String>,
}

/// All pipeline parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root of the data layout.
    pub data_dir: PathBuf,
    /// Conversion stage.
    pub process: ProcessParams,
    /// Batch scoring stage.
    pub m_stat: MStatParams,
    /// Article extraction stage.
    pub extract: ExtractParams,
    /// Time-series stage.
    pub over_time: OverTimeParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            process: ProcessParams::default(),
            m_stat: MStatParams::default(),
            extract: ExtractParams::default(),
            over_time: OverTimeParams::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON params file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Check value domains.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.process.page_chunk == 0 {
            return Err(ConfigError::Invalid {
                field: "process.page_chunk",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.process.out_format == OutputFormat::Tabular && self.process.tags.is_empty() {
            return Err(ConfigError::Invalid {
                field: "process.tags",
                reason: "tabular output needs at least one tag".to_string(),
            });
        }
        Ok(())
    }

    /// Directory holding decompressed dumps.
    pub fn temp_dir(&self) -> PathBuf {
        self.data_dir.join("temp")
    }

    /// Directory holding traces and extracted articles.
    pub fn out_dir(&self) -> PathBuf {
        self.data_dir.join("out")
    }

    /// Directory holding score tables and time series.
    pub fn m_stat_dir(&self) -> PathBuf {
        self.data_dir.join("out_m_stat")
    }
}
