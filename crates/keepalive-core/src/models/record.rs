//! Keepalive record data models

use serde::{Deserialize, Serialize};

/// Title prefix shared by every keepalive record
pub const TITLE_PREFIX: &str = "keepalive:";

/// Tag carried by a record whose URLs all answered in the last cycle
pub const LABEL_ALIVE: &str = "alive";

/// Tag carried by a record with at least one unresponsive URL
pub const LABEL_FAILED: &str = "failed";

/// Identifier of a record inside its store (issue number for GitHub)
pub type RecordId = u64;

/// Build the lookup title for an owner
pub fn record_title(owner: &str) -> String {
    format!("{TITLE_PREFIX} {owner}")
}

/// Whether a title follows the keepalive naming convention
pub fn is_keepalive_title(title: &str) -> bool {
    title.starts_with(TITLE_PREFIX)
}

/// Aggregate liveness of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// Every URL answered in the last cycle
    Alive,
    /// At least one URL failed in the last cycle
    Failed,
    /// Never checked, or tags were cleared
    #[default]
    Unknown,
}

impl RecordStatus {
    /// Derive the status from a record's tag set
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Self {
        let has = |name: &str| labels.iter().any(|l| l.as_ref() == name);
        if has(LABEL_ALIVE) {
            Self::Alive
        } else if has(LABEL_FAILED) {
            Self::Failed
        } else {
            Self::Unknown
        }
    }

    /// Tag that represents this status, if any
    pub fn label(self) -> Option<&'static str> {
        match self {
            Self::Alive => Some(LABEL_ALIVE),
            Self::Failed => Some(LABEL_FAILED),
            Self::Unknown => None,
        }
    }

    /// Lowercase name used on the wire
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Alive => "alive",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record as read from the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Store identifier
    pub id: RecordId,

    /// Title; the lookup key
    pub title: String,

    /// Serialized body (see [`crate::codec`])
    pub body: String,

    /// Tag names
    pub labels: Vec<String>,

    /// Number of comments on the record
    pub comments: u32,
}

impl StoredRecord {
    /// Status derived from the tag set
    pub fn status(&self) -> RecordStatus {
        RecordStatus::from_labels(&self.labels)
    }

    /// Whether the record carries the given tag
    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|l| l == name)
    }
}

/// URLs and status for one owner, as returned by GetURLs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlListing {
    /// Monitored URLs in body order
    pub urls: Vec<String>,
    /// Status derived from the record's tags
    pub status: RecordStatus,
}

impl UrlListing {
    /// Listing for an owner without a record
    pub fn empty() -> Self {
        Self {
            urls: Vec::new(),
            status: RecordStatus::Unknown,
        }
    }
}
