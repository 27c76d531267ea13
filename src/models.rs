//! Domain types shared by the scanner, classifier, state store and jobs

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A movie folder found directly under the scan root.
///
/// Identity is the folder name; it is assumed unique within one root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub name: String,
    pub path: PathBuf,
}

impl Candidate {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Tri-state reading of a free-form model answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Positive,
    Negative,
    Indeterminate,
}

/// Outcome of a successful classification. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub is_match: bool,
    /// Raw model output, kept for auditing
    pub raw_response: String,
    pub checked_at: DateTime<Utc>,
}

impl Verdict {
    pub fn new(is_match: bool, raw_response: impl Into<String>) -> Self {
        Self {
            is_match,
            raw_response: raw_response.into(),
            checked_at: Utc::now(),
        }
    }
}

/// Persisted proof that a candidate has been classified
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckedRecord {
    pub name: String,
    #[serde(flatten)]
    pub verdict: Verdict,
}
