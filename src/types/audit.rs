//! Per-task audit output shapes.
//!
//! An [`AuditResult`] is what one analysis task hands back: a pointer to its
//! raw output, a pointer to its parsed output, and an optional set of counts.
//! Once produced it is never mutated, except for the storage rewrite the
//! dispatcher applies after a successful upload.

use serde::{Deserialize, Serialize};

/// Location of one artifact produced by a task.
///
/// Before upload the details describe a local file; after upload they point
/// into the artifact store (`type` is the store kind, `filename` the storage
/// reference and `path` the store collection).
///
/// # Examples
///
/// ```
/// use tide_audit::types::AuditDetails;
///
/// let details = AuditDetails::new("local", "phpcs.json", "/tmp/work");
/// let json = serde_json::to_string(&details).unwrap();
/// assert_eq!(json, r#"{"type":"local","filename":"phpcs.json","path":"/tmp/work"}"#);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditDetails {
    /// Where the artifact lives (`local`, a store kind, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Logical file name, or the storage reference once uploaded.
    #[serde(rename = "filename")]
    pub file_name: String,
    /// Directory or collection holding the artifact.
    pub path: String,
}

impl AuditDetails {
    /// Create details from their three parts.
    pub fn new(kind: impl Into<String>, file_name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            file_name: file_name.into(),
            path: path.into(),
        }
    }
}

/// Optional counters summarising a task's findings.
///
/// Every counter is omitted from JSON when absent, so an empty summary
/// renders as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSummary {
    /// Number of errors reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors_count: Option<u64>,
    /// Number of warnings reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings_count: Option<u64>,
    /// Number of files inspected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files_count: Option<u64>,
}

impl AuditSummary {
    /// Returns `true` when no counter is set.
    pub fn is_empty(&self) -> bool {
        self.errors_count.is_none() && self.warnings_count.is_none() && self.files_count.is_none()
    }
}

/// The output of one analysis task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditResult {
    /// The tool's unprocessed output.
    pub raw: AuditDetails,
    /// The tool's output after parsing.
    pub parsed: AuditDetails,
    /// Counts, when the task produced any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<AuditSummary>,
}

impl AuditResult {
    /// Create a result without a summary.
    pub fn new(raw: AuditDetails, parsed: AuditDetails) -> Self {
        Self {
            raw,
            parsed,
            summary: None,
        }
    }

    /// Attach a summary.
    pub fn with_summary(mut self, summary: AuditSummary) -> Self {
        self.summary = Some(summary);
        self
    }
}
