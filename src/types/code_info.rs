//! Structural summary of a package's source tree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One descriptive entry about the package (a header field, a detected
/// framework, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoDetails {
    /// Category of the entry.
    #[serde(rename = "type")]
    pub kind: String,
    /// Entry name.
    pub key: String,
    /// Entry value.
    pub value: String,
}

/// Line-count statistics for a single language.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClocResult {
    /// Blank lines.
    pub blank: u64,
    /// Comment lines.
    pub comment: u64,
    /// Code lines.
    pub code: u64,
    /// Files counted.
    #[serde(rename = "nFiles")]
    pub n_files: u64,
}

/// Structural code information for a package.
///
/// Exactly one `CodeInfo` must be present in a job's result set before a
/// report can be built. Its `kind` doubles as the report's `project_type`.
///
/// `cloc` is an ordered map, so languages always render in the same order.
///
/// # Examples
///
/// ```
/// use tide_audit::types::CodeInfo;
///
/// let info = CodeInfo::new("plugin");
/// assert!(info.is_identified());
/// assert_eq!(
///     serde_json::to_string(&info).unwrap(),
///     r#"{"type":"plugin","details":[],"cloc":{}}"#
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeInfo {
    /// Package type (`plugin`, `theme`, ...). Empty when unidentified.
    #[serde(rename = "type")]
    pub kind: String,
    /// Ordered descriptive entries.
    #[serde(default)]
    pub details: Vec<InfoDetails>,
    /// Language name to line counts.
    #[serde(default)]
    pub cloc: BTreeMap<String, ClocResult>,
}

impl CodeInfo {
    /// Create code info for a package type with no details or counts.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    /// Append a detail entry.
    pub fn with_detail(
        mut self,
        kind: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.details.push(InfoDetails {
            kind: kind.into(),
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Set line counts for a language.
    pub fn with_cloc(mut self, language: impl Into<String>, counts: ClocResult) -> Self {
        self.cloc.insert(language.into(), counts);
        self
    }

    /// Returns `true` when the package type is known.
    pub fn is_identified(&self) -> bool {
        !self.kind.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cloc_languages_render_sorted() {
        let info = CodeInfo::new("theme")
            .with_cloc(
                "PHP",
                ClocResult {
                    blank: 1,
                    comment: 2,
                    code: 3,
                    n_files: 1,
                },
            )
            .with_cloc("CSS", ClocResult::default());
        let json = serde_json::to_string(&info).unwrap();
        assert_eq!(
            json,
            r#"{"type":"theme","details":[],"cloc":{"CSS":{"blank":0,"comment":0,"code":0,"nFiles":0},"PHP":{"blank":1,"comment":2,"code":3,"nFiles":1}}}"#
        );
    }

    #[test]
    fn details_keep_insertion_order() {
        let info = CodeInfo::new("plugin")
            .with_detail("header", "Name", "Demo")
            .with_detail("header", "Version", "1.0.0");
        assert_eq!(info.details[0].key, "Name");
        assert_eq!(info.details[1].key, "Version");
    }

    #[test]
    fn unidentified_info() {
        assert!(!CodeInfo::default().is_identified());
    }
}
