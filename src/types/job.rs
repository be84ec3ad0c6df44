//! Job descriptor.

use serde::{Deserialize, Serialize};

/// One audit request for a package.
///
/// A job is accepted from the work queue, processed by the dispatcher and
/// ends once its report has been delivered or the job has failed. All text
/// metadata is optional on the wire and defaults to empty.
///
/// # Examples
///
/// ```
/// use tide_audit::types::Job;
///
/// let job = Job::new("akismet", "39f5b1c2")
///     .with_project_type("plugin")
///     .with_audits(["info", "phpcs_wordpress"]);
/// assert_eq!(job.audits.len(), 2);
/// assert!(job.archive_reference.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Job {
    /// Human-readable package title.
    pub title: String,
    /// Package description.
    pub content: String,
    /// Package version.
    pub version: String,
    /// Project slug. Empty when the package is not tied to a project.
    pub slug: String,
    /// Content checksum identifying the exact source audited.
    pub checksum: String,
    /// Report visibility (`public`, `private`).
    pub visibility: String,
    /// Package type (`plugin`, `theme`).
    pub project_type: String,
    /// Where the source came from.
    pub source_url: String,
    /// Source format (`zip`, `git`).
    pub source_type: String,
    /// Storage reference of a previously stored source archive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_reference: Option<String>,
    /// Requested task identifiers.
    pub audits: Vec<String>,
}

impl Job {
    /// Create a job with a slug and checksum.
    pub fn new(slug: impl Into<String>, checksum: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            checksum: checksum.into(),
            ..Self::default()
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the visibility.
    pub fn with_visibility(mut self, visibility: impl Into<String>) -> Self {
        self.visibility = visibility.into();
        self
    }

    /// Set the package type.
    pub fn with_project_type(mut self, project_type: impl Into<String>) -> Self {
        self.project_type = project_type.into();
        self
    }

    /// Set the source location and format.
    pub fn with_source(mut self, url: impl Into<String>, source_type: impl Into<String>) -> Self {
        self.source_url = url.into();
        self.source_type = source_type.into();
        self
    }

    /// Set the storage reference of the source archive.
    pub fn with_archive_reference(mut self, reference: impl Into<String>) -> Self {
        self.archive_reference = Some(reference.into());
        self
    }

    /// Set the requested task identifiers.
    pub fn with_audits<I, S>(mut self, audits: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.audits = audits.into_iter().map(Into::into).collect();
        self
    }

    /// Name used in logs: the slug, or the checksum for anonymous jobs.
    pub fn label(&self) -> &str {
        if self.slug.is_empty() {
            &self.checksum
        } else {
            &self.slug
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_default_to_empty() {
        let job: Job = serde_json::from_str(r#"{"checksum":"abc","audits":["info"]}"#).unwrap();
        assert_eq!(job.checksum, "abc");
        assert!(job.slug.is_empty());
        assert!(job.title.is_empty());
        assert_eq!(job.audits, vec!["info".to_string()]);
    }

    #[test]
    fn label_falls_back_to_checksum() {
        assert_eq!(Job::new("", "abc").label(), "abc");
        assert_eq!(Job::new("slug", "abc").label(), "slug");
    }
}
