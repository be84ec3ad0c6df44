//! The canonical report envelope and its assembly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::result_set::{EnvelopeField, ResultSet};
use crate::merge::first_meaningful;
use crate::types::{AuditDetails, AuditSummary, CodeInfo, Job};

/// Errors raised while assembling a report.
#[derive(Error, Debug)]
pub enum PayloadError {
    /// The result set has no code-info entry.
    #[error("missing code info")]
    MissingCodeInfo,

    /// The result set has no task reports.
    #[error("missing results")]
    MissingResults,

    /// The envelope could not be rendered.
    #[error("failed to serialize payload: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One task's entry in the envelope's `reports` map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    /// Raw artifact details.
    pub raw: AuditDetails,
    /// Parsed artifact details.
    pub parsed: AuditDetails,
    /// Counts; `{}` when the task produced none.
    #[serde(default)]
    pub summary: AuditSummary,
}

/// The report delivered downstream.
///
/// Field order is the wire order. Scalar fields are always present (empty
/// when unknown); `project` only appears when the job has a slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Package title.
    pub title: String,
    /// Package description.
    pub content: String,
    /// Package version.
    pub version: String,
    /// Source checksum.
    pub checksum: String,
    /// Report visibility.
    pub visibility: String,
    /// Package type, taken from the code info.
    pub project_type: String,
    /// Source location.
    pub source_url: String,
    /// Source format.
    pub source_type: String,
    /// Structural code info, verbatim.
    pub code_info: CodeInfo,
    /// Task reports keyed by task identifier.
    pub reports: BTreeMap<String, ReportEntry>,
    /// `[slug]` for jobs tied to a project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<Vec<String>>,
}

impl Payload {
    /// Assemble the envelope for a job from its results.
    ///
    /// Validation is fail-fast: a missing code-info entry is reported before
    /// missing task reports.
    ///
    /// # Errors
    ///
    /// - [`PayloadError::MissingCodeInfo`] when `results` has no code info.
    /// - [`PayloadError::MissingResults`] when `results` has no task report.
    pub fn assemble(job: &Job, results: &ResultSet) -> Result<Self, PayloadError> {
        let code_info = results.code_info().ok_or(PayloadError::MissingCodeInfo)?;
        if !results.has_reports() {
            return Err(PayloadError::MissingResults);
        }

        let reports = results
            .reports()
            .map(|(task_id, result)| {
                (
                    task_id.to_string(),
                    ReportEntry {
                        raw: result.raw.clone(),
                        parsed: result.parsed.clone(),
                        summary: result.summary.clone().unwrap_or_default(),
                    },
                )
            })
            .collect();

        let project = if job.slug.is_empty() {
            None
        } else {
            Some(vec![job.slug.clone()])
        };

        Ok(Self {
            title: resolve_field(EnvelopeField::Title, &job.title, results),
            content: resolve_field(EnvelopeField::Content, &job.content, results),
            version: resolve_field(EnvelopeField::Version, &job.version, results),
            checksum: results.checksum().unwrap_or_default().to_string(),
            visibility: resolve_field(EnvelopeField::Visibility, &job.visibility, results),
            project_type: code_info.kind.clone(),
            source_url: resolve_field(EnvelopeField::SourceUrl, &job.source_url, results),
            source_type: resolve_field(EnvelopeField::SourceType, &job.source_type, results),
            code_info: code_info.clone(),
            reports,
            project,
        })
    }

    /// Render the envelope as JSON bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PayloadError> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Task overrides first (by task identifier), then the job's own value.
fn resolve_field(field: EnvelopeField, job_value: &str, results: &ResultSet) -> String {
    let candidates: Vec<String> = results
        .overrides_for(field)
        .chain(std::iter::once(job_value))
        .map(str::to_string)
        .collect();
    first_meaningful(&candidates).unwrap_or_default()
}

/// Build the report bytes for a job.
///
/// # Examples
///
/// ```
/// use tide_audit::payload::{build, PayloadError, ResultSet};
/// use tide_audit::types::Job;
///
/// let err = build(&Job::default(), &ResultSet::new()).unwrap_err();
/// assert!(matches!(err, PayloadError::MissingCodeInfo));
/// ```
pub fn build(job: &Job, results: &ResultSet) -> Result<Vec<u8>, PayloadError> {
    Payload::assemble(job, results)?.to_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::result_set::EnvelopeOverrides;
    use crate::types::AuditResult;

    fn minimal_results() -> ResultSet {
        let mut results = ResultSet::new();
        results.set_code_info(CodeInfo::new("plugin"));
        results.insert_report("phpcs_demo", AuditResult::default());
        results
    }

    #[test]
    fn missing_code_info_checked_first() {
        let err = Payload::assemble(&Job::default(), &ResultSet::new()).unwrap_err();
        assert!(matches!(err, PayloadError::MissingCodeInfo));
        assert_eq!(err.to_string(), "missing code info");
    }

    #[test]
    fn checksum_alone_is_not_a_result() {
        let mut results = ResultSet::new();
        results.set_code_info(CodeInfo::new("plugin"));
        results.set_checksum("abc");
        let err = Payload::assemble(&Job::default(), &results).unwrap_err();
        assert!(matches!(err, PayloadError::MissingResults));
    }

    #[test]
    fn job_metadata_fills_scalars() {
        let job = Job::new("", "abc")
            .with_title("Demo")
            .with_version("1.2.3")
            .with_visibility("public")
            .with_source("https://example.org/demo.zip", "zip");
        let payload = Payload::assemble(&job, &minimal_results()).unwrap();
        assert_eq!(payload.title, "Demo");
        assert_eq!(payload.version, "1.2.3");
        assert_eq!(payload.visibility, "public");
        assert_eq!(payload.source_url, "https://example.org/demo.zip");
        assert_eq!(payload.source_type, "zip");
        assert!(payload.content.is_empty());
        // Checksum comes from the result set, not the job.
        assert!(payload.checksum.is_empty());
        assert!(payload.project.is_none());
    }

    #[test]
    fn task_override_wins_over_job_metadata() {
        let mut results = minimal_results();
        results.set_overrides(
            "info",
            EnvelopeOverrides::new()
                .with(EnvelopeField::Version, "2.0.0")
                .with(EnvelopeField::Title, ""),
        );
        let job = Job::default().with_title("Job Title").with_version("1.0.0");
        let payload = Payload::assemble(&job, &results).unwrap();
        assert_eq!(payload.version, "2.0.0");
        // An empty override is not meaningful, so the job value survives.
        assert_eq!(payload.title, "Job Title");
    }

    #[test]
    fn project_type_comes_from_code_info() {
        let job = Job::default().with_project_type("theme");
        let payload = Payload::assemble(&job, &minimal_results()).unwrap();
        assert_eq!(payload.project_type, "plugin");
    }
}
