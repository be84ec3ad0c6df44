//! The seam between the dispatcher and concrete analysis tools.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::payload::{EnvelopeField, EnvelopeOverrides};
use crate::types::{AuditResult, CodeInfo, Job};

/// Errors scoped to one task.
#[derive(Error, Debug)]
pub enum TaskError {
    /// The tool reported a failure.
    #[error("{0}")]
    Failed(String),

    /// The task panicked while running.
    #[error("task panicked")]
    Panicked,

    /// The job requested a task nobody registered.
    #[error("no task registered as '{0}'")]
    Unregistered(String),

    /// The task hit a filesystem error.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// What a task gets to work with.
#[derive(Debug, Clone)]
pub struct TaskContext {
    /// The job being audited.
    pub job: Arc<Job>,
    /// Scratch directory private to this job run.
    pub work_dir: PathBuf,
    /// Local copy of the source archive, when the job names one.
    pub archive: Option<PathBuf>,
}

/// Which side of a task's output an artifact holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// The tool's unprocessed output.
    Raw,
    /// The parsed output.
    Parsed,
}

impl ArtifactKind {
    /// Suffix used in storage references.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Raw => "full",
            Self::Parsed => "details",
        }
    }
}

/// A local file a task wants persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Raw or parsed.
    pub kind: ArtifactKind,
    /// Where the task wrote it.
    pub path: PathBuf,
}

/// The two shapes a task can produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskProduct {
    /// Structural code info (the info task).
    CodeInfo(CodeInfo),
    /// An audit report.
    Report(AuditResult),
}

/// Everything a task hands back on success.
///
/// # Examples
///
/// ```
/// use tide_audit::dispatch::{ArtifactKind, TaskOutput};
/// use tide_audit::payload::EnvelopeField;
/// use tide_audit::types::AuditResult;
///
/// let output = TaskOutput::report(AuditResult::default())
///     .with_artifact(ArtifactKind::Raw, "/tmp/job/raw.json")
///     .with_override(EnvelopeField::Version, "1.4.2");
/// assert_eq!(output.artifacts.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutput {
    /// The produced value.
    pub product: TaskProduct,
    /// Local files to upload once every task has settled.
    pub artifacts: Vec<Artifact>,
    /// Envelope values this task knows better than the job metadata.
    pub overrides: EnvelopeOverrides,
}

impl TaskOutput {
    /// Output of a code-info task.
    pub fn code_info(info: CodeInfo) -> Self {
        Self::from_product(TaskProduct::CodeInfo(info))
    }

    /// Output of an audit task.
    pub fn report(result: AuditResult) -> Self {
        Self::from_product(TaskProduct::Report(result))
    }

    fn from_product(product: TaskProduct) -> Self {
        Self {
            product,
            artifacts: Vec::new(),
            overrides: EnvelopeOverrides::new(),
        }
    }

    /// Ask for a local file to be uploaded.
    pub fn with_artifact(mut self, kind: ArtifactKind, path: impl Into<PathBuf>) -> Self {
        self.artifacts.push(Artifact {
            kind,
            path: path.into(),
        });
        self
    }

    /// Supply an envelope value.
    pub fn with_override(mut self, field: EnvelopeField, value: impl Into<String>) -> Self {
        self.overrides.set(field, value);
        self
    }
}

/// One independent analysis unit.
///
/// Tasks never share mutable state: each gets its own context clone and
/// returns its output by value.
#[async_trait]
pub trait AuditTask: Send + Sync {
    /// Identifier jobs use to request this task.
    fn id(&self) -> &str;

    /// Run the analysis for a job.
    async fn run(&self, ctx: &TaskContext) -> Result<TaskOutput, TaskError>;
}
