//! What a processed job leaves behind.

use std::io;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use super::state::JobState;
use super::task::{ArtifactKind, TaskError};
use crate::client::DeliveryError;
use crate::payload::PayloadError;
use crate::store::StoreError;

/// One scoped failure observed while processing a job.
#[derive(Error, Debug)]
pub enum FailureCause {
    /// A task failed; only its own report is missing.
    #[error("task {task_id} failed: {error}")]
    Task {
        /// The failing task.
        task_id: String,
        /// Why it failed.
        error: TaskError,
    },

    /// The source archive could not be fetched.
    #[error("download of {reference} failed: {error}")]
    Download {
        /// The archive reference.
        reference: String,
        /// Why it failed.
        error: StoreError,
    },

    /// One artifact could not be uploaded.
    #[error("upload of {reference} failed: {error}")]
    Upload {
        /// The artifact reference.
        reference: String,
        /// Why it failed.
        error: StoreError,
    },

    /// A task handed back a second artifact of a kind it already produced.
    /// The first artifact of each kind is kept; the extra one is not uploaded.
    #[error("task {task_id} produced more than one {} artifact", .kind.suffix())]
    DuplicateArtifact {
        /// The offending task.
        task_id: String,
        /// The repeated kind.
        kind: ArtifactKind,
    },

    /// The job's scratch directory could not be prepared.
    #[error("work directory unavailable: {0}")]
    Workspace(#[source] io::Error),

    /// The report could not be assembled.
    #[error("report assembly failed: {0}")]
    Payload(#[source] PayloadError),

    /// The report could not be delivered.
    #[error("delivery failed: {0}")]
    Delivery(#[source] DeliveryError),
}

impl FailureCause {
    /// Returns `true` for causes that end the job on their own.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Download { .. } | Self::Workspace(_) | Self::Payload(_) | Self::Delivery(_)
        )
    }
}

/// A job whose report was delivered.
///
/// Partial failures (a failed task, a failed upload) do not prevent
/// delivery; they are listed here for the caller.
#[derive(Debug)]
pub struct JobOutcome {
    /// Identifier of this processing run.
    pub run_id: Uuid,
    /// Slug of the job.
    pub slug: String,
    /// Checksum of the job.
    pub checksum: String,
    /// The report bytes that were sent.
    pub payload: Vec<u8>,
    /// The response body returned by the report endpoint.
    pub response: Vec<u8>,
    /// Non-fatal failures observed along the way.
    pub partial_failures: Vec<FailureCause>,
    /// When processing started.
    pub started_at: DateTime<Utc>,
    /// When the report was accepted.
    pub finished_at: DateTime<Utc>,
}

impl JobOutcome {
    /// Always [`JobState::Delivered`].
    pub fn state(&self) -> JobState {
        JobState::Delivered
    }
}

/// A job that ended in [`JobState::Failed`].
///
/// Carries every cause that contributed, not just the last one.
#[derive(Error, Debug)]
#[error("job {slug} ({checksum}) failed while {stage} with {count} cause(s)", count = .causes.len())]
pub struct JobFailure {
    /// Identifier of this processing run.
    pub run_id: Uuid,
    /// Slug of the job.
    pub slug: String,
    /// Checksum of the job.
    pub checksum: String,
    /// The state the job was in when it failed.
    pub stage: JobState,
    /// All failures observed, in the order they were recorded.
    pub causes: Vec<FailureCause>,
    /// When processing started.
    pub started_at: DateTime<Utc>,
    /// When the job was declared failed.
    pub failed_at: DateTime<Utc>,
}

impl JobFailure {
    /// Always [`JobState::Failed`].
    pub fn state(&self) -> JobState {
        JobState::Failed
    }

    /// The cause that ended the job, if one was fatal on its own.
    pub fn fatal_cause(&self) -> Option<&FailureCause> {
        self.causes.iter().rev().find(|cause| cause.is_fatal())
    }

    /// Task identifiers that failed.
    pub fn failed_tasks(&self) -> Vec<&str> {
        self.causes
            .iter()
            .filter_map(|cause| match cause {
                FailureCause::Task { task_id, .. } => Some(task_id.as_str()),
                _ => None,
            })
            .collect()
    }
}
