//! Job dispatch.
//!
//! A [`Dispatcher`] takes a [`Job`](crate::types::Job), runs the requested
//! [`AuditTask`]s concurrently, uploads their artifacts, and delivers the
//! assembled report. Each job walks the [`JobState`] machine and ends as a
//! [`JobOutcome`] or a [`JobFailure`].

mod dispatcher;
mod outcome;
mod state;
mod task;

pub use dispatcher::{artifact_reference, Dispatcher};
pub use outcome::{FailureCause, JobFailure, JobOutcome};
pub use state::JobState;
pub use task::{
    Artifact, ArtifactKind, AuditTask, TaskContext, TaskError, TaskOutput, TaskProduct,
};
