//! Report assembly.
//!
//! A job's task outputs accumulate in a [`ResultSet`]. Once every task has
//! settled, [`build`] validates the set and renders the canonical
//! [`Payload`] envelope:
//!
//! ```text
//! title, content, version, checksum, visibility, project_type,
//! source_url, source_type, code_info{type, details, cloc},
//! reports{<task>: {raw, parsed, summary}}, [project]
//! ```
//!
//! Scalar fields are resolved through [`crate::merge`] over task overrides
//! and job metadata. [`ReportPayloader`] pairs the builder with a
//! [`DeliveryClient`] for sending.

mod envelope;
mod result_set;

pub use envelope::{build, Payload, PayloadError, ReportEntry};
pub use result_set::{
    is_reserved_id, EnvelopeField, EnvelopeOverrides, ResultEntry, ResultSet, CHECKSUM_KEY,
    CODE_INFO_KEY,
};

use reqwest::Method;

use crate::client::{DeliveryClient, DeliveryError};
use crate::types::Job;

/// Builds reports and posts them through a delivery client.
#[derive(Debug, Clone)]
pub struct ReportPayloader<C> {
    client: C,
}

impl<C: DeliveryClient> ReportPayloader<C> {
    /// Create a payloader around a client.
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// The underlying client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Build the report bytes for a job. See [`build`].
    pub fn build(&self, job: &Job, results: &ResultSet) -> Result<Vec<u8>, PayloadError> {
        build(job, results)
    }

    /// POST report bytes to `destination`, returning the response body.
    pub async fn send(&self, destination: &str, payload: &[u8]) -> Result<Vec<u8>, DeliveryError> {
        self.client.send(Method::POST, destination, payload).await
    }
}
