//! Audit pipeline core.
//!
//! Takes a code package (plugin or theme), runs independent analysis tasks
//! against it, merges their outputs into one canonical report, and delivers
//! that report to a downstream API.
//!
//! # Overview
//!
//! A [`Job`](types::Job) names the package and the tasks to run. The
//! [`Dispatcher`](dispatch::Dispatcher) runs the tasks concurrently, uploads
//! their artifacts to an [`ArtifactStore`](store::ArtifactStore), builds the
//! report with [`payload::build`], and posts it through a
//! [`DeliveryClient`](client::DeliveryClient).
//!
//! # Module Organization
//!
//! - [`types`] - Job, audit result and code-info data model
//! - [`merge`] - First-meaningful-value resolution across provenances
//! - [`payload`] - Result sets and canonical report assembly
//! - [`client`] - Credential exchange and authenticated delivery
//! - [`store`] - Artifact storage backends
//! - [`dispatch`] - Job state machine and concurrent task execution
//! - [`config`] - TOML / environment configuration
//! - [`error`] - Crate-wide error type
//!
//! # Example
//!
//! ```
//! use tide_audit::payload::{build, ResultSet};
//! use tide_audit::types::{AuditDetails, AuditResult, CodeInfo, Job};
//!
//! let mut results = ResultSet::new();
//! results.set_code_info(CodeInfo::new("plugin"));
//! results.set_checksum("abcdefg");
//! let mock = AuditDetails::new("mock", "mock", "mock");
//! results.insert_report("phpcs_demo", AuditResult::new(mock.clone(), mock));
//!
//! let bytes = build(&Job::default(), &results).unwrap();
//! assert!(bytes.starts_with(br#"{"title":"""#));
//! ```

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod merge;
pub mod payload;
pub mod store;
pub mod types;

#[cfg(feature = "logging")]
mod logging;

pub use client::{DeliveryClient, DeliveryError, HttpDeliveryClient};
pub use config::{Config, ConfigError};
pub use dispatch::{Dispatcher, JobFailure, JobOutcome, JobState};
pub use error::{Error, Result};
#[cfg(feature = "logging")]
pub use logging::init_logging;
pub use payload::{Payload, PayloadError, ResultSet};
pub use store::{ArtifactStore, StoreError};
