//! Data model shared by every component.
//!
//! - [`Job`] - the package under audit and its requested tasks
//! - [`AuditResult`] - one task's raw/parsed output and counts
//! - [`CodeInfo`] - the structural summary every report requires

pub mod audit;
pub mod code_info;
pub mod job;

pub use audit::{AuditDetails, AuditResult, AuditSummary};
pub use code_info::{ClocResult, CodeInfo, InfoDetails};
pub use job::Job;
