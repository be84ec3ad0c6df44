//! Crate-wide error type.

use thiserror::Error;

use crate::client::DeliveryError;
use crate::config::ConfigError;
use crate::dispatch::{JobFailure, TaskError};
use crate::payload::PayloadError;
use crate::store::StoreError;

/// Any error surfaced by this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Report assembly failed.
    #[error(transparent)]
    Payload(#[from] PayloadError),

    /// Authentication or transport failed.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    /// A storage operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A task failed.
    #[error(transparent)]
    Task(#[from] TaskError),

    /// A job ended in the failed state.
    #[error(transparent)]
    Job(#[from] Box<JobFailure>),
}

impl From<JobFailure> for Error {
    fn from(failure: JobFailure) -> Self {
        Self::Job(Box::new(failure))
    }
}

/// Result alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
