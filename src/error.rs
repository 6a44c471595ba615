//! Unified error type.

use thiserror::Error;

use crate::store::StoreError;

/// The error type returned by ticklist's bootstrap operations.
///
/// Per-request failures are expressed as HTTP [`Response`](crate::Response)
/// values (see [`AppError`](crate::AppError)), not as `Error`s. This type
/// surfaces failures that stop the service from starting or serving:
/// configuration, opening the database, binding a port.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid bind address `{0}`")]
    InvalidBind(String),

    #[error("usage: {0}")]
    Usage(String),

    #[error("storage: {0}")]
    Storage(#[from] StoreError),
}
