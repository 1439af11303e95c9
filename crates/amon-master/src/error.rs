use amon_domain::{ApiError, DomainError};
use thiserror::Error;

/// Internal error type for `amon-master`. Mapped to the wire-level
/// [`ApiError`] taxonomy (§7) at the `amon-api` boundary, mirroring the
/// teacher's per-crate-error-maps-into-ApiError convention.
#[derive(Debug, Error)]
pub enum MasterError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] amon_store::StoreError),

    #[error(transparent)]
    Notify(#[from] amon_notify::NotifyError),

    #[error("missing required field: {0}")]
    MissingParameter(&'static str),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("id {0} is gone")]
    Gone(String),

    #[error("{0}")]
    Internal(String),
}

impl From<MasterError> for ApiError {
    fn from(e: MasterError) -> Self {
        match e {
            MasterError::Domain(d) => ApiError::invalid_argument(d.to_string()),
            MasterError::Store(s) => ApiError::internal(s.to_string()),
            MasterError::Notify(n) => ApiError::internal(n.to_string()),
            MasterError::MissingParameter(f) => ApiError::missing_parameter(format!("missing required field: {f}")),
            MasterError::InvalidArgument(m) => ApiError::invalid_argument(m),
            MasterError::NotFound(m) => ApiError::not_found(m),
            MasterError::Gone(m) => ApiError::gone(m),
            MasterError::Internal(m) => ApiError::internal(m),
        }
    }
}
