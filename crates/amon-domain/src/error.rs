use thiserror::Error;

/// Validation/parsing failures raised while building or checking a domain
/// object, before any authorization or I/O has happened.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid uuid for field '{field}': {value}")]
    InvalidUuid { field: &'static str, value: String },

    #[error("unknown probe type: {0}")]
    UnknownProbeType(String),

    #[error("probe config invalid: {0}")]
    InvalidConfig(String),

    #[error("name exceeds 512 characters ({0} given)")]
    NameTooLong(usize),

    #[error("runLocally probes require agent == machine")]
    RunLocallyMismatch,

    #[error("maintenance window must set exactly one scope (all, probes, probeGroups, machines), got {0}")]
    MaintenanceScope(usize),

    #[error("maintenance window start ({start}) must be before end ({end})")]
    MaintenanceRange { start: i64, end: i64 },

    #[error("invalid relative duration '{0}'")]
    InvalidDuration(String),

    #[error("contact urn '{0}' is malformed")]
    InvalidContactUrn(String),

    #[error("event is missing required field: {0}")]
    InvalidEvent(&'static str),
}

/// The fixed error-kind taxonomy the master emits on the wire, §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    MissingParameter,
    InvalidArgument,
    ResourceNotFound,
    Gone,
    InternalError,
    MultiError,
}

impl ApiErrorKind {
    /// The PascalCase wire name used in `{code, message}` error bodies (§6).
    pub fn code(&self) -> &'static str {
        match self {
            ApiErrorKind::MissingParameter => "MissingParameter",
            ApiErrorKind::InvalidArgument => "InvalidArgument",
            ApiErrorKind::ResourceNotFound => "ResourceNotFound",
            ApiErrorKind::Gone => "Gone",
            ApiErrorKind::InternalError => "InternalError",
            ApiErrorKind::MultiError => "MultiError",
        }
    }

    /// Conventional REST status for this kind (§6).
    pub fn status(&self) -> u16 {
        match self {
            ApiErrorKind::MissingParameter => 409,
            ApiErrorKind::InvalidArgument => 409,
            ApiErrorKind::ResourceNotFound => 404,
            ApiErrorKind::Gone => 410,
            ApiErrorKind::InternalError => 500,
            ApiErrorKind::MultiError => 409,
        }
    }
}

/// A single wire-level error: `{code, message}`.
#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn missing_parameter(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::MissingParameter, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::InvalidArgument, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::ResourceNotFound, message)
    }

    pub fn gone(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Gone, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::InternalError, message)
    }

    /// Wraps multiple per-item errors from a batch endpoint (§4.8, §7).
    /// Collapses to the single inner error when there is only one.
    pub fn multi(mut errors: Vec<ApiError>) -> Self {
        if errors.len() == 1 {
            return errors.remove(0);
        }
        let message = errors
            .iter()
            .map(|e| format!("{}: {}", e.kind.code(), e.message))
            .collect::<Vec<_>>()
            .join("; ");
        Self::new(ApiErrorKind::MultiError, message)
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        ApiError::invalid_argument(e.to_string())
    }
}
