use http::StatusCode;
use sea_orm::error::DbErr;
use serde::Serialize;

/// Coarse error category the boundary layer switches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A referenced user, task or vacation does not exist
    NotFound,
    /// Request is well-formed but conflicts with stored data (e.g. overlapping vacations)
    InvalidData,
    /// Request payload failed field validation
    Validation,
    /// Document or relational store failure
    Storage,
    /// Unexpected state inside the service
    Internal,
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        DbErr,
    ),

    #[error("Storage error: {context}: {source}")]
    StorageError {
        context: String,
        #[source]
        #[serde(skip)]
        source: anyhow::Error,
    },

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    pub fn storage(context: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        ServiceError::StorageError {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Discriminant used instead of inspecting error messages.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidData(_) => ErrorKind::InvalidData,
            Self::ValidationError(_) => ErrorKind::Validation,
            Self::DatabaseError(_) | Self::StorageError { .. } => ErrorKind::Storage,
            Self::InternalError(_) | Self::Other(_) => ErrorKind::Internal,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::InvalidData | ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Storage | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Storage and internal errors return generic messages.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) | Self::StorageError { .. } => "Storage error".to_string(),
            Self::InternalError(_) | Self::Other(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

pub trait ResultExt<T> {
    /// Wraps storage and internal failures with the name of the failing operation.
    /// `NotFound`, `InvalidData` and `ValidationError` pass through untouched.
    fn context(self, operation: impl Into<String>) -> ServiceResult<T>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<ServiceError>,
{
    fn context(self, operation: impl Into<String>) -> ServiceResult<T> {
        self.map_err(|err| match err.into() {
            err @ (ServiceError::NotFound(_)
            | ServiceError::InvalidData(_)
            | ServiceError::ValidationError(_)) => err,
            ServiceError::StorageError { context, source } => ServiceError::StorageError {
                context: format!("{}: {}", operation.into(), context),
                source,
            },
            other => ServiceError::storage(operation, other),
        })
    }
}
