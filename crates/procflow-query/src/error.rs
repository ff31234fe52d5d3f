//! Error types for the historic query engine

use thiserror::Error;

/// Result type alias for query operations
pub type Result<T> = std::result::Result<T, QueryError>;

/// Main error type for query operations
#[derive(Error, Debug)]
pub enum QueryError {
    /// Input validation error; the message identifies the offending argument
    #[error("{message}")]
    IllegalArgument { message: String },

    /// `single_result()` matched more than one row
    #[error("Query returned more than one result")]
    NonUniqueResult,

    /// A single-result lookup matched nothing at the API boundary
    #[error("Not found: {resource_type} with ID {id}")]
    NotFound { resource_type: String, id: String },

    /// Store-level failure surfaced through the query path
    #[error("Engine error: {0}")]
    Engine(#[from] procflow_core::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl QueryError {
    /// Create an input validation error with a stable message
    pub fn illegal_argument(message: impl Into<String>) -> Self {
        Self::IllegalArgument {
            message: message.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    /// Get the error category for telemetry
    pub fn category(&self) -> &'static str {
        match self {
            QueryError::IllegalArgument { .. } => "illegal_argument",
            QueryError::NonUniqueResult => "non_unique_result",
            QueryError::NotFound { .. } => "not_found",
            QueryError::Engine(_) => "engine",
            QueryError::Serialization(_) => "serialization",
        }
    }

    /// Get the HTTP status code for API responses
    pub fn http_status(&self) -> u16 {
        match self {
            QueryError::IllegalArgument { .. } => 400,
            QueryError::NonUniqueResult => 400,
            QueryError::NotFound { .. } => 404,
            QueryError::Engine(_) => 500,
            QueryError::Serialization(_) => 500,
        }
    }
}
