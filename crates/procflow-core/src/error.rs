use thiserror::Error;

/// Shared error type for the historic-data subsystem
#[derive(Error, Debug)]
pub enum Error {
    #[error("Capture error: {message}")]
    Capture { message: String },

    #[error("Job error: {message}")]
    Job { message: String },

    #[error("Store error: {message}")]
    Store { message: String },

    #[error("Query error: {message}")]
    Query { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    #[error("Generic error: {message}")]
    Generic { message: String },
}

impl Error {
    /// Create a new capture error
    pub fn capture(message: impl Into<String>) -> Self {
        Self::Capture {
            message: message.into(),
        }
    }

    /// Create a new job error
    pub fn job(message: impl Into<String>) -> Self {
        Self::Job {
            message: message.into(),
        }
    }

    /// Create a new store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Create a new query error
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_error_messages() {
        let fixture = Error::store("variable row missing");
        let actual = fixture.to_string();
        let expected = "Store error: variable row missing";
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_error_from_serde() {
        let bad = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let actual = Error::from(bad);
        assert!(matches!(actual, Error::Serialization { .. }));
    }
}
