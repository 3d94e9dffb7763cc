//! Error types for Explainer.
//!
//! One error enum covers every failure category of the pipeline: bad
//! configuration, file access, PDF decoding, store state and integrity,
//! generation, prompt rendering and the query log database.

use thiserror::Error;

/// Unified error type for Explainer.
///
/// All fallible functions return `Result<T, AppError>`.
/// We never panic; errors are represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors (including bad chunking parameters)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A document or page could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// The embedding store was searched before anything was indexed
    #[error("Embedding store is not built yet. Run 'explainer index' first.")]
    NotIndexed,

    /// A persisted store does not have the expected shape
    #[error("Corrupt embedding store: {0}")]
    Corruption(String),

    /// The language model call failed, timed out or returned nothing
    #[error("Generation error: {0}")]
    Generation(String),

    /// Embedding provider errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Query log database errors
    #[error("Database error: {0}")]
    Database(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_indexed_message_points_to_index_command() {
        let err = AppError::NotIndexed;
        assert!(err.to_string().contains("explainer index"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.pdf");
        let err: AppError = io.into();
        assert!(matches!(err, AppError::Io(_)));
        assert!(err.to_string().contains("missing.pdf"));
    }

    #[test]
    fn test_json_error_conversion() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: AppError = parse.into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
