//! Pipeline error type.

use std::fmt;

use ragqa_core::ErrorKind;
use ragqa_postgres::PgError;
use ragqa_vector::VectorError;

/// Result of chunking, indexing, retrieval or generation.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure anywhere in the splitting, indexing and answering pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A remote model call failed or was rejected.
    #[error("{provider} request failed: {message}")]
    Provider { provider: String, message: String },

    /// The embedder returned something unusable.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// A prompt could not be resolved.
    #[error("template failed: {0}")]
    Template(String),

    /// Invalid chunking, provider or template settings.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Vector(#[from] VectorError),

    #[error(transparent)]
    Database(#[from] PgError),

    /// Passed through from an embedding, generation or rendering capability.
    #[error(transparent)]
    Service(#[from] ragqa_core::Error),

    #[error("invalid json: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn provider(provider: impl fmt::Display, message: impl fmt::Display) -> Self {
        Self::Provider {
            provider: provider.to_string(),
            message: message.to_string(),
        }
    }

    pub fn embedding(message: impl fmt::Display) -> Self {
        Self::Embedding(message.to_string())
    }

    pub fn template(message: impl fmt::Display) -> Self {
        Self::Template(message.to_string())
    }

    pub fn config(message: impl fmt::Display) -> Self {
        Self::Config(message.to_string())
    }

    /// Whether repeating the failed call may succeed.
    ///
    /// Remote model failures count as retryable; database failures only
    /// when the pool says so.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider { .. } => true,
            Self::Database(e) | Self::Vector(VectorError::Database(e)) => e.is_transient(),
            Self::Service(e) => e.is_retryable(),
            _ => false,
        }
    }
}

impl From<Error> for ragqa_core::Error {
    fn from(error: Error) -> Self {
        let kind = match &error {
            Error::Service(_) => ErrorKind::Unknown,
            Error::Config(_) => ErrorKind::Configuration,
            Error::Provider { .. } | Error::Embedding(_) => ErrorKind::ExternalError,
            Error::Template(_) => ErrorKind::Template,
            Error::Serialization(_) => ErrorKind::Serialization,
            Error::Vector(e) if e.is_not_found() => ErrorKind::NotFound,
            Error::Vector(VectorError::Configuration(_)) => ErrorKind::Configuration,
            Error::Vector(VectorError::DimensionMismatch { .. }) => ErrorKind::InvalidInput,
            Error::Vector(_) | Error::Database(_) => ErrorKind::Unknown,
        };

        match error {
            Error::Service(inner) => inner,
            other => ragqa_core::Error::new(kind).with_message(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_core_error() {
        let err: ragqa_core::Error = Error::config("chunk size 10 must exceed overlap 10").into();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err: ragqa_core::Error = Error::provider("openai", "rate limited").into();
        assert_eq!(err.kind(), ErrorKind::ExternalError);
        assert!(err.message.unwrap().contains("openai request failed: rate limited"));

        let err: ragqa_core::Error =
            Error::Vector(VectorError::collection_not_found("collection_3_1")).into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_storage_failures_map_to_unknown() {
        let err: ragqa_core::Error = Error::Database(PgError::Config("no url".into())).into();
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert!(err.message.unwrap().contains("no url"));
    }

    #[test]
    fn test_service_error_round_trips() {
        let inner = ragqa_core::Error::new(ErrorKind::ServiceUnavailable).with_message("busy");
        let err = Error::from(inner);
        assert!(err.is_retryable());

        let back: ragqa_core::Error = err.into();
        assert_eq!(back.kind(), ErrorKind::ServiceUnavailable);
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::provider("cohere", "timeout").is_retryable());
        assert!(!Error::config("bad").is_retryable());
        assert!(!Error::template("missing").is_retryable());
    }
}
