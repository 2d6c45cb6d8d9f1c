//! Error reported by capability implementations.

use strum::{AsRefStr, Display};

/// Type alias for boxed dynamic errors that can be sent across threads.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Result of a capability call.
pub type Result<T> = std::result::Result<T, Error>;

/// What went wrong, independent of which capability failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// The caller passed something unusable.
    InvalidInput,
    /// Missing key, unknown model, bad sizing.
    Configuration,
    /// The addressed resource does not exist.
    NotFound,
    /// The remote provider rejected or failed the request.
    ExternalError,
    /// The remote provider is rate limiting or down.
    ServiceUnavailable,
    /// A template could not be resolved or rendered.
    Template,
    Serialization,
    Unknown,
}

impl ErrorKind {
    /// Whether repeating the same call may succeed.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::ExternalError | Self::ServiceUnavailable)
    }
}

/// Failure of an embedding, generation or rendering call.
#[derive(Debug, thiserror::Error)]
#[error("{kind}{}", message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
pub struct Error {
    pub kind: ErrorKind,
    pub message: Option<String>,
    #[source]
    pub source: Option<BoxedError>,
}

impl Error {
    /// Creates an error of the given kind without details.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Attaches a human-readable message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attaches the underlying cause.
    pub fn with_source(mut self, source: impl Into<BoxedError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Whether repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}
