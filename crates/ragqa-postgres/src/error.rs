//! Database error type.

use std::borrow::Cow;

use deadpool::managed::TimeoutType;
use diesel::result::{ConnectionError, DatabaseErrorKind, Error as DieselError};
use diesel_async::pooled_connection::PoolError as ManagerError;
use diesel_async::pooled_connection::deadpool::PoolError;

/// Type-erased error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Specialized [`Result`] type for database operations.
pub type PgResult<T, E = PgError> = Result<T, E>;

/// Failure of a pool, migration or query operation.
#[derive(Debug, thiserror::Error)]
#[must_use = "database errors should be handled appropriately"]
pub enum PgError {
    /// Invalid pool settings or connection string.
    #[error("configuration error: {0}")]
    Config(String),

    /// Waiting for, creating or recycling a connection took too long.
    #[error("database operation timed out ({0:?})")]
    Timeout(TimeoutType),

    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("migration error: {0}")]
    Migration(BoxError),

    /// Statement failed: syntax, constraint, type or missing row.
    #[error("query error: {0}")]
    Query(#[from] DieselError),

    #[error("unexpected error: {0}")]
    Unexpected(Cow<'static, str>),
}

impl PgError {
    /// Whether the statement collided with an existing object.
    ///
    /// Concurrent `CREATE ... IF NOT EXISTS` can still race on the catalog's
    /// unique index; that surfaces as a unique violation or an
    /// "already exists" message.
    pub fn is_already_exists(&self) -> bool {
        match self {
            Self::Query(DieselError::DatabaseError(kind, info)) => {
                matches!(kind, DatabaseErrorKind::UniqueViolation)
                    || info.message().contains("already exists")
            }
            _ => false,
        }
    }

    /// Whether retrying the operation may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Connection(err) => matches!(err, ConnectionError::BadConnection(_)),
            Self::Query(DieselError::DatabaseError(kind, _)) => matches!(
                kind,
                DatabaseErrorKind::SerializationFailure | DatabaseErrorKind::ClosedConnection
            ),
            _ => false,
        }
    }
}

impl From<PoolError> for PgError {
    fn from(value: PoolError) -> Self {
        match value {
            PoolError::Timeout(kind) => Self::Timeout(kind),
            PoolError::Backend(ManagerError::ConnectionError(err)) => Self::Connection(err),
            PoolError::Backend(ManagerError::QueryError(err)) => Self::Query(err),
            PoolError::Closed => Self::Unexpected("connection pool is closed".into()),
            PoolError::NoRuntimeSpecified => {
                Self::Unexpected("connection pool has no async runtime".into())
            }
            PoolError::PostCreateHook(err) => Self::Unexpected(err.to_string().into()),
        }
    }
}
