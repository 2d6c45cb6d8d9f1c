#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Embeds all migrations into the final binary.
pub(crate) const MIGRATIONS: diesel_migrations::EmbeddedMigrations =
    diesel_migrations::embed_migrations!();

/// Tracing target for client lifecycle events.
pub const TRACING_TARGET_CLIENT: &str = "ragqa_postgres::client";

/// Tracing target for query execution.
pub const TRACING_TARGET_QUERY: &str = "ragqa_postgres::queries";

/// Tracing target for migration runs.
pub const TRACING_TARGET_MIGRATION: &str = "ragqa_postgres::migrations";

/// Tracing target for connection establishment and pool management.
pub const TRACING_TARGET_CONNECTION: &str = "ragqa_postgres::connection";

mod client;
mod error;
pub mod model;
pub mod query;
mod schema;
pub mod types;

pub use diesel_async::AsyncPgConnection as PgConnection;
pub use pgvector::Vector;

pub use crate::client::{
    ConnectionPool, MigrationResult, PgClient, PgConfig, PgConn, PgPoolStatus, PooledConnection,
    get_applied_migrations, run_pending_migrations,
};
pub use crate::error::{BoxError, PgError, PgResult};
pub use crate::types::{OffsetPagination, sanitize_text};
