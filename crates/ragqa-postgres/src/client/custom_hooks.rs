//! Connection establishment and pool lifecycle hooks.

use std::time::Instant;

use deadpool::managed::{HookResult, Metrics};
use diesel::ConnectionResult;
use diesel_async::pooled_connection::{PoolError, PoolableConnection};
use diesel_async::{AsyncConnection, AsyncPgConnection};
use futures::FutureExt;
use futures::future::BoxFuture;

use super::pg_config::mask_url;
use crate::TRACING_TARGET_CONNECTION;

/// Opens a connection for the pool and reports the handshake time.
pub(super) fn establish(url: &str) -> BoxFuture<'_, ConnectionResult<AsyncPgConnection>> {
    async move {
        let start = Instant::now();
        let result = AsyncPgConnection::establish(url).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => tracing::debug!(
                target: TRACING_TARGET_CONNECTION,
                elapsed_ms,
                "Database connection established"
            ),
            Err(err) => tracing::error!(
                target: TRACING_TARGET_CONNECTION,
                url = %mask_url(url),
                elapsed_ms,
                error = %err,
                "Failed to establish database connection"
            ),
        }

        result
    }
    .boxed()
}

/// Flags connections that are already unusable when they join the pool.
pub(super) fn after_create(conn: &mut AsyncPgConnection, _: &Metrics) -> HookResult<PoolError> {
    if conn.is_broken() {
        tracing::warn!(target: TRACING_TARGET_CONNECTION, "New pooled connection is broken");
    }
    Ok(())
}

/// Flags connections that broke while checked out.
pub(super) fn before_recycle(
    conn: &mut AsyncPgConnection,
    metrics: &Metrics,
) -> HookResult<PoolError> {
    if conn.is_broken() {
        tracing::warn!(
            target: TRACING_TARGET_CONNECTION,
            recycle_count = metrics.recycle_count,
            age = ?metrics.age(),
            "Returned connection is broken"
        );
    }
    Ok(())
}
