//! Embedded schema migrations.

use std::time::{Duration, Instant};

use diesel_async::async_connection_wrapper::AsyncConnectionWrapper;
use diesel_migrations::MigrationHarness;
use serde::Serialize;
use tokio::task::spawn_blocking;

use crate::{MIGRATIONS, PgClient, PgError, PgResult, TRACING_TARGET_MIGRATION};

/// Outcome of a migration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationResult {
    /// Versions applied by this run, oldest first.
    pub applied_versions: Vec<String>,
    /// Wall-clock duration of the run.
    #[serde(serialize_with = "serialize_millis")]
    pub duration: Duration,
}

impl MigrationResult {
    /// Returns whether the schema was already current.
    #[inline]
    pub fn is_noop(&self) -> bool {
        self.applied_versions.is_empty()
    }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u128(d.as_millis())
}

/// Applies every embedded migration the database has not seen yet.
#[tracing::instrument(skip(pg), target = TRACING_TARGET_MIGRATION)]
pub async fn run_pending_migrations(pg: &PgClient) -> PgResult<MigrationResult> {
    tracing::info!(target: TRACING_TARGET_MIGRATION, "Starting database migration process");

    let start = Instant::now();
    let conn = pg.get_pooled_connection().await?;
    let mut conn: AsyncConnectionWrapper<_> = conn.into();

    let versions = spawn_blocking(move || {
        conn.run_pending_migrations(MIGRATIONS)
            .map(|versions| versions.into_iter().map(|v| v.to_string()).collect::<Vec<_>>())
    })
    .await
    .map_err(|err| {
        tracing::error!(target: TRACING_TARGET_MIGRATION, error = %err, "Migration task panicked");
        PgError::Migration(err.into())
    })?
    .map_err(|err| {
        tracing::error!(target: TRACING_TARGET_MIGRATION, error = %err, "Database migration process failed");
        PgError::Migration(err)
    })?;

    let duration = start.elapsed();
    tracing::info!(
        target: TRACING_TARGET_MIGRATION,
        duration = ?duration,
        migrations_count = versions.len(),
        "Database migration process completed"
    );

    Ok(MigrationResult {
        applied_versions: versions,
        duration,
    })
}

/// Lists the migration versions already recorded in the database.
#[tracing::instrument(skip(pg), target = TRACING_TARGET_MIGRATION)]
pub async fn get_applied_migrations(pg: &PgClient) -> PgResult<Vec<String>> {
    let conn = pg.get_pooled_connection().await?;
    let mut conn: AsyncConnectionWrapper<_> = conn.into();

    spawn_blocking(move || {
        conn.applied_migrations()
            .map(|versions| versions.into_iter().map(|v| v.to_string()).collect())
    })
    .await
    .map_err(|err| PgError::Migration(err.into()))?
    .map_err(PgError::Migration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_result_noop() {
        let result = MigrationResult {
            applied_versions: vec![],
            duration: Duration::from_millis(3),
        };
        assert!(result.is_noop());

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["duration"], 3);
    }
}
