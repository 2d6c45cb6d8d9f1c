//! Chunks repository for persisted asset segments.

use std::future::Future;

use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};

use crate::model::{Chunk, NewChunk};
use crate::types::OffsetPagination;
use crate::{PgConnection, PgError, PgResult, TRACING_TARGET_QUERY, schema};

/// Number of rows sent per `INSERT` statement.
pub const CHUNK_INSERT_BATCH_SIZE: usize = 100;

/// Repository for chunk database operations.
pub trait ChunkRepository {
    /// Inserts chunks in batches inside one transaction and returns how many were written.
    fn create_chunks(
        &mut self,
        new_chunks: Vec<NewChunk>,
    ) -> impl Future<Output = PgResult<usize>> + Send;

    /// Deletes every chunk of a project. Collection rows referencing them cascade.
    fn delete_project_chunks(
        &mut self,
        project_id: i32,
    ) -> impl Future<Output = PgResult<usize>> + Send;

    /// Lists a project's chunks ordered by `chunk_order`, ties broken by `chunk_id`.
    fn list_project_chunks(
        &mut self,
        project_id: i32,
        pagination: OffsetPagination,
    ) -> impl Future<Output = PgResult<Vec<Chunk>>> + Send;

    /// Counts a project's chunks.
    fn count_project_chunks(&mut self, project_id: i32)
    -> impl Future<Output = PgResult<i64>> + Send;
}

impl ChunkRepository for PgConnection {
    async fn create_chunks(&mut self, new_chunks: Vec<NewChunk>) -> PgResult<usize> {
        use schema::chunks;

        if new_chunks.is_empty() {
            return Ok(0);
        }

        let inserted = self
            .transaction::<_, PgError, _>(|conn| {
                async move {
                    let mut inserted = 0;
                    for batch in new_chunks.chunks(CHUNK_INSERT_BATCH_SIZE) {
                        inserted += diesel::insert_into(chunks::table)
                            .values(batch)
                            .execute(conn)
                            .await?;
                    }
                    Ok(inserted)
                }
                .scope_boxed()
            })
            .await?;

        tracing::debug!(target: TRACING_TARGET_QUERY, inserted, "Chunks created");
        Ok(inserted)
    }

    async fn delete_project_chunks(&mut self, project_id: i32) -> PgResult<usize> {
        use schema::chunks::{self, dsl};

        let affected = diesel::delete(chunks::table.filter(dsl::chunk_project_id.eq(project_id)))
            .execute(self)
            .await
            .map_err(PgError::from)?;

        tracing::debug!(target: TRACING_TARGET_QUERY, project_id, affected, "Project chunks deleted");
        Ok(affected)
    }

    async fn list_project_chunks(
        &mut self,
        project_id: i32,
        pagination: OffsetPagination,
    ) -> PgResult<Vec<Chunk>> {
        use schema::chunks::{self, dsl};

        let chunks = chunks::table
            .filter(dsl::chunk_project_id.eq(project_id))
            .order((dsl::chunk_order.asc(), dsl::chunk_id.asc()))
            .limit(pagination.limit)
            .offset(pagination.offset)
            .select(Chunk::as_select())
            .load(self)
            .await
            .map_err(PgError::from)?;

        Ok(chunks)
    }

    async fn count_project_chunks(&mut self, project_id: i32) -> PgResult<i64> {
        use schema::chunks::{self, dsl};

        let count = chunks::table
            .filter(dsl::chunk_project_id.eq(project_id))
            .count()
            .get_result(self)
            .await
            .map_err(PgError::from)?;

        Ok(count)
    }
}
