//! pgvector backend implementation.

use async_trait::async_trait;
use diesel::pg::Pg;
use diesel::sql_types::{BigInt, Bool, Double, Integer, Jsonb, Text};
use diesel::{OptionalExtension, QueryableByName};
use diesel_async::RunQueryDsl;
use diesel_async::scoped_futures::ScopedFutureExt;
use pgvector::Vector;
use ragqa_postgres::{PgClient, PgError};
use serde_json::Value;

use crate::TRACING_TARGET;
use crate::collection::{CollectionInfo, CollectionName};
use crate::config::{DistanceMetric, IndexType};
use crate::error::VectorResult;
use crate::record::{RetrievedDocument, VectorItem};
use crate::store::VectorStoreBackend;

/// Key under which the distance metric is recorded in the table comment.
const DISTANCE_COMMENT_KEY: &str = "distance=";

#[derive(QueryableByName)]
struct ExistsRow {
    #[diesel(sql_type = Bool)]
    found: bool,
}

#[derive(QueryableByName)]
struct NameRow {
    #[diesel(sql_type = Text)]
    name: String,
}

#[derive(QueryableByName)]
struct CountRow {
    #[diesel(sql_type = BigInt)]
    count: i64,
}

#[derive(QueryableByName)]
struct DescribeRow {
    #[diesel(sql_type = Text)]
    owner: String,
    #[diesel(sql_type = Bool)]
    has_index: bool,
    #[diesel(sql_type = Integer)]
    dimensions: i32,
    #[diesel(sql_type = Text)]
    comment: String,
}

#[derive(QueryableByName)]
struct SearchRow {
    #[diesel(sql_type = Text)]
    id: String,
    #[diesel(sql_type = Text)]
    text: String,
    #[diesel(sql_type = Jsonb)]
    metadata: Value,
    #[diesel(sql_type = Double)]
    score: f64,
}

/// Collections stored as PostgreSQL tables with a pgvector column.
///
/// Each collection is a table `(id, text, vector, metadata, chunk_id)` whose
/// `chunk_id` references `chunks` with `ON DELETE CASCADE`. Collection names
/// are validated [`CollectionName`]s; every value travels as a bind parameter.
#[derive(Debug, Clone)]
pub struct PgVectorBackend {
    pg: PgClient,
}

impl PgVectorBackend {
    /// Creates a backend over a database client.
    pub fn new(pg: PgClient) -> Self {
        Self { pg }
    }

    async fn table_exists(&self, name: &str) -> VectorResult<bool> {
        let mut conn = self.pg.get_connection().await?;
        let row: ExistsRow = diesel::sql_query(
            "SELECT EXISTS (SELECT 1 FROM pg_tables \
             WHERE schemaname = current_schema() AND tablename = $1) AS found",
        )
        .bind::<Text, _>(name)
        .get_result(&mut **conn)
        .await
        .map_err(PgError::from)?;

        Ok(row.found)
    }

    async fn index_exists(&self, index_name: &str) -> VectorResult<bool> {
        let mut conn = self.pg.get_connection().await?;
        let row: ExistsRow = diesel::sql_query(
            "SELECT EXISTS (SELECT 1 FROM pg_indexes \
             WHERE schemaname = current_schema() AND indexname = $1) AS found",
        )
        .bind::<Text, _>(index_name)
        .get_result(&mut **conn)
        .await
        .map_err(PgError::from)?;

        Ok(row.found)
    }
}

/// Builds the multi-row insert statement for `rows` placeholders groups.
fn insert_sql(name: &CollectionName, rows: usize) -> String {
    let values = (0..rows)
        .map(|i| {
            let base = i * 4;
            format!("(${}, ${}, ${}, ${})", base + 1, base + 2, base + 3, base + 4)
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!("INSERT INTO {name} (text, vector, metadata, chunk_id) VALUES {values}")
}

fn create_index_sql(name: &CollectionName, index_type: IndexType, distance: DistanceMetric) -> String {
    let (method, params) = match index_type {
        IndexType::Hnsw => ("hnsw", "m = 16, ef_construction = 64"),
        IndexType::IvfFlat => ("ivfflat", "lists = 100"),
    };

    format!(
        "CREATE INDEX IF NOT EXISTS {index} ON {name} USING {method} (vector {ops}) WITH ({params})",
        index = name.index_name(),
        ops = distance.ops_class(),
    )
}

fn search_sql(name: &CollectionName, distance: DistanceMetric) -> String {
    let op = distance.operator();
    let score = match distance {
        DistanceMetric::Cosine => format!("1 - (vector {op} $1)"),
        DistanceMetric::Dot => format!("-(vector {op} $1)"),
    };

    format!(
        "SELECT id::text AS id, COALESCE(text, '') AS text, metadata, ({score})::float8 AS score \
         FROM {name} ORDER BY vector {op} $1 LIMIT $2"
    )
}

/// Reads the distance metric back from a table comment.
fn parse_distance_comment(comment: &str) -> DistanceMetric {
    comment
        .strip_prefix(DISTANCE_COMMENT_KEY)
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or_default()
}

#[async_trait]
impl VectorStoreBackend for PgVectorBackend {
    fn name(&self) -> &'static str {
        "pgvector"
    }

    async fn collection_exists(&self, name: &CollectionName) -> VectorResult<bool> {
        self.table_exists(name.as_str()).await
    }

    async fn create_collection(
        &self,
        name: &CollectionName,
        dimensions: usize,
        distance: DistanceMetric,
    ) -> VectorResult<bool> {
        if self.table_exists(name.as_str()).await? {
            return Ok(false);
        }

        let create = format!(
            "CREATE TABLE {name} (\
                id BIGSERIAL PRIMARY KEY, \
                text TEXT, \
                vector vector({dimensions}) NOT NULL, \
                metadata JSONB NOT NULL DEFAULT '{{}}'::jsonb, \
                chunk_id INTEGER REFERENCES chunks (chunk_id) ON DELETE CASCADE\
            )"
        );
        let comment = format!("COMMENT ON TABLE {name} IS '{DISTANCE_COMMENT_KEY}{distance}'");

        let mut conn = self.pg.get_connection().await?;
        let result = conn
            .transaction::<_, PgError, _>(|conn| {
                async move {
                    diesel::sql_query(create).execute(conn).await?;
                    diesel::sql_query(comment).execute(conn).await?;
                    Ok(())
                }
                .scope_boxed()
            })
            .await;

        match result {
            Ok(()) => {
                tracing::debug!(target: TRACING_TARGET, collection = %name, dimensions, "pgvector table created");
                Ok(true)
            }
            Err(err) if err.is_already_exists() => {
                tracing::debug!(target: TRACING_TARGET, collection = %name, "pgvector table created concurrently");
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn drop_collection(&self, name: &CollectionName) -> VectorResult<bool> {
        if !self.table_exists(name.as_str()).await? {
            return Ok(false);
        }

        let mut conn = self.pg.get_connection().await?;
        diesel::sql_query(format!("DROP TABLE IF EXISTS {name}"))
            .execute(&mut **conn)
            .await
            .map_err(PgError::from)?;

        Ok(true)
    }

    async fn list_collections(&self) -> VectorResult<Vec<CollectionName>> {
        let mut conn = self.pg.get_connection().await?;
        let rows: Vec<NameRow> = diesel::sql_query(
            "SELECT tablename::text AS name FROM pg_tables \
             WHERE schemaname = current_schema() AND tablename LIKE $1 ORDER BY tablename",
        )
        .bind::<Text, _>("collection\\_%")
        .load(&mut **conn)
        .await
        .map_err(PgError::from)?;

        Ok(rows
            .into_iter()
            .filter_map(|row| CollectionName::new(row.name).ok())
            .collect())
    }

    async fn describe_collection(
        &self,
        name: &CollectionName,
    ) -> VectorResult<Option<CollectionInfo>> {
        let mut conn = self.pg.get_connection().await?;
        let described: Option<DescribeRow> = diesel::sql_query(
            "SELECT t.tableowner::text AS owner, \
                    EXISTS (SELECT 1 FROM pg_indexes i \
                            WHERE i.schemaname = t.schemaname AND i.indexname = $2) AS has_index, \
                    a.atttypmod AS dimensions, \
                    COALESCE(obj_description(c.oid, 'pg_class'), '') AS comment \
             FROM pg_tables t \
             JOIN pg_namespace n ON n.nspname = t.schemaname \
             JOIN pg_class c ON c.relname = t.tablename AND c.relnamespace = n.oid \
             JOIN pg_attribute a ON a.attrelid = c.oid AND a.attname = 'vector' \
             WHERE t.schemaname = current_schema() AND t.tablename = $1",
        )
        .bind::<Text, _>(name.as_str())
        .bind::<Text, _>(name.index_name())
        .get_result(&mut **conn)
        .await
        .optional()
        .map_err(PgError::from)?;

        let Some(described) = described else {
            return Ok(None);
        };

        let count: CountRow = diesel::sql_query(format!("SELECT COUNT(*) AS count FROM {name}"))
            .get_result(&mut **conn)
            .await
            .map_err(PgError::from)?;

        Ok(Some(CollectionInfo {
            name: name.clone(),
            owner: described.owner,
            has_index: described.has_index,
            row_count: count.count.max(0) as u64,
            dimensions: described.dimensions.max(0) as usize,
            distance: parse_distance_comment(&described.comment),
        }))
    }

    async fn insert_rows(&self, name: &CollectionName, rows: &[VectorItem]) -> VectorResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut query = diesel::sql_query(insert_sql(name, rows.len())).into_boxed::<Pg>();
        for row in rows {
            query = query
                .bind::<Text, _>(row.text.clone())
                .bind::<pgvector::sql_types::Vector, _>(Vector::from(row.vector.clone()))
                .bind::<Jsonb, _>(row.metadata.clone())
                .bind::<Integer, _>(row.source_chunk_id);
        }

        let mut conn = self.pg.get_connection().await?;
        let inserted = conn
            .transaction::<_, PgError, _>(|conn| {
                async move { Ok(query.execute(conn).await?) }.scope_boxed()
            })
            .await?;

        tracing::trace!(target: TRACING_TARGET, collection = %name, inserted, "pgvector batch committed");
        Ok(inserted)
    }

    async fn search(
        &self,
        name: &CollectionName,
        query: &[f32],
        limit: usize,
        distance: DistanceMetric,
    ) -> VectorResult<Vec<RetrievedDocument>> {
        let mut conn = self.pg.get_connection().await?;
        let rows: Vec<SearchRow> = diesel::sql_query(search_sql(name, distance))
            .bind::<pgvector::sql_types::Vector, _>(Vector::from(query.to_vec()))
            .bind::<BigInt, _>(i64::try_from(limit).unwrap_or(i64::MAX))
            .load(&mut **conn)
            .await
            .map_err(PgError::from)?;

        Ok(rows
            .into_iter()
            .map(|row| RetrievedDocument::from_row(row.id, row.text, &row.metadata, row.score))
            .collect())
    }

    async fn create_index(
        &self,
        name: &CollectionName,
        index_type: IndexType,
        distance: DistanceMetric,
    ) -> VectorResult<bool> {
        let index_name = name.index_name();
        if self.index_exists(&index_name).await? {
            return Ok(false);
        }

        let mut conn = self.pg.get_connection().await?;
        let result = diesel::sql_query(create_index_sql(name, index_type, distance))
            .execute(&mut **conn)
            .await
            .map_err(PgError::from);

        match result {
            Ok(_) => Ok(true),
            Err(err) if err.is_already_exists() => {
                tracing::debug!(target: TRACING_TARGET, index = %index_name, "Index created concurrently");
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn drop_index(&self, name: &CollectionName) -> VectorResult<bool> {
        let index_name = name.index_name();
        if !self.index_exists(&index_name).await? {
            return Ok(false);
        }

        let mut conn = self.pg.get_connection().await?;
        diesel::sql_query(format!("DROP INDEX IF EXISTS {index_name}"))
            .execute(&mut **conn)
            .await
            .map_err(PgError::from)?;

        Ok(true)
    }
}
