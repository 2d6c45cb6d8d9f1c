//! Engine tests against a live PostgreSQL with the pgvector extension.
//!
//! Run with `POSTGRES_URL=... cargo test -p ragqa-vector -- --ignored`.

use std::time::{SystemTime, UNIX_EPOCH};

use ragqa_postgres::model::NewChunk;
use ragqa_postgres::query::ChunkRepository;
use ragqa_postgres::{OffsetPagination, PgClient, PgConfig, run_pending_migrations};
use ragqa_vector::{
    CollectionName, DistanceMetric, IndexOutcome, VectorBackendKind, VectorError, VectorItem,
    VectorStore, VectorStoreConfig,
};
use serde_json::json;

const DIMS: usize = 3;

async fn client() -> PgClient {
    let url = std::env::var("POSTGRES_URL").expect("POSTGRES_URL must be set");
    let pg = PgClient::connect(PgConfig::new(url)).await.unwrap();
    run_pending_migrations(&pg).await.unwrap();
    pg
}

fn project_id() -> i32 {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().subsec_nanos();
    (nanos % 1_000_000) as i32 + 1
}

/// Persists `n` chunks and returns their ids in insertion order.
async fn seed_chunks(pg: &PgClient, project: i32, n: usize) -> Vec<i32> {
    let mut conn = pg.get_connection().await.unwrap();
    let new_chunks = (1..=n)
        .map(|i| NewChunk {
            chunk_text: format!("chunk {i}"),
            chunk_metadata: json!({"source": "/docs/guide.md"}),
            chunk_order: i as i32,
            chunk_project_id: project,
            chunk_asset_name: "guide.md".to_string(),
        })
        .collect();
    conn.create_chunks(new_chunks).await.unwrap();

    conn.list_project_chunks(project, OffsetPagination::new(1000, 0))
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.chunk_id)
        .collect()
}

fn items(chunk_ids: &[i32]) -> Vec<VectorItem> {
    chunk_ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let mut vector = vec![0.1; DIMS];
            vector[i % DIMS] = 1.0 + i as f32;
            VectorItem::new(format!("text {i}"), vector, *id)
                .with_metadata(json!({"source": "/docs/guide.md"}))
        })
        .collect()
}

#[tokio::test]
#[ignore = "requires POSTGRES_URL with pgvector"]
async fn test_insert_search_and_lazy_index() {
    let pg = client().await;
    let project = project_id();
    let config = VectorStoreConfig::new(VectorBackendKind::PgVector).with_index_threshold(100);
    let store = VectorStore::new(config, Some(&pg)).unwrap();
    let name = store.name_for(project, DIMS).unwrap();

    assert!(store.create(&name, DIMS, true).await.unwrap());
    assert!(!store.create(&name, DIMS, false).await.unwrap());
    assert!(store.search(&name, &[1.0, 0.0, 0.0], 5).await.unwrap().is_empty());

    let ids = seed_chunks(&pg, project, 120).await;
    let all = items(&ids);

    let first = store.insert_batch(&name, &all[..100], 50).await.unwrap();
    assert_eq!(first.rows_inserted, 100);
    assert!(first.index_created);

    let rest = store.insert_batch(&name, &all[100..], 50).await.unwrap();
    assert!(!rest.index_created);
    assert_eq!(store.ensure_index(&name).await.unwrap(), IndexOutcome::AlreadyPresent);

    let info = store.describe(&name).await.unwrap().unwrap();
    assert_eq!(info.row_count, 120);
    assert_eq!(info.dimensions, DIMS);
    assert_eq!(info.distance, DistanceMetric::Cosine);
    assert!(info.has_index);

    let hits = store.search(&name, &[1.0, 0.0, 0.0], 200).await.unwrap();
    assert_eq!(hits.len(), 120);
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    assert_eq!(hits[0].source_name, "guide.md");

    assert!(store.list().await.unwrap().contains(&name));

    let mut conn = pg.get_connection().await.unwrap();
    conn.delete_project_chunks(project).await.unwrap();
    drop(conn);
    assert_eq!(store.describe(&name).await.unwrap().unwrap().row_count, 0);

    assert!(store.drop(&name).await.unwrap());
}

#[tokio::test]
#[ignore = "requires POSTGRES_URL with pgvector"]
async fn test_missing_collection_and_dimension_mismatch() {
    let pg = client().await;
    let project = project_id();
    let config = VectorStoreConfig::new(VectorBackendKind::PgVector).with_distance(DistanceMetric::Dot);
    let store = VectorStore::new(config, Some(&pg)).unwrap();
    let name = CollectionName::for_project(project, DIMS).unwrap();
    store.drop(&name).await.unwrap();

    let err = store.search(&name, &[1.0, 0.0, 0.0], 5).await.unwrap_err();
    assert!(err.is_not_found());

    store.create(&name, DIMS, false).await.unwrap();
    let ids = seed_chunks(&pg, project, 2).await;
    let mut rows = items(&ids);
    rows[1].vector.push(0.0);

    let err = store.insert(&name, &rows).await.unwrap_err();
    assert!(matches!(err, VectorError::DimensionMismatch { expected: 3, actual: 4 }));
    assert_eq!(store.describe(&name).await.unwrap().unwrap().distance, DistanceMetric::Dot);

    let mut conn = pg.get_connection().await.unwrap();
    conn.delete_project_chunks(project).await.unwrap();
    drop(conn);
    store.drop(&name).await.unwrap();
}
