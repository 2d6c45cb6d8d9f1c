//! Retrieval quality metrics.

use std::collections::BTreeMap;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{Error, Result, TRACING_TARGET_RAG};

/// Cut-offs evaluated when none are given.
pub const DEFAULT_K_VALUES: [usize; 3] = [1, 3, 5];

/// One labelled query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalItem {
    /// Query sent to the retriever.
    pub query: String,
    /// Reference answer.
    #[serde(default)]
    pub ground_truth_answer: String,
    /// Identifiers of the documents that answer the query.
    pub ground_truth_doc_ids: Vec<String>,
}

/// Parses one [`EvalItem`] per non-blank line.
pub fn parse_eval_items(jsonl: &str) -> Result<Vec<EvalItem>> {
    jsonl
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_str(line).map_err(Error::from))
        .collect()
}

/// Fraction of the ground-truth ids found in the first `k` retrieved ids.
pub fn recall_at_k(retrieved: &[String], ground_truth: &[String], k: usize) -> f64 {
    if ground_truth.is_empty() {
        return 0.0;
    }

    let top_k = top_k(retrieved, k);
    let hits = ground_truth.iter().filter(|id| top_k.contains(id)).count();
    hits as f64 / ground_truth.len() as f64
}

/// `1.0` when any ground-truth id is within the first `k` retrieved ids.
pub fn hit_rate_at_k(retrieved: &[String], ground_truth: &[String], k: usize) -> f64 {
    let top_k = top_k(retrieved, k);
    match ground_truth.iter().any(|id| top_k.contains(id)) {
        true => 1.0,
        false => 0.0,
    }
}

/// Reciprocal rank of the first relevant id within the first `k`.
pub fn mrr_at_k(retrieved: &[String], ground_truth: &[String], k: usize) -> f64 {
    top_k(retrieved, k)
        .iter()
        .position(|id| ground_truth.contains(id))
        .map_or(0.0, |rank| 1.0 / (rank + 1) as f64)
}

fn top_k(retrieved: &[String], k: usize) -> &[String] {
    &retrieved[..k.min(retrieved.len())]
}

/// Metrics of a single query, keyed `recall@k`, `hit_rate@k` and `mrr@k`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMetrics {
    /// Evaluated query.
    pub query: String,
    /// Ids returned by the retriever, best first.
    pub retrieved_ids: Vec<String>,
    /// Metric values.
    pub metrics: BTreeMap<String, f64>,
}

/// Per-query metrics and their means.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalReport {
    /// One entry per evaluated item, in input order.
    pub per_query: Vec<QueryMetrics>,
    /// Mean of every metric across items.
    pub average: BTreeMap<String, f64>,
}

/// Runs `retrieve(query, max_k)` for every item and scores the ranked ids it
/// returns against the item's ground truth.
pub async fn evaluate_retrieval<F, Fut>(
    items: &[EvalItem],
    k_values: &[usize],
    mut retrieve: F,
) -> Result<RetrievalReport>
where
    F: FnMut(String, usize) -> Fut,
    Fut: Future<Output = Result<Vec<String>>>,
{
    let Some(&max_k) = k_values.iter().max() else {
        return Err(Error::config("at least one cut-off is required"));
    };
    if k_values.contains(&0) {
        return Err(Error::config("cut-offs must be positive"));
    }

    let mut report = RetrievalReport::default();
    for item in items {
        let retrieved_ids = retrieve(item.query.clone(), max_k).await?;
        let truth = &item.ground_truth_doc_ids;

        let mut metrics = BTreeMap::new();
        for &k in k_values {
            metrics.insert(format!("recall@{k}"), recall_at_k(&retrieved_ids, truth, k));
            metrics.insert(format!("hit_rate@{k}"), hit_rate_at_k(&retrieved_ids, truth, k));
            metrics.insert(format!("mrr@{k}"), mrr_at_k(&retrieved_ids, truth, k));
        }

        tracing::debug!(
            target: TRACING_TARGET_RAG,
            query = %item.query,
            retrieved = retrieved_ids.len(),
            "Evaluated query"
        );

        report.per_query.push(QueryMetrics {
            query: item.query.clone(),
            retrieved_ids,
            metrics,
        });
    }

    if !report.per_query.is_empty() {
        let count = report.per_query.len() as f64;
        for query in &report.per_query {
            for (name, value) in &query.metrics {
                *report.average.entry(name.clone()).or_default() += value / count;
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_metrics() {
        let retrieved = ids(&["a", "b", "c", "d"]);
        let truth = ids(&["c", "x"]);

        assert_eq!(recall_at_k(&retrieved, &truth, 1), 0.0);
        assert_eq!(recall_at_k(&retrieved, &truth, 3), 0.5);
        assert_eq!(hit_rate_at_k(&retrieved, &truth, 2), 0.0);
        assert_eq!(hit_rate_at_k(&retrieved, &truth, 3), 1.0);
        assert_eq!(mrr_at_k(&retrieved, &truth, 5), 1.0 / 3.0);
        assert_eq!(mrr_at_k(&retrieved, &truth, 2), 0.0);
    }

    #[test]
    fn test_metrics_edge_cases() {
        assert_eq!(recall_at_k(&ids(&["a"]), &[], 3), 0.0);
        assert_eq!(hit_rate_at_k(&[], &ids(&["a"]), 3), 0.0);
        assert_eq!(mrr_at_k(&ids(&["a"]), &ids(&["a"]), 10), 1.0);
    }

    #[test]
    fn test_parse_eval_items() {
        let jsonl = r#"
{"query": "what is a?", "ground_truth_answer": "A.", "ground_truth_doc_ids": ["a.txt"]}

{"query": "what is b?", "ground_truth_doc_ids": ["b.txt", "c.txt"]}
"#;
        let items = parse_eval_items(jsonl).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].ground_truth_answer, "A.");
        assert_eq!(items[1].ground_truth_answer, "");
        assert_eq!(items[1].ground_truth_doc_ids, ids(&["b.txt", "c.txt"]));

        assert!(parse_eval_items("{\"query\": 1}").is_err());
    }

    #[tokio::test]
    async fn test_evaluate_retrieval() {
        let items = vec![
            EvalItem {
                query: "first".to_owned(),
                ground_truth_answer: String::new(),
                ground_truth_doc_ids: ids(&["a"]),
            },
            EvalItem {
                query: "second".to_owned(),
                ground_truth_answer: String::new(),
                ground_truth_doc_ids: ids(&["z"]),
            },
        ];

        let mut requested = Vec::new();
        let report = evaluate_retrieval(&items, &DEFAULT_K_VALUES, |query, k| {
            requested.push(k);
            async move {
                Ok::<_, Error>(match query.as_str() {
                    "first" => ids(&["b", "a"]),
                    _ => ids(&["b"]),
                })
            }
        })
        .await
        .unwrap();

        assert_eq!(requested, vec![5, 5]);
        assert_eq!(report.per_query.len(), 2);
        assert_eq!(report.per_query[0].metrics["hit_rate@1"], 0.0);
        assert_eq!(report.per_query[0].metrics["mrr@3"], 0.5);
        assert_eq!(report.average["recall@3"], 0.5);
        assert_eq!(report.average["mrr@3"], 0.25);
        assert_eq!(report.average.len(), 9);
    }

    #[tokio::test]
    async fn test_evaluate_requires_cut_offs() {
        let result = evaluate_retrieval(&[], &[], |_, _| async { Ok::<_, Error>(Vec::new()) }).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
