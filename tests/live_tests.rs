//! Live cluster tests
//!
//! These tests require a running Elasticsearch reachable at ELASTIC_URL
//! (default http://localhost:9200). They skip themselves otherwise.
//! Run with: cargo test --test live_tests

use inference_search::elastic::{ElasticStore, EsClient};
use inference_search::indexing::Indexer;
use inference_search::search::SemanticSearch;
use inference_search::Config;
use serde_json::json;
use std::sync::Arc;

fn live_client() -> (Arc<EsClient>, Config) {
    let config = Config::from_env().unwrap();
    let client = EsClient::new(&config.elastic).unwrap();
    (Arc::new(client), config)
}

/// Check if the cluster is available
async fn cluster_available(client: &EsClient) -> bool {
    client.info().await.is_ok()
}

#[tokio::test]
async fn test_cluster_info() {
    let (client, _) = live_client();
    if !cluster_available(&client).await {
        eprintln!("Skipping test: cluster not available at {}", client.base_url());
        return;
    }

    let info = client.info().await.unwrap();
    assert!(!info.cluster_name.is_empty());
    assert!(!info.version.number.is_empty());
}

#[tokio::test]
async fn test_bulk_then_list_documents() {
    let (client, config) = live_client();
    if !cluster_available(&client).await {
        eprintln!("Skipping test: cluster not available at {}", client.base_url());
        return;
    }

    let index = format!("isearch-live-{}", chrono::Utc::now().timestamp_millis());
    let indexer = Indexer::new(client.clone(), config.search.clone());
    indexer.recreate_index(&index).await.unwrap();

    let docs = vec![
        json!({ "title": "Benefits of Exercise", "content": "Regular exercise improves health" }),
        json!({ "title": "Importance of Sleep", "content": "Adequate sleep is crucial" }),
    ];
    let failures = indexer.bulk_load(&index, &docs).await.unwrap();
    assert!(failures.is_empty(), "rejected: {:?}", failures);
    client.refresh(&index).await.unwrap();

    let all = SemanticSearch::new(client.clone(), config.search.clone())
        .all_documents(&index)
        .await
        .unwrap();
    assert_eq!(all.total, 2);

    // Cleanup
    let _ = client.delete_index(&index).await;
}
