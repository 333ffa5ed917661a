//! Cluster overview behind `isearch info`

use crate::elastic::models::{ClusterInfo, IndexSummary, XpackInfo};
use crate::elastic::{ElasticStore, ServiceError, ServiceResult};

/// What `isearch info` reports.
///
/// Only the connection check is fatal. The optional sections keep their own
/// outcome, so a cluster without `/_xpack` (serverless) still lists indices.
#[derive(Debug)]
pub struct ClusterOverview {
    pub info: ClusterInfo,
    pub features: Option<Result<XpackInfo, ServiceError>>,
    pub indices: Option<Result<Vec<IndexSummary>, ServiceError>>,
}

pub async fn overview(
    store: &dyn ElasticStore,
    features: bool,
    indices: bool,
) -> ServiceResult<ClusterOverview> {
    let info = store.info().await?;
    tracing::debug!(cluster = %info.cluster_name, version = %info.version.number, "connected");

    let features = if features {
        let result = store.xpack_info().await;
        if let Err(err) = &result {
            tracing::warn!(error = %err, "Feature info unavailable");
        }
        Some(result)
    } else {
        None
    };

    let indices = if indices {
        let result = store.list_indices().await;
        if let Err(err) = &result {
            tracing::warn!(error = %err, "Index list unavailable");
        }
        Some(result)
    } else {
        None
    };

    Ok(ClusterOverview {
        info,
        features,
        indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elastic::mock::{self, MockElasticStore};
    use serde_json::json;

    #[tokio::test]
    async fn test_feature_failure_does_not_hide_indices() {
        let store = MockElasticStore::new();
        store.index_document("elser_test_index", Some("1"), &json!({})).await.unwrap();
        store.fail_next_xpack(mock::api_error("no handler found for uri [/_xpack]")).await;

        let overview = overview(&store, true, true).await.unwrap();
        assert_eq!(overview.info.cluster_name, "mock-cluster");
        assert!(matches!(overview.features, Some(Err(_))));

        let indices = overview.indices.unwrap().unwrap();
        assert_eq!(indices.len(), 1);
        assert_eq!(indices[0].docs_count.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_sections_only_when_asked() {
        let store = MockElasticStore::new();
        let overview = overview(&store, false, false).await.unwrap();
        assert!(overview.features.is_none());
        assert!(overview.indices.is_none());

        let overview = super::overview(&store, true, false).await.unwrap();
        assert!(overview.features.unwrap().unwrap().features.contains_key("ml"));
    }
}
