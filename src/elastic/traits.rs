//! Trait abstraction for the Elasticsearch operations used by the crate

use super::error::ServiceResult;
use super::models::*;
use async_trait::async_trait;
use serde_json::Value;

/// Every call the provisioner, the search invoker and the CLI make against the
/// cluster.
///
/// [`EsClient`](super::EsClient) is the HTTP implementation; tests use the
/// scripted in-memory store in `elastic::mock`. Shared as
/// `Arc<dyn ElasticStore>`.
#[async_trait]
pub trait ElasticStore: Send + Sync {
    // ========================================================================
    // Cluster
    // ========================================================================

    /// Cluster name and version (`GET /`)
    async fn info(&self) -> ServiceResult<ClusterInfo>;

    /// Licensed features and whether they are enabled
    async fn xpack_info(&self) -> ServiceResult<XpackInfo>;

    /// All indices with their document counts
    async fn list_indices(&self) -> ServiceResult<Vec<IndexSummary>>;

    // ========================================================================
    // Inference
    // ========================================================================

    /// Look up an inference endpoint. A missing endpoint is `ServiceError::NotFound`.
    async fn get_inference(
        &self,
        task_type: TaskType,
        inference_id: &str,
    ) -> ServiceResult<InferenceEndpoint>;

    /// Create an inference endpoint and return the descriptor the service stored.
    async fn put_inference(
        &self,
        task_type: TaskType,
        inference_id: &str,
        config: &InferenceConfig,
    ) -> ServiceResult<InferenceEndpoint>;

    /// Run an inference endpoint on a single input
    async fn run_inference(
        &self,
        task_type: TaskType,
        inference_id: &str,
        input: &str,
    ) -> ServiceResult<Value>;

    /// Run a deployed trained model (e.g. ELSER) on one text
    async fn infer_trained_model(
        &self,
        model_id: &str,
        text: &str,
    ) -> ServiceResult<TrainedModelInference>;

    // ========================================================================
    // Indices
    // ========================================================================

    async fn create_index(&self, index: &str, body: &Value) -> ServiceResult<()>;

    async fn delete_index(&self, index: &str) -> ServiceResult<()>;

    async fn put_index_template(&self, name: &str, body: &Value) -> ServiceResult<()>;

    /// Make recent writes visible to search
    async fn refresh(&self, index: &str) -> ServiceResult<()>;

    async fn get_mapping(&self, index: &str) -> ServiceResult<Value>;

    // ========================================================================
    // Documents
    // ========================================================================

    /// Index one document, with an explicit id or a service-generated one
    async fn index_document(
        &self,
        index: &str,
        id: Option<&str>,
        document: &Value,
    ) -> ServiceResult<IndexedDocument>;

    /// Index many documents in one `_bulk` request
    async fn bulk_index(&self, index: &str, documents: &[Value]) -> ServiceResult<BulkResponse>;

    async fn get_document(&self, index: &str, id: &str) -> ServiceResult<StoredDocument>;

    // ========================================================================
    // Search
    // ========================================================================

    /// Execute a search request body against one index
    async fn search(&self, index: &str, body: &Value) -> ServiceResult<SearchResponse>;
}
