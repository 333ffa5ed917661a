//! In-memory mock implementation of ElasticStore for testing without a cluster.
#![allow(dead_code)]

use super::error::{ServiceError, ServiceResult};
use super::models::*;
use super::traits::ElasticStore;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use tokio::sync::Mutex;

/// In-memory mock implementation of ElasticStore.
///
/// Inference endpoints, indices and documents live in maps behind async
/// mutexes. Failures are scripted: queued errors are returned by the next
/// `get_inference` / `put_inference` calls before the normal behaviour kicks
/// in, and names in the collision set are always rejected with
/// `NameCollision`. Every inference call is counted so tests can assert on
/// side effects.
#[derive(Default)]
pub struct MockElasticStore {
    endpoints: Mutex<HashMap<String, InferenceEndpoint>>,
    colliding_names: Mutex<HashSet<String>>,
    get_failures: Mutex<VecDeque<ServiceError>>,
    put_failures: Mutex<VecDeque<ServiceError>>,
    xpack_failures: Mutex<VecDeque<ServiceError>>,
    put_names: Mutex<Vec<String>>,
    get_calls: Mutex<usize>,
    indices: Mutex<BTreeMap<String, Value>>,
    documents: Mutex<HashMap<String, Vec<(String, Value)>>>,
    templates: Mutex<HashMap<String, Value>>,
    search_responses: Mutex<VecDeque<ServiceResult<SearchResponse>>>,
    search_bodies: Mutex<Vec<(String, Value)>>,
}

impl MockElasticStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing inference endpoint.
    pub async fn with_endpoint(self, endpoint: InferenceEndpoint) -> Self {
        self.endpoints
            .lock()
            .await
            .insert(endpoint.inference_id.clone(), endpoint);
        self
    }

    /// Reject every creation under `name` as a model id collision.
    pub async fn with_colliding_name(self, name: &str) -> Self {
        self.colliding_names.lock().await.insert(name.to_string());
        self
    }

    /// Queue an error for the next `put_inference` call.
    pub async fn fail_next_put(&self, err: ServiceError) {
        self.put_failures.lock().await.push_back(err);
    }

    /// Queue an error for the next `get_inference` call.
    pub async fn fail_next_get(&self, err: ServiceError) {
        self.get_failures.lock().await.push_back(err);
    }

    /// Queue an error for the next `xpack_info` call.
    pub async fn fail_next_xpack(&self, err: ServiceError) {
        self.xpack_failures.lock().await.push_back(err);
    }

    /// Queue the result of the next `search` call.
    pub async fn push_search_response(&self, response: ServiceResult<SearchResponse>) {
        self.search_responses.lock().await.push_back(response);
    }

    /// Names passed to `put_inference`, in call order
    pub async fn put_names(&self) -> Vec<String> {
        self.put_names.lock().await.clone()
    }

    pub async fn put_calls(&self) -> usize {
        self.put_names.lock().await.len()
    }

    pub async fn get_calls(&self) -> usize {
        *self.get_calls.lock().await
    }

    pub async fn endpoint_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.endpoints.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Bodies passed to `search`, with their target index
    pub async fn search_bodies(&self) -> Vec<(String, Value)> {
        self.search_bodies.lock().await.clone()
    }

    pub async fn documents(&self, index: &str) -> Vec<(String, Value)> {
        self.documents
            .lock()
            .await
            .get(index)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn template(&self, name: &str) -> Option<Value> {
        self.templates.lock().await.get(name).cloned()
    }
}

// ---------------------------------------------------------------------------
// Scripted error constructors
// ---------------------------------------------------------------------------

pub fn timeout() -> ServiceError {
    ServiceError::Transient {
        reason: "operation timed out".to_string(),
    }
}

pub fn collision(name: &str) -> ServiceError {
    ServiceError::NameCollision {
        reason: format!(
            "Model IDs must be unique. Requested model ID [{}] matches existing model IDs but must not.",
            name
        ),
    }
}

pub fn api_error(reason: &str) -> ServiceError {
    ServiceError::Api {
        status: 400,
        error_type: "illegal_argument_exception".to_string(),
        reason: reason.to_string(),
    }
}

fn not_found(what: &str) -> ServiceError {
    ServiceError::NotFound {
        reason: format!("{} not found", what),
    }
}

/// Sparse "embedding" of a text: one token per lowercase word, weight 1.0.
fn word_weights(text: &str) -> Value {
    let weights: Map<String, Value> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| (w.to_lowercase(), json!(1.0)))
        .collect();
    Value::Object(weights)
}

// ---------------------------------------------------------------------------
// ElasticStore implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl ElasticStore for MockElasticStore {
    async fn info(&self) -> ServiceResult<ClusterInfo> {
        Ok(ClusterInfo {
            name: "mock-node".to_string(),
            cluster_name: "mock-cluster".to_string(),
            version: VersionInfo {
                number: "8.15.0".to_string(),
                build_flavor: Some("default".to_string()),
            },
        })
    }

    async fn xpack_info(&self) -> ServiceResult<XpackInfo> {
        if let Some(err) = self.xpack_failures.lock().await.pop_front() {
            return Err(err);
        }
        let mut features = BTreeMap::new();
        features.insert(
            "ml".to_string(),
            FeatureInfo {
                available: true,
                enabled: true,
            },
        );
        Ok(XpackInfo { features })
    }

    async fn list_indices(&self) -> ServiceResult<Vec<IndexSummary>> {
        let indices = self.indices.lock().await;
        let documents = self.documents.lock().await;
        Ok(indices
            .keys()
            .map(|name| IndexSummary {
                index: name.clone(),
                health: Some("green".to_string()),
                docs_count: Some(documents.get(name).map_or(0, Vec::len).to_string()),
            })
            .collect())
    }

    async fn get_inference(
        &self,
        task_type: TaskType,
        inference_id: &str,
    ) -> ServiceResult<InferenceEndpoint> {
        *self.get_calls.lock().await += 1;
        if let Some(err) = self.get_failures.lock().await.pop_front() {
            return Err(err);
        }
        self.endpoints
            .lock()
            .await
            .get(inference_id)
            .filter(|e| e.task_type == task_type)
            .cloned()
            .ok_or_else(|| not_found(&format!("inference endpoint [{}]", inference_id)))
    }

    async fn put_inference(
        &self,
        task_type: TaskType,
        inference_id: &str,
        config: &InferenceConfig,
    ) -> ServiceResult<InferenceEndpoint> {
        self.put_names.lock().await.push(inference_id.to_string());
        if let Some(err) = self.put_failures.lock().await.pop_front() {
            return Err(err);
        }
        if self.colliding_names.lock().await.contains(inference_id) {
            return Err(collision(inference_id));
        }

        let mut endpoints = self.endpoints.lock().await;
        if endpoints.contains_key(inference_id) {
            return Err(collision(inference_id));
        }
        let endpoint = InferenceEndpoint {
            inference_id: inference_id.to_string(),
            task_type,
            service: config.service.clone(),
            service_settings: config.service_settings.clone(),
            task_settings: config.task_settings.clone(),
        };
        endpoints.insert(inference_id.to_string(), endpoint.clone());
        Ok(endpoint)
    }

    async fn run_inference(
        &self,
        task_type: TaskType,
        inference_id: &str,
        input: &str,
    ) -> ServiceResult<Value> {
        let endpoints = self.endpoints.lock().await;
        match endpoints.get(inference_id) {
            Some(e) if e.task_type == task_type => {
                Ok(json!({ task_type.as_str(): [{ "result": format!("echo: {}", input) }] }))
            }
            _ => Err(not_found(&format!("inference endpoint [{}]", inference_id))),
        }
    }

    async fn infer_trained_model(
        &self,
        _model_id: &str,
        text: &str,
    ) -> ServiceResult<TrainedModelInference> {
        Ok(TrainedModelInference {
            inference_results: vec![TrainedModelResult {
                predicted_value: word_weights(text),
            }],
        })
    }

    async fn create_index(&self, index: &str, body: &Value) -> ServiceResult<()> {
        let mut indices = self.indices.lock().await;
        if indices.contains_key(index) {
            return Err(ServiceError::Api {
                status: 400,
                error_type: "resource_already_exists_exception".to_string(),
                reason: format!("index [{}] already exists", index),
            });
        }
        indices.insert(index.to_string(), body.clone());
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> ServiceResult<()> {
        self.documents.lock().await.remove(index);
        match self.indices.lock().await.remove(index) {
            Some(_) => Ok(()),
            None => Err(not_found(&format!("index [{}]", index))),
        }
    }

    async fn put_index_template(&self, name: &str, body: &Value) -> ServiceResult<()> {
        self.templates
            .lock()
            .await
            .insert(name.to_string(), body.clone());
        Ok(())
    }

    async fn refresh(&self, index: &str) -> ServiceResult<()> {
        if self.indices.lock().await.contains_key(index) {
            Ok(())
        } else {
            Err(not_found(&format!("index [{}]", index)))
        }
    }

    async fn get_mapping(&self, index: &str) -> ServiceResult<Value> {
        let indices = self.indices.lock().await;
        let body = indices
            .get(index)
            .ok_or_else(|| not_found(&format!("index [{}]", index)))?;
        Ok(json!({ index: { "mappings": body.get("mappings").cloned().unwrap_or(json!({})) } }))
    }

    async fn index_document(
        &self,
        index: &str,
        id: Option<&str>,
        document: &Value,
    ) -> ServiceResult<IndexedDocument> {
        self.indices
            .lock()
            .await
            .entry(index.to_string())
            .or_insert_with(|| json!({}));

        let mut documents = self.documents.lock().await;
        let docs = documents.entry(index.to_string()).or_default();
        let id = id
            .map(str::to_string)
            .unwrap_or_else(|| format!("auto-{}", docs.len() + 1));

        let result = if let Some(existing) = docs.iter_mut().find(|(doc_id, _)| *doc_id == id) {
            existing.1 = document.clone();
            "updated"
        } else {
            docs.push((id.clone(), document.clone()));
            "created"
        };

        Ok(IndexedDocument {
            index: index.to_string(),
            id,
            result: result.to_string(),
        })
    }

    async fn bulk_index(&self, index: &str, documents: &[Value]) -> ServiceResult<BulkResponse> {
        let mut items = Vec::with_capacity(documents.len());
        for doc in documents {
            let indexed = self.index_document(index, None, doc).await?;
            items.push(json!({ "index": { "_id": indexed.id, "status": 201, "result": indexed.result } }));
        }
        Ok(BulkResponse {
            took: 1,
            errors: false,
            items,
        })
    }

    async fn get_document(&self, index: &str, id: &str) -> ServiceResult<StoredDocument> {
        let documents = self.documents.lock().await;
        let source = documents
            .get(index)
            .and_then(|docs| docs.iter().find(|(doc_id, _)| doc_id == id))
            .map(|(_, doc)| doc.clone());
        match source {
            Some(source) => Ok(StoredDocument {
                index: index.to_string(),
                id: id.to_string(),
                found: true,
                source: Some(source),
            }),
            None => Err(not_found(&format!("document [{}]", id))),
        }
    }

    async fn search(&self, index: &str, body: &Value) -> ServiceResult<SearchResponse> {
        self.search_bodies
            .lock()
            .await
            .push((index.to_string(), body.clone()));
        match self.search_responses.lock().await.pop_front() {
            Some(response) => response,
            None => Ok(SearchResponse {
                took: 0,
                timed_out: false,
                hits: HitsEnvelope {
                    total: Some(TotalHits {
                        value: 0,
                        relation: "eq".to_string(),
                    }),
                    max_score: None,
                    hits: Vec::new(),
                },
            }),
        }
    }
}
