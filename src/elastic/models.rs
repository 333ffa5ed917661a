//! Request and response shapes for the Elasticsearch REST API

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

// ============================================================================
// Inference endpoints
// ============================================================================

/// Task an inference endpoint performs; also the path segment in `/_inference/{task}/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    SparseEmbedding,
    TextEmbedding,
    Completion,
    Rerank,
    ChatCompletion,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::SparseEmbedding => "sparse_embedding",
            TaskType::TextEmbedding => "text_embedding",
            TaskType::Completion => "completion",
            TaskType::Rerank => "rerank",
            TaskType::ChatCompletion => "chat_completion",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `PUT /_inference/{task}/{id}`.
///
/// `service_settings` and `task_settings` are passed through untouched; which
/// keys are required depends on the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    pub service: String,
    #[serde(default)]
    pub service_settings: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_settings: Option<Map<String, Value>>,
}

/// Default chat model for the OpenAI completion preset
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";

impl InferenceConfig {
    pub fn new(service: impl Into<String>, service_settings: Map<String, Value>) -> Self {
        Self {
            service: service.into(),
            service_settings,
            task_settings: None,
        }
    }

    /// Built-in ELSER sparse embedding service.
    pub fn elser(num_allocations: u32, num_threads: u32) -> Self {
        let mut settings = Map::new();
        settings.insert("num_allocations".into(), json!(num_allocations));
        settings.insert("num_threads".into(), json!(num_threads));
        Self::new("elser", settings)
    }

    /// OpenAI chat completion through the inference API.
    pub fn openai_completion(api_key: impl Into<String>, model_id: impl Into<String>) -> Self {
        let mut settings = Map::new();
        settings.insert("api_key".into(), Value::String(api_key.into()));
        settings.insert("model_id".into(), Value::String(model_id.into()));
        Self::new("openai", settings)
    }
}

/// Descriptor of an inference endpoint as reported by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceEndpoint {
    #[serde(alias = "model_id")]
    pub inference_id: String,
    pub task_type: TaskType,
    pub service: String,
    #[serde(default)]
    pub service_settings: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_settings: Option<Map<String, Value>>,
}

/// `GET /_inference/{task}/{id}` wraps the descriptor in a list.
///
/// 8.11 and 8.12 call the list `models` and the id `model_id`. A body with
/// neither key is a decode error, never an empty list.
#[derive(Debug, Deserialize)]
pub(crate) struct InferenceEndpointList {
    #[serde(alias = "models")]
    pub endpoints: Vec<InferenceEndpoint>,
}

// ============================================================================
// Cluster
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterInfo {
    #[serde(default)]
    pub name: String,
    pub cluster_name: String,
    pub version: VersionInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub number: String,
    #[serde(default)]
    pub build_flavor: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct XpackInfo {
    #[serde(default)]
    pub features: BTreeMap<String, FeatureInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureInfo {
    #[serde(default)]
    pub available: bool,
    #[serde(default)]
    pub enabled: bool,
}

/// One row of `GET /_cat/indices?format=json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSummary {
    pub index: String,
    #[serde(default)]
    pub health: Option<String>,
    #[serde(rename = "docs.count", default)]
    pub docs_count: Option<String>,
}

// ============================================================================
// Documents
// ============================================================================

/// Response of `PUT /{index}/_doc/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedDocument {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_id")]
    pub id: String,
    pub result: String,
}

/// Response of `GET /{index}/_doc/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub found: bool,
    #[serde(rename = "_source", default)]
    pub source: Option<Value>,
}

/// Response of `POST /_bulk`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkResponse {
    #[serde(default)]
    pub took: u64,
    pub errors: bool,
    #[serde(default)]
    pub items: Vec<Value>,
}

impl BulkResponse {
    /// Reasons of the items the service rejected.
    pub fn failures(&self) -> Vec<String> {
        self.items
            .iter()
            .filter_map(|item| item.as_object()?.values().next())
            .filter_map(|op| op.get("error"))
            .map(|err| {
                err.get("reason")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| err.to_string())
            })
            .collect()
    }
}

/// Response of `POST /_ml/trained_models/{model}/_infer`
#[derive(Debug, Clone, Deserialize)]
pub struct TrainedModelInference {
    #[serde(default)]
    pub inference_results: Vec<TrainedModelResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrainedModelResult {
    #[serde(default)]
    pub predicted_value: Value,
}

// ============================================================================
// Search
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub timed_out: bool,
    pub hits: HitsEnvelope,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HitsEnvelope {
    #[serde(default)]
    pub total: Option<TotalHits>,
    #[serde(default)]
    pub max_score: Option<f64>,
    #[serde(default)]
    pub hits: Vec<RawHit>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TotalHits {
    pub value: u64,
    #[serde(default)]
    pub relation: String,
}

/// A hit exactly as the service returns it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawHit {
    #[serde(rename = "_index", default)]
    pub index: String,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    #[serde(rename = "_source", default)]
    pub source: Map<String, Value>,
    #[serde(default)]
    pub highlight: HashMap<String, Vec<String>>,
    #[serde(rename = "_explanation", alias = "explanation", default)]
    pub explanation: Option<Value>,
}
