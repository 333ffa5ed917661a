//! Semantic search over a sparse-vector field
//!
//! Builds a text-expansion (or `sparse_vector`) query with highlighting and
//! relevance explanation, runs it once, and shapes the raw hits into
//! [`SearchResult`] for display.

pub mod render;

pub use render::{render_result, RenderOptions};

use crate::elastic::models::{RawHit, SearchResponse};
use crate::elastic::{ElasticStore, ServiceError};
use crate::SearchConfig;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search query must not be empty")]
    EmptyQuery,

    #[error("search on [{index}] failed")]
    Service {
        index: String,
        #[source]
        source: ServiceError,
    },
}

/// Search hits in the order the service returned them.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub total: u64,
    pub max_score: Option<f64>,
    pub hits: Vec<Hit>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Hit {
    pub id: String,
    pub index: String,
    pub score: f64,
    pub title: Option<String>,
    pub content: Option<String>,
    /// First highlighted fragment of the content field
    pub highlight: Option<String>,
    pub explanation: Option<Value>,
    pub source: Map<String, Value>,
}

/// How the query text is matched against the sparse field.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryMode {
    /// `text_expansion` through a deployed trained model (e.g. `.elser_model_2`)
    TextExpansion { model_id: String },
    /// `sparse_vector` through an inference endpoint
    SparseVector { inference_id: String },
}

pub struct SemanticSearch {
    store: Arc<dyn ElasticStore>,
    config: SearchConfig,
}

impl SemanticSearch {
    pub fn new(store: Arc<dyn ElasticStore>, config: SearchConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// An inference endpoint, when configured, takes precedence over the model id.
    pub fn mode(&self) -> QueryMode {
        match &self.config.inference_id {
            Some(id) if !id.is_empty() => QueryMode::SparseVector {
                inference_id: id.clone(),
            },
            _ => QueryMode::TextExpansion {
                model_id: self.config.model_id.clone(),
            },
        }
    }

    /// Request body for `query_text`.
    pub fn build_request(&self, query_text: &str) -> Value {
        let field = &self.config.vector_field;
        let query = match self.mode() {
            QueryMode::TextExpansion { model_id } => json!({
                "text_expansion": {
                    field.as_str(): { "model_id": model_id, "model_text": query_text }
                }
            }),
            QueryMode::SparseVector { inference_id } => json!({
                "sparse_vector": {
                    "field": field,
                    "inference_id": inference_id,
                    "query": query_text
                }
            }),
        };

        let mut body = json!({ "query": query, "size": self.config.size });
        if self.config.highlight {
            body["highlight"] = json!({ "fields": { self.config.content_field.as_str(): {} } });
        }
        if self.config.explain {
            body["explain"] = json!(true);
        }
        body
    }

    /// Run a semantic search once. No retry, no pagination.
    pub async fn search(&self, index: &str, query_text: &str) -> Result<SearchResult, SearchError> {
        let query_text = query_text.trim();
        if query_text.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let body = self.build_request(query_text);
        tracing::debug!(index, query = query_text, "semantic search");
        let response = self.execute(index, &body).await?;
        tracing::info!(index, total = response.total, returned = response.hits.len(), "search done");
        Ok(response)
    }

    /// Every document of `index` (up to the configured size), unscored.
    pub async fn all_documents(&self, index: &str) -> Result<SearchResult, SearchError> {
        let body = json!({ "query": { "match_all": {} }, "size": self.config.size });
        self.execute(index, &body).await
    }

    async fn execute(&self, index: &str, body: &Value) -> Result<SearchResult, SearchError> {
        let response = self
            .store
            .search(index, body)
            .await
            .map_err(|source| SearchError::Service {
                index: index.to_string(),
                source,
            })?;
        Ok(self.shape(response))
    }

    fn shape(&self, response: SearchResponse) -> SearchResult {
        let total = response
            .hits
            .total
            .as_ref()
            .map(|t| t.value)
            .unwrap_or(response.hits.hits.len() as u64);
        let hits = response
            .hits
            .hits
            .into_iter()
            .map(|raw| self.shape_hit(raw))
            .collect();

        SearchResult {
            total,
            max_score: response.hits.max_score,
            hits,
        }
    }

    fn shape_hit(&self, mut raw: RawHit) -> Hit {
        let text = |field: &str| raw.source.get(field).and_then(Value::as_str).map(str::to_string);
        let title = text(&self.config.title_field);
        let content = text(&self.config.content_field);
        let highlight = raw
            .highlight
            .remove(&self.config.content_field)
            .and_then(|fragments| fragments.into_iter().next());

        Hit {
            id: raw.id,
            index: raw.index,
            score: raw.score.unwrap_or(0.0),
            title,
            content,
            highlight,
            explanation: raw.explanation,
            source: raw.source,
        }
    }
}
