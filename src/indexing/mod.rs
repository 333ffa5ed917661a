//! Index setup and document ingestion
//!
//! Pass-through helpers around the index APIs: a mapping with a
//! `sparse_vector` field, ingestion that embeds each document with a trained
//! model before indexing it, index templates, and bulk loading of JSON lines.

pub mod documents;

use crate::elastic::{ElasticStore, ServiceError};
use crate::SearchConfig;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexingError {
    #[error("error while {context}")]
    Service {
        context: String,
        #[source]
        source: ServiceError,
    },

    #[error("model [{model_id}] returned no embedding for {subject}")]
    MissingEmbedding { model_id: String, subject: String },

    #[error("document {position} has no text in field [{field}]")]
    MissingText { field: String, position: usize },

    #[error("line {line} is not a JSON document")]
    InvalidLine {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

fn service(context: impl Into<String>) -> impl FnOnce(ServiceError) -> IndexingError {
    let context = context.into();
    move |source| IndexingError::Service { context, source }
}

/// Mapping with text title/content fields and a sparse vector for the embedding.
pub fn semantic_index_body(config: &SearchConfig) -> Value {
    json!({
        "mappings": {
            "properties": {
                config.title_field.as_str(): { "type": "text" },
                config.content_field.as_str(): { "type": "text" },
                config.vector_field.as_str(): { "type": "sparse_vector" }
            }
        }
    })
}

/// Body of an index template applying `number_of_shards` to matching indices.
pub fn index_template_body(patterns: &[String], priority: u32, shards: u32) -> Value {
    json!({
        "index_patterns": patterns,
        "priority": priority,
        "template": { "settings": { "number_of_shards": shards } }
    })
}

/// Parse newline-delimited JSON documents, skipping blank lines.
pub fn parse_json_lines(input: &str) -> Result<Vec<Value>, IndexingError> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|source| IndexingError::InvalidLine {
                line: i + 1,
                source,
            })
        })
        .collect()
}

/// Writes documents into a semantic index.
pub struct Indexer {
    store: Arc<dyn ElasticStore>,
    config: SearchConfig,
}

impl Indexer {
    pub fn new(store: Arc<dyn ElasticStore>, config: SearchConfig) -> Self {
        Self { store, config }
    }

    /// Drop `index` if present and create it again with the semantic mapping.
    pub async fn recreate_index(&self, index: &str) -> Result<(), IndexingError> {
        match self.store.delete_index(index).await {
            Ok(()) => tracing::info!(index, "Deleted existing index"),
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(service(format!("deleting index [{}]", index))(err)),
        }

        self.store
            .create_index(index, &semantic_index_body(&self.config))
            .await
            .map_err(service(format!("creating index [{}]", index)))?;
        tracing::info!(index, "Index created");
        Ok(())
    }

    /// Embed each document's content with the configured model, store the
    /// expansion in the vector field, index it under ids `1..=n`, then refresh.
    ///
    /// Returns the number of documents indexed.
    pub async fn index_with_embeddings(
        &self,
        index: &str,
        documents: Vec<Value>,
    ) -> Result<usize, IndexingError> {
        let count = documents.len();
        for (i, mut doc) in documents.into_iter().enumerate() {
            let position = i + 1;
            let text = doc
                .get(&self.config.content_field)
                .and_then(Value::as_str)
                .ok_or_else(|| IndexingError::MissingText {
                    field: self.config.content_field.clone(),
                    position,
                })?
                .to_string();

            let embedding = self.expand(&text, format!("document {}", position)).await?;
            doc[self.config.vector_field.as_str()] = embedding;

            let id = position.to_string();
            let indexed = self
                .store
                .index_document(index, Some(&id), &doc)
                .await
                .map_err(service(format!("indexing document {}", position)))?;
            tracing::info!(index, id = %indexed.id, result = %indexed.result, "Document indexed");
        }

        self.store
            .refresh(index)
            .await
            .map_err(service(format!("refreshing index [{}]", index)))?;
        tracing::info!(index, count, "Documents indexed and refreshed");
        Ok(count)
    }

    /// Token weights the configured trained model produces for `text`.
    pub async fn embed(&self, text: &str) -> Result<Value, IndexingError> {
        self.expand(text, "the given text".to_string()).await
    }

    async fn expand(&self, text: &str, subject: String) -> Result<Value, IndexingError> {
        let inference = self
            .store
            .infer_trained_model(&self.config.model_id, text)
            .await
            .map_err(service(format!("embedding {}", subject)))?;
        inference
            .inference_results
            .into_iter()
            .next()
            .map(|r| r.predicted_value)
            .filter(|v| !v.is_null())
            .ok_or_else(|| IndexingError::MissingEmbedding {
                model_id: self.config.model_id.clone(),
                subject,
            })
    }

    /// Bulk-load documents as-is. Rejected items are logged and returned.
    pub async fn bulk_load(
        &self,
        index: &str,
        documents: &[Value],
    ) -> Result<Vec<String>, IndexingError> {
        let response = self
            .store
            .bulk_index(index, documents)
            .await
            .map_err(service(format!("bulk loading into [{}]", index)))?;
        let failures = response.failures();
        for reason in &failures {
            tracing::warn!(index, %reason, "Bulk item rejected");
        }
        tracing::info!(
            index,
            submitted = documents.len(),
            failed = failures.len(),
            took_ms = response.took,
            "Bulk load done"
        );
        Ok(failures)
    }

    pub async fn put_template(&self, name: &str, body: &Value) -> Result<(), IndexingError> {
        self.store
            .put_index_template(name, body)
            .await
            .map_err(service(format!("creating index template [{}]", name)))?;
        tracing::info!(template = name, "Index template created");
        Ok(())
    }
}
