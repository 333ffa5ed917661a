//! HTTP client for the Elasticsearch REST API

use super::error::{ServiceError, ServiceResult};
use super::models::*;
use super::traits::ElasticStore;
use crate::ElasticConfig;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;

/// Credentials attached to every request
#[derive(Clone)]
enum Auth {
    ApiKey(String),
    Basic { username: String, password: String },
    Anonymous,
}

/// Client for a single Elasticsearch deployment.
///
/// Cheaply cloneable (shares the reqwest connection pool). Built once from an
/// [`ElasticConfig`] and handed to the provisioner and the search invoker.
#[derive(Clone)]
pub struct EsClient {
    http: reqwest::Client,
    base_url: String,
    auth: Auth,
}

impl EsClient {
    /// Create a client for `config.url`.
    ///
    /// An API key wins over basic credentials when both are configured.
    pub fn new(config: &ElasticConfig) -> ServiceResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .danger_accept_invalid_certs(!config.verify_certs)
            .build()
            .map_err(ServiceError::Transport)?;

        let auth = match (&config.api_key, &config.username) {
            (Some(key), _) if !key.is_empty() => Auth::ApiKey(key.clone()),
            (_, Some(username)) if !username.is_empty() => Auth::Basic {
                username: username.clone(),
                password: config.password.clone().unwrap_or_default(),
            },
            _ => Auth::Anonymous,
        };

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        tracing::debug!(%method, path, "elasticsearch request");
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let req = self.http.request(method, url);
        match &self.auth {
            Auth::ApiKey(key) => req.header(AUTHORIZATION, format!("ApiKey {}", key)),
            Auth::Basic { username, password } => req.basic_auth(username, Some(password)),
            Auth::Anonymous => req,
        }
    }

    /// Send a request, classify failures, and decode a successful body.
    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder, context: &str) -> ServiceResult<T> {
        let response = req.send().await.map_err(ServiceError::from_transport)?;
        let status = response.status();
        let body = response.text().await.map_err(ServiceError::from_transport)?;

        if !status.is_success() {
            let err = ServiceError::from_response(status, &body);
            tracing::debug!(status = status.as_u16(), error = %err, "{} failed", context);
            return Err(err);
        }

        serde_json::from_str(&body).map_err(|e| ServiceError::decode(context, e))
    }

    /// Like [`send`](Self::send) for calls whose acknowledgement body is not needed.
    async fn send_ack(&self, req: RequestBuilder, context: &str) -> ServiceResult<()> {
        let _: Value = self.send(req, context).await?;
        Ok(())
    }
}

fn segment(raw: &str) -> String {
    urlencoding::encode(raw).into_owned()
}

/// Build the NDJSON body of a `_bulk` request that indexes every document into `index`.
fn bulk_body(index: &str, documents: &[Value]) -> String {
    let mut body = String::new();
    for doc in documents {
        body.push_str(&json!({ "index": { "_index": index } }).to_string());
        body.push('\n');
        body.push_str(&doc.to_string());
        body.push('\n');
    }
    body
}

#[async_trait]
impl ElasticStore for EsClient {
    async fn info(&self) -> ServiceResult<ClusterInfo> {
        self.send(self.request(Method::GET, "/"), "cluster info").await
    }

    async fn xpack_info(&self) -> ServiceResult<XpackInfo> {
        self.send(self.request(Method::GET, "/_xpack"), "xpack info")
            .await
    }

    async fn list_indices(&self) -> ServiceResult<Vec<IndexSummary>> {
        let req = self
            .request(Method::GET, "/_cat/indices")
            .query(&[("format", "json")]);
        self.send(req, "index list").await
    }

    async fn get_inference(
        &self,
        task_type: TaskType,
        inference_id: &str,
    ) -> ServiceResult<InferenceEndpoint> {
        let path = format!("/_inference/{}/{}", task_type, segment(inference_id));
        let list: InferenceEndpointList = self
            .send(self.request(Method::GET, &path), "inference endpoint")
            .await?;

        list.endpoints
            .into_iter()
            .find(|e| e.inference_id == inference_id)
            .ok_or_else(|| ServiceError::NotFound {
                reason: format!("inference endpoint [{}] not listed", inference_id),
            })
    }

    async fn put_inference(
        &self,
        task_type: TaskType,
        inference_id: &str,
        config: &InferenceConfig,
    ) -> ServiceResult<InferenceEndpoint> {
        let path = format!("/_inference/{}/{}", task_type, segment(inference_id));
        let req = self.request(Method::PUT, &path).json(config);
        self.send(req, "created inference endpoint").await
    }

    async fn run_inference(
        &self,
        task_type: TaskType,
        inference_id: &str,
        input: &str,
    ) -> ServiceResult<Value> {
        let path = format!("/_inference/{}/{}", task_type, segment(inference_id));
        let req = self
            .request(Method::POST, &path)
            .json(&json!({ "input": input }));
        self.send(req, "inference result").await
    }

    async fn infer_trained_model(
        &self,
        model_id: &str,
        text: &str,
    ) -> ServiceResult<TrainedModelInference> {
        let path = format!("/_ml/trained_models/{}/_infer", segment(model_id));
        let req = self
            .request(Method::POST, &path)
            .json(&json!({ "docs": [{ "text_field": text }] }));
        self.send(req, "trained model inference").await
    }

    async fn create_index(&self, index: &str, body: &Value) -> ServiceResult<()> {
        let req = self.request(Method::PUT, &format!("/{}", segment(index))).json(body);
        self.send_ack(req, "create index").await
    }

    async fn delete_index(&self, index: &str) -> ServiceResult<()> {
        let req = self.request(Method::DELETE, &format!("/{}", segment(index)));
        self.send_ack(req, "delete index").await
    }

    async fn put_index_template(&self, name: &str, body: &Value) -> ServiceResult<()> {
        let req = self
            .request(Method::PUT, &format!("/_index_template/{}", segment(name)))
            .json(body);
        self.send_ack(req, "index template").await
    }

    async fn refresh(&self, index: &str) -> ServiceResult<()> {
        let req = self.request(Method::POST, &format!("/{}/_refresh", segment(index)));
        self.send_ack(req, "refresh").await
    }

    async fn get_mapping(&self, index: &str) -> ServiceResult<Value> {
        let req = self.request(Method::GET, &format!("/{}/_mapping", segment(index)));
        self.send(req, "index mapping").await
    }

    async fn index_document(
        &self,
        index: &str,
        id: Option<&str>,
        document: &Value,
    ) -> ServiceResult<IndexedDocument> {
        let req = match id {
            Some(id) => self.request(
                Method::PUT,
                &format!("/{}/_doc/{}", segment(index), segment(id)),
            ),
            None => self.request(Method::POST, &format!("/{}/_doc", segment(index))),
        };
        self.send(req.json(document), "indexed document").await
    }

    async fn bulk_index(&self, index: &str, documents: &[Value]) -> ServiceResult<BulkResponse> {
        let req = self
            .request(Method::POST, "/_bulk")
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(bulk_body(index, documents));
        self.send(req, "bulk response").await
    }

    async fn get_document(&self, index: &str, id: &str) -> ServiceResult<StoredDocument> {
        let path = format!("/{}/_doc/{}", segment(index), segment(id));
        self.send(self.request(Method::GET, &path), "document").await
    }

    async fn search(&self, index: &str, body: &Value) -> ServiceResult<SearchResponse> {
        let req = self
            .request(Method::POST, &format!("/{}/_search", segment(index)))
            .json(body);
        self.send(req, "search response").await
    }
}
