//! Inference Search
//!
//! Client-side tooling for a hosted Elasticsearch deployment:
//! - Idempotent provisioning of inference endpoints, with bounded retries on
//!   transient failures and renaming on model id collisions
//! - Semantic search over ELSER sparse vectors with highlighting and
//!   relevance explanations
//! - Index setup and ingestion helpers for the demo corpus

pub mod cluster;
pub mod elastic;
pub mod indexing;
pub mod provision;
pub mod search;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

// ============================================================================
// Config structs (YAML deserialization targets and runtime config)
// ============================================================================

/// Top-level configuration.
///
/// Loaded from an optional YAML file, then overridden by environment variables.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub elastic: ElasticConfig,
    pub provisioning: ProvisioningConfig,
    pub search: SearchConfig,
    pub openai: OpenAiConfig,
}

/// Connection to the Elasticsearch deployment
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ElasticConfig {
    pub url: String,
    /// Sent as `Authorization: ApiKey ...`; takes precedence over basic auth
    pub api_key: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub verify_certs: bool,
    pub request_timeout_secs: u64,
}

impl Default for ElasticConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".into(),
            api_key: None,
            username: None,
            password: None,
            verify_certs: true,
            request_timeout_secs: 30,
        }
    }
}

/// Retry and rename budget of the inference provisioner
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProvisioningConfig {
    /// Attempts per name, the first one included
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
    pub jitter: bool,
    /// Collision renames before giving up
    pub max_renames: u32,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 5000,
            max_delay_ms: 60_000,
            multiplier: 2.0,
            jitter: true,
            max_renames: 3,
        }
    }
}

/// Semantic search and ingestion settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub index: String,
    pub vector_field: String,
    /// Trained model used by `text_expansion` queries and document embedding
    pub model_id: String,
    /// When set, queries use `sparse_vector` against this inference endpoint
    pub inference_id: Option<String>,
    pub content_field: String,
    pub title_field: String,
    pub size: usize,
    pub explain: bool,
    pub highlight: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            index: "elser_test_index".into(),
            vector_field: "content_vector".into(),
            model_id: ".elser_model_2".into(),
            inference_id: None,
            content_field: "content".into(),
            title_field: "title".into(),
            size: 10,
            explain: true,
            highlight: true,
        }
    }
}

/// Credentials for the OpenAI completion preset
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub model_id: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model_id: elastic::models::DEFAULT_OPENAI_MODEL.into(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables only.
    /// Equivalent to from_yaml_and_env(None).
    pub fn from_env() -> Result<Self> {
        Self::from_yaml_and_env(None)
    }

    /// Load configuration from an optional YAML file, then override with env vars.
    ///
    /// Priority: env var > YAML > default
    ///
    /// If `yaml_path` is None, tries "config.yaml" in CWD. A missing file falls
    /// back to env vars / defaults.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        let mut config = Self::load_yaml(yaml_path);

        if let Ok(url) = std::env::var("ELASTIC_URL") {
            config.elastic.url = url;
        }
        if let Some(key) = non_empty_env("ELASTIC_API_KEY") {
            config.elastic.api_key = Some(key);
        }
        if let Some(user) = non_empty_env("ES_USER") {
            config.elastic.username = Some(user);
        }
        if let Some(password) = non_empty_env("ES_PASSWORD") {
            config.elastic.password = Some(password);
        }
        if let Ok(raw) = std::env::var("ELASTIC_VERIFY_CERTS") {
            config.elastic.verify_certs = raw
                .parse()
                .with_context(|| format!("ELASTIC_VERIFY_CERTS must be true or false, got {raw:?}"))?;
        }
        if let Ok(raw) = std::env::var("ELASTIC_TIMEOUT_SECS") {
            config.elastic.request_timeout_secs = raw
                .parse()
                .with_context(|| format!("ELASTIC_TIMEOUT_SECS must be a number, got {raw:?}"))?;
        }
        if let Ok(index) = std::env::var("SEARCH_INDEX") {
            config.search.index = index;
        }
        if let Some(key) = non_empty_env("OPENAI_API_KEY") {
            config.openai.api_key = Some(key);
        }

        Ok(config)
    }

    /// Try to load and parse a YAML config file. Returns defaults on any failure.
    fn load_yaml(yaml_path: Option<&Path>) -> Self {
        let default_path = Path::new("config.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                Self::default()
            }
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Shared application state: one client, one config, built once by the caller.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn elastic::ElasticStore>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Create the HTTP client described by `config.elastic`
    pub fn new(config: Config) -> Result<Self> {
        let client = elastic::EsClient::new(&config.elastic)
            .context("Failed to create Elasticsearch client")?;
        Ok(Self::with_store(Arc::new(client), config))
    }

    pub fn with_store(store: Arc<dyn elastic::ElasticStore>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    pub fn provisioner(&self) -> provision::Provisioner {
        provision::Provisioner::from_config(self.store.clone(), &self.config.provisioning)
    }

    pub fn semantic_search(&self) -> search::SemanticSearch {
        search::SemanticSearch::new(self.store.clone(), self.config.search.clone())
    }

    pub fn indexer(&self) -> indexing::Indexer {
        indexing::Indexer::new(self.store.clone(), self.config.search.clone())
    }
}

// ============================================================================
// Tests
// ============================================================================
