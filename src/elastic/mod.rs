//! Elasticsearch client, error taxonomy and wire models

pub mod client;
pub mod error;
pub mod models;
pub mod traits;

pub use client::EsClient;
pub use error::{is_model_id_collision, ErrorKind, ServiceError, ServiceResult};
pub use traits::ElasticStore;

#[cfg(test)]
pub(crate) mod mock;
