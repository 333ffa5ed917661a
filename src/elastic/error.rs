//! Error taxonomy for calls against the Elasticsearch REST API
//!
//! Every failure coming out of [`EsClient`](super::EsClient) is classified
//! exactly once, here, into a [`ServiceError`]. Callers branch on
//! [`ServiceError::kind`] instead of inspecting messages.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Reason fragment the ML plugin reports when an inference id is already taken.
const MODEL_ID_COLLISION: &str = "Model IDs must be unique";

/// HTTP statuses worth retrying: the request never reached a healthy node.
const TRANSIENT_STATUSES: &[u16] = &[408, 429, 502, 503, 504];

/// Coarse classification used by the provisioner to pick a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Transient,
    NameCollision,
    Other,
}

/// Structured error returned by every [`ElasticStore`](super::ElasticStore) call.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found: {reason}")]
    NotFound { reason: String },

    #[error("transient failure: {reason}")]
    Transient { reason: String },

    #[error("name already in use: {reason}")]
    NameCollision { reason: String },

    #[error("service returned {status} ({error_type}): {reason}")]
    Api {
        status: u16,
        error_type: String,
        reason: String,
    },

    #[error("request failed")]
    Transport(#[source] reqwest::Error),

    #[error("failed to decode {context}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// `{"error": {...} | "...", "status": 400}` as returned by Elasticsearch
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<ErrorField>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorField {
    Detailed {
        #[serde(rename = "type")]
        error_type: Option<String>,
        reason: Option<String>,
    },
    Message(String),
}

/// Whether a service-reported reason means "this inference id is already in use".
///
/// The service exposes no dedicated error type for this case, so the check is a
/// substring match. Keep it here and nowhere else.
pub fn is_model_id_collision(reason: &str) -> bool {
    reason.contains(MODEL_ID_COLLISION)
}

impl ServiceError {
    /// Classify a non-success HTTP response.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let (error_type, reason) = match serde_json::from_str::<ErrorBody>(body) {
            Ok(ErrorBody {
                error:
                    Some(ErrorField::Detailed {
                        error_type,
                        reason,
                    }),
            }) => (error_type, reason),
            Ok(ErrorBody {
                error: Some(ErrorField::Message(message)),
            }) => (None, Some(message)),
            _ => (None, None),
        };

        let reason = reason
            .filter(|r| !r.is_empty())
            .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());

        if status == StatusCode::NOT_FOUND {
            return ServiceError::NotFound { reason };
        }
        if TRANSIENT_STATUSES.contains(&status.as_u16()) {
            return ServiceError::Transient {
                reason: format!("HTTP {}: {}", status.as_u16(), reason),
            };
        }
        if is_model_id_collision(&reason) {
            return ServiceError::NameCollision { reason };
        }

        ServiceError::Api {
            status: status.as_u16(),
            error_type: error_type.unwrap_or_else(|| "unknown".to_string()),
            reason,
        }
    }

    /// Classify a failure that happened before any response was received.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            ServiceError::Transient {
                reason: err.to_string(),
            }
        } else {
            ServiceError::Transport(err)
        }
    }

    pub fn decode(context: impl Into<String>, source: serde_json::Error) -> Self {
        ServiceError::Decode {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::NotFound { .. } => ErrorKind::NotFound,
            ServiceError::Transient { .. } => ErrorKind::Transient,
            ServiceError::NameCollision { .. } => ErrorKind::NameCollision,
            ServiceError::Api { .. } | ServiceError::Transport(_) | ServiceError::Decode { .. } => {
                ErrorKind::Other
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}
