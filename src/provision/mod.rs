//! Idempotent provisioning of inference endpoints
//!
//! [`Provisioner::ensure_inference`] looks an endpoint up by `(task, name)`,
//! creates it when absent, retries transient failures through the injected
//! [`RetryPolicy`], and moves to a timestamp-suffixed name when the service
//! reports a model id collision.

pub mod retry;

pub use retry::{ExponentialBackoff, FixedDelay, RetryPolicy};

use crate::elastic::models::{InferenceConfig, InferenceEndpoint, TaskType};
use crate::elastic::{ElasticStore, ErrorKind, ServiceError};
use crate::ProvisioningConfig;
use std::sync::Arc;
use thiserror::Error;

/// Outcome of a successful [`Provisioner::ensure_inference`] call.
///
/// After a collision rename `endpoint.inference_id` differs from
/// `requested_name`; callers must use the former.
#[derive(Debug, Clone)]
pub struct Provisioned {
    pub endpoint: InferenceEndpoint,
    pub requested_name: String,
    /// `false` when the endpoint already existed
    pub created: bool,
}

impl Provisioned {
    pub fn name(&self) -> &str {
        &self.endpoint.inference_id
    }

    pub fn was_renamed(&self) -> bool {
        self.endpoint.inference_id != self.requested_name
    }
}

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("inference endpoint name must not be empty")]
    InvalidName,

    #[error("gave up on inference endpoint [{name}] after {attempts} attempts")]
    RetriesExhausted {
        name: String,
        attempts: u32,
        #[source]
        last_error: ServiceError,
    },

    #[error("inference endpoint [{requested}] still collides after {renames} renames (last tried [{last_name}])")]
    CollisionLimit {
        requested: String,
        last_name: String,
        renames: u32,
    },

    #[error("failed to provision inference endpoint [{name}]")]
    Service {
        name: String,
        #[source]
        source: ServiceError,
    },
}

/// Creates inference endpoints exactly once per logical name.
///
/// Idempotency rests entirely on the service-side existence check: two
/// processes provisioning the same name concurrently can both miss the lookup
/// and race on creation. The loser then sees a collision (and gets a renamed
/// endpoint) or a plain service error. Nothing here serialises such callers.
pub struct Provisioner {
    store: Arc<dyn ElasticStore>,
    policy: Arc<dyn RetryPolicy>,
    max_renames: u32,
}

impl Provisioner {
    pub fn new(store: Arc<dyn ElasticStore>, policy: Arc<dyn RetryPolicy>, max_renames: u32) -> Self {
        Self {
            store,
            policy,
            max_renames,
        }
    }

    /// Provisioner with exponential backoff configured from `config`.
    pub fn from_config(store: Arc<dyn ElasticStore>, config: &ProvisioningConfig) -> Self {
        Self::new(
            store,
            Arc::new(ExponentialBackoff::from_config(config)),
            config.max_renames,
        )
    }

    /// Make sure an inference endpoint named `name` exists for `task_type`.
    ///
    /// Transient failures (lookup or creation) are retried up to the policy's
    /// attempt budget. A name collision switches to `{name}_{unix_seconds}` and
    /// starts a fresh attempt budget, at most `max_renames` times. Any other
    /// service error is returned immediately.
    pub async fn ensure_inference(
        &self,
        name: &str,
        task_type: TaskType,
        config: &InferenceConfig,
    ) -> Result<Provisioned, ProvisionError> {
        if name.trim().is_empty() {
            return Err(ProvisionError::InvalidName);
        }

        let max_attempts = self.policy.max_attempts().max(1);
        let mut candidate = name.to_string();
        let mut renames = 0;
        let mut last_stamp = None;

        'names: loop {
            let mut attempt = 1;
            loop {
                let err = match self.get_or_create(&candidate, task_type, config).await {
                    Ok((endpoint, created)) => {
                        return Ok(Provisioned {
                            endpoint,
                            requested_name: name.to_string(),
                            created,
                        })
                    }
                    Err(err) => err,
                };

                match err.kind() {
                    ErrorKind::Transient => {
                        if attempt >= max_attempts {
                            tracing::error!(
                                inference_id = %candidate,
                                attempts = attempt,
                                "Max retries reached, giving up"
                            );
                            return Err(ProvisionError::RetriesExhausted {
                                name: candidate,
                                attempts: attempt,
                                last_error: err,
                            });
                        }
                        let delay = self.policy.delay(attempt);
                        tracing::warn!(
                            inference_id = %candidate,
                            attempt,
                            max_attempts,
                            delay_ms = delay.as_millis() as u64,
                            error = %err,
                            "Transient failure, retrying"
                        );
                        self.policy.pause(delay).await;
                        attempt += 1;
                    }
                    ErrorKind::NameCollision => {
                        if renames >= self.max_renames {
                            return Err(ProvisionError::CollisionLimit {
                                requested: name.to_string(),
                                last_name: candidate,
                                renames,
                            });
                        }
                        let stamp = next_stamp(last_stamp);
                        last_stamp = Some(stamp);
                        let renamed = format!("{}_{}", name, stamp);
                        tracing::warn!(
                            inference_id = %candidate,
                            renamed = %renamed,
                            "Inference id already in use, retrying under a new id"
                        );
                        candidate = renamed;
                        renames += 1;
                        continue 'names;
                    }
                    ErrorKind::NotFound | ErrorKind::Other => {
                        return Err(ProvisionError::Service {
                            name: candidate,
                            source: err,
                        });
                    }
                }
            }
        }
    }

    /// One lookup-then-create round under a single name.
    async fn get_or_create(
        &self,
        name: &str,
        task_type: TaskType,
        config: &InferenceConfig,
    ) -> Result<(InferenceEndpoint, bool), ServiceError> {
        match self.store.get_inference(task_type, name).await {
            Ok(existing) => {
                tracing::info!(inference_id = name, %task_type, "Inference endpoint already exists");
                return Ok((existing, false));
            }
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err),
        }

        let created = self.store.put_inference(task_type, name, config).await?;
        tracing::info!(
            inference_id = %created.inference_id,
            %task_type,
            service = %created.service,
            "Inference endpoint created"
        );
        Ok((created, true))
    }
}

/// Unix seconds for a rename suffix, strictly after the previous one.
fn next_stamp(previous: Option<i64>) -> i64 {
    let now = chrono::Utc::now().timestamp();
    match previous {
        Some(prev) if now <= prev => prev + 1,
        _ => now,
    }
}
