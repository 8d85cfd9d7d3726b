//! Cluster gateway
//!
//! Idempotent operations the job controller is written against. Mutations and
//! reads go through [`with_retry`]; existence probes do not, since any failed
//! read already means "treat as missing".

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, info};

use crate::controller::api::{ClusterApi, JobPod, JobStatusSnapshot, PodEvent};
use crate::controller::error::Result;
use crate::controller::retry::{RetryConfig, with_retry};
use crate::resources::job::generate_job;
use crate::resources::namespace::generate_namespace;
use crate::resources::secret::generate_job_secret;

/// Whether [`ClusterGateway::ensure_secret`] created or replaced the secret
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SecretOutcome {
    Created,
    Updated,
}

impl fmt::Display for SecretOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretOutcome::Created => write!(f, "created"),
            SecretOutcome::Updated => write!(f, "updated"),
        }
    }
}

pub struct ClusterGateway<A> {
    api: A,
    retry: RetryConfig,
}

impl<A: ClusterApi> ClusterGateway<A> {
    pub fn new(api: A, retry: RetryConfig) -> Self {
        Self { api, retry }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub async fn namespace_exists(&self, name: &str) -> bool {
        match self.api.get_namespace(name).await {
            Ok(_) => true,
            Err(e) => {
                debug!(namespace = %name, error = %e, "Namespace lookup failed");
                false
            }
        }
    }

    /// Create the namespace unless it already exists
    pub async fn ensure_namespace(&self, name: &str) -> Result<()> {
        if self.namespace_exists(name).await {
            info!("Namespace {} exists", name);
            return Ok(());
        }

        let namespace = generate_namespace(name);
        with_retry(&self.retry, || self.api.create_namespace(&namespace)).await?;
        info!("Namespace {} created", name);
        Ok(())
    }

    async fn secret_exists(&self, namespace: &str, name: &str) -> bool {
        self.api.get_secret(namespace, name).await.is_ok()
    }

    /// Create the secret, or replace its data if it already exists
    pub async fn ensure_secret(
        &self,
        namespace: &str,
        name: &str,
        string_data: BTreeMap<String, String>,
    ) -> Result<SecretOutcome> {
        let secret = generate_job_secret(namespace, name, string_data);

        let outcome = if self.secret_exists(namespace, name).await {
            with_retry(&self.retry, || {
                self.api.replace_secret(namespace, name, &secret)
            })
            .await?;
            SecretOutcome::Updated
        } else {
            with_retry(&self.retry, || self.api.create_secret(namespace, &secret)).await?;
            SecretOutcome::Created
        };

        info!("Secret {} {}", name, outcome);
        Ok(outcome)
    }

    pub async fn job_exists(&self, namespace: &str, name: &str) -> bool {
        self.api.get_job(namespace, name).await.is_ok()
    }

    /// Create the job, deleting a previous job of the same name first.
    ///
    /// A Job's pod template is immutable, so an existing job cannot be updated
    /// in place. The delete and the create are not atomic.
    pub async fn submit_job(&self, namespace: &str, name: &str, command: &str) -> Result<()> {
        let job = generate_job(namespace, name, command);

        if self.job_exists(namespace, name).await {
            with_retry(&self.retry, || self.api.delete_job(namespace, name)).await?;
            info!("Job {} deleted", name);
        }

        with_retry(&self.retry, || self.api.create_job(namespace, &job)).await?;
        info!("Job {} created", name);
        Ok(())
    }

    pub async fn read_job_status(&self, namespace: &str, name: &str) -> Result<JobStatusSnapshot> {
        with_retry(&self.retry, || self.api.get_job_status(namespace, name)).await
    }

    pub async fn list_pods_for_job(&self, namespace: &str, name: &str) -> Result<Vec<JobPod>> {
        with_retry(&self.retry, || self.api.list_job_pods(namespace, name)).await
    }

    pub async fn list_events_for_pod(
        &self,
        namespace: &str,
        pod_name: &str,
        pod_uid: &str,
    ) -> Result<Vec<PodEvent>> {
        with_retry(&self.retry, || {
            self.api.list_pod_events(namespace, pod_name, pod_uid)
        })
        .await
    }

    pub async fn read_pod_log(
        &self,
        namespace: &str,
        pod_name: &str,
        container: &str,
    ) -> Result<String> {
        with_retry(&self.retry, || {
            self.api.read_pod_log(namespace, pod_name, container)
        })
        .await
    }
}
