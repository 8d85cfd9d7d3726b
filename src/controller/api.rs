//! Kubernetes API access
//!
//! [`ClusterApi`] is the narrow set of single API calls the gateway is built
//! from. [`KubeApi`] implements it on top of `kube::Api`; tests substitute an
//! in-memory cluster.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{Event, Namespace, Pod, Secret};
use kube::Client;
use kube::api::{Api, DeleteParams, ListParams, LogParams, PostParams};

use crate::controller::error::Result;
use crate::resources::common::{job_selector, pod_event_selector};

/// Replica counts of a Job at the time it was read
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JobStatusSnapshot {
    pub succeeded: i32,
    pub failed: i32,
}

impl JobStatusSnapshot {
    pub fn new(succeeded: i32, failed: i32) -> Self {
        Self { succeeded, failed }
    }

    pub fn from_job(job: &Job) -> Self {
        job.status
            .as_ref()
            .map(|s| Self {
                succeeded: s.succeeded.unwrap_or(0),
                failed: s.failed.unwrap_or(0),
            })
            .unwrap_or_default()
    }

    /// A pod of the job ran to completion, successfully or not
    pub fn is_terminal(&self) -> bool {
        self.succeeded + self.failed > 0
    }

    pub fn is_succeeded(&self) -> bool {
        self.succeeded > 0
    }

    pub fn is_failed(&self) -> bool {
        self.failed > 0
    }
}

/// The fields of a Job's pod needed for diagnosis
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JobPod {
    pub name: Option<String>,
    pub uid: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
}

impl From<Pod> for JobPod {
    fn from(pod: Pod) -> Self {
        Self {
            start_time: pod
                .status
                .as_ref()
                .and_then(|s| s.start_time.as_ref())
                .map(|t| t.0),
            name: pod.metadata.name,
            uid: pod.metadata.uid,
        }
    }
}

/// A single event recorded against a pod
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PodEvent {
    pub reason: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub message: Option<String>,
}

impl From<Event> for PodEvent {
    fn from(event: Event) -> Self {
        // Events from newer reporters only carry eventTime
        let timestamp = event
            .first_timestamp
            .map(|t| t.0)
            .or_else(|| event.event_time.map(|t| t.0));
        Self {
            reason: event.reason,
            timestamp,
            message: event.message,
        }
    }
}

/// Single Kubernetes API calls used by the gateway
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn get_namespace(&self, name: &str) -> Result<Namespace>;

    async fn create_namespace(&self, namespace: &Namespace) -> Result<()>;

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret>;

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<()>;

    async fn replace_secret(&self, namespace: &str, name: &str, secret: &Secret) -> Result<()>;

    async fn get_job(&self, namespace: &str, name: &str) -> Result<Job>;

    async fn create_job(&self, namespace: &str, job: &Job) -> Result<()>;

    async fn delete_job(&self, namespace: &str, name: &str) -> Result<()>;

    async fn get_job_status(&self, namespace: &str, name: &str) -> Result<JobStatusSnapshot>;

    async fn list_job_pods(&self, namespace: &str, job_name: &str) -> Result<Vec<JobPod>>;

    async fn list_pod_events(
        &self,
        namespace: &str,
        pod_name: &str,
        pod_uid: &str,
    ) -> Result<Vec<PodEvent>>;

    async fn read_pod_log(&self, namespace: &str, pod_name: &str, container: &str)
    -> Result<String>;
}

/// [`ClusterApi`] backed by a Kubernetes client
#[derive(Clone)]
pub struct KubeApi {
    client: Client,
}

impl KubeApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn namespaced<K>(&self, namespace: &str) -> Api<K>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        <K as kube::Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ClusterApi for KubeApi {
    async fn get_namespace(&self, name: &str) -> Result<Namespace> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        Ok(api.get(name).await?)
    }

    async fn create_namespace(&self, namespace: &Namespace) -> Result<()> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        api.create(&PostParams::default(), namespace).await?;
        Ok(())
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret> {
        let api: Api<Secret> = self.namespaced(namespace);
        Ok(api.get(name).await?)
    }

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<()> {
        let api: Api<Secret> = self.namespaced(namespace);
        api.create(&PostParams::default(), secret).await?;
        Ok(())
    }

    async fn replace_secret(&self, namespace: &str, name: &str, secret: &Secret) -> Result<()> {
        let api: Api<Secret> = self.namespaced(namespace);
        api.replace(name, &PostParams::default(), secret).await?;
        Ok(())
    }

    async fn get_job(&self, namespace: &str, name: &str) -> Result<Job> {
        let api: Api<Job> = self.namespaced(namespace);
        Ok(api.get(name).await?)
    }

    async fn create_job(&self, namespace: &str, job: &Job) -> Result<()> {
        let api: Api<Job> = self.namespaced(namespace);
        api.create(&PostParams::default(), job).await?;
        Ok(())
    }

    async fn delete_job(&self, namespace: &str, name: &str) -> Result<()> {
        let api: Api<Job> = self.namespaced(namespace);
        // Background propagation so the old pods go with the job
        api.delete(name, &DeleteParams::background()).await?;
        Ok(())
    }

    async fn get_job_status(&self, namespace: &str, name: &str) -> Result<JobStatusSnapshot> {
        let api: Api<Job> = self.namespaced(namespace);
        let job = api.get_status(name).await?;
        Ok(JobStatusSnapshot::from_job(&job))
    }

    async fn list_job_pods(&self, namespace: &str, job_name: &str) -> Result<Vec<JobPod>> {
        let api: Api<Pod> = self.namespaced(namespace);
        let pods = api
            .list(&ListParams::default().labels(&job_selector(job_name)))
            .await?;
        Ok(pods.items.into_iter().map(JobPod::from).collect())
    }

    async fn list_pod_events(
        &self,
        namespace: &str,
        pod_name: &str,
        pod_uid: &str,
    ) -> Result<Vec<PodEvent>> {
        let api: Api<Event> = self.namespaced(namespace);
        let events = api
            .list(&ListParams::default().fields(&pod_event_selector(pod_name, pod_uid)))
            .await?;
        Ok(events.items.into_iter().map(PodEvent::from).collect())
    }

    async fn read_pod_log(
        &self,
        namespace: &str,
        pod_name: &str,
        container: &str,
    ) -> Result<String> {
        let api: Api<Pod> = self.namespaced(namespace);
        let params = LogParams {
            container: Some(container.to_string()),
            ..Default::default()
        };
        Ok(api.logs(pod_name, &params).await?)
    }
}
