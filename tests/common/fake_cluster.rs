//! In-memory cluster implementing `ClusterApi`
//!
//! Stores namespaces, secrets and jobs, replays a scripted sequence of job
//! statuses, and records every call so tests can assert on ordering.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{Namespace, Secret};
use review_db_job::controller::{ClusterApi, JobPod, JobStatusSnapshot, PodEvent};
use review_db_job::{Error, Result};

type Key = (String, String);

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

/// Build a Kubernetes API error response
pub fn api_error(code: u16, reason: &str) -> Error {
    Error::KubeError(kube::Error::Api(kube::error::ErrorResponse {
        status: "Failure".to_string(),
        message: format!("{} (injected)", reason),
        reason: reason.to_string(),
        code,
    }))
}

fn not_found(kind: &str, name: &str) -> Error {
    api_error(404, &format!("{} {} not found", kind, name))
}

#[derive(Default)]
struct State {
    namespaces: BTreeMap<String, Namespace>,
    secrets: BTreeMap<Key, Secret>,
    jobs: BTreeMap<Key, Job>,
    statuses: VecDeque<JobStatusSnapshot>,
    pods: Vec<JobPod>,
    events: BTreeMap<String, Vec<PodEvent>>,
    logs: BTreeMap<String, String>,
    failures: BTreeMap<&'static str, u32>,
    calls: Vec<String>,
}

#[derive(Default)]
pub struct FakeCluster {
    state: Mutex<State>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    /// Record a call and fail it if failures were injected for `op`
    fn call(&self, op: &'static str, target: &str) -> Result<()> {
        self.with_state(|s| {
            s.calls.push(format!("{} {}", op, target));
            match s.failures.get_mut(op) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    Err(api_error(503, "ServiceUnavailable"))
                }
                _ => Ok(()),
            }
        })
    }

    /// Statuses returned by successive status reads; the last one repeats
    pub fn script_statuses(&self, statuses: &[(i32, i32)]) {
        self.with_state(|s| {
            s.statuses = statuses
                .iter()
                .map(|&(succeeded, failed)| JobStatusSnapshot::new(succeeded, failed))
                .collect();
        });
    }

    /// Make the next `times` calls of `op` fail with a 503
    pub fn fail(&self, op: &'static str, times: u32) {
        self.with_state(|s| {
            s.failures.insert(op, times);
        });
    }

    pub fn insert_namespace(&self, name: &str) {
        self.with_state(|s| {
            s.namespaces.insert(name.to_string(), Namespace::default());
        });
    }

    pub fn insert_job(&self, namespace: &str, name: &str) {
        self.with_state(|s| {
            s.jobs.insert(key(namespace, name), Job::default());
        });
    }

    pub fn add_pod(&self, pod: JobPod) {
        self.with_state(|s| s.pods.push(pod));
    }

    pub fn set_events(&self, pod_name: &str, events: Vec<PodEvent>) {
        self.with_state(|s| {
            s.events.insert(pod_name.to_string(), events);
        });
    }

    pub fn set_log(&self, pod_name: &str, log: &str) {
        self.with_state(|s| {
            s.logs.insert(pod_name.to_string(), log.to_string());
        });
    }

    pub fn namespace(&self, name: &str) -> Option<Namespace> {
        self.with_state(|s| s.namespaces.get(name).cloned())
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        self.with_state(|s| s.secrets.get(&key(namespace, name)).cloned())
    }

    pub fn secret_count(&self) -> usize {
        self.with_state(|s| s.secrets.len())
    }

    pub fn job(&self, namespace: &str, name: &str) -> Option<Job> {
        self.with_state(|s| s.jobs.get(&key(namespace, name)).cloned())
    }

    /// Every call made so far, as `"<op> <target>"`
    pub fn calls(&self) -> Vec<String> {
        self.with_state(|s| s.calls.clone())
    }

    /// Number of calls of `op`
    pub fn count(&self, op: &str) -> usize {
        self.with_state(|s| {
            s.calls
                .iter()
                .filter(|c| c.split(' ').next() == Some(op))
                .count()
        })
    }
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn get_namespace(&self, name: &str) -> Result<Namespace> {
        self.call("get_namespace", name)?;
        self.namespace(name)
            .ok_or_else(|| not_found("namespace", name))
    }

    async fn create_namespace(&self, namespace: &Namespace) -> Result<()> {
        let name = namespace.metadata.name.clone().unwrap_or_default();
        self.call("create_namespace", &name)?;
        self.with_state(|s| {
            if s.namespaces.contains_key(&name) {
                return Err(api_error(409, "AlreadyExists"));
            }
            s.namespaces.insert(name, namespace.clone());
            Ok(())
        })
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret> {
        self.call("get_secret", name)?;
        self.secret(namespace, name)
            .ok_or_else(|| not_found("secret", name))
    }

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<()> {
        let name = secret.metadata.name.clone().unwrap_or_default();
        self.call("create_secret", &name)?;
        self.with_state(|s| {
            let k = key(namespace, &name);
            if s.secrets.contains_key(&k) {
                return Err(api_error(409, "AlreadyExists"));
            }
            s.secrets.insert(k, secret.clone());
            Ok(())
        })
    }

    async fn replace_secret(&self, namespace: &str, name: &str, secret: &Secret) -> Result<()> {
        self.call("replace_secret", name)?;
        self.with_state(|s| {
            let k = key(namespace, name);
            if !s.secrets.contains_key(&k) {
                return Err(not_found("secret", name));
            }
            s.secrets.insert(k, secret.clone());
            Ok(())
        })
    }

    async fn get_job(&self, namespace: &str, name: &str) -> Result<Job> {
        self.call("get_job", name)?;
        self.job(namespace, name).ok_or_else(|| not_found("job", name))
    }

    async fn create_job(&self, namespace: &str, job: &Job) -> Result<()> {
        let name = job.metadata.name.clone().unwrap_or_default();
        self.call("create_job", &name)?;
        self.with_state(|s| {
            let k = key(namespace, &name);
            if s.jobs.contains_key(&k) {
                return Err(api_error(409, "AlreadyExists"));
            }
            s.jobs.insert(k, job.clone());
            Ok(())
        })
    }

    async fn delete_job(&self, namespace: &str, name: &str) -> Result<()> {
        self.call("delete_job", name)?;
        self.with_state(|s| {
            s.jobs
                .remove(&key(namespace, name))
                .map(|_| ())
                .ok_or_else(|| not_found("job", name))
        })
    }

    async fn get_job_status(&self, namespace: &str, name: &str) -> Result<JobStatusSnapshot> {
        self.call("get_job_status", name)?;
        self.with_state(|s| {
            if !s.jobs.contains_key(&key(namespace, name)) {
                return Err(not_found("job", name));
            }
            let status = if s.statuses.len() > 1 {
                s.statuses.pop_front()
            } else {
                s.statuses.front().copied()
            };
            Ok(status.unwrap_or_default())
        })
    }

    async fn list_job_pods(&self, _namespace: &str, job_name: &str) -> Result<Vec<JobPod>> {
        self.call("list_job_pods", job_name)?;
        Ok(self.with_state(|s| s.pods.clone()))
    }

    async fn list_pod_events(
        &self,
        _namespace: &str,
        pod_name: &str,
        _pod_uid: &str,
    ) -> Result<Vec<PodEvent>> {
        self.call("list_pod_events", pod_name)?;
        Ok(self.with_state(|s| s.events.get(pod_name).cloned().unwrap_or_default()))
    }

    async fn read_pod_log(
        &self,
        _namespace: &str,
        pod_name: &str,
        container: &str,
    ) -> Result<String> {
        self.call("read_pod_log", &format!("{}/{}", pod_name, container))?;
        self.with_state(|s| s.logs.get(pod_name).cloned())
            .ok_or_else(|| not_found("pod", pod_name))
    }
}
