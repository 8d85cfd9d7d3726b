//! Lifecycle of the single database Job of a run
//!
//! ```text
//! NotStarted -> Created -> Polling -> Succeeded | Failed | TimedOut
//!      \_________________________________/
//!        job already succeeded (entry guard)
//! ```
//!
//! The controller provisions the namespace, secret and job, polls the job
//! until it reaches a terminal state or the timeout passes, and on failure
//! prints the diagnostics of the job's latest pod before reporting the error.

use std::collections::BTreeMap;
use std::fmt;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{Config, PollConfig};
use crate::controller::api::ClusterApi;
use crate::controller::diagnosis::diagnose;
use crate::controller::error::{Error, Result};
use crate::controller::gateway::ClusterGateway;
use crate::resources::common::job_name;
use crate::resources::secret::connection_env;
use crate::resources::sql::job_command;

/// Phase of the job within a run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JobPhase {
    #[default]
    NotStarted,
    Created,
    Polling,
    Succeeded,
    Failed,
    TimedOut,
}

impl JobPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobPhase::Succeeded | JobPhase::Failed | JobPhase::TimedOut
        )
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobPhase::NotStarted => write!(f, "NotStarted"),
            JobPhase::Created => write!(f, "Created"),
            JobPhase::Polling => write!(f, "Polling"),
            JobPhase::Succeeded => write!(f, "Succeeded"),
            JobPhase::Failed => write!(f, "Failed"),
            JobPhase::TimedOut => write!(f, "TimedOut"),
        }
    }
}

/// Terminal result of a job
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed,
    TimedOut,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Succeeded)
    }
}

impl From<JobOutcome> for JobPhase {
    fn from(outcome: JobOutcome) -> Self {
        match outcome {
            JobOutcome::Succeeded => JobPhase::Succeeded,
            JobOutcome::Failed => JobPhase::Failed,
            JobOutcome::TimedOut => JobPhase::TimedOut,
        }
    }
}

/// Everything needed to create the job of a run
///
/// Not `Debug`: the secret data holds the database password.
#[derive(Clone)]
pub struct JobRequest {
    pub namespace: String,
    pub job_name: String,
    pub command: String,
    pub secret_data: BTreeMap<String, String>,
}

impl JobRequest {
    pub fn from_config(config: &Config) -> Self {
        let action = config.action.action;
        Self {
            namespace: config.action.namespace.clone(),
            job_name: job_name(action.as_str(), &config.database.name),
            command: job_command(action, &config.database.name),
            secret_data: connection_env(&config.database),
        }
    }
}

impl fmt::Display for JobRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.job_name)
    }
}

pub struct JobController<A> {
    gateway: ClusterGateway<A>,
    polling: PollConfig,
    phase: JobPhase,
}

impl<A: ClusterApi> JobController<A> {
    pub fn new(gateway: ClusterGateway<A>, polling: PollConfig) -> Self {
        Self {
            gateway,
            polling,
            phase: JobPhase::NotStarted,
        }
    }

    pub fn phase(&self) -> JobPhase {
        self.phase
    }

    pub fn gateway(&self) -> &ClusterGateway<A> {
        &self.gateway
    }

    fn transition(&mut self, to: JobPhase) {
        debug!(from = %self.phase, to = %to, "Job phase transition");
        self.phase = to;
    }

    /// Run the job to completion and report the result.
    ///
    /// Returns `Ok(())` only if the job succeeded. A failed or timed out job is
    /// diagnosed first and then returned as [`Error::JobFailed`] or
    /// [`Error::JobTimedOut`].
    pub async fn run(&mut self, request: &JobRequest) -> Result<()> {
        let outcome = self.execute(request).await?;
        self.report(request, outcome).await
    }

    /// Provision the job unless it already succeeded, then wait for it
    pub async fn execute(&mut self, request: &JobRequest) -> Result<JobOutcome> {
        let namespace = request.namespace.as_str();
        let name = request.job_name.as_str();

        if self.already_succeeded(namespace, name).await? {
            info!(job = %request, "Job already succeeded, not resubmitting");
            self.transition(JobPhase::Succeeded);
            return Ok(JobOutcome::Succeeded);
        }

        self.gateway.ensure_namespace(namespace).await?;
        self.gateway
            .ensure_secret(namespace, name, request.secret_data.clone())
            .await?;
        self.gateway
            .submit_job(namespace, name, &request.command)
            .await?;
        self.transition(JobPhase::Created);

        self.poll(namespace, name).await
    }

    async fn already_succeeded(&self, namespace: &str, name: &str) -> Result<bool> {
        if !self.gateway.job_exists(namespace, name).await {
            return Ok(false);
        }
        let status = self.gateway.read_job_status(namespace, name).await?;
        Ok(status.is_succeeded())
    }

    /// Poll the job status until it succeeds, fails or the timeout passes.
    ///
    /// The first read happens one interval after the call. The loop always
    /// ends once the timeout has elapsed.
    pub async fn poll(&mut self, namespace: &str, name: &str) -> Result<JobOutcome> {
        self.transition(JobPhase::Polling);
        let started = Instant::now();

        let outcome = loop {
            tokio::time::sleep(self.polling.interval).await;

            let status = self.gateway.read_job_status(namespace, name).await?;
            debug!(
                job = %name,
                succeeded = status.succeeded,
                failed = status.failed,
                elapsed_secs = started.elapsed().as_secs(),
                "Polled job status"
            );

            if status.is_succeeded() {
                break JobOutcome::Succeeded;
            }
            if status.is_failed() {
                break JobOutcome::Failed;
            }
            if started.elapsed() >= self.polling.timeout {
                warn!(
                    job = %name,
                    timeout_secs = self.polling.timeout.as_secs(),
                    "Job did not finish in time"
                );
                break JobOutcome::TimedOut;
            }
        };

        self.transition(outcome.into());
        Ok(outcome)
    }

    /// Log success, or print diagnostics and turn the outcome into an error
    pub async fn report(&self, request: &JobRequest, outcome: JobOutcome) -> Result<()> {
        let name = &request.job_name;
        if outcome.is_success() {
            info!("Job {} succeeded", name);
            return Ok(());
        }

        if let Some(record) = diagnose(&self.gateway, &request.namespace, name).await {
            info!("{}", record);
        }

        match outcome {
            JobOutcome::TimedOut => Err(Error::JobTimedOut {
                name: name.clone(),
                timeout: self.polling.timeout,
            }),
            _ => Err(Error::JobFailed { name: name.clone() }),
        }
    }
}
