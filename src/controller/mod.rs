pub mod api;
pub mod diagnosis;
pub mod error;
pub mod gateway;
pub mod job_controller;
pub mod retry;

pub use api::{ClusterApi, JobPod, JobStatusSnapshot, KubeApi, PodEvent};
pub use diagnosis::{DiagnosticRecord, diagnose, render_events_table, select_latest_pod};
pub use error::{Error, Result};
pub use gateway::{ClusterGateway, SecretOutcome};
pub use job_controller::{JobController, JobOutcome, JobPhase, JobRequest};
pub use retry::{RetryConfig, with_retry};
