//! Error types for the review database job

use std::time::Duration;

use thiserror::Error;

/// Error variants are named with the `Error` suffix where they wrap another
/// error (e.g., `KubeError`), matching the rest of the crate.
#[allow(clippy::enum_variant_names)]
#[derive(Error, Debug)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Kubeconfig error: {0}")]
    KubeconfigError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Given action {0} not supported. Supported ones are create and remove.")]
    UnsupportedAction(String),

    #[error("Job {name} failed")]
    JobFailed { name: String },

    #[error("Job {name} did not finish within {}s", timeout.as_secs())]
    JobTimedOut { name: String, timeout: Duration },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
