pub mod config;
pub mod controller;
pub mod resources;

pub use config::{Action, ActionConfig, Cli, Config, DatabaseConfig, PollConfig};
pub use controller::{
    ClusterApi, ClusterGateway, DiagnosticRecord, Error, JobController, JobOutcome, JobPhase,
    JobRequest, JobStatusSnapshot, KubeApi, Result, RetryConfig, SecretOutcome,
};
pub use resources::job_name;

use kube::Client;
use kube::config::{KubeConfigOptions, Kubeconfig};
use secrecy::ExposeSecret;

/// Build a Kubernetes client.
///
/// Uses the kubeconfig document from the configuration when one was given,
/// otherwise the ambient kubeconfig or in-cluster service account.
pub async fn client_from_config(config: &Config) -> Result<Client> {
    let Some(ref document) = config.kubeconfig else {
        return Ok(Client::try_default().await?);
    };

    let kubeconfig = Kubeconfig::from_yaml(document.expose_secret())
        .map_err(|e| Error::KubeconfigError(e.to_string()))?;
    let client_config =
        kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|e| Error::KubeconfigError(e.to_string()))?;
    Ok(Client::try_from(client_config)?)
}

/// Run the database job described by `config` and wait for its result.
///
/// Resolves once the job has reached a terminal state, so the caller's exit
/// status reflects the job outcome.
pub async fn run(config: Config) -> Result<()> {
    let request = JobRequest::from_config(&config);
    tracing::info!(
        job = %request,
        action = %config.action.action,
        database = %config.database.name,
        "Running database job"
    );

    let client = client_from_config(&config).await?;
    let gateway = ClusterGateway::new(KubeApi::new(client), config.retry.clone());
    let mut controller = JobController::new(gateway, config.polling.clone());
    controller.run(&request).await
}
