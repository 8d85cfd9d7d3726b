//! Job resource generation
//!
//! The Job runs exactly once: one completion, no parallelism and no pod
//! retries, so a failed psql run surfaces as a failed Job instead of being
//! retried by the Job controller.

use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{
    Container, EnvFromSource, PodSpec, PodTemplateSpec, SecretEnvSource,
};
use kube::core::ObjectMeta;

use crate::resources::common::{CONTAINER_NAME, POSTGRES_IMAGE};

/// Generate the psql Job.
///
/// The container environment comes entirely from the Secret of the same name.
pub fn generate_job(namespace: &str, job_name: &str, command: &str) -> Job {
    Job {
        metadata: ObjectMeta {
            name: Some(job_name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: Some(JobSpec {
            backoff_limit: Some(0),
            completions: Some(1),
            parallelism: Some(1),
            template: PodTemplateSpec {
                metadata: None,
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: CONTAINER_NAME.to_string(),
                        image: Some(POSTGRES_IMAGE.to_string()),
                        command: Some(vec!["/bin/sh".to_string(), "-c".to_string()]),
                        args: Some(vec![command.to_string()]),
                        env_from: Some(vec![EnvFromSource {
                            secret_ref: Some(SecretEnvSource {
                                name: job_name.to_string(),
                                ..Default::default()
                            }),
                            ..Default::default()
                        }]),
                        ..Default::default()
                    }],
                    restart_policy: Some("Never".to_string()),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}
