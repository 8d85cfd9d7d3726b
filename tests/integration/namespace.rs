//! Test namespace management for isolation

use k8s_openapi::api::core::v1::Namespace;
use kube::api::{DeleteParams, PropagationPolicy};
use kube::{Api, Client};
use uuid::Uuid;

/// A unique namespace name that is deleted by [`TestNamespace::cleanup`]
///
/// The namespace itself is created by the code under test.
pub struct TestNamespace {
    pub name: String,
    client: Client,
}

impl TestNamespace {
    /// Generate a `{prefix}-{uuid8}` name so test runs do not collide
    pub fn new(client: Client, prefix: &str) -> Self {
        let suffix = &Uuid::new_v4().to_string()[..8];
        Self {
            name: format!("{}-{}", prefix, suffix),
            client,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn client(&self) -> Client {
        self.client.clone()
    }

    /// Delete the namespace and everything in it
    ///
    /// Does not wait for completion; Kubernetes garbage collects it eventually.
    pub async fn cleanup(&self) {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let dp = DeleteParams {
            propagation_policy: Some(PropagationPolicy::Background),
            ..Default::default()
        };
        if let Err(e) = namespaces.delete(&self.name, &dp).await {
            tracing::warn!("Failed to delete test namespace {}: {}", self.name, e);
        }
    }
}
