use k8s_openapi::api::core::v1::Namespace;
use kube::core::ObjectMeta;

use crate::resources::common::namespace_labels;

/// Generate the review Namespace
pub fn generate_namespace(name: &str) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(namespace_labels()),
            ..Default::default()
        },
        ..Default::default()
    }
}
