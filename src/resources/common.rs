//! Common utilities for Kubernetes resource generation
//!
//! Naming and label conventions shared by every resource this crate creates,
//! kept in one place so the Namespace, Secret, Job and pod lookups agree.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

/// Prefix of every generated job name
pub const JOB_NAME_PREFIX: &str = "gha-review-service";

/// Label linking Secrets and Pods to the Job they belong to.
///
/// The Job controller sets this label on the pods it creates, so the same key
/// is used when selecting pods for diagnosis.
pub const JOB_NAME_LABEL: &str = "job-name";

/// Name of the container that runs psql inside the Job
pub const CONTAINER_NAME: &str = "psql";

/// Image used for the psql container
pub const POSTGRES_IMAGE: &str = "postgres:11-alpine";

/// Job names above this length are shortened. Kubernetes appends a random
/// suffix to pod names, so the job name must leave room for it.
const MAX_JOB_NAME_LEN: usize = 52;

/// Characters kept from the full name when it has to be shortened
const TRUNCATED_LEN: usize = 40;

/// Hex characters of the SHA-256 digest appended to a shortened name
const HASH_LEN: usize = 8;

/// Derive the Job name for an action on a target database.
///
/// Short names are returned as `gha-review-service-<action>-<target>`. Longer
/// ones keep the first 40 characters and append the first 8 hex characters of
/// the SHA-256 of the full name, so two targets sharing a long prefix still get
/// distinct jobs.
pub fn job_name(action: &str, target: &str) -> String {
    let full = format!("{}-{}-{}", JOB_NAME_PREFIX, action, target);
    if full.chars().count() <= MAX_JOB_NAME_LEN {
        return full;
    }

    let digest = hex::encode(Sha256::digest(full.as_bytes()));
    let truncated: String = full.chars().take(TRUNCATED_LEN).collect();
    format!("{}-{}", truncated, &digest[..HASH_LEN])
}

/// Labels for the review Namespace
///
/// `app: kubed` lets kubed sync the image pull secret into the namespace.
pub fn namespace_labels() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("environment".to_string(), "review".to_string()),
        ("app".to_string(), "kubed".to_string()),
    ])
}

/// Labels for resources owned by a single Job
pub fn job_labels(job_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(JOB_NAME_LABEL.to_string(), job_name.to_string())])
}

/// Label selector matching the pods of a Job
pub fn job_selector(job_name: &str) -> String {
    format!("{}={}", JOB_NAME_LABEL, job_name)
}

/// Field selector matching the events of a single pod
pub fn pod_event_selector(pod_name: &str, pod_uid: &str) -> String {
    format!(
        "involvedObject.name={},involvedObject.uid={}",
        pod_name, pod_uid
    )
}
