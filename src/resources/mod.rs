pub mod common;
pub mod job;
pub mod namespace;
pub mod secret;
pub mod sql;

pub use common::{
    CONTAINER_NAME, JOB_NAME_LABEL, JOB_NAME_PREFIX, POSTGRES_IMAGE, job_labels, job_name,
    job_selector, namespace_labels, pod_event_selector,
};
