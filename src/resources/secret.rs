use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Secret;
use kube::core::ObjectMeta;
use secrecy::ExposeSecret;

use crate::config::DatabaseConfig;
use crate::resources::common::job_labels;

/// libpq environment variables for the psql container.
///
/// `PGDATABASE` is the database psql connects to, not the one being created or
/// dropped: a database cannot be dropped while connected to it.
pub fn connection_env(database: &DatabaseConfig) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("PGHOST".to_string(), database.host.clone()),
        ("PGPORT".to_string(), database.port.to_string()),
        ("PGUSER".to_string(), database.user.clone()),
        (
            "PGPASSWORD".to_string(),
            database.password.expose_secret().to_string(),
        ),
        ("PGDATABASE".to_string(), database.default_database.clone()),
    ])
}

/// Generate the credentials Secret consumed by the Job through `envFrom`
pub fn generate_job_secret(
    namespace: &str,
    job_name: &str,
    string_data: BTreeMap<String, String>,
) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(job_name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(job_labels(job_name)),
            ..Default::default()
        },
        type_: Some("Opaque".to_string()),
        string_data: Some(string_data),
        ..Default::default()
    }
}
