//! Run configuration
//!
//! Every input is a command-line flag that falls back to the environment
//! variable GitHub Actions sets for an action input (`INPUT_<NAME>`). The
//! parsed [`Cli`] is converted once into a [`Config`] which is passed by
//! reference to everything that needs it.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use secrecy::SecretString;

use crate::controller::error::{Error, Result};
use crate::controller::retry::RetryConfig;

/// Action performed on the target database
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Create,
    Remove,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Remove => "remove",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "create" => Ok(Action::Create),
            "remove" => Ok(Action::Remove),
            _ => Err(Error::UnsupportedAction(s.to_string())),
        }
    }
}

/// Where the job runs and what it does
#[derive(Clone, Debug)]
pub struct ActionConfig {
    pub namespace: String,
    pub action: Action,
}

/// Connection parameters for the database server
#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: SecretString,
    /// Database created or dropped by the job
    pub name: String,
    /// Database psql connects to while running the DDL
    pub default_database: String,
}

/// Job polling policy
#[derive(Clone, Debug)]
pub struct PollConfig {
    /// Delay between two job status reads
    pub interval: Duration,
    /// Give up once the job has been polled for this long
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(300), // 5 minutes
        }
    }
}

/// Fully resolved configuration for a single run
#[derive(Clone, Debug)]
pub struct Config {
    /// Kubeconfig document; `None` uses the ambient kubeconfig or in-cluster config
    pub kubeconfig: Option<SecretString>,
    pub action: ActionConfig,
    pub database: DatabaseConfig,
    pub polling: PollConfig,
    pub retry: RetryConfig,
}

/// Command-line interface
#[derive(Parser, Debug)]
#[command(name = "review-db-job")]
#[command(version)]
#[command(about = "Create or drop a review database through a Kubernetes Job", long_about = None)]
pub struct Cli {
    /// Kubeconfig document (not a path)
    #[arg(long, env = "INPUT_KUBECONFIG", default_value = "", hide_env_values = true)]
    pub kubeconfig: String,

    /// Namespace the job runs in
    #[arg(long, env = "INPUT_NAMESPACE")]
    pub namespace: String,

    /// `create` or `remove` (case-insensitive)
    #[arg(long, env = "INPUT_ACTION")]
    pub action: String,

    /// Database user
    #[arg(long = "db-user", env = "INPUT_DB_USER")]
    pub db_user: String,

    /// Database password
    #[arg(long = "db-password", env = "INPUT_DB_PASSWORD", hide_env_values = true)]
    pub db_password: String,

    /// Database port
    #[arg(long = "db-port", env = "INPUT_DB_PORT", default_value = "5432")]
    pub db_port: String,

    /// Database host
    #[arg(long = "db-host", env = "INPUT_DB_HOST")]
    pub db_host: String,

    /// Database to create or drop
    #[arg(long, env = "INPUT_DATABASE")]
    pub database: String,

    /// Database to connect to while running the DDL
    #[arg(
        long = "default-database-name",
        env = "INPUT_DEFAULT_DATABASE_NAME",
        default_value = "postgres"
    )]
    pub default_database_name: String,

    /// Seconds between job status reads
    #[arg(long = "poll-interval-secs", env = "INPUT_POLL_INTERVAL_SECS", default_value_t = 10)]
    pub poll_interval_secs: u64,

    /// Seconds to wait for the job before failing
    #[arg(long = "timeout-secs", env = "INPUT_TIMEOUT_SECS", default_value_t = 300)]
    pub timeout_secs: u64,
}

impl TryFrom<Cli> for Config {
    type Error = Error;

    fn try_from(cli: Cli) -> Result<Self> {
        let action: Action = cli.action.parse()?;

        let namespace = cli.namespace.trim().to_string();
        if namespace.is_empty() {
            return Err(Error::InvalidConfig("namespace must not be empty".to_string()));
        }

        let name = cli.database.trim().to_string();
        if name.is_empty() {
            return Err(Error::InvalidConfig("database must not be empty".to_string()));
        }

        let port = cli.db_port.trim().parse::<u16>().map_err(|_| {
            Error::InvalidConfig(format!("db_port '{}' is not a valid port", cli.db_port))
        })?;

        if cli.poll_interval_secs == 0 {
            return Err(Error::InvalidConfig(
                "poll interval must be at least one second".to_string(),
            ));
        }

        let kubeconfig = if cli.kubeconfig.trim().is_empty() {
            None
        } else {
            Some(SecretString::from(cli.kubeconfig))
        };

        Ok(Config {
            kubeconfig,
            action: ActionConfig { namespace, action },
            database: DatabaseConfig {
                host: cli.db_host,
                port,
                user: cli.db_user,
                password: SecretString::from(cli.db_password),
                name,
                default_database: cli.default_database_name,
            },
            polling: PollConfig {
                interval: Duration::from_secs(cli.poll_interval_secs),
                timeout: Duration::from_secs(cli.timeout_secs),
            },
            retry: RetryConfig::default(),
        })
    }
}
