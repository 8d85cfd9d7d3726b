use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use review_db_job::{Cli, Config, run};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    if let Err(e) = init() {
        eprintln!("Failed to initialize: {}", e);
        return ExitCode::FAILURE;
    }

    let cli = Cli::parse();
    let result = match Config::try_from(cli) {
        Ok(config) => run(config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            // Workflow command so the failure is annotated on the run
            println!("::error::{}", e);
            ExitCode::FAILURE
        }
    }
}

fn init() -> Result<(), Box<dyn std::error::Error>> {
    // Install the TLS crypto provider before any TLS operations
    if rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_err()
        && rustls::crypto::CryptoProvider::get_default().is_none()
    {
        return Err("Failed to install rustls crypto provider and no provider is available".into());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("review_db_job=info".parse()?)
                .add_directive("kube=warn".parse()?),
        )
        .init();

    Ok(())
}
