//! Dataspace participant provisioner - HTTP entry point

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dataspace_provisioner::config::{ProvisionConfig, SeedConfig, StatusConfig};
use dataspace_provisioner::kube_client::{create_client, KubeReader};
use dataspace_provisioner::provision::Provisioner;
use dataspace_provisioner::seed::Seeder;
use dataspace_provisioner::server::{api_router, AppState};
use dataspace_provisioner::status::StatusChecker;

/// Provisions dataspace participants onto Kubernetes and serves their
/// aggregated health status
#[derive(Parser, Debug)]
#[command(name = "dataspace-provisioner", version, about, long_about = None)]
struct Cli {
    /// Address to bind the HTTP API
    #[arg(long, default_value = "0.0.0.0:9999")]
    bind: SocketAddr,

    /// Path to a kubeconfig file; inferred (in-cluster or ~/.kube/config)
    /// when omitted
    #[arg(long, env = "KUBECONFIG")]
    kubeconfig: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let client = create_client(cli.kubeconfig.as_deref()).await?;

    let reader = Arc::new(KubeReader::new(client.clone()));
    let checker = Arc::new(StatusChecker::new(reader, StatusConfig::default()));
    let seeder = Arc::new(Seeder::new(SeedConfig::default()));
    let provisioner = Arc::new(Provisioner::new(
        client,
        seeder,
        ProvisionConfig::default(),
    ));

    let state = AppState {
        checker: Arc::clone(&checker),
        provisioner,
    };

    let listener = tokio::net::TcpListener::bind(cli.bind).await?;
    info!(addr = %cli.bind, "Starting provisioner API server");

    axum::serve(listener, api_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down");
    checker.close();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
    }
}
