//! Tally Kernel server binary.

use secrecy::ExposeSecret;
use std::sync::Arc;
use tally_kernel::directory::SqlDirectory;
use tally_kernel::infrastructure::{
    audit, config::Settings, server, telemetry::TelemetryBuilder,
};
use tally_kernel::state::AppState;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Settings::new()?;

    let telemetry = TelemetryBuilder::from_settings(&config.telemetry, env!("CARGO_PKG_VERSION"))
        .with_metrics()
        .init()?;

    info!("Tally Kernel Starting...");
    audit::log_audit(&audit::AuditEvent::SystemStartup {
        component: "Kernel".into(),
    });

    let directory = match SqlDirectory::connect(
        config.database.url.expose_secret(),
        config.database.max_connections,
    )
    .await
    {
        Ok(directory) => directory,
        Err(e) => {
            error!("Failed to open directory database: {:?}", e);
            std::process::exit(1);
        }
    };

    let state = AppState::from_settings(&config, Arc::new(directory))?;

    info!("Tally Kernel Initialized. Waiting for shutdown signal...");
    if let Err(e) = server::run_server(&config, state, telemetry.metrics, shutdown_signal()).await
    {
        error!("HTTP server failed: {:?}", e);
    }

    info!("Shutdown signal received, cleaning up...");
    audit::log_audit(&audit::AuditEvent::SystemShutdown {
        reason: "Signal received".into(),
    });

    info!("Tally Kernel Shutdown Complete.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
