//! Drift Gate - validating admission webhook for Application updates

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use drift_gate::server::{run_server, RunConfig};
use drift_gate::webhook::WebhookState;
use drift_gate::{
    DEFAULT_TLS_CERT_PATH, DEFAULT_TLS_KEY_PATH, DEFAULT_WEBHOOK_PORT, TARGET_KIND,
};

/// Validating webhook that suppresses no-op Application reconcile updates
#[derive(Parser, Debug)]
#[command(name = "drift-gate", version, about, long_about = None)]
struct Cli {
    /// Webhook server port
    #[arg(long, default_value_t = DEFAULT_WEBHOOK_PORT)]
    port: u16,

    /// Log level when RUST_LOG is not set (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Path to the PEM-encoded serving certificate
    #[arg(long, default_value = DEFAULT_TLS_CERT_PATH)]
    tls_cert: PathBuf,

    /// Path to the PEM-encoded private key
    #[arg(long, default_value = DEFAULT_TLS_KEY_PATH)]
    tls_key: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install crypto provider before any TLS use. The webhook cannot serve
    // HTTPS without one, so failure here ends the process.
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        eprintln!("CRITICAL: failed to install rustls crypto provider: {:?}", e);
        std::process::exit(1);
    }

    let cli = Cli::parse();

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&cli.log_level)
            .map_err(|e| anyhow::anyhow!("invalid log level {:?}: {}", cli.log_level, e))?,
    };
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = RunConfig {
        addr: SocketAddr::from(([0, 0, 0, 0], cli.port)),
        cert_path: cli.tls_cert,
        key_path: cli.tls_key,
    };
    let state = Arc::new(WebhookState::new(TARGET_KIND));

    tracing::info!(port = cli.port, kind = TARGET_KIND, "Starting webhook server");
    run_server(config, state)
        .await
        .map_err(|e| anyhow::anyhow!("webhook server failed: {}", e))?;

    Ok(())
}
