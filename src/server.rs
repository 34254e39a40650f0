//! HTTPS server lifecycle for the webhook
//!
//! Serves the webhook router over TLS with the certificate and key loaded
//! once at startup from PEM files, and drains in-flight requests for a
//! bounded grace period on SIGINT/SIGTERM before releasing the socket.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use tracing::{error, info};

use crate::error::Error;
use crate::webhook::{webhook_router, WebhookState};

/// How long in-flight requests may keep running after a shutdown signal
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Server configuration
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Address to bind the HTTPS listener
    pub addr: SocketAddr,
    /// Path to the PEM-encoded serving certificate
    pub cert_path: PathBuf,
    /// Path to the PEM-encoded private key
    pub key_path: PathBuf,
}

/// Run the webhook HTTPS server until a shutdown signal arrives
///
/// Failure to load the TLS material or to serve on the configured address
/// is fatal; request-level failures are answered on the wire and never
/// surface here.
pub async fn run_server(config: RunConfig, state: Arc<WebhookState>) -> crate::Result<()> {
    let app = webhook_router(state);

    let tls_config = RustlsConfig::from_pem_file(&config.cert_path, &config.key_path)
        .await
        .map_err(|e| {
            Error::tls_config(format!(
                "failed to load {} / {}: {}",
                config.cert_path.display(),
                config.key_path.display(),
                e
            ))
        })?;

    let handle = Handle::new();
    tokio::spawn(shutdown_on_signal(handle.clone()));

    info!(addr = %config.addr, "Starting webhook HTTPS server");

    axum_server::bind_rustls(config.addr, tls_config)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .map_err(|e| Error::server(e.to_string()))?;

    info!("Webhook server exited");
    Ok(())
}

/// Wait for SIGINT or SIGTERM, then start a bounded graceful drain
async fn shutdown_on_signal(handle: Handle) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!(grace = ?SHUTDOWN_GRACE, "Shutdown signal received, draining in-flight requests");
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}
