//! Error types for the webhook

use thiserror::Error;

/// Main error type for webhook startup and serving
///
/// Request-level failures never surface here; they are answered on the wire
/// by the handler. Everything in this enum is fatal to the process.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// TLS material could not be loaded or parsed
    #[error("TLS configuration error: {0}")]
    TlsConfig(String),

    /// The HTTPS listener failed to bind or serve
    #[error("server error: {0}")]
    Server(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a TLS configuration error with the given message
    pub fn tls_config(msg: impl Into<String>) -> Self {
        Self::TlsConfig(msg.into())
    }

    /// Create a server error with the given message
    pub fn server(msg: impl Into<String>) -> Self {
        Self::Server(msg.into())
    }
}
