//! Drift Gate - validating admission webhook for Application updates
//!
//! The Kubernetes API server calls this webhook on every UPDATE of an
//! Application custom resource. The reconcile loop rewrites bookkeeping
//! fields (`metadata.managedFields`, `metadata.generation`,
//! `status.reconciledAt`) on every pass, so a naive controller re-triggers
//! itself forever. Drift Gate strips those fields from both object
//! snapshots, diffs what remains, and:
//!
//! - denies updates where nothing real changed (a no-op short-circuit the
//!   controller treats as "skip redundant work", not a rejection), and
//! - allows genuine changes, logging every differing field for audit.
//!
//! # Modules
//!
//! - [`snapshot`] - Snapshot extraction and bookkeeping-field normalization
//! - [`diff`] - Section diffing and the allow/deny decision
//! - [`webhook`] - AdmissionReview HTTP boundary
//! - [`server`] - HTTPS server lifecycle
//! - [`error`] - Error types for the webhook

#![deny(missing_docs)]

pub mod diff;
pub mod error;
pub mod server;
pub mod snapshot;
pub mod webhook;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Default port for the webhook HTTPS server
///
/// Port 8443 is used instead of 443 to avoid requiring root privileges.
pub const DEFAULT_WEBHOOK_PORT: u16 = 8443;

/// Resource kind this webhook gates; requests for any other kind pass
/// through untouched
pub const TARGET_KIND: &str = "Application";

/// Default path to the PEM serving certificate mounted into the container
pub const DEFAULT_TLS_CERT_PATH: &str = "/certs/tls.crt";

/// Default path to the PEM serving key mounted into the container
pub const DEFAULT_TLS_KEY_PATH: &str = "/certs/tls.key";
