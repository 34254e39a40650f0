//! AdmissionReview boundary for the update webhook
//!
//! Routes the single validation endpoint and carries the state the handler
//! needs. Envelope decoding and verdict mapping live in the handler; the
//! decision itself lives in [`crate::diff`]. The router is constructed
//! explicitly with its state injected - no process-wide handler registry.

pub mod validate;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

/// Shared state for webhook handlers
#[derive(Clone)]
pub struct WebhookState {
    /// Resource kind this webhook gates; other kinds pass through untouched
    pub target_kind: String,
}

impl WebhookState {
    /// Create state gating the given resource kind
    pub fn new(target_kind: impl Into<String>) -> Self {
        Self {
            target_kind: target_kind.into(),
        }
    }
}

impl Default for WebhookState {
    fn default() -> Self {
        Self::new(crate::TARGET_KIND)
    }
}

/// Build the webhook router with the validation and health endpoints
pub fn webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/validate", post(validate::validate_handler))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
}
