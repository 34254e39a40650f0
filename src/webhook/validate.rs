//! Application update validation
//!
//! Handles AdmissionReview requests for Application updates: strips
//! reconcile bookkeeping from both object snapshots, diffs the rest, denies
//! no-ops with a success status and allows real changes, logging each
//! differing field.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
use kube::core::response::{Status, StatusSummary};
use kube::core::DynamicObject;
use tracing::{debug, error, info};

use crate::diff::{decide, FieldChange, ReasonCode};
use crate::snapshot::{normalize, object_snapshot};

use super::WebhookState;

/// Error type for webhook request processing
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// An object embedded in the admission request could not be converted
    /// into a snapshot
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        // Plain-text error body, no AdmissionReview envelope. Callers
        // already tolerate a non-JSON body on parse failures.
        let message = self.to_string();
        error!(error = %message, "Webhook request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
    }
}

/// Handle validating admission review for Application updates
///
/// Out-of-scope requests - non-UPDATE operations, other kinds, requests
/// missing either object - are accepted without comparison. In-scope
/// requests are allowed only when the normalized snapshots differ.
pub async fn validate_handler(
    State(state): State<Arc<WebhookState>>,
    Json(body): Json<AdmissionReview<DynamicObject>>,
) -> Result<Json<AdmissionReview<DynamicObject>>, WebhookError> {
    let req: AdmissionRequest<DynamicObject> = match body.try_into() {
        Ok(req) => req,
        Err(e) => {
            error!(error = %e, "Failed to parse admission request");
            return Ok(Json(AdmissionResponse::invalid(e.to_string()).into_review()));
        }
    };

    let response = validate_update(&state, &req)?;
    Ok(Json(response.into_review()))
}

/// Process a single update admission request
fn validate_update(
    state: &WebhookState,
    request: &AdmissionRequest<DynamicObject>,
) -> Result<AdmissionResponse, WebhookError> {
    let uid = &request.uid;

    // Only UPDATE requests for the gated kind are compared
    if !matches!(request.operation, Operation::Update) || request.kind.kind != state.target_kind {
        debug!(
            uid = %uid,
            operation = ?request.operation,
            kind = %request.kind.kind,
            "Out-of-scope request, allowing unchanged"
        );
        return Ok(AdmissionResponse::from(request));
    }

    // An update without both sides has nothing to compare
    let (Some(old_object), Some(new_object)) = (&request.old_object, &request.object) else {
        debug!(uid = %uid, "Old or new object missing from request, allowing unchanged");
        return Ok(AdmissionResponse::from(request));
    };

    let old = normalize(object_snapshot(old_object)?);
    let new = normalize(object_snapshot(new_object)?);

    let outcome = decide(&old, &new);
    let mut response = AdmissionResponse::from(request);

    match outcome.verdict.reason {
        ReasonCode::NoOp => {
            info!(uid = %uid, name = %request.name, "No significant differences found");
            response.allowed = false;
            response.result = Status {
                status: Some(StatusSummary::Success),
                message: outcome.verdict.message.to_string(),
                code: StatusCode::OK.as_u16(),
                ..Default::default()
            };
        }
        ReasonCode::Changed => {
            log_changes(&outcome.changes);
            info!(
                uid = %uid,
                name = %request.name,
                changes = outcome.changes.len(),
                "Significant differences found, allowing update"
            );
            response.allowed = true;
        }
    }

    Ok(response)
}

/// Log one line per differing key for audit output
fn log_changes(changes: &[FieldChange]) {
    for change in changes {
        debug!(
            section = %change.section,
            key = %change.key,
            kind = %change.kind,
            old = ?change.old,
            new = ?change.new,
            "Field difference"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webhook::webhook_router;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const TEST_UID: &str = "705ab4f5-6393-11e8-b7cc-42010a800002";

    fn application(replicas: u64, reconciled_at: &str, generation: u64) -> Value {
        json!({
            "apiVersion": "argoproj.io/v1alpha1",
            "kind": "Application",
            "metadata": {
                "name": "guestbook",
                "namespace": "argocd",
                "generation": generation,
                "labels": {"team": "platform"},
                "managedFields": [{
                    "manager": "application-controller",
                    "operation": "Update",
                    "apiVersion": "argoproj.io/v1alpha1"
                }]
            },
            "spec": {"replicas": replicas, "project": "default"},
            "status": {"health": "Healthy", "reconciledAt": reconciled_at}
        })
    }

    fn review_body(operation: &str, kind: &str, old_object: Value, object: Value) -> Value {
        json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview",
            "request": {
                "uid": TEST_UID,
                "kind": {"group": "argoproj.io", "version": "v1alpha1", "kind": kind},
                "resource": {"group": "argoproj.io", "version": "v1alpha1", "resource": "applications"},
                "name": "guestbook",
                "namespace": "argocd",
                "operation": operation,
                "userInfo": {"username": "system:serviceaccount:argocd:application-controller"},
                "object": object,
                "oldObject": old_object,
                "dryRun": false
            }
        })
    }

    async fn post_validate(body: String) -> (StatusCode, Value) {
        let router = webhook_router(Arc::new(WebhookState::default()));
        let request = Request::builder()
            .method("POST")
            .uri("/validate")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .expect("request building should succeed");

        let response = router.oneshot(request).await.expect("request should succeed");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 10 * 1024 * 1024)
            .await
            .expect("body reading should succeed");
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    // ==========================================================================
    // Integration Tests: HTTP Handler
    // ==========================================================================

    #[tokio::test]
    async fn integration_noop_update_is_denied_with_success_status() {
        // Same object; only bookkeeping churned between the two versions
        let body = review_body(
            "UPDATE",
            "Application",
            application(2, "2026-08-07T10:00:00Z", 4),
            application(2, "2026-08-07T10:00:30Z", 5),
        );

        let (status, review) = post_validate(body.to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(review["apiVersion"], "admission.k8s.io/v1");
        assert_eq!(review["response"]["uid"], TEST_UID);
        assert_eq!(review["response"]["allowed"], false);
        assert_eq!(review["response"]["status"]["status"], "Success");
        assert_eq!(review["response"]["status"]["message"], "Update successful.");
        assert_eq!(review["response"]["status"]["code"], 200);
    }

    #[tokio::test]
    async fn integration_spec_change_is_allowed() {
        let body = review_body(
            "UPDATE",
            "Application",
            application(1, "2026-08-07T10:00:00Z", 4),
            application(2, "2026-08-07T10:00:30Z", 5),
        );

        let (status, review) = post_validate(body.to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(review["response"]["uid"], TEST_UID);
        assert_eq!(review["response"]["allowed"], true);
    }

    #[tokio::test]
    async fn integration_metadata_label_change_is_allowed() {
        let old = application(2, "2026-08-07T10:00:00Z", 4);
        let mut new = application(2, "2026-08-07T10:00:30Z", 5);
        new["metadata"]["labels"]["tier"] = json!("prod");

        let body = review_body("UPDATE", "Application", old, new);
        let (status, review) = post_validate(body.to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(review["response"]["allowed"], true);
    }

    #[tokio::test]
    async fn integration_delete_operation_is_fast_accepted() {
        let body = review_body(
            "DELETE",
            "Application",
            application(2, "2026-08-07T10:00:00Z", 4),
            Value::Null,
        );

        let (status, review) = post_validate(body.to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(review["response"]["allowed"], true);
        assert_eq!(review["response"]["uid"], TEST_UID);
    }

    #[tokio::test]
    async fn integration_other_kinds_are_fast_accepted() {
        // Identical objects would be a no-op denial for the gated kind;
        // an ungated kind must never reach the comparison
        let object = application(2, "2026-08-07T10:00:00Z", 4);
        let body = review_body("UPDATE", "Rollout", object.clone(), object);

        let (status, review) = post_validate(body.to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(review["response"]["allowed"], true);
    }

    #[tokio::test]
    async fn integration_update_without_old_object_is_fast_accepted() {
        let body = review_body(
            "UPDATE",
            "Application",
            Value::Null,
            application(2, "2026-08-07T10:00:00Z", 4),
        );

        let (status, review) = post_validate(body.to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(review["response"]["allowed"], true);
    }

    #[tokio::test]
    async fn integration_malformed_body_is_rejected_without_envelope() {
        let (status, review) = post_validate("{not json".to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        // Plain-text error, not an AdmissionReview
        assert_eq!(review, Value::Null);
    }

    #[tokio::test]
    async fn integration_envelope_without_request_is_invalid() {
        let body = json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview"
        });

        let (status, review) = post_validate(body.to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(review["response"]["allowed"], false);
    }

    #[tokio::test]
    async fn integration_healthz_responds_ok() {
        let router = webhook_router(Arc::new(WebhookState::default()));
        let request = Request::builder()
            .method("GET")
            .uri("/healthz")
            .body(Body::empty())
            .expect("request building should succeed");

        let response = router.oneshot(request).await.expect("request should succeed");
        assert_eq!(response.status(), StatusCode::OK);
    }

    // ==========================================================================
    // Story Tests
    // ==========================================================================

    /// Story: the reconcile loop stops re-triggering itself
    ///
    /// The controller writes a fresh reconciledAt on every pass. If that
    /// alone admitted the update, each reconcile would schedule the next one
    /// forever. The webhook answers deny-with-success so the controller can
    /// drop the update on the floor.
    #[tokio::test]
    async fn story_reconciled_at_churn_does_not_admit() {
        let mut old = application(2, "2026-08-07T10:00:00Z", 4);
        let mut new = old.clone();
        old["status"]["reconciledAt"] = json!("T1");
        new["status"]["reconciledAt"] = json!("T2");

        let body = review_body("UPDATE", "Application", old, new);
        let (_, review) = post_validate(body.to_string()).await;
        assert_eq!(review["response"]["allowed"], false);
        assert_eq!(review["response"]["status"]["message"], "Update successful.");
    }

    /// Story: a webhook gating a different kind leaves Applications alone
    #[tokio::test]
    async fn story_state_controls_the_gated_kind() {
        let router = webhook_router(Arc::new(WebhookState::new("Rollout")));
        let object = application(2, "2026-08-07T10:00:00Z", 4);
        let body = review_body("UPDATE", "Application", object.clone(), object);

        let request = Request::builder()
            .method("POST")
            .uri("/validate")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request building should succeed");

        let response = router.oneshot(request).await.expect("request should succeed");
        let bytes = axum::body::to_bytes(response.into_body(), 10 * 1024 * 1024)
            .await
            .expect("body reading should succeed");
        let review: Value = serde_json::from_slice(&bytes).expect("response should be JSON");

        // Application is out of scope for a Rollout gate: fast accept
        assert_eq!(review["response"]["allowed"], true);
    }

    // ==========================================================================
    // Unit Tests
    // ==========================================================================

    #[test]
    fn test_webhook_error_maps_to_plain_500() {
        let err = WebhookError::Serialization(
            serde_json::from_str::<serde_json::Value>("{not json").unwrap_err(),
        );
        assert!(err.to_string().contains("serialization error"));

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
