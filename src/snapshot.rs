//! Snapshot extraction and normalization
//!
//! A snapshot is the untyped JSON tree of one version of an Application
//! object. Working on plain [`serde_json::Value`] instead of a compiled
//! schema keeps the webhook correct when the Application CRD grows fields
//! this binary has never heard of.
//!
//! Before two snapshots are compared, the fields the cluster rewrites on
//! every object touch are stripped, so their churn cannot register as a
//! change: `metadata.managedFields` and `metadata.generation` (API server
//! bookkeeping) and `status.reconciledAt` (the controller's reconcile
//! timestamp). Stripping `reconciledAt` is what breaks the reconcile loop's
//! self-triggering.

use kube::core::DynamicObject;
use serde_json::Value;

/// Keys under `metadata` rewritten by the API server on every object touch
const METADATA_BOOKKEEPING_KEYS: [&str; 2] = ["managedFields", "generation"];

/// Key under `status` stamped by the controller on every reconcile pass
const RECONCILED_AT_KEY: &str = "reconciledAt";

/// Serialize an admission object back into an untyped snapshot tree.
///
/// The caller's object is not consumed or mutated; the returned value is an
/// owned copy the decision pipeline is free to normalize.
pub fn object_snapshot(object: &DynamicObject) -> Result<Value, serde_json::Error> {
    serde_json::to_value(object)
}

/// Strip reconcile bookkeeping from a snapshot.
///
/// Removes `metadata.managedFields`, `metadata.generation` and
/// `status.reconciledAt` when present. A parent section that is absent or
/// not an object is left alone; so is every other field - over-stripping
/// would silently hide real changes from the diff. Idempotent.
pub fn normalize(mut snapshot: Value) -> Value {
    if let Some(metadata) = snapshot.get_mut("metadata").and_then(Value::as_object_mut) {
        for key in METADATA_BOOKKEEPING_KEYS {
            metadata.remove(key);
        }
    }
    if let Some(status) = snapshot.get_mut("status").and_then(Value::as_object_mut) {
        status.remove(RECONCILED_AT_KEY);
    }
    snapshot
}
