//! Section diffing and the admission decision
//!
//! Two normalized snapshots are partitioned into their `metadata`, `spec`
//! and `status` sections and compared with structural equality. The result
//! folds into a verdict: deny when nothing changed (the no-op short-circuit
//! that keeps the reconcile loop from feeding itself), allow when anything
//! did, together with a field-level change list for the audit log.
//!
//! The decision is a pure function of the two snapshots - no clock, no
//! request ordering, no process state - so the same pair always produces
//! the same outcome in the same order.

use std::fmt;

use serde_json::{Map, Value};

/// A named top-level partition of a snapshot
///
/// A section may be absent from a snapshot; absence is a valid state, not
/// an error, and is tracked separately from "present but empty".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// Object metadata (labels, annotations, ...)
    Metadata,
    /// The user-declared desired state
    Spec,
    /// Controller-written observed state
    Status,
}

impl Section {
    /// All sections, in the order they are compared and reported
    pub const ALL: [Section; 3] = [Section::Metadata, Section::Spec, Section::Status];

    /// The snapshot key this section lives under
    pub fn key(self) -> &'static str {
        match self {
            Section::Metadata => "metadata",
            Section::Spec => "spec",
            Section::Status => "status",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// How a key differs between the old and new side of a section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Key present only on the new side
    Added,
    /// Key present only on the old side
    Removed,
    /// Key present on both sides with unequal values
    Modified,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChangeKind::Added => "added",
            ChangeKind::Removed => "removed",
            ChangeKind::Modified => "modified",
        })
    }
}

/// One key that differs between the two sides of a section
///
/// `None` marks a side where the key is absent altogether - a different
/// state than the key being present with a JSON `null`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    /// Section the key belongs to
    pub section: Section,
    /// The differing key
    pub key: String,
    /// Whether the key was added, removed or modified
    pub kind: ChangeKind,
    /// Value on the old side, if the key exists there
    pub old: Option<Value>,
    /// Value on the new side, if the key exists there
    pub new: Option<Value>,
}

/// Reason category attached to a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonCode {
    /// Nothing but bookkeeping changed; the update is a reconcile no-op
    NoOp,
    /// At least one section differs for real
    Changed,
}

/// Message carried with the no-op denial
///
/// The "success" wording is deliberate: this denial tells the controller
/// nothing meaningful happened so it can skip redundant work. It is not a
/// rejection of a harmful change.
pub const NOOP_MESSAGE: &str = "Update successful.";

/// The admission decision fed back through the AdmissionReview envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Whether the update is admitted
    pub allowed: bool,
    /// Why
    pub reason: ReasonCode,
    /// Human-readable message carried in the response status
    pub message: &'static str,
}

impl Verdict {
    /// Deny-as-no-op: every section compared equal after normalization
    pub fn no_op() -> Self {
        Verdict {
            allowed: false,
            reason: ReasonCode::NoOp,
            message: NOOP_MESSAGE,
        }
    }

    /// Allow: at least one section carries a real change
    pub fn changed() -> Self {
        Verdict {
            allowed: true,
            reason: ReasonCode::Changed,
            message: "",
        }
    }
}

/// Verdict plus the per-key changes backing it
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// The admission decision
    pub verdict: Verdict,
    /// Field-level changes for every section that differed; empty for no-op
    pub changes: Vec<FieldChange>,
}

/// Decide whether an update carries real changes.
///
/// Both snapshots must already be normalized
/// ([`crate::snapshot::normalize`]); this function does not re-normalize.
pub fn decide(old: &Value, new: &Value) -> Outcome {
    let mut changes = Vec::new();
    let mut any_changed = false;

    for section in Section::ALL {
        let old_section = old.get(section.key());
        let new_section = new.get(section.key());

        // Option equality preserves the deliberate asymmetry: absent on both
        // sides is equal, absent vs present (even an empty map) is not.
        // Present values compare with serde_json's recursive structural
        // equality - type tag first, then per-variant: maps by key, sequences
        // pairwise in order, scalars by value - so a type change at a key is
        // simply unequal, never an error.
        if old_section == new_section {
            continue;
        }
        any_changed = true;
        changes.extend(section_changes(section, old_section, new_section));
    }

    if any_changed {
        Outcome {
            verdict: Verdict::changed(),
            changes,
        }
    } else {
        Outcome {
            verdict: Verdict::no_op(),
            changes: Vec::new(),
        }
    }
}

/// Per-key changes for one section that compared unequal.
///
/// Keys come out in `serde_json::Map` order (sorted): removed and modified
/// keys from the old side first, then added keys from the new side. The
/// order never affects the verdict; it only keeps logs reproducible. A side
/// that is absent or not an object iterates as empty, so an absent-to-empty
/// transition flags the section with no per-key records.
fn section_changes(
    section: Section,
    old_section: Option<&Value>,
    new_section: Option<&Value>,
) -> Vec<FieldChange> {
    let empty = Map::new();
    let old_map = old_section.and_then(Value::as_object).unwrap_or(&empty);
    let new_map = new_section.and_then(Value::as_object).unwrap_or(&empty);

    let mut changes = Vec::new();

    for (key, old_value) in old_map {
        match new_map.get(key) {
            Some(new_value) if new_value != old_value => changes.push(FieldChange {
                section,
                key: key.clone(),
                kind: ChangeKind::Modified,
                old: Some(old_value.clone()),
                new: Some(new_value.clone()),
            }),
            Some(_) => {}
            None => changes.push(FieldChange {
                section,
                key: key.clone(),
                kind: ChangeKind::Removed,
                old: Some(old_value.clone()),
                new: None,
            }),
        }
    }

    for (key, new_value) in new_map {
        if !old_map.contains_key(key) {
            changes.push(FieldChange {
                section,
                key: key.clone(),
                kind: ChangeKind::Added,
                old: None,
                new: Some(new_value.clone()),
            });
        }
    }

    changes
}
