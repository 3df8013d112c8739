// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use kube::CustomResource;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const PHASE_PROGRESSING: &str = "Progressing";
pub const PHASE_READY: &str = "Ready";

const CONDITION_RECONCILE_COMPLETE: &str = "ReconcileComplete";

/// Declarative bootstrap request for a namespaced platform: which namespaces
/// to provision and where the manifest bundle comes from.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[kube(group = "groundwork.geeko.me", version = "v1alpha1", kind = "Foundation")]
#[kube(status = "FoundationStatus")]
#[serde(rename_all = "camelCase")]
pub struct FoundationSpec {
    /// Namespaces to provision, in order. Names must be unique.
    pub namespaces: Vec<String>,
    /// URI of the manifest bundle tarball. Empty or absent means the local
    /// fallback archive is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifests_uri: Option<String>,
    /// Managed-service mode, enables the managed-only component
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed: Option<bool>,
}

impl Foundation {
    /// The manifest source URI, or None when the local fallback applies
    pub fn manifests_uri(&self) -> Option<&str> {
        self.spec
            .manifests_uri
            .as_deref()
            .filter(|uri| !uri.is_empty())
    }

    pub fn is_managed(&self) -> bool {
        self.spec.managed.unwrap_or(false)
    }

    /// The applications namespace that rendered resources are applied into
    pub fn target_namespace(&self) -> Option<&str> {
        self.spec.namespaces.first().map(String::as_str)
    }

    /// First namespace name that appears more than once, if any
    pub fn duplicate_namespace(&self) -> Option<&str> {
        let mut seen = HashSet::new();
        self.spec
            .namespaces
            .iter()
            .find(|name| !seen.insert(name.as_str()))
            .map(String::as_str)
    }

    pub fn has_conditions(&self) -> bool {
        self.status
            .as_ref()
            .and_then(|s| s.conditions.as_ref())
            .is_some_and(|c| !c.is_empty())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FoundationStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
}

impl FoundationStatus {
    /// Status published when reconciliation of a fresh object starts
    pub fn progressing() -> Self {
        FoundationStatus {
            phase: Some(PHASE_PROGRESSING.to_string()),
            conditions: Some(vec![Condition {
                condition_type: CONDITION_RECONCILE_COMPLETE.to_string(),
                status: "False".to_string(),
                reason: Some("ReconcileInit".to_string()),
                message: Some("Initializing Foundation resource".to_string()),
            }]),
        }
    }

    /// Status published after a successful reconcile pass
    pub fn ready() -> Self {
        FoundationStatus {
            phase: Some(PHASE_READY.to_string()),
            conditions: Some(vec![Condition {
                condition_type: CONDITION_RECONCILE_COMPLETE.to_string(),
                status: "True".to_string(),
                reason: Some("ReconcileCompleted".to_string()),
                message: Some("Foundation reconciled successfully".to_string()),
            }]),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
