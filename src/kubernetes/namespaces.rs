// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Namespace provisioning: isolation labels, network policy and role binding.

use crate::config::Config;
use crate::constants::labels;
use crate::error::Result;
use crate::types::foundation::Foundation;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::api::networking::v1::{
    NetworkPolicy, NetworkPolicyIngressRule, NetworkPolicyPeer, NetworkPolicySpec,
};
use k8s_openapi::api::rbac::v1::{RoleBinding, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, OwnerReference};
use kube::{
    api::{Api, ObjectMeta, PostParams},
    Client, Resource,
};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;
use tracing::{debug, info, instrument};

/// Ensure a namespace exists with its isolation policy and role binding, all
/// owned by the Foundation for cascade deletion. Every step is idempotent;
/// re-running after a partial failure completes the remainder.
#[instrument(skip(client, foundation, config))]
pub async fn bootstrap_namespace(
    client: &Client,
    foundation: &Foundation,
    name: &str,
    config: &Config,
) -> Result<()> {
    let namespaces: Api<Namespace> = Api::all(client.clone());
    ensure_exists(&namespaces, name, "namespace", desired_namespace(foundation, name)).await?;

    let policies: Api<NetworkPolicy> = Api::namespaced(client.clone(), name);
    ensure_exists(
        &policies,
        name,
        "network policy",
        desired_network_policy(foundation, name),
    )
    .await?;

    let bindings: Api<RoleBinding> = Api::namespaced(client.clone(), name);
    ensure_exists(
        &bindings,
        name,
        "role binding",
        desired_role_binding(foundation, name, &config.elevated_role),
    )
    .await?;

    Ok(())
}

/// Create the object if the existence check reports not-found. A create
/// racing with a concurrent creator is success. The owner reference is part
/// of the desired object, so it is only ever set at creation time.
async fn ensure_exists<K>(api: &Api<K>, name: &str, kind: &str, desired: K) -> Result<()>
where
    K: Clone + Debug + DeserializeOwned + Serialize,
{
    match api.get(name).await {
        Ok(_) => {
            debug!("The {} {} already exists", kind, name);
            Ok(())
        }
        Err(kube::Error::Api(err)) if err.code == 404 => {
            info!("Creating {} {}", kind, name);
            match api.create(&PostParams::default(), &desired).await {
                Ok(_) => Ok(()),
                Err(kube::Error::Api(err)) if err.code == 409 => {
                    debug!("The {} {} was created concurrently", kind, name);
                    Ok(())
                }
                Err(e) => Err(e.into()),
            }
        }
        Err(e) => Err(e.into()),
    }
}

fn owner_references(foundation: &Foundation) -> Option<Vec<OwnerReference>> {
    foundation.controller_owner_ref(&()).map(|reference| vec![reference])
}

fn desired_namespace(foundation: &Foundation, name: &str) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(BTreeMap::from([
                (
                    labels::GENERATED_NAMESPACE.to_string(),
                    "true".to_string(),
                ),
                (
                    labels::POD_SECURITY_ENFORCE.to_string(),
                    labels::POD_SECURITY_BASELINE.to_string(),
                ),
            ])),
            owner_references: owner_references(foundation),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Ingress is only permitted from namespaces this operator generated, which
/// confines cross-namespace traffic to the platform's own namespaces.
fn desired_network_policy(foundation: &Foundation, name: &str) -> NetworkPolicy {
    NetworkPolicy {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(name.to_string()),
            owner_references: owner_references(foundation),
            ..Default::default()
        },
        spec: Some(NetworkPolicySpec {
            pod_selector: LabelSelector::default(),
            ingress: Some(vec![NetworkPolicyIngressRule {
                from: Some(vec![NetworkPolicyPeer {
                    namespace_selector: Some(LabelSelector {
                        match_labels: Some(BTreeMap::from([(
                            labels::GENERATED_NAMESPACE.to_string(),
                            "true".to_string(),
                        )])),
                        ..Default::default()
                    }),
                    ..Default::default()
                }]),
                ..Default::default()
            }]),
            policy_types: Some(vec!["Ingress".to_string()]),
            ..Default::default()
        }),
    }
}

fn desired_role_binding(foundation: &Foundation, name: &str, elevated_role: &str) -> RoleBinding {
    RoleBinding {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(name.to_string()),
            owner_references: owner_references(foundation),
            ..Default::default()
        },
        subjects: Some(vec![Subject {
            api_group: Some("rbac.authorization.k8s.io".to_string()),
            kind: "Group".to_string(),
            name: format!("system:serviceaccounts:{}", name),
            ..Default::default()
        }]),
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".to_string(),
            kind: "ClusterRole".to_string(),
            name: elevated_role.to_string(),
        },
    }
}
