// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Idempotent create-or-update of rendered resources against the cluster.

use crate::error::{GroundworkError, Result};
use kube::api::{Api, DynamicObject, PostParams};
use kube::core::{GroupVersionKind, TypeMeta};
use kube::discovery::ApiResource;
use kube::Client;
use tracing::{debug, info};

/// Apply one rendered resource: create it when absent, otherwise replace it
/// carrying the live object's resource version so the update is not rejected
/// as stale. A create racing with another writer is success.
pub async fn create_or_update(client: &Client, obj: &DynamicObject) -> Result<()> {
    let name = obj.metadata.name.clone().ok_or_else(|| {
        GroundworkError::RenderError("rendered resource has no metadata.name".to_string())
    })?;
    let types = obj.types.as_ref().ok_or_else(|| {
        GroundworkError::RenderError(format!("rendered resource {} has no type metadata", name))
    })?;
    let api = dynamic_api(client, types, obj.metadata.namespace.as_deref());

    match api.get(&name).await {
        Ok(live) => {
            debug!("Updating existing {} {}", types.kind, name);
            let mut desired = obj.clone();
            desired.metadata.resource_version = live.metadata.resource_version.clone();
            api.replace(&name, &PostParams::default(), &desired).await?;
            Ok(())
        }
        Err(kube::Error::Api(err)) if err.code == 404 => {
            info!("Creating {} {}", types.kind, name);
            match api.create(&PostParams::default(), obj).await {
                Ok(_) => Ok(()),
                Err(kube::Error::Api(err)) if err.code == 409 => {
                    debug!("{} {} was created concurrently", types.kind, name);
                    Ok(())
                }
                Err(e) => Err(e.into()),
            }
        }
        Err(e) => Err(e.into()),
    }
}

fn dynamic_api(client: &Client, types: &TypeMeta, namespace: Option<&str>) -> Api<DynamicObject> {
    let gvk = gvk_of(types);
    let resource = ApiResource::from_gvk_with_plural(&gvk, &plural_name(&gvk.kind));
    match namespace {
        Some(namespace) => Api::namespaced_with(client.clone(), namespace, &resource),
        None => Api::all_with(client.clone(), &resource),
    }
}

fn gvk_of(types: &TypeMeta) -> GroupVersionKind {
    match types.api_version.split_once('/') {
        Some((group, version)) => GroupVersionKind::gvk(group, version, &types.kind),
        None => GroupVersionKind::gvk("", &types.api_version, &types.kind),
    }
}

/// Lowercase plural resource name for a kind, handling the `-y` and sibilant
/// endings that a plain `s` suffix gets wrong (NetworkPolicy, Ingress)
fn plural_name(kind: &str) -> String {
    let kind = kind.to_ascii_lowercase();
    if let Some(stem) = kind.strip_suffix('y') {
        if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
            return format!("{}ies", stem);
        }
    }
    if kind.ends_with('s') || kind.ends_with('x') || kind.ends_with("ch") || kind.ends_with("sh") {
        return format!("{}es", kind);
    }
    format!("{}s", kind)
}
