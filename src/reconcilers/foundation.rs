// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Foundation reconciler - provisions namespaces and deploys the manifest bundle.

use crate::config::Config;
use crate::constants::{timing, MANAGED_COMPONENT};
use crate::error::{GroundworkError, Result};
use crate::kubernetes::bootstrap_namespace;
use crate::manifests::{create_or_update, download_bundle, render};
use crate::types::foundation::{Foundation, FoundationStatus};
use futures::StreamExt;
use kube::{
    api::{Api, Patch, PatchParams},
    runtime::{controller::Action, watcher, Controller},
    Client, ResourceExt,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub struct FoundationReconciler {
    client: Client,
    config: Config,
}

impl FoundationReconciler {
    pub fn new(client: Client, config: Config) -> Self {
        Self { client, config }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let foundations: Api<Foundation> = Api::all(self.client.clone());
        let context = Arc::new(self);

        Controller::new(foundations, watcher::Config::default())
            .run(reconcile, error_policy, context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled foundation: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }
}

async fn reconcile(foundation: Arc<Foundation>, ctx: Arc<FoundationReconciler>) -> Result<Action> {
    let name = foundation.name_any();
    info!("Reconciling Foundation {}", name);

    if !foundation.has_conditions() {
        publish_status(&ctx.client, &name, FoundationStatus::progressing()).await?;
    }

    reconcile_foundation(&ctx.client, &ctx.config, &foundation).await?;

    // A lost Ready update fails the pass so the scheduler retries it; every
    // step above tolerates the re-run
    publish_status(&ctx.client, &name, FoundationStatus::ready()).await?;

    Ok(Action::requeue(Duration::from_secs(
        timing::RESYNC_INTERVAL_SECS,
    )))
}

/// One pass of the bootstrap pipeline: validate the spec, provision each
/// namespace, download and extract the manifest bundle, then render and apply
/// every applicable component into the applications namespace. Each step is
/// idempotent; a failure aborts the pass and the next invocation resumes the
/// remainder.
pub async fn reconcile_foundation(
    client: &Client,
    config: &Config,
    foundation: &Foundation,
) -> Result<()> {
    if let Some(duplicate) = foundation.duplicate_namespace() {
        return Err(GroundworkError::InvalidSpec(format!(
            "namespace {} is listed more than once",
            duplicate
        )));
    }

    for namespace in &foundation.spec.namespaces {
        bootstrap_namespace(client, foundation, namespace, config).await?;
    }

    let bundle = download_bundle(config, foundation.manifests_uri()).await?;

    let Some(target) = foundation.target_namespace() else {
        debug!("Foundation declares no namespaces, skipping manifest deployment");
        return Ok(());
    };

    for component in bundle.components()? {
        if component.name == MANAGED_COMPONENT && !foundation.is_managed() {
            debug!("Skipping managed-only component {}", component.name);
            continue;
        }
        info!("Deploying component {} into namespace {}", component.name, target);
        let objects = render(&component.path, target)?;
        for object in &objects {
            create_or_update(client, object).await?;
        }
    }

    Ok(())
}

async fn publish_status(client: &Client, name: &str, status: FoundationStatus) -> Result<()> {
    let api: Api<Foundation> = Api::all(client.clone());
    let patch = serde_json::json!({ "status": status });
    api.patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    Ok(())
}

fn error_policy(
    _foundation: Arc<Foundation>,
    error: &GroundworkError,
    _ctx: Arc<FoundationReconciler>,
) -> Action {
    error!("Reconciliation error: {}", error);
    Action::requeue(Duration::from_secs(timing::ERROR_REQUEUE_SECS))
}
