// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use kube::Client;
use tracing::{info, warn};

use groundwork::config::Config;
use groundwork::reconcilers::FoundationReconciler;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting Groundwork operator");

    // Load configuration
    let config = Config::from_env();
    info!(
        "Configuration loaded: manifests_root={}",
        config.manifests_root.display()
    );

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    // Run the Foundation reconciler
    let reconciler = FoundationReconciler::new(client, config);
    reconciler.run().await?;

    // This should never be reached as the reconciler runs forever
    warn!("Foundation reconciler stopped unexpectedly");
    Ok(())
}
