// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::env;
use std::path::PathBuf;

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Local fallback archive used when a Foundation declares no manifests URI
    pub archive_path: PathBuf,
    /// Root directory that manifest bundles are extracted under
    pub manifests_root: PathBuf,
    /// ClusterRole bound to all service accounts of each generated namespace
    pub elevated_role: String,
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let archive_path = env::var("MANIFESTS_ARCHIVE_PATH")
            .unwrap_or_else(|_| "/opt/manifests/bundle.tar.gz".to_string());
        let manifests_root = env::var("MANIFESTS_ROOT")
            .unwrap_or_else(|_| "/opt/manifests/extracted".to_string());
        let elevated_role = env::var("ELEVATED_CLUSTER_ROLE")
            .unwrap_or_else(|_| "system:openshift:scc:anyuid".to_string());

        Config {
            archive_path: PathBuf::from(archive_path),
            manifests_root: PathBuf::from(manifests_root),
            elevated_role,
        }
    }
}
