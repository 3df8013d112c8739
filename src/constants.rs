// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Kubernetes label keys and values used by Groundwork
pub mod labels {
    /// Marks a namespace as created by this operator
    pub const GENERATED_NAMESPACE: &str = "groundwork.geeko.me/generated-namespace";
    /// Pod Security admission enforcement label
    pub const POD_SECURITY_ENFORCE: &str = "pod-security.kubernetes.io/enforce";
    /// Enforcement level applied to generated namespaces
    pub const POD_SECURITY_BASELINE: &str = "baseline";
}

/// The operator name
pub const OPERATOR_NAME: &str = "groundwork";

/// Component directory that is only deployed for managed installs
pub const MANAGED_COMPONENT: &str = "managed-config";

/// Reconcile timing configuration
pub mod timing {
    /// Periodic resync interval in seconds for successfully reconciled objects
    pub const RESYNC_INTERVAL_SECS: u64 = 300;
    /// Requeue delay in seconds after a reconcile error
    pub const ERROR_REQUEUE_SECS: u64 = 60;
}
