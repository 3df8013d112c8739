// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for namespace provisioning.

pub mod namespaces;

pub use namespaces::bootstrap_namespace;
