// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GroundworkError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Manifest fetch failed: {0}")]
    FetchError(String),

    #[error("Archive extraction failed: {0}")]
    ExtractError(String),

    #[error("Overlay rendering failed: {0}")]
    RenderError(String),

    #[error("Invalid Foundation spec: {0}")]
    InvalidSpec(String),
}

pub type Result<T> = std::result::Result<T, GroundworkError>;
