// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Manifest bundle pipeline: fetch, extract, render, apply.

pub mod apply;
pub mod extract;
pub mod fetch;
pub mod render;

pub use apply::create_or_update;
pub use render::render;

use crate::config::Config;
use crate::error::{GroundworkError, Result};
use std::path::PathBuf;

/// An extracted manifest bundle on disk, one component per subdirectory
pub struct ManifestBundle {
    root: PathBuf,
}

/// A component directory within a bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub name: String,
    pub path: PathBuf,
}

impl ManifestBundle {
    /// Component directories in sorted order. Tarballs conventionally wrap
    /// their contents in a single container directory; enumeration descends
    /// through it when that is all the bundle holds.
    pub fn components(&self) -> Result<Vec<Component>> {
        let mut root = self.root.clone();
        let entries = list_dir(&root)?;
        if entries.len() == 1 && entries[0].is_dir() {
            root = entries[0].clone();
        }

        let mut components: Vec<Component> = list_dir(&root)?
            .into_iter()
            .filter(|path| path.is_dir())
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?.to_string();
                Some(Component { name, path })
            })
            .collect();
        components.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(components)
    }
}

fn list_dir(path: &std::path::Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(path)
        .map_err(|e| GroundworkError::ExtractError(format!("{}: {}", path.display(), e)))?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry =
            entry.map_err(|e| GroundworkError::ExtractError(format!("{}: {}", path.display(), e)))?;
        paths.push(entry.path());
    }
    Ok(paths)
}

/// Fetch the bundle for the given source and extract it into that source's
/// own directory under the manifests root, overwriting whatever a previous
/// fetch left there.
pub async fn download_bundle(config: &Config, uri: Option<&str>) -> Result<ManifestBundle> {
    let dest = config.manifests_root.join(cache_key(uri));
    let stream = fetch::fetch(config, uri).await?;
    extract::extract(stream, &dest).await?;
    Ok(ManifestBundle { root: dest })
}

/// Directory name for a manifest source. Keying the extraction directory by
/// source keeps concurrent reconciles of differently-sourced Foundations off
/// each other's trees.
fn cache_key(uri: Option<&str>) -> String {
    match uri {
        None => "local".to_string(),
        Some(uri) => {
            let mut key: String = uri
                .chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                        c
                    } else {
                        '-'
                    }
                })
                .collect();
            key.truncate(100);
            key
        }
    }
}
