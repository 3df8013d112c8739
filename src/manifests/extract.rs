// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Streaming gzip+tar extraction of manifest bundles.

use crate::error::{GroundworkError, Result};
use async_compression::tokio::bufread::GzipDecoder;
use futures::StreamExt;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncBufRead;
use tokio_tar::{Archive, EntryType};
use tracing::{debug, instrument};

/// Unpack a gzipped tar stream below `dest`. The first entry is the
/// conventional container marker and produces no side effects. Extraction is
/// not transactional: a mid-stream failure leaves a partial tree that the
/// next run overwrites.
#[instrument(skip(stream))]
pub async fn extract<R>(stream: R, dest: &Path) -> Result<()>
where
    R: AsyncBufRead + Send + Unpin,
{
    fs::create_dir_all(dest)
        .await
        .map_err(|e| GroundworkError::ExtractError(format!("{}: {}", dest.display(), e)))?;

    let mut archive = Archive::new(GzipDecoder::new(stream));
    let mut entries = archive
        .entries()
        .map_err(|e| GroundworkError::ExtractError(e.to_string()))?;

    match entries.next().await {
        Some(Ok(_)) => {}
        Some(Err(e)) => return Err(GroundworkError::ExtractError(e.to_string())),
        None => {
            return Err(GroundworkError::ExtractError(
                "archive contains no entries".to_string(),
            ))
        }
    }

    while let Some(entry) = entries.next().await {
        let mut entry = entry.map_err(|e| GroundworkError::ExtractError(e.to_string()))?;
        let path = entry
            .path()
            .map_err(|e| GroundworkError::ExtractError(e.to_string()))?
            .into_owned();
        let target = safe_join(dest, &path)?;

        match entry.header().entry_type() {
            EntryType::Directory => {
                fs::create_dir_all(&target).await.map_err(|e| {
                    GroundworkError::ExtractError(format!("{}: {}", target.display(), e))
                })?;
            }
            EntryType::Regular => {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent).await.map_err(|e| {
                        GroundworkError::ExtractError(format!("{}: {}", parent.display(), e))
                    })?;
                }
                entry.unpack(&target).await.map_err(|e| {
                    GroundworkError::ExtractError(format!("{}: {}", target.display(), e))
                })?;
            }
            other => {
                debug!("Skipping {:?} entry {}", other, path.display());
            }
        }
    }

    Ok(())
}

/// Resolve an archive entry path below the extraction root, rejecting any
/// path that could escape it.
fn safe_join(root: &Path, entry_path: &Path) -> Result<PathBuf> {
    let mut target = root.to_path_buf();
    for component in entry_path.components() {
        match component {
            Component::Normal(part) => target.push(part),
            Component::CurDir => {}
            _ => {
                return Err(GroundworkError::ExtractError(format!(
                    "entry path {} escapes the extraction root",
                    entry_path.display()
                )))
            }
        }
    }
    Ok(target)
}
