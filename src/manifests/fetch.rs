// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Manifest bundle retrieval from a remote URI or the local fallback archive.

use crate::config::Config;
use crate::error::{GroundworkError, Result};
use futures::TryStreamExt;
use std::io;
use tokio::io::{AsyncBufRead, BufReader};
use tokio_util::io::StreamReader;
use tracing::{debug, info};

/// A manifest archive opened as a byte stream, consumed once by the extractor
pub type ArchiveStream = Box<dyn AsyncBufRead + Send + Unpin>;

/// Open the manifest bundle for the given source. A non-empty URI is fetched
/// over HTTP, otherwise the local fallback archive is opened. The payload is
/// streamed, not buffered.
pub async fn fetch(config: &Config, uri: Option<&str>) -> Result<ArchiveStream> {
    match uri {
        Some(uri) => fetch_remote(uri).await,
        None => open_fallback(config).await,
    }
}

async fn fetch_remote(uri: &str) -> Result<ArchiveStream> {
    info!("Downloading manifest bundle from {}", uri);

    let response = reqwest::get(uri)
        .await
        .map_err(|e| GroundworkError::FetchError(format!("GET {}: {}", uri, e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(GroundworkError::FetchError(format!(
            "GET {}: HTTP status {}",
            uri, status
        )));
    }

    let stream = response
        .bytes_stream()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
    Ok(Box::new(StreamReader::new(Box::pin(stream))))
}

async fn open_fallback(config: &Config) -> Result<ArchiveStream> {
    debug!(
        "No manifests URI given, opening fallback archive {}",
        config.archive_path.display()
    );

    let file = tokio::fs::File::open(&config.archive_path).await.map_err(|e| {
        GroundworkError::FetchError(format!("{}: {}", config.archive_path.display(), e))
    })?;
    Ok(Box::new(BufReader::new(file)))
}
