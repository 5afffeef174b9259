//! Bounded HTTP downloads.
//!
//! The transfer limit is enforced twice: once against the declared `Content-Length`
//! before any byte is written, and again against the bytes actually received, so a
//! server that lies about its length cannot push more than the limit to disk.
//! Failures are terminal; there is no retry.

use crate::core::AgpkgError;
use anyhow::{Context, Result};
use reqwest::StatusCode;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Downloads `url` into `dest`, returning the number of bytes written.
///
/// # Errors
///
/// - [`AgpkgError::NotFound`] for HTTP 404
/// - [`AgpkgError::TooLarge`] when the declared or received size exceeds `limit`
/// - [`AgpkgError::Network`] for transport failures and other non-success statuses
pub async fn download_to(client: &reqwest::Client, url: &str, dest: &Path, limit: u64) -> Result<u64> {
    debug!("Downloading {}", url);

    let mut response = client.get(url).send().await.map_err(|e| network(url, &e))?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(AgpkgError::NotFound {
            location: url.to_string(),
        }
        .into());
    }
    if !status.is_success() {
        return Err(AgpkgError::Network {
            url: url.to_string(),
            reason: format!("HTTP request failed with status: {status}"),
        }
        .into());
    }

    if let Some(declared) = response.content_length() {
        if declared > limit {
            return Err(AgpkgError::TooLarge {
                size: declared,
                limit,
            }
            .into());
        }
    }

    let mut file = tokio::fs::File::create(dest)
        .await
        .with_context(|| format!("Failed to create download file: {}", dest.display()))?;

    let mut written: u64 = 0;
    while let Some(chunk) = response.chunk().await.map_err(|e| network(url, &e))? {
        written += chunk.len() as u64;
        if written > limit {
            drop(file);
            let _ = tokio::fs::remove_file(dest).await;
            return Err(AgpkgError::TooLarge {
                size: written,
                limit,
            }
            .into());
        }
        file.write_all(&chunk)
            .await
            .with_context(|| format!("Failed to write download file: {}", dest.display()))?;
    }

    file.flush().await.with_context(|| format!("Failed to flush {}", dest.display()))?;
    debug!("Downloaded {} bytes from {}", written, url);
    Ok(written)
}

fn network(url: &str, err: &reqwest::Error) -> anyhow::Error {
    AgpkgError::Network {
        url: url.to_string(),
        reason: err.to_string(),
    }
    .into()
}
