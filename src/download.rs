use crate::{
    files,
    util::{ensure_dir, sha256_hex},
};
use anyhow::{Context, Result, anyhow};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

pub const REPO_SEGMENT: &str = "/file/repo";
pub const DOWNLOAD_SEGMENT: &str = "/file/download";

/// Maps a file-repository url onto its download url. Blank input yields `None`.
pub fn download_url(url: &str, from: &str, to: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }
    if from.is_empty() {
        return Some(url.to_string());
    }
    Some(url.replacen(from, to, 1))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadedFile {
    pub url: String,
    pub path: PathBuf,
    pub bytes: u64,
    pub sha256: String,
}

/// Fetches an already rewritten download url into `out_dir`.
pub async fn download_to_dir(client: &Client, url: &str, out_dir: &Path) -> Result<DownloadedFile> {
    let name = files::file_name(url).ok_or_else(|| anyhow!("no file name in url: {url}"))?;
    ensure_dir(out_dir)?;

    let resp = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("GET {url}"))?
        .error_for_status()
        .with_context(|| format!("GET {url}"))?;
    let body = resp.bytes().await.with_context(|| "reading response body")?;

    let path = out_dir.join(&name);
    tokio::fs::write(&path, &body)
        .await
        .with_context(|| format!("writing {}", path.display()))?;

    info!("downloaded {} bytes to {}", body.len(), path.display());

    Ok(DownloadedFile {
        url: url.to_string(),
        path,
        bytes: body.len() as u64,
        sha256: sha256_hex(&body),
    })
}
