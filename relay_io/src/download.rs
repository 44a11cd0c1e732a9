//! Artifact downloads with retry, timeout and cancellation.
//!
//! The body is streamed into `<target>.tmp` and renamed over the target only
//! once it is complete (and matches its checksum, when one is given). A
//! failed attempt never leaves the temp file behind.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use relay_core::config::NetworkConfig;
use relay_core::{Artifact, Error};

pub const USER_AGENT: &str = concat!("relay/", env!("CARGO_PKG_VERSION"));

/// Suffix of the in-progress download next to the target.
pub const TMP_SUFFIX: &str = ".tmp";

#[derive(Clone)]
pub struct Downloader {
    client: reqwest::Client,
    timeout: Duration,
    retries: u32,
}

impl Downloader {
    pub fn new(timeout: Duration, retries: u32) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            timeout,
            retries,
        }
    }

    pub fn from_config(network: &NetworkConfig) -> Self {
        Self::new(Duration::from_secs(network.timeout_secs), network.retries)
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn fetch(
        &self,
        artifact: &Artifact,
        cancel: &CancellationToken,
    ) -> Result<u64, Error> {
        self.fetch_with_progress(artifact, cancel, &|_, _| {}).await
    }

    /// Download `artifact`, calling `on_progress(bytes_so_far, total)` for
    /// every chunk. Returns the number of bytes written.
    pub async fn fetch_with_progress(
        &self,
        artifact: &Artifact,
        cancel: &CancellationToken,
        on_progress: &(dyn Fn(u64, Option<u64>) + Send + Sync),
    ) -> Result<u64, Error> {
        let tmp = tmp_path(&artifact.target);
        if let Some(parent) = artifact.target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::filesystem(parent, e))?;
        }

        let attempts = self.retries + 1;
        let mut last_error = None;

        for attempt in 1..=attempts {
            if cancel.is_cancelled() {
                remove_tmp(&tmp).await;
                return Err(Error::Cancelled);
            }

            debug!(url = %artifact.url, attempt, attempts, "downloading");
            match self.attempt(artifact, &tmp, cancel, on_progress).await {
                Ok(bytes) => {
                    if let Err(e) = tokio::fs::rename(&tmp, &artifact.target).await {
                        remove_tmp(&tmp).await;
                        return Err(Error::filesystem(&artifact.target, e));
                    }
                    debug!(target = %artifact.target.display(), bytes, "download complete");
                    return Ok(bytes);
                }
                Err(Error::Cancelled) => {
                    remove_tmp(&tmp).await;
                    return Err(Error::Cancelled);
                }
                Err(e) => {
                    remove_tmp(&tmp).await;
                    warn!(
                        name = %artifact.name,
                        attempt,
                        attempts,
                        error = %e,
                        "download attempt failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Download {
            url: artifact.url.clone(),
            message: "no download attempt was made".to_string(),
        }))
    }

    async fn attempt(
        &self,
        artifact: &Artifact,
        tmp: &Path,
        cancel: &CancellationToken,
        on_progress: &(dyn Fn(u64, Option<u64>) + Send + Sync),
    ) -> Result<u64, Error> {
        let download_err = |message: String| Error::Download {
            url: artifact.url.clone(),
            message,
        };

        let request = self.client.get(&artifact.url).timeout(self.timeout).send();
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            response = request => response.map_err(|e| download_err(e.to_string()))?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(download_err(format!("HTTP {status}")));
        }

        let total = response.content_length();
        let mut file = tokio::fs::File::create(tmp)
            .await
            .map_err(|e| Error::filesystem(tmp, e))?;
        let mut hasher = artifact.checksum.as_ref().map(|_| Sha256::new());
        let mut downloaded = 0u64;
        let mut stream = response.bytes_stream();

        on_progress(0, total);
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                next = stream.next() => next,
            };
            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk.map_err(|e| download_err(format!("failed to read body: {e}")))?;

            file.write_all(&chunk)
                .await
                .map_err(|e| Error::filesystem(tmp, e))?;
            if let Some(hasher) = hasher.as_mut() {
                hasher.update(&chunk);
            }
            downloaded += chunk.len() as u64;
            on_progress(downloaded, total);
        }

        file.flush().await.map_err(|e| Error::filesystem(tmp, e))?;
        drop(file);

        if let Some(expected) = total
            && downloaded < expected
        {
            return Err(download_err(format!(
                "incomplete body: received {downloaded} of {expected} bytes"
            )));
        }

        if let (Some(expected), Some(hasher)) = (&artifact.checksum, hasher) {
            let actual = format!("{:x}", hasher.finalize());
            if !actual.eq_ignore_ascii_case(expected.trim()) {
                return Err(Error::ChecksumMismatch {
                    expected: expected.clone(),
                    actual,
                    file_name: Some(artifact.name.clone()),
                });
            }
        }

        Ok(downloaded)
    }
}

pub fn tmp_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(TMP_SUFFIX);
    PathBuf::from(name)
}

async fn remove_tmp(tmp: &Path) {
    if let Err(e) = tokio::fs::remove_file(tmp).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!(path = %tmp.display(), error = %e, "failed to remove temp file");
    }
}
