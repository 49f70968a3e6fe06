use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use thiserror::Error;

pub const FETCH_ATTEMPTS: u32 = 3;
pub const RETRY_BACKOFF: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transfer timed out: {0}")]
    Timeout(String),
    #[error("transfer failed: {0}")]
    Transfer(String),
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout(_))
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(err.to_string())
    } else {
        FetchError::Transfer(err.to_string())
    }
}

/// Fetches a URL straight into its final path. Bounded retry with a fixed
/// backoff; any transport, HTTP-status, or filesystem failure counts as a
/// failed attempt. A failed attempt deletes whatever landed at the
/// destination so the existing-prefix check can never mistake a broken
/// transfer for a completed one.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    backoff: Duration,
}

impl Fetcher {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("build download http client")?;
        Ok(Self {
            client,
            backoff: RETRY_BACKOFF,
        })
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub async fn fetch(&self, url: &str, dest: &Path) -> Result<(), FetchError> {
        let mut attempt = 1;
        loop {
            match self.attempt(url, dest).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    discard_partial(dest);
                    if attempt >= FETCH_ATTEMPTS {
                        return Err(err);
                    }
                    tracing::warn!(
                        attempt,
                        max_attempts = FETCH_ATTEMPTS,
                        error = %err,
                        "download failed; retrying"
                    );
                    tokio::time::sleep(self.backoff).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn attempt(&self, url: &str, dest: &Path) -> Result<(), FetchError> {
        let response = self.client.get(url).send().await.map_err(classify)?;
        let response = response.error_for_status().map_err(classify)?;
        let body = response.bytes().await.map_err(classify)?;
        std::fs::write(dest, &body)
            .map_err(|err| FetchError::Transfer(format!("write {}: {err}", dest.display())))?;
        Ok(())
    }
}

fn discard_partial(dest: &Path) {
    if dest.exists()
        && let Err(err) = std::fs::remove_file(dest)
    {
        tracing::warn!(path = %dest.display(), error = %err, "could not remove partial download");
    }
}
