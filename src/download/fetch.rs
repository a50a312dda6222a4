// Quran Audio Engine - word-by-word recitation audio downloader
// Copyright (C) 2025 Quran Audio Engine contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Fetch worker: single-file GET with retry policy
//!
//! One fetch is a bounded-timeout HTTP GET that distinguishes three
//! outcomes: success (body written to disk, size reported), not-found
//! (authoritative 404, nothing written) and everything else (transport
//! errors and unexpected statuses, retried with a fixed backoff).
//!
//! A failed or partial fetch never leaves a truncated file behind: the body
//! is buffered fully, written to a temp file in the destination directory
//! and renamed into place only once complete.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tracing::{error, warn};
use url::Url;

/// Attempts per file before giving up on transient errors
pub const MAX_FETCH_ATTEMPTS: u32 = 3;

/// Fixed delay between retry attempts
pub const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Hard timeout for one GET, connect through body
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of a single fetch attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    /// File written to the destination; bytes on disk
    Success(u64),
    /// Remote returned 404. Authoritative: the word does not exist.
    NotFound,
    /// Transport failure or unexpected status; may succeed on retry
    Error(String),
}

/// Transport seam between the orchestrator and the network.
///
/// The production implementation is [`HttpTransport`]; tests substitute a
/// scripted one.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one GET of `url` into `dest`
    async fn fetch_one(&self, url: &Url, dest: &Path) -> FetchStatus;
}

/// reqwest-backed transport with a shared connection pool
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport whose pool is sized to the engine's concurrency cap
    pub fn new(timeout: Duration, pool_size: usize) -> crate::error::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(pool_size)
            .build()?;
        Ok(Self { client })
    }

    /// Buffer the body and move it into place atomically
    fn write_atomic(dest: &Path, body: &[u8]) -> std::io::Result<()> {
        let dir = dest.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(body)?;
        tmp.persist(dest).map_err(|e| e.error)?;
        Ok(())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch_one(&self, url: &Url, dest: &Path) -> FetchStatus {
        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => return FetchStatus::Error(format!("request failed: {e}")),
        };

        match response.status() {
            StatusCode::OK => {
                let body = match response.bytes().await {
                    Ok(body) => body,
                    Err(e) => return FetchStatus::Error(format!("body read failed: {e}")),
                };
                match Self::write_atomic(dest, &body) {
                    Ok(()) => FetchStatus::Success(body.len() as u64),
                    Err(e) => {
                        error!(dest = %dest.display(), error = %e, "failed to write audio file");
                        FetchStatus::Error(format!("write failed: {e}"))
                    }
                }
            }
            StatusCode::NOT_FOUND => FetchStatus::NotFound,
            status => FetchStatus::Error(format!("unexpected status {status}")),
        }
    }
}

/// Fetch one file, retrying transient errors with a fixed backoff.
///
/// A 404 is never retried — it is an authoritative answer and retrying it
/// only wastes time. Returns `(succeeded, bytes_written)`.
pub async fn fetch_with_retry(
    transport: &dyn Transport,
    url: &Url,
    dest: &Path,
    max_attempts: u32,
    backoff: Duration,
) -> (bool, u64) {
    for attempt in 1..=max_attempts {
        match transport.fetch_one(url, dest).await {
            FetchStatus::Success(bytes) => return (true, bytes),
            FetchStatus::NotFound => {
                if attempt == 1 {
                    warn!(%url, "remote file not found (404)");
                }
                return (false, 0);
            }
            FetchStatus::Error(reason) => {
                error!(%url, attempt, max_attempts, %reason, "fetch attempt failed");
                if attempt < max_attempts {
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
    (false, 0)
}
