//! HTTP transport primitives: fetch text, download a file.
//!
//! The engine only talks to the [`Transport`] trait, so tests can swap in
//! an in-memory implementation while production uses reqwest.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use tokio::io::AsyncWriteExt;

use crate::sync::types::{SyncError, SyncResult};

/// Network operations the sync engine needs.
pub trait Transport: Send + Sync {
    /// GET `url` and return the body as text.
    fn get_text(&self, url: &str) -> impl Future<Output = SyncResult<String>> + Send;

    /// GET `url` and stream the body into a new file at `dest`.
    ///
    /// Returns the number of bytes written. `dest` is created or truncated.
    /// The transfer fails once the server sends nothing for `idle_timeout`;
    /// a slow but steady transfer may take as long as it needs.
    fn download(
        &self,
        url: &str,
        dest: &Path,
        idle_timeout: Duration,
    ) -> impl Future<Output = SyncResult<u64>> + Send;
}

/// Build the URL for a relative path under `base_url`.
///
/// Each path segment is percent-encoded; `/` separators are kept.
#[must_use]
pub fn join_url(base_url: &str, relative_path: &str) -> String {
    let encoded: Vec<_> = relative_path
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();

    if base_url.ends_with('/') {
        format!("{base_url}{}", encoded.join("/"))
    } else {
        format!("{base_url}/{}", encoded.join("/"))
    }
}

fn idle_error(url: &str, idle_timeout: Duration) -> SyncError {
    SyncError::transport(
        url,
        format!("timed out after {:.1}s without data", idle_timeout.as_secs_f64()),
    )
}

/// Await one step of a transfer, giving up after `idle_timeout` of silence.
async fn within<F, T>(url: &str, idle_timeout: Duration, step: F, context: &str) -> SyncResult<T>
where
    F: Future<Output = reqwest::Result<T>>,
{
    match tokio::time::timeout(idle_timeout, step).await {
        Ok(result) => result.map_err(|e| SyncError::transport(url, format!("{context}: {e}"))),
        Err(_) => Err(idle_error(url, idle_timeout)),
    }
}

fn check_status(url: &str, response: reqwest::Response) -> SyncResult<reqwest::Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(SyncError::transport(url, format!("HTTP {}", response.status())))
    }
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport whose connect timeout is `timeout`.
    ///
    /// No overall request deadline is set: manifest fetches are bounded by
    /// the caller and downloads by their idle timeout.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the TLS backend cannot be initialized.
    pub fn new(timeout: Duration) -> SyncResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .user_agent(concat!("httpsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SyncError::transport("", format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn get_text(&self, url: &str) -> SyncResult<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SyncError::transport(url, format!("request failed: {e}")))?;
        check_status(url, response)?
            .text()
            .await
            .map_err(|e| SyncError::transport(url, format!("Failed to read body: {e}")))
    }

    async fn download(&self, url: &str, dest: &Path, idle_timeout: Duration) -> SyncResult<u64> {
        let response = within(url, idle_timeout, self.client.get(url).send(), "request failed").await?;
        let mut response = check_status(url, response)?;

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| SyncError::filesystem(dest, e))?;

        let mut written = 0u64;
        while let Some(chunk) = within(url, idle_timeout, response.chunk(), "Failed to read body").await? {
            file.write_all(&chunk)
                .await
                .map_err(|e| SyncError::filesystem(dest, e))?;
            written += chunk.len() as u64;
        }

        file.flush().await.map_err(|e| SyncError::filesystem(dest, e))?;
        file.sync_all().await.map_err(|e| SyncError::filesystem(dest, e))?;
        Ok(written)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://h:8080/", "a.txt"), "http://h:8080/a.txt");
        assert_eq!(join_url("http://h:8080", "a.txt"), "http://h:8080/a.txt");
        assert_eq!(join_url("http://h/files/", "dir/b c.txt"), "http://h/files/dir/b%20c.txt");
        assert_eq!(join_url("http://h/", "q?#.bin"), "http://h/q%3F%23.bin");
    }

    #[test]
    fn test_http_transport_builds() {
        assert!(HttpTransport::new(Duration::from_secs(5)).is_ok());
    }
}
