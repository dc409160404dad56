//! Remote source retrieval.
//!
//! The remote endpoint is deliberately dumb: an HTTP GET against a fixed URL
//! returning the plugin's full source as plaintext, with the version marker
//! somewhere in the body. No authentication, no content negotiation, no
//! retries - a failed fetch surfaces as a check failure and the cycle aborts,
//! because the update check is best-effort, not a critical path.
//!
//! [`PluginSource`] is the seam: the sequencer only needs "give me the source
//! text", so tests swap in an in-memory implementation and the production
//! path uses [`HttpSource`] backed by `reqwest`.

use crate::core::ReplugError;
use crate::version::{VersionString, marker};
use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

/// A location that can produce the plugin's full source text.
#[async_trait]
pub trait PluginSource: Send + Sync {
    /// Human-readable description of the source (a URL), for logs and errors.
    fn location(&self) -> &str;

    /// Retrieve the complete source text in a single attempt.
    ///
    /// # Errors
    ///
    /// Returns [`ReplugError::NetworkFailure`] (wrapped) on a transport
    /// error or a non-success status. Implementations never retry.
    async fn fetch(&self) -> Result<String>;
}

/// HTTP implementation of [`PluginSource`].
#[derive(Debug, Clone)]
pub struct HttpSource {
    url: String,
    client: reqwest::Client,
}

impl HttpSource {
    /// Create a source for the given URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PluginSource for HttpSource {
    fn location(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<String> {
        debug!("fetching remote source from {}", self.url);

        let response = self.client.get(&self.url).send().await.map_err(|e| {
            ReplugError::NetworkFailure {
                url: self.url.clone(),
                reason: e.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReplugError::NetworkFailure {
                url: self.url.clone(),
                reason: format!("HTTP {status}"),
            }
            .into());
        }

        let body = response
            .text()
            .await
            .map_err(|e| ReplugError::NetworkFailure {
                url: self.url.clone(),
                reason: format!("failed to read body: {e}"),
            })?;

        debug!("fetched {} bytes from {}", body.len(), self.url);
        Ok(body)
    }
}

/// Fetch the remote source and extract its version marker.
///
/// # Errors
///
/// Fails on a fetch error or when the body carries no version marker; either
/// way the caller reports `CheckFailed` and leaves the installed file alone.
pub async fn fetch_remote_version<S: PluginSource + ?Sized>(source: &S) -> Result<VersionString> {
    let body = source.fetch().await?;
    let version = marker::extract_version(&body, source.location())?;
    debug!("remote source at {} declares version {version}", source.location());
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FailingSource, StaticSource};

    #[tokio::test]
    async fn test_remote_version_from_body() {
        let source = StaticSource::new("/** @version 1.1 */\nmodule body\n");
        let version = fetch_remote_version(&source).await.unwrap();
        assert_eq!(version.as_str(), "1.1");
    }

    #[tokio::test]
    async fn test_remote_version_missing_marker() {
        let source = StaticSource::new("no marker in this body");
        let err = fetch_remote_version(&source).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ReplugError>(),
            Some(ReplugError::VersionMarkerMissing { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_failure_surfaces_network_kind() {
        let source = FailingSource::with_status(404);
        let err = fetch_remote_version(&source).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ReplugError>(),
            Some(ReplugError::NetworkFailure { .. })
        ));
    }
}
