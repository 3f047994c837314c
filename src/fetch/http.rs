// src/fetch/http.rs
use super::{Fetched, Source, SourceId};
use crate::config::Settings;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Published-sheet CSV exports over HTTP. Every failure, whatever its
/// cause, comes back as `SourceUnavailable`.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).gzip(true).build()?;
        Ok(Self { client })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(Duration::from_secs(settings.request_timeout_secs))
    }

    /// The underlying client, shared with recording lookups.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Source for HttpSource {
    #[tracing::instrument(level = "debug", skip(self), fields(source = %id))]
    async fn fetch(&self, id: &SourceId) -> Result<Fetched> {
        let url = match id {
            SourceId::Url(u) => u,
            SourceId::Static(_) => return Err(Error::unavailable(id, "not an HTTP source")),
        };

        let resp = self
            .client
            .get(url)
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "request failed");
                Error::unavailable(id, e)
            })?;

        let status = resp.status();
        if !status.is_success() {
            warn!(%status, "non-success status");
            return Err(Error::unavailable(id, format!("HTTP {}", status)));
        }

        let text = resp
            .text()
            .await
            .map_err(|e| Error::unavailable(id, format!("reading body: {}", e)))?;
        if text.trim().is_empty() {
            warn!("empty body");
            return Err(Error::unavailable(id, "empty body"));
        }

        debug!(bytes = text.len(), "fetched sheet");
        Ok(Fetched::live(text))
    }
}
