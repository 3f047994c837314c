// src/fetch/mod.rs
//! Where sheet text comes from: published spreadsheet URLs over HTTP, or
//! the built-in sample datasets, optionally stacked so that the samples
//! stand in when a sheet cannot be used.

use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashMap;
use std::fmt;
use tracing::{info, warn};

pub mod fallback;
pub mod http;
pub mod sample;

pub use fallback::Fallback;
pub use http::HttpSource;
pub use sample::StaticSource;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceId {
    /// A published CSV export.
    Url(String),
    /// A built-in dataset, e.g. `leads` or `calls/simran`.
    Static(String),
}

impl SourceId {
    pub fn url(u: impl Into<String>) -> Self {
        SourceId::Url(u.into())
    }

    pub fn key(k: impl Into<String>) -> Self {
        SourceId::Static(k.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            SourceId::Url(s) | SourceId::Static(s) => s,
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceId::Url(u) => f.write_str(u),
            SourceId::Static(k) => write!(f, "sample:{}", k),
        }
    }
}

/// Sheet text plus whether it is sample data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub text: String,
    pub sample: bool,
}

impl Fetched {
    pub fn live(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sample: false,
        }
    }

    pub fn sample(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sample: true,
        }
    }
}

#[async_trait]
pub trait Source: Send + Sync {
    async fn fetch(&self, id: &SourceId) -> Result<Fetched>;

    /// Replacement content for `id` once its real content turned out to be
    /// unusable (for instance no header row). `None` when there is none.
    async fn substitute(&self, _id: &SourceId) -> Option<Result<Fetched>> {
        None
    }
}

#[async_trait]
impl<'a, S: Source + ?Sized> Source for &'a S {
    async fn fetch(&self, id: &SourceId) -> Result<Fetched> {
        (**self).fetch(id).await
    }

    async fn substitute(&self, id: &SourceId) -> Option<Result<Fetched>> {
        (**self).substitute(id).await
    }
}

/// Fetch every id concurrently and wait for all of them, successes and
/// failures alike. Results line up with `ids`.
#[tracing::instrument(level = "debug", skip(source, ids), fields(count = ids.len()))]
pub async fn fetch_all_settled<S: Source + ?Sized>(
    source: &S,
    ids: &[SourceId],
) -> Vec<Result<Fetched>> {
    let results = join_all(ids.iter().map(|id| source.fetch(id))).await;
    let failed = results.iter().filter(|r| r.is_err()).count();
    if failed > 0 {
        warn!(failed, total = ids.len(), "some sources failed");
    } else {
        info!(total = ids.len(), "all sources fetched");
    }
    results
}

/// Fixed in-memory responses; anything else is unavailable.
#[derive(Debug, Clone, Default)]
pub struct MapSource {
    entries: HashMap<SourceId, String>,
}

impl MapSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: SourceId, text: impl Into<String>) -> Self {
        self.entries.insert(id, text.into());
        self
    }
}

#[async_trait]
impl Source for MapSource {
    async fn fetch(&self, id: &SourceId) -> Result<Fetched> {
        self.entries
            .get(id)
            .map(Fetched::live)
            .ok_or_else(|| Error::unavailable(id, "no such entry"))
    }
}
