// src/fetch/fallback.rs
use super::{Fetched, Source, SourceId};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{info, warn};

/// Try `primary`; when it cannot deliver, serve the `fallback` dataset
/// routed to that id instead. Only recoverable errors are answered this
/// way, and only for ids that have a route.
#[derive(Debug, Clone)]
pub struct Fallback<P, F> {
    primary: P,
    fallback: F,
    /// Primary id text (a sheet URL) → fallback dataset key.
    routes: HashMap<String, String>,
}

impl<P: Source, F: Source> Fallback<P, F> {
    pub fn new(primary: P, fallback: F, routes: HashMap<String, String>) -> Self {
        Self {
            primary,
            fallback,
            routes,
        }
    }

    pub fn primary(&self) -> &P {
        &self.primary
    }

    fn route(&self, id: &SourceId) -> Option<SourceId> {
        match id {
            SourceId::Static(_) => Some(id.clone()),
            SourceId::Url(u) => self.routes.get(u).map(SourceId::key),
        }
    }
}

#[async_trait]
impl<P: Source, F: Source> Source for Fallback<P, F> {
    async fn fetch(&self, id: &SourceId) -> Result<Fetched> {
        match self.primary.fetch(id).await {
            Ok(fetched) => Ok(fetched),
            Err(e) if e.is_recoverable() => match self.substitute(id).await {
                Some(sub) => {
                    warn!(source = %id, error = %e, "primary source failed; using sample data");
                    sub
                }
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    async fn substitute(&self, id: &SourceId) -> Option<Result<Fetched>> {
        let target = self.route(id)?;
        info!(source = %id, fallback = %target, "serving fallback");
        Some(self.fallback.fetch(&target).await.map(|f| Fetched {
            sample: true,
            ..f
        }))
    }
}
