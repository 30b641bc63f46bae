//! Where the rotator gets its candidates from, and how it checks them.

use crate::config::RotatorConfig;
use crate::error::RotatorError;
use crate::probe;
use crate::proxy::Proxy;
use crate::source::{self, Source};

use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// Harvesting and reachability capability used by the rotator.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Download a batch of candidate proxies. Never fails; unreachable
    /// sources simply contribute nothing.
    async fn harvest(&self) -> HashSet<Proxy>;

    /// Split `candidates` into `(alive, dead)`.
    async fn reachability(
        &self,
        candidates: HashSet<Proxy>,
        batch_size: usize,
    ) -> (HashSet<Proxy>, HashSet<Proxy>);
}

/// Repository backed by public listing pages over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRepository {
    client: Client,
    sources: Vec<Source>,
    sanity_url: Url,
    probe_timeout: Duration,
}

impl HttpRepository {
    pub fn new(config: &RotatorConfig) -> Result<Self, RotatorError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .build()?;

        Ok(Self {
            client,
            sources: config.sources.clone(),
            sanity_url: config.sanity_url.clone(),
            probe_timeout: config.probe_timeout,
        })
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }
}

#[async_trait]
impl Repository for HttpRepository {
    async fn harvest(&self) -> HashSet<Proxy> {
        source::harvest(&self.client, &self.sources).await
    }

    async fn reachability(
        &self,
        candidates: HashSet<Proxy>,
        batch_size: usize,
    ) -> (HashSet<Proxy>, HashSet<Proxy>) {
        probe::probe(candidates, batch_size, &self.sanity_url, self.probe_timeout).await
    }
}
