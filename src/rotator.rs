//! Core proxy rotator implementation.

use crate::config::RotatorConfig;
use crate::error::RotatorError;
use crate::filter::Policy;
use crate::proxy::Proxy;
use crate::repository::{HttpRepository, Repository};
use crate::schedule::Schedule;
use crate::snapshot;

use log::{debug, info, warn};
use rand::seq::IteratorRandom;
use std::collections::HashSet;
use std::time::Instant;

/// The part of the rotator that survives a restart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoolState {
    /// Proxies believed usable and not handed out yet.
    pub crawled: HashSet<Proxy>,
    /// Proxies known bad or already handed out. Never expire.
    pub blocked: HashSet<Proxy>,
    /// The proxy currently handed out.
    pub selected: Option<Proxy>,
}

/// Hands out one proxy at a time and replaces it on demand.
///
/// `rotate` takes `&mut self`; share a rotator between tasks behind a mutex
/// held for the whole rotation.
pub struct ProxyRotator {
    /// Configuration for the rotator.
    pub config: RotatorConfig,
    policy: Policy,
    schedule: Schedule,
    repository: Box<dyn Repository>,
    state: PoolState,
    last_download: Option<Instant>,
}

impl ProxyRotator {
    /// Create a rotator harvesting over HTTP, restoring the snapshot in the
    /// configured cache directory if there is one.
    pub fn new(config: RotatorConfig) -> Result<Self, RotatorError> {
        let repository = HttpRepository::new(&config)?;
        Self::with_repository(config, repository)
    }

    /// Create a rotator using a custom repository.
    pub fn with_repository(
        config: RotatorConfig,
        repository: impl Repository + 'static,
    ) -> Result<Self, RotatorError> {
        let policy = config.policy();
        let schedule = config.schedule();

        let state = match &config.cache_dir {
            Some(dir) => snapshot::load(dir, &policy.fingerprint())?.unwrap_or_default(),
            None => PoolState::default(),
        };

        Ok(Self {
            config,
            policy,
            schedule,
            repository: Box::new(repository),
            state,
            last_download: None,
        })
    }

    /// The proxy currently handed out.
    pub fn selected(&self) -> Option<&Proxy> {
        self.state.selected.as_ref()
    }

    pub fn crawled(&self) -> &HashSet<Proxy> {
        &self.state.crawled
    }

    pub fn blocked(&self) -> &HashSet<Proxy> {
        &self.state.blocked
    }

    pub fn state(&self) -> &PoolState {
        &self.state
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// When the last harvest completed in this process.
    pub fn last_download(&self) -> Option<Instant> {
        self.last_download
    }

    /// Number of crawled proxies waiting to be handed out.
    pub fn len(&self) -> usize {
        self.state.crawled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.crawled.is_empty()
    }

    /// Whether the last rotation could not find a proxy to hand out.
    pub fn is_exhausted(&self) -> bool {
        self.state.selected.is_none() && self.state.crawled.is_empty()
    }

    /// Block the selected proxy and select another one.
    ///
    /// Downloads a fresh batch first when the schedule asks for it. Leaves
    /// `selected()` empty when no proxy is left.
    pub async fn rotate(&mut self) -> Result<(), RotatorError> {
        if let Some(previous) = self.state.selected.take() {
            debug!("Blocking proxy {}", previous);
            self.state.blocked.insert(previous);
        }

        if self
            .schedule
            .should_harvest(self.state.crawled.is_empty(), self.last_download, Instant::now())
        {
            self.download().await;
        }

        let max_pool_size = self.config.max_pool_size;
        if max_pool_size > 0 && self.state.crawled.len() > max_pool_size {
            debug!(
                "Downsampling {} crawled proxies to {}",
                self.state.crawled.len(),
                max_pool_size
            );
            let mut rng = rand::rng();
            self.state.crawled = std::mem::take(&mut self.state.crawled)
                .into_iter()
                .choose_multiple(&mut rng, max_pool_size)
                .into_iter()
                .collect();
        }

        let next = self.state.crawled.iter().next().cloned();
        match next {
            Some(proxy) => {
                self.state.crawled.remove(&proxy);
                info!("Selected proxy {} ({} left)", proxy, self.state.crawled.len());
                self.state.selected = Some(proxy);
            }
            None => {
                warn!("No proxy available after rotation");
            }
        }

        self.save()
    }

    /// Harvest, filter, optionally probe, and merge into the crawled set.
    async fn download(&mut self) {
        let harvested = self.repository.harvest().await;
        let total = harvested.len();

        let mut available: HashSet<Proxy> = harvested
            .into_iter()
            .filter(|proxy| !self.state.blocked.contains(proxy) && self.policy.keep(proxy))
            .collect();
        info!("{}/{} harvested proxies pass the policy", available.len(), total);

        if self.config.live_check && !available.is_empty() {
            let (alive, dead) = self
                .repository
                .reachability(available, self.config.probe_batch_size)
                .await;
            info!("{} proxies alive, {} blocked as dead", alive.len(), dead.len());
            // a re-harvested endpoint may still sit in crawled from an earlier batch
            for proxy in &dead {
                self.state.crawled.remove(proxy);
            }
            self.state.blocked.extend(dead);
            available = alive;
        }

        self.state.crawled.extend(available);
        self.last_download = Some(Instant::now());
        debug_assert!(self.state.crawled.is_disjoint(&self.state.blocked));
    }

    fn save(&self) -> Result<(), RotatorError> {
        match &self.config.cache_dir {
            Some(dir) => snapshot::save(dir, &self.policy.fingerprint(), &self.state),
            None => Ok(()),
        }
    }
}
