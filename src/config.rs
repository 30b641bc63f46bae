//! Configuration for the proxy rotator.

use crate::filter::Policy;
use crate::proxy::Anonymity;
use crate::schedule::Schedule;
use crate::source::{Source, SourceFormat};

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Listing pages harvested when no sources are configured.
pub const DEFAULT_SOURCES: [&str; 2] = ["https://sslproxies.org/", "https://free-proxy-list.net/"];

/// Target requested through a candidate proxy to check that it is alive.
pub const DEFAULT_SANITY_URL: &str = "https://ip.oxylabs.io/ip";

/// Configuration for the proxy rotator.
#[derive(Debug, Clone)]
pub struct RotatorConfig {
    /// Listing sources to harvest proxies from.
    pub sources: Vec<Source>,
    /// URL requested through a proxy during reachability checks.
    pub sanity_url: Url,
    /// Required anonymity level, `None` for any.
    pub anonymity: Option<Anonymity>,
    /// Allowed ISO 3166-1 alpha-2 country codes, `None` for any.
    pub countries: Option<HashSet<String>>,
    /// Whether proxies must support HTTPS.
    pub secure: bool,
    /// Probe harvested proxies before adding them to the pool.
    pub live_check: bool,
    /// Number of proxies probed concurrently, 0 probes all at once.
    pub probe_batch_size: usize,
    /// Upper bound on the crawled set, 0 for unbounded.
    pub max_pool_size: usize,
    /// Interval after which the pool is refreshed even if not empty.
    pub refresh_interval: Option<Duration>,
    /// Directory holding the pool snapshot, `None` disables persistence.
    pub cache_dir: Option<PathBuf>,
    /// Connect timeout for listing sources.
    pub connect_timeout: Duration,
    /// Read timeout for listing sources.
    pub read_timeout: Duration,
    /// Total timeout of one reachability check.
    pub probe_timeout: Duration,
    /// Timeout of a request sent through the middleware.
    pub request_timeout: Duration,
    /// Number of proxies the middleware tries before giving up.
    pub max_rotations: usize,
    /// Maximum requests per second sent through the middleware.
    pub max_requests_per_second: f64,
}

impl RotatorConfig {
    /// Create a new configuration builder.
    pub fn builder() -> RotatorConfigBuilder {
        RotatorConfigBuilder::new()
    }

    /// The filter policy described by this configuration.
    pub fn policy(&self) -> Policy {
        Policy {
            anonymity: self.anonymity,
            countries: self.countries.clone(),
            secure: self.secure,
        }
    }

    pub fn schedule(&self) -> Schedule {
        Schedule::new(self.refresh_interval)
    }
}

impl Default for RotatorConfig {
    fn default() -> Self {
        RotatorConfigBuilder::new().build()
    }
}

/// Builder for `RotatorConfig`.
#[derive(Debug, Clone)]
pub struct RotatorConfigBuilder {
    sources: Option<Vec<Source>>,
    sanity_url: Option<Url>,
    anonymity: Option<Anonymity>,
    countries: Option<HashSet<String>>,
    secure: Option<bool>,
    live_check: Option<bool>,
    probe_batch_size: Option<usize>,
    max_pool_size: Option<usize>,
    refresh_interval: Option<Duration>,
    cache_dir: Option<PathBuf>,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    probe_timeout: Option<Duration>,
    request_timeout: Option<Duration>,
    max_rotations: Option<usize>,
    max_requests_per_second: Option<f64>,
}

impl RotatorConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self {
            sources: None,
            sanity_url: None,
            anonymity: None,
            countries: None,
            secure: None,
            live_check: None,
            probe_batch_size: None,
            max_pool_size: None,
            refresh_interval: None,
            cache_dir: None,
            connect_timeout: None,
            read_timeout: None,
            probe_timeout: None,
            request_timeout: None,
            max_rotations: None,
            max_requests_per_second: None,
        }
    }

    /// Set the listing sources to harvest proxies from.
    pub fn sources(mut self, sources: Vec<Source>) -> Self {
        self.sources = Some(sources);
        self
    }

    /// Set the URL requested through a proxy during reachability checks.
    pub fn sanity_url(mut self, url: Url) -> Self {
        self.sanity_url = Some(url);
        self
    }

    /// Only keep proxies with exactly this anonymity level.
    pub fn anonymity(mut self, anonymity: Anonymity) -> Self {
        self.anonymity = Some(anonymity);
        self
    }

    /// Only keep proxies located in one of these countries.
    pub fn countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.countries = Some(
            countries
                .into_iter()
                .map(|code| code.as_ref().trim().to_uppercase())
                .collect(),
        );
        self
    }

    /// Set whether proxies must support HTTPS.
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = Some(secure);
        self
    }

    /// Probe harvested proxies before adding them to the pool.
    pub fn live_check(mut self, enabled: bool) -> Self {
        self.live_check = Some(enabled);
        self
    }

    /// Set how many proxies are probed concurrently.
    pub fn probe_batch_size(mut self, size: usize) -> Self {
        self.probe_batch_size = Some(size);
        self
    }

    /// Cap the number of crawled proxies kept in memory.
    pub fn max_pool_size(mut self, size: usize) -> Self {
        self.max_pool_size = Some(size);
        self
    }

    /// Refresh the pool once this interval has elapsed since the last harvest.
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = Some(interval);
        self
    }

    /// Persist the pool state in this directory.
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Set the connect timeout for listing sources.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the read timeout for listing sources.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Set the total timeout of one reachability check.
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = Some(timeout);
        self
    }

    /// Set the timeout of requests sent through the middleware.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set the number of proxies the middleware tries per request.
    pub fn max_rotations(mut self, count: usize) -> Self {
        self.max_rotations = Some(count);
        self
    }

    /// Set the maximum requests per second sent through the middleware.
    pub fn max_requests_per_second(mut self, rps: f64) -> Self {
        self.max_requests_per_second = Some(rps);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> RotatorConfig {
        RotatorConfig {
            sources: self.sources.unwrap_or_else(|| {
                DEFAULT_SOURCES
                    .iter()
                    .map(|url| Source::new(*url, SourceFormat::HtmlTable))
                    .collect()
            }),
            sanity_url: self.sanity_url.unwrap_or_else(default_sanity_url),
            anonymity: self.anonymity,
            countries: self.countries,
            secure: self.secure.unwrap_or(true),
            live_check: self.live_check.unwrap_or(false),
            probe_batch_size: self.probe_batch_size.unwrap_or(0),
            max_pool_size: self.max_pool_size.unwrap_or(0),
            refresh_interval: self.refresh_interval,
            cache_dir: self.cache_dir,
            connect_timeout: self.connect_timeout.unwrap_or(Duration::from_secs(1)),
            read_timeout: self.read_timeout.unwrap_or(Duration::from_secs(10)),
            probe_timeout: self.probe_timeout.unwrap_or(Duration::from_secs(1)),
            request_timeout: self.request_timeout.unwrap_or(Duration::from_secs(10)),
            max_rotations: self.max_rotations.unwrap_or(10),
            max_requests_per_second: self.max_requests_per_second.unwrap_or(5.0),
        }
    }
}

impl Default for RotatorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn default_sanity_url() -> Url {
    Url::parse(DEFAULT_SANITY_URL).expect("DEFAULT_SANITY_URL is a valid URL")
}
