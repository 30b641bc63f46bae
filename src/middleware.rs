//! Middleware implementation for reqwest.

use crate::config::RotatorConfig;
use crate::error::{NoProxyAvailable, NoRotationsLeft, RotatorError};
use crate::proxy::Proxy;
use crate::rotator::ProxyRotator;

use anyhow::anyhow;
use async_trait::async_trait;
use governor::{
    clock::DefaultClock,
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use log::{info, warn};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, Error, Middleware, Next, Result};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Middleware that sends every request through the rotator's selected proxy,
/// rotating to a new proxy whenever a request fails.
#[derive(Clone)]
pub struct ProxyRotatorMiddleware {
    /// The shared rotator. The lock is held for a whole rotation.
    rotator: Arc<Mutex<ProxyRotator>>,
    max_rotations: usize,
    request_timeout: Duration,
    /// Rate limiter to control requests per second.
    limiter: Arc<Limiter>,
}

impl ProxyRotatorMiddleware {
    /// Create a new middleware with the given configuration and select a
    /// first proxy.
    pub async fn new(config: RotatorConfig) -> Result<Self> {
        let rotator = ProxyRotator::new(config).map_err(into_middleware_error)?;
        let middleware = Self::from_rotator(rotator);

        {
            let mut rotator = middleware.rotator.lock().await;
            if rotator.selected().is_none() {
                rotator.rotate().await.map_err(into_middleware_error)?;
            }
            match rotator.selected() {
                Some(proxy) => info!(
                    "Proxy rotator initialized with {} ({} more crawled)",
                    proxy,
                    rotator.len()
                ),
                None => warn!("No proxy available in pool"),
            }
        }

        Ok(middleware)
    }

    /// Wrap an existing rotator.
    pub fn from_rotator(rotator: ProxyRotator) -> Self {
        let rps = rotator.config.max_requests_per_second.ceil() as u32;
        let quota = Quota::per_second(NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN));

        Self {
            max_rotations: rotator.config.max_rotations,
            request_timeout: rotator.config.request_timeout,
            rotator: Arc::new(Mutex::new(rotator)),
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// The rotator shared by every clone of this middleware.
    pub fn rotator(&self) -> Arc<Mutex<ProxyRotator>> {
        Arc::clone(&self.rotator)
    }

    async fn send_through(
        &self,
        proxy: &Proxy,
        request: reqwest::Request,
    ) -> std::result::Result<reqwest::Response, reqwest::Error> {
        let client = reqwest::Client::builder()
            .proxy(proxy.to_reqwest_proxy()?)
            .timeout(self.request_timeout)
            .build()?;
        client.execute(request).await
    }

    /// Rotate away from `proxy` unless another request already did.
    async fn retire(&self, proxy: &Proxy) -> Result<()> {
        let mut rotator = self.rotator.lock().await;
        if rotator.selected() == Some(proxy) {
            rotator.rotate().await.map_err(into_middleware_error)?;
        }
        Ok(())
    }
}

#[async_trait]
impl Middleware for ProxyRotatorMiddleware {
    async fn handle(
        &self,
        req: reqwest::Request,
        _extensions: &mut http::Extensions,
        _next: Next<'_>,
    ) -> Result<reqwest::Response> {
        {
            let mut rotator = self.rotator.lock().await;
            if rotator.selected().is_none() {
                rotator.rotate().await.map_err(into_middleware_error)?;
            }
        }

        let mut attempts = 0;
        while attempts < self.max_rotations {
            let selected = self.rotator.lock().await.selected().cloned();
            let Some(proxy) = selected else {
                warn!("No proxy available after {} attempts", attempts);
                return Err(Error::Middleware(anyhow!(NoProxyAvailable)));
            };

            let proxied_request = req.try_clone().ok_or_else(|| {
                Error::Middleware(anyhow!(
                    "Request object is not cloneable. Are you passing a streaming body?"
                        .to_string()
                ))
            })?;

            attempts += 1;
            info!("Using proxy: {} (attempt {})", proxy, attempts);

            self.limiter.until_ready().await;

            match self.send_through(&proxy, proxied_request).await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    warn!(
                        "Request through proxy {} returned {} (attempt {})",
                        proxy,
                        response.status(),
                        attempts
                    );
                }
                Err(err) => {
                    warn!(
                        "Request failed with proxy {} (attempt {}): {}",
                        proxy, attempts, err
                    );
                }
            }

            self.retire(&proxy).await?;
        }

        Err(Error::Middleware(anyhow!(NoRotationsLeft { attempts })))
    }
}

/// Build a client whose requests all go through a fresh rotator.
pub async fn client(config: RotatorConfig) -> Result<ClientWithMiddleware> {
    let middleware = ProxyRotatorMiddleware::new(config).await?;
    Ok(ClientBuilder::new(reqwest::Client::new())
        .with(middleware)
        .build())
}

fn into_middleware_error(err: RotatorError) -> Error {
    match err {
        RotatorError::Http(e) => Error::Reqwest(e),
        other => Error::Middleware(anyhow!(other)),
    }
}
