//! Reachability checks through candidate proxies.

use crate::error::RotatorError;
use crate::proxy::Proxy;

use futures::future;
use log::{debug, info};
use reqwest::{redirect, Client, StatusCode};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// Split `candidates` into proxies that answered and proxies that did not.
///
/// Candidates are checked in sequential batches of `batch_size`, all requests
/// of a batch running concurrently. A `batch_size` of 0 checks everything in
/// a single batch.
pub async fn probe(
    candidates: HashSet<Proxy>,
    batch_size: usize,
    sanity_url: &Url,
    timeout: Duration,
) -> (HashSet<Proxy>, HashSet<Proxy>) {
    let candidates: Vec<Proxy> = candidates.into_iter().collect();
    let batch_size = match batch_size {
        0 => candidates.len().max(1),
        n => n,
    };

    info!(
        "Checking {} proxies against {} in batches of {}",
        candidates.len(),
        sanity_url,
        batch_size
    );

    let mut alive = HashSet::new();
    let mut dead = HashSet::new();

    for batch in candidates.chunks(batch_size) {
        let results = future::join_all(
            batch
                .iter()
                .map(|proxy| is_reachable(proxy, sanity_url, timeout)),
        )
        .await;

        for (proxy, result) in batch.iter().zip(results) {
            match result {
                Ok(()) => {
                    alive.insert(proxy.clone());
                }
                Err(e) => {
                    debug!("{}", e);
                    dead.insert(proxy.clone());
                }
            }
        }
    }

    info!(
        "Reachability check completed: {} alive, {} dead",
        alive.len(),
        dead.len()
    );

    (alive, dead)
}

/// Request `sanity_url` through `proxy`; only a 200 counts as reachable.
pub async fn is_reachable(proxy: &Proxy, sanity_url: &Url, timeout: Duration) -> Result<(), RotatorError> {
    let failed = |reason: String| RotatorError::ProbeError {
        proxy: proxy.to_string(),
        reason,
    };

    let client = Client::builder()
        .proxy(proxy.to_reqwest_proxy().map_err(|e| failed(e.to_string()))?)
        .redirect(redirect::Policy::none())
        .timeout(timeout)
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(sanity_url.clone()).send().await.map_err(|e| {
        if e.is_timeout() {
            RotatorError::ProbeTimeout {
                proxy: proxy.to_string(),
            }
        } else {
            failed(e.to_string())
        }
    })?;

    match response.status() {
        StatusCode::OK => Ok(()),
        status => Err(failed(format!("status {}", status))),
    }
}
