//! Harvesting proxies from public listing sources.

use crate::error::RotatorError;
use crate::proxy::Proxy;

use futures::future;
use log::{debug, info, warn};
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use std::collections::HashSet;

/// Layout of a listing source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// An HTML table in the free-proxy-list layout: address, port, country
    /// code, country, anonymity, google, https, last checked.
    HtmlTable,
    /// One `ip:port` per line, `#` starts a comment.
    PlainText,
}

/// A listing source: a URL, or a local file path, plus its layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub url: String,
    pub format: SourceFormat,
}

impl Source {
    pub fn new(url: impl Into<String>, format: SourceFormat) -> Self {
        Self {
            url: url.into(),
            format,
        }
    }

    /// Whether this source is fetched over HTTP rather than read from disk.
    pub fn is_remote(&self) -> bool {
        self.url.starts_with("http://") || self.url.starts_with("https://")
    }

    /// Parse the raw content of this source.
    pub fn parse(&self, content: &str) -> HashSet<Proxy> {
        match self.format {
            SourceFormat::HtmlTable => parse_html_table(content),
            SourceFormat::PlainText => parse_plain_text(content),
        }
    }
}

/// Fetch every source concurrently and union the results.
///
/// A source that fails contributes nothing. When two sources list the same
/// endpoint, the record from the earlier source is kept.
pub async fn harvest(client: &Client, sources: &[Source]) -> HashSet<Proxy> {
    info!("Harvesting proxies from {} sources", sources.len());

    let results = future::join_all(sources.iter().map(|source| fetch_source(client, source))).await;

    let mut available = HashSet::new();
    for (source, result) in sources.iter().zip(results) {
        match result {
            Ok(proxies) => {
                info!("Fetched {} proxies from {}", proxies.len(), source.url);
                available.extend(proxies);
            }
            Err(e) => {
                warn!("{}", e);
            }
        }
    }

    info!("Harvested {} unique proxies", available.len());
    available
}

/// Fetch and parse one source.
pub async fn fetch_source(client: &Client, source: &Source) -> Result<HashSet<Proxy>, RotatorError> {
    let unavailable = |reason: String| RotatorError::SourceUnavailable {
        url: source.url.clone(),
        reason,
    };

    let content = if source.is_remote() {
        let response = client
            .get(&source.url)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        if response.status() != StatusCode::OK {
            return Err(unavailable(format!("status {}", response.status())));
        }

        response.text().await.map_err(|e| unavailable(e.to_string()))?
    } else {
        tokio::fs::read_to_string(&source.url)
            .await
            .map_err(|e| unavailable(e.to_string()))?
    };

    Ok(source.parse(&content))
}

/// Extract proxies from a free-proxy-list style HTML table.
pub(crate) fn parse_html_table(content: &str) -> HashSet<Proxy> {
    let (Ok(rows), Ok(cells)) = (Selector::parse("tr"), Selector::parse("td")) else {
        return HashSet::new();
    };

    let document = Html::parse_document(content);
    let mut proxies = HashSet::new();

    for row in document.select(&rows) {
        let columns: Vec<String> = row
            .select(&cells)
            .map(|cell| cell.text().collect::<String>())
            .collect();

        if columns.len() < 7 {
            continue;
        }

        match Proxy::from_raw(&columns[0], &columns[1], &columns[2], &columns[4], &columns[6]) {
            Ok(proxy) => {
                proxies.insert(proxy);
            }
            Err(e) => debug!("Skipping row: {}", e),
        }
    }

    proxies
}

/// Extract proxies from a plain `ip:port` list.
pub(crate) fn parse_plain_text(content: &str) -> HashSet<Proxy> {
    content
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let line = line.strip_prefix("http://").unwrap_or(line);
            let (address, port) = line.rsplit_once(':')?;

            match Proxy::from_raw(address, port, "", "", "") {
                Ok(proxy) => Some(proxy),
                Err(e) => {
                    debug!("Skipping line: {}", e);
                    None
                }
            }
        })
        .collect()
}
