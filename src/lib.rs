//! # reqwest-proxy-rotator
//!
//! A rotating pool of free HTTP proxies, with a middleware for reqwest.
//!
//! The rotator harvests candidate proxies from public listing pages, keeps the
//! ones matching the configured policy (anonymity, country, HTTPS support),
//! optionally checks that they answer, and hands them out one at a time. A
//! proxy that has been handed out is never handed out again by the same
//! process. The pool can be persisted to a cache directory between runs.

pub mod config;
pub mod error;
pub mod filter;
pub mod middleware;
pub mod probe;
pub mod proxy;
pub mod repository;
pub mod rotator;
pub mod schedule;
pub mod snapshot;
pub mod source;
#[cfg(test)]
mod test_util;

pub use config::{RotatorConfig, RotatorConfigBuilder};
pub use error::{NoProxyAvailable, NoRotationsLeft, RotatorError};
pub use filter::{Fingerprint, Policy};
pub use middleware::{client, ProxyRotatorMiddleware};
pub use proxy::{Anonymity, Proxy};
pub use repository::{HttpRepository, Repository};
pub use rotator::{PoolState, ProxyRotator};
pub use source::{Source, SourceFormat};
