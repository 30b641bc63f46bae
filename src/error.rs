//! Error types for the reqwest-proxy-rotator crate.

use crate::filter::Fingerprint;
use thiserror::Error;

/// Errors raised while harvesting, probing, or persisting the pool.
///
/// Per-endpoint failures (`MalformedRecord`, `SourceUnavailable`, `ProbeTimeout`,
/// `ProbeError`) are absorbed inside the pool and only logged. The rest are
/// returned to the caller.
#[derive(Debug, Error)]
pub enum RotatorError {
    /// A harvested record could not be turned into a proxy.
    #[error("Malformed proxy record: {0}")]
    MalformedRecord(String),

    /// A listing source could not be fetched.
    #[error("Source {url} unavailable: {reason}")]
    SourceUnavailable { url: String, reason: String },

    /// A reachability check ran out of time.
    #[error("Reachability check through {proxy} timed out")]
    ProbeTimeout { proxy: String },

    /// A reachability check failed for any other reason.
    #[error("Reachability check through {proxy} failed: {reason}")]
    ProbeError { proxy: String, reason: String },

    /// The snapshot on disk was written under a different policy.
    #[error("Snapshot policy {found:?} does not match configured policy {expected:?}")]
    PolicyMismatch {
        expected: Fingerprint,
        found: Fingerprint,
    },

    /// The snapshot on disk uses a format version this build cannot read.
    #[error("Unsupported snapshot version {0}")]
    SnapshotVersion(u32),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Error returned when the rotator has no endpoint to hand out.
#[derive(Debug, Error)]
#[error("No proxy available in pool")]
pub struct NoProxyAvailable;

/// Error returned when every rotation allowed for a request was used up.
#[derive(Debug, Error)]
#[error("No proxy rotations left after {attempts} attempts")]
pub struct NoRotationsLeft {
    pub attempts: usize,
}
