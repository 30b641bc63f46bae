//! Proxy representation and anonymity level.

use crate::error::RotatorError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Anonymity level advertised by a listing source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Anonymity {
    /// The source did not say, or used a label we do not recognise.
    Unknown,
    /// Transparent proxy, forwards the client address.
    Weak,
    /// Anonymous proxy, hides the client address but reveals itself as a proxy.
    Medium,
    /// Elite proxy.
    High,
}

impl Anonymity {
    /// Map a free-text label scraped from a listing page.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "elite" | "elite proxy" => Anonymity::High,
            "anonymous" => Anonymity::Medium,
            "transparent" => Anonymity::Weak,
            _ => Anonymity::Unknown,
        }
    }
}

/// A proxy endpoint harvested from a listing source.
///
/// Two proxies are the same endpoint when `address` and `port` match; the
/// remaining fields are metadata and take no part in equality or hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proxy {
    /// Host name or literal IP address.
    pub address: String,
    /// TCP port of the proxy.
    pub port: u16,
    /// ISO 3166-1 alpha-2 country code, uppercase, empty when unknown.
    pub country: String,
    /// Anonymity level claimed by the source.
    pub anonymity: Anonymity,
    /// Whether the proxy claims to tunnel HTTPS.
    pub secure: bool,
}

impl Proxy {
    /// Create a proxy from already-normalized fields.
    pub fn new(
        address: impl Into<String>,
        port: u16,
        country: impl Into<String>,
        anonymity: Anonymity,
        secure: bool,
    ) -> Self {
        Self {
            address: address.into(),
            port,
            country: country.into(),
            anonymity,
            secure,
        }
    }

    /// Build a proxy from the raw text columns of a listing row.
    pub fn from_raw(
        address: &str,
        port: &str,
        country: &str,
        anonymity: &str,
        https: &str,
    ) -> Result<Self, RotatorError> {
        let port = match port.trim().parse::<u16>() {
            Ok(port) if port > 0 => port,
            _ => {
                return Err(RotatorError::MalformedRecord(format!(
                    "invalid port {:?} for {}",
                    port,
                    address.trim()
                )))
            }
        };

        Ok(Self {
            address: address.trim().to_lowercase(),
            port,
            country: country.trim().to_uppercase(),
            anonymity: Anonymity::from_label(anonymity),
            secure: https.trim().to_lowercase() == "yes",
        })
    }

    /// The proxy URL handed to `reqwest::Proxy::all`.
    pub fn url(&self) -> String {
        format!("http://{}", self)
    }

    /// Convert the proxy to a reqwest::Proxy.
    pub fn to_reqwest_proxy(&self) -> Result<reqwest::Proxy, reqwest::Error> {
        reqwest::Proxy::all(self.url())
    }
}

impl PartialEq for Proxy {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address && self.port == other.port
    }
}

impl Eq for Proxy {}

impl Hash for Proxy {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
        self.port.hash(state);
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::collections::HashSet;

    fn hash_of(proxy: &Proxy) -> u64 {
        let mut hasher = DefaultHasher::new();
        proxy.hash(&mut hasher);
        hasher.finish()
    }

    fn sample() -> Proxy {
        Proxy::new("192.168.1.1", 8080, "US", Anonymity::High, true)
    }

    #[test]
    fn test_anonymity_from_label() {
        assert_eq!(Anonymity::from_label("elite proxy"), Anonymity::High);
        assert_eq!(Anonymity::from_label("elite"), Anonymity::High);
        assert_eq!(Anonymity::from_label("anonymous"), Anonymity::Medium);
        assert_eq!(Anonymity::from_label("Transparent"), Anonymity::Weak);
        assert_eq!(Anonymity::from_label("unknown"), Anonymity::Unknown);
        assert_eq!(Anonymity::from_label("a1b2c3d4e5"), Anonymity::Unknown);
    }

    #[test]
    fn test_identity_ignores_metadata() {
        let other = Proxy::new("192.168.1.1", 8080, "EU", Anonymity::Medium, false);
        assert_eq!(sample(), other);
        assert_eq!(hash_of(&sample()), hash_of(&other));
    }

    #[test]
    fn test_identity_depends_on_port() {
        let other = Proxy::new("192.168.1.1", 8081, "US", Anonymity::High, true);
        assert_ne!(sample(), other);
    }

    #[test]
    fn test_first_seen_metadata_wins_in_set() {
        let mut set = HashSet::new();
        set.insert(sample());
        assert!(!set.insert(Proxy::new("192.168.1.1", 8080, "CA", Anonymity::Weak, false)));

        let stored = set.iter().next().unwrap();
        assert_eq!(stored.country, "US");
        assert_eq!(stored.anonymity, Anonymity::High);
    }

    #[test]
    fn test_display_and_url() {
        assert_eq!(sample().to_string(), "192.168.1.1:8080");
        assert_eq!(sample().url(), "http://192.168.1.1:8080");
    }

    #[test]
    fn test_from_raw_normalizes_fields() {
        let proxy = Proxy::from_raw(" 10.0.0.1 ", "3128", "de", "Elite Proxy", "YES").unwrap();
        assert_eq!(proxy.address, "10.0.0.1");
        assert_eq!(proxy.port, 3128);
        assert_eq!(proxy.country, "DE");
        assert_eq!(proxy.anonymity, Anonymity::High);
        assert!(proxy.secure);

        let proxy = Proxy::from_raw("10.0.0.1", "80", "", "anonymous", "no").unwrap();
        assert!(!proxy.secure);
        assert_eq!(proxy.country, "");
    }

    #[test]
    fn test_from_raw_rejects_bad_ports() {
        for port in ["", "abc", "0", "65536", "-1"] {
            let result = Proxy::from_raw("10.0.0.1", port, "US", "elite proxy", "yes");
            assert!(
                matches!(result, Err(RotatorError::MalformedRecord(_))),
                "port {port:?} should be rejected"
            );
        }
    }
}
