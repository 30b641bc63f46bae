//! Policy filter applied to harvested proxies.

use crate::proxy::{Anonymity, Proxy};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::Ipv4Addr;

/// Which proxies the rotator is allowed to hand out.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    /// Required anonymity level. `None` accepts any level.
    pub anonymity: Option<Anonymity>,
    /// Allowed country codes. `None` accepts any country.
    pub countries: Option<HashSet<String>>,
    /// Required HTTPS support.
    pub secure: bool,
}

/// The part of a policy a persisted snapshot must agree with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub anonymity: Option<Anonymity>,
    pub secure: bool,
}

impl Policy {
    /// Whether `proxy` passes every check of this policy.
    ///
    /// Only literal IPv4 addresses are accepted since the proxies are used as
    /// plain `http://ip:port` targets. Anonymity must match exactly, not "at
    /// least".
    pub fn keep(&self, proxy: &Proxy) -> bool {
        if proxy.address.parse::<Ipv4Addr>().is_err() {
            return false;
        }

        if let Some(anonymity) = self.anonymity {
            if proxy.anonymity != anonymity {
                return false;
            }
        }

        if let Some(countries) = &self.countries {
            if !countries.contains(&proxy.country) {
                return false;
            }
        }

        proxy.secure == self.secure
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint {
            anonymity: self.anonymity,
            secure: self.secure,
        }
    }
}
