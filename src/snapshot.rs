//! Persisting the pool state between runs.
//!
//! The snapshot is a single JSON document, `snapshot.json`, inside the cache
//! directory. Its header (format version and policy fingerprint) is checked
//! before the proxy lists are decoded, so a snapshot written under another
//! policy is refused without being loaded.

use crate::error::RotatorError;
use crate::filter::Fingerprint;
use crate::proxy::Proxy;
use crate::rotator::PoolState;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the snapshot file inside the cache directory.
pub const SNAPSHOT_FILE: &str = "snapshot.json";

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Deserialize)]
struct Header {
    version: u32,
    fingerprint: Fingerprint,
}

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    fingerprint: Fingerprint,
    blocked: Vec<Proxy>,
    crawled: Vec<Proxy>,
    selected: Option<Proxy>,
}

pub fn snapshot_path(dir: &Path) -> PathBuf {
    dir.join(SNAPSHOT_FILE)
}

/// Write `state` to the snapshot file in `dir`, creating `dir` if needed.
pub fn save(dir: &Path, fingerprint: &Fingerprint, state: &PoolState) -> Result<(), RotatorError> {
    fs::create_dir_all(dir)?;

    let snapshot = Snapshot {
        version: SNAPSHOT_VERSION,
        fingerprint: *fingerprint,
        blocked: sorted(state.blocked.iter()),
        crawled: sorted(state.crawled.iter()),
        selected: state.selected.clone(),
    };

    let path = snapshot_path(dir);
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(&snapshot)?)?;
    fs::rename(&tmp, &path)?;

    debug!(
        "Saved snapshot to {}: {} crawled, {} blocked",
        path.display(),
        snapshot.crawled.len(),
        snapshot.blocked.len()
    );
    Ok(())
}

/// Read the snapshot in `dir`, if any.
///
/// Fails with `PolicyMismatch` when the snapshot was written under a
/// different fingerprint than `expected`.
pub fn load(dir: &Path, expected: &Fingerprint) -> Result<Option<PoolState>, RotatorError> {
    let path = snapshot_path(dir);
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read(&path)?;

    let header: Header = serde_json::from_slice(&content)?;
    if header.version != SNAPSHOT_VERSION {
        return Err(RotatorError::SnapshotVersion(header.version));
    }
    if header.fingerprint != *expected {
        return Err(RotatorError::PolicyMismatch {
            expected: *expected,
            found: header.fingerprint,
        });
    }

    let snapshot: Snapshot = serde_json::from_slice(&content)?;
    let blocked: HashSet<Proxy> = snapshot.blocked.into_iter().collect();
    let selected = snapshot.selected.filter(|proxy| !blocked.contains(proxy));
    let crawled: HashSet<Proxy> = snapshot
        .crawled
        .into_iter()
        .filter(|proxy| !blocked.contains(proxy) && selected.as_ref() != Some(proxy))
        .collect();
    let state = PoolState {
        blocked,
        crawled,
        selected,
    };

    info!(
        "Loaded snapshot from {}: {} crawled, {} blocked",
        path.display(),
        state.crawled.len(),
        state.blocked.len()
    );
    Ok(Some(state))
}

fn sorted<'a>(proxies: impl Iterator<Item = &'a Proxy>) -> Vec<Proxy> {
    let mut proxies: Vec<Proxy> = proxies.cloned().collect();
    proxies.sort_by(|a, b| (&a.address, a.port).cmp(&(&b.address, b.port)));
    proxies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::Anonymity;
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};

    fn fingerprint(anonymity: Anonymity) -> Fingerprint {
        Fingerprint {
            anonymity: Some(anonymity),
            secure: true,
        }
    }

    fn state() -> PoolState {
        PoolState {
            crawled: HashSet::from([
                Proxy::new("192.168.1.1", 8080, "US", Anonymity::High, true),
                Proxy::new("192.168.1.2", 3128, "", Anonymity::High, true),
            ]),
            blocked: HashSet::from([Proxy::new("10.0.0.1", 80, "DE", Anonymity::High, true)]),
            selected: Some(Proxy::new("172.16.0.1", 8080, "CA", Anonymity::High, true)),
        }
    }

    fn fields(proxies: &HashSet<Proxy>) -> Vec<(String, u16, String, Anonymity, bool)> {
        let mut fields: Vec<_> = proxies
            .iter()
            .map(|p| (p.address.clone(), p.port, p.country.clone(), p.anonymity, p.secure))
            .collect();
        fields.sort_by(|a, b| (&a.0, a.1).cmp(&(&b.0, b.1)));
        fields
    }

    #[test]
    fn test_load_missing_snapshot() {
        let dir = TempDir::new().unwrap();
        assert!(load(dir.path(), &fingerprint(Anonymity::High)).unwrap().is_none());
    }

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let cache = dir.path().join("nested").join("cache");
        let state = state();

        assert_ok!(save(&cache, &fingerprint(Anonymity::High), &state));
        assert!(snapshot_path(&cache).exists());

        let loaded = assert_ok!(load(&cache, &fingerprint(Anonymity::High))).unwrap();
        assert_eq!(loaded, state);
        assert_eq!(fields(&loaded.crawled), fields(&state.crawled));
        assert_eq!(fields(&loaded.blocked), fields(&state.blocked));
        let selected = loaded.selected.unwrap();
        assert_eq!(selected.country, "CA");
        assert_eq!(selected.anonymity, Anonymity::High);
    }

    #[test]
    fn test_policy_mismatch() {
        let dir = TempDir::new().unwrap();
        save(dir.path(), &fingerprint(Anonymity::High), &state()).unwrap();

        let result = load(dir.path(), &fingerprint(Anonymity::Medium));
        assert!(matches!(
            result,
            Err(RotatorError::PolicyMismatch { expected, found })
                if expected.anonymity == Some(Anonymity::Medium)
                    && found.anonymity == Some(Anonymity::High)
        ));

        let insecure = Fingerprint {
            anonymity: Some(Anonymity::High),
            secure: false,
        };
        assert!(matches!(
            load(dir.path(), &insecure),
            Err(RotatorError::PolicyMismatch { .. })
        ));
    }

    #[test]
    fn test_unknown_version_is_refused() {
        let dir = TempDir::new().unwrap();
        fs::write(
            snapshot_path(dir.path()),
            r#"{"version":99,"fingerprint":{"anonymity":null,"secure":true}}"#,
        )
        .unwrap();

        let expected = Fingerprint {
            anonymity: None,
            secure: true,
        };
        assert!(matches!(
            load(dir.path(), &expected),
            Err(RotatorError::SnapshotVersion(99))
        ));
    }

    #[test]
    fn test_garbage_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(snapshot_path(dir.path()), b"\x80\x04pickle").unwrap();
        let err = assert_err!(load(dir.path(), &fingerprint(Anonymity::High)));
        assert!(matches!(err, RotatorError::Serialization(_)));
    }

    #[test]
    fn test_blocked_entries_are_dropped_from_crawled() {
        let dir = TempDir::new().unwrap();
        let mut state = state();
        state
            .blocked
            .insert(Proxy::new("192.168.1.1", 8080, "US", Anonymity::High, true));

        save(dir.path(), &fingerprint(Anonymity::High), &state).unwrap();
        let loaded = load(dir.path(), &fingerprint(Anonymity::High)).unwrap().unwrap();
        assert_eq!(loaded.crawled.len(), 1);
        assert!(loaded.crawled.is_disjoint(&loaded.blocked));
    }

    #[test]
    fn test_blocked_selection_is_dropped() {
        let dir = TempDir::new().unwrap();
        let mut state = state();
        state
            .blocked
            .insert(Proxy::new("172.16.0.1", 8080, "CA", Anonymity::High, true));

        save(dir.path(), &fingerprint(Anonymity::High), &state).unwrap();
        let loaded = load(dir.path(), &fingerprint(Anonymity::High)).unwrap().unwrap();
        assert!(loaded.selected.is_none());
        assert_eq!(loaded.crawled.len(), 2);
    }

    #[test]
    fn test_selection_is_removed_from_crawled() {
        let dir = TempDir::new().unwrap();
        let mut state = state();
        let selected = state.selected.clone().unwrap();
        state.crawled.insert(selected.clone());

        save(dir.path(), &fingerprint(Anonymity::High), &state).unwrap();
        let loaded = load(dir.path(), &fingerprint(Anonymity::High)).unwrap().unwrap();
        assert_eq!(loaded.selected, Some(selected.clone()));
        assert!(!loaded.crawled.contains(&selected));
        assert_eq!(loaded.crawled.len(), 2);
    }
}
