//! Configuration fingerprinting and the atomic visited-set.

use dashmap::DashSet;
use sha2::{Digest, Sha256};

use at_types::{Configuration, Fingerprint};

/// Compute the deduplication fingerprint of a configuration: SHA-256 of its
/// canonical JSON encoding, as lowercase hex.
pub fn fingerprint_of(config: &Configuration) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(config.canonical_json().as_bytes());
    Fingerprint(format!("{:x}", hasher.finalize()))
}

/// Tracks the set of fingerprints already evaluated or in flight.
///
/// Admission is an atomic check-and-insert: two concurrent callers with the
/// same fingerprint see exactly one admission.
#[derive(Debug, Default)]
pub struct FingerprintTracker {
    seen: DashSet<Fingerprint>,
}

impl FingerprintTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the fingerprint and try to claim it. Returns the fingerprint
    /// and whether it was admitted (`false` = already present, no side
    /// effects).
    pub fn admit(&self, config: &Configuration) -> (Fingerprint, bool) {
        let fp = fingerprint_of(config);
        let admitted = self.seen.insert(fp.clone());
        (fp, admitted)
    }

    pub fn contains(&self, fp: &Fingerprint) -> bool {
        self.seen.contains(fp)
    }

    /// Number of distinct configurations admitted so far.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
