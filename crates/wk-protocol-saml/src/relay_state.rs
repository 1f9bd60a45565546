//! Relay-state integrity and replay protection.
//!
//! The relay state is an opaque correlation token carried alongside SAML
//! messages. It is protected two ways: an HMAC-SHA1 digest binds the token
//! to a secret key, and a freshness window bounds how long an accepted
//! token may be replayed.
//!
//! The guard holds no storage. Callers own the set of accepted records and
//! prune it with [`retain_fresh`]; the secret key is an explicit value per
//! server instance or session, never a process-wide singleton.

use std::time::{Duration, SystemTime};

/// Default secret key length in bytes.
const SECRET_KEY_LEN: usize = 20;

/// Random key material for relay-state HMAC signing.
///
/// Immutable once generated; safe to share across threads for read-only
/// use.
#[derive(Clone)]
pub struct SecretKey {
    bytes: Vec<u8>,
}

impl SecretKey {
    /// Generates a fresh random key (20 bytes) from a cryptographically
    /// secure source.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            bytes: wk_crypto::random_bytes(SECRET_KEY_LEN),
        }
    }

    /// Wraps caller-provided key bytes.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Returns the raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material stays out of logs.
        f.debug_struct("SecretKey").finish_non_exhaustive()
    }
}

/// Signs and verifies relay-state tokens with a secret key.
pub struct RelayStateGuard {
    key: SecretKey,
}

impl RelayStateGuard {
    /// Creates a guard over an existing secret key.
    #[must_use]
    pub fn new(key: SecretKey) -> Self {
        Self { key }
    }

    /// Creates a guard with a freshly generated secret key.
    #[must_use]
    pub fn generate() -> Self {
        Self::new(SecretKey::generate())
    }

    /// Returns the guard's secret key.
    #[must_use]
    pub fn key(&self) -> &SecretKey {
        &self.key
    }

    /// Computes the HMAC-SHA1 digest of a relay-state value as a lowercase
    /// hex string (40 characters).
    #[must_use]
    pub fn sign(&self, value: &str) -> String {
        hex::encode(wk_crypto::hmac_sha1(self.key.as_bytes(), value.as_bytes()))
    }

    /// Verifies a relay-state value against its hex digest in constant
    /// time. Malformed hex fails verification.
    #[must_use]
    pub fn verify(&self, value: &str, digest: &str) -> bool {
        let Ok(tag) = hex::decode(digest) else {
            return false;
        };
        wk_crypto::hmac_sha1_verify(self.key.as_bytes(), value.as_bytes(), &tag)
    }
}

/// Returns true iff `timestamp` is still inside the freshness window:
/// `now - timestamp < window`. A record aged exactly `window` is stale.
/// Timestamps at or after `now` are fresh.
#[must_use]
pub fn is_fresh(timestamp: SystemTime, window: Duration, now: SystemTime) -> bool {
    match now.duration_since(timestamp) {
        Ok(age) => age < window,
        // timestamp is in the future relative to now.
        Err(_) => true,
    }
}

/// Prunes a caller-owned collection of timestamped records down to those
/// still inside the freshness window.
pub fn retain_fresh<T>(
    records: &mut Vec<T>,
    window: Duration,
    now: SystemTime,
    issued_at: impl Fn(&T) -> SystemTime,
) {
    records.retain(|record| is_fresh(issued_at(record), window, now));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_40_hex_chars() {
        let guard = RelayStateGuard::generate();
        let digest = guard.sign("some-relay-token");
        assert_eq!(digest.len(), 40);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn digest_is_deterministic() {
        let guard = RelayStateGuard::generate();
        assert_eq!(guard.sign("token"), guard.sign("token"));
    }

    #[test]
    fn different_keys_produce_different_digests() {
        let a = RelayStateGuard::generate();
        let b = RelayStateGuard::generate();
        assert_ne!(a.sign("token"), b.sign("token"));
    }

    #[test]
    fn verify_roundtrip() {
        let guard = RelayStateGuard::generate();
        let digest = guard.sign("token");
        assert!(guard.verify("token", &digest));
        assert!(!guard.verify("other", &digest));
        assert!(!guard.verify("token", "not-hex"));
    }

    #[test]
    fn verify_rejects_foreign_digest() {
        let ours = RelayStateGuard::generate();
        let theirs = RelayStateGuard::generate();
        let digest = theirs.sign("token");
        assert!(!ours.verify("token", &digest));
    }

    #[test]
    fn freshness_window() {
        let now = SystemTime::now();
        let window = Duration::from_secs(300);

        assert!(is_fresh(now - Duration::from_secs(299), window, now));
        assert!(is_fresh(now, window, now));
        // Records from the future count as fresh.
        assert!(is_fresh(now + Duration::from_secs(10), window, now));
        // Boundary: age == window is stale.
        assert!(!is_fresh(now - Duration::from_secs(300), window, now));
        assert!(!is_fresh(now - Duration::from_secs(301), window, now));
    }

    #[test]
    fn retain_fresh_prunes_stale_records() {
        let now = SystemTime::now();
        let window = Duration::from_secs(60);

        let mut records = vec![
            ("fresh", now - Duration::from_secs(10)),
            ("stale", now - Duration::from_secs(120)),
            ("boundary", now - Duration::from_secs(60)),
        ];
        retain_fresh(&mut records, window, now, |r| r.1);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, "fresh");
    }
}
