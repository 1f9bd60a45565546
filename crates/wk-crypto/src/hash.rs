//! Hash and HMAC functions.
//!
//! SHA-256 is the default digest throughout wicket. SHA-1 is kept for
//! interoperability with legacy SAML peers and maps to the backend's
//! legacy-only algorithm handles.

use aws_lc_rs::{digest, hmac};

/// Computes a SHA-1 digest of the input data.
///
/// Legacy SAML deployments still negotiate SHA-1 digests; new integrations
/// should use [`sha256`].
#[must_use]
pub fn sha1(data: &[u8]) -> Vec<u8> {
    digest::digest(&digest::SHA1_FOR_LEGACY_USE_ONLY, data)
        .as_ref()
        .to_vec()
}

/// Computes a SHA-256 digest of the input data.
#[must_use]
pub fn sha256(data: &[u8]) -> Vec<u8> {
    digest::digest(&digest::SHA256, data).as_ref().to_vec()
}

/// Computes an HMAC-SHA1 tag over `data` with the given key bytes.
///
/// The tag is 20 bytes long.
#[must_use]
pub fn hmac_sha1(key: &[u8], data: &[u8]) -> Vec<u8> {
    let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, key);
    hmac::sign(&key, data).as_ref().to_vec()
}

/// Computes an HMAC-SHA256 tag over `data` with the given key bytes.
#[must_use]
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let key = hmac::Key::new(hmac::HMAC_SHA256, key);
    hmac::sign(&key, data).as_ref().to_vec()
}

/// Verifies an HMAC-SHA1 tag in constant time.
#[must_use]
pub fn hmac_sha1_verify(key: &[u8], data: &[u8], tag: &[u8]) -> bool {
    let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, key);
    hmac::verify(&key, data, tag).is_ok()
}
