//! # wk-crypto
//!
//! Cryptographic operations for the wicket SSO broker, built on aws-lc-rs.
//!
//! This crate provides the primitives the SAML protocol layer needs:
//!
//! - SHA-1/SHA-256 digests and HMAC keyed hashing
//! - Cryptographically secure random generation
//! - Typed signing-key material ([`SigningKey`]) resolved once at load time
//! - RSA PKCS#1 v1.5 signing and verification
//!
//! SHA-1 support exists solely for interoperability with legacy SAML
//! identity providers and uses the backend's legacy-only algorithm handles.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod hash;
pub mod keys;
pub mod random;
pub mod signature;

pub use hash::{hmac_sha1, hmac_sha1_verify, hmac_sha256, sha1, sha256};
pub use keys::SigningKey;
pub use random::{random_alphanumeric, random_bytes};
pub use signature::{rsa_verify, RsaAlgorithm, SignatureError};
