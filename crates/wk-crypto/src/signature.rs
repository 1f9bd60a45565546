//! RSA signature operations.
//!
//! SAML 2.0 interoperability requires RSA PKCS#1 v1.5 signatures. SHA-256
//! is the default hash; SHA-1 signatures can still be *verified* for
//! messages from legacy identity providers, but the backend provides no
//! SHA-1 signing path and new signatures are never created with it.

use aws_lc_rs::{
    rand::SystemRandom,
    signature::{self, RsaKeyPair},
};
use thiserror::Error;

/// Error type for signature operations.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// Signing failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Verification could not be attempted.
    #[error("signature verification failed")]
    Verification,

    /// Invalid key format.
    #[error("invalid key format: {0}")]
    InvalidKey(String),

    /// Algorithm not supported.
    #[error("algorithm not supported: {0}")]
    UnsupportedAlgorithm(String),
}

/// RSA PKCS#1 v1.5 signature algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaAlgorithm {
    /// RSA with SHA-1. Verification only; kept for legacy peers.
    Sha1,
    /// RSA with SHA-256 (default).
    Sha256,
    /// RSA with SHA-384.
    Sha384,
    /// RSA with SHA-512.
    Sha512,
}

impl RsaAlgorithm {
    /// Returns true if this algorithm uses a deprecated hash.
    #[must_use]
    pub const fn is_legacy(self) -> bool {
        matches!(self, Self::Sha1)
    }

    /// Returns the hash name, e.g. for log messages.
    #[must_use]
    pub const fn digest_name(self) -> &'static str {
        match self {
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        }
    }
}

/// Signs data with an RSA private key.
///
/// # Errors
///
/// Returns [`SignatureError::UnsupportedAlgorithm`] for SHA-1 (no signing
/// path exists for it) and [`SignatureError::Signing`] if the backend
/// rejects the operation.
pub fn rsa_sign(
    key_pair: &RsaKeyPair,
    data: &[u8],
    algorithm: RsaAlgorithm,
) -> Result<Vec<u8>, SignatureError> {
    let padding = match algorithm {
        RsaAlgorithm::Sha256 => &signature::RSA_PKCS1_SHA256,
        RsaAlgorithm::Sha384 => &signature::RSA_PKCS1_SHA384,
        RsaAlgorithm::Sha512 => &signature::RSA_PKCS1_SHA512,
        RsaAlgorithm::Sha1 => {
            return Err(SignatureError::UnsupportedAlgorithm(
                "RSA-SHA1 signature creation is not supported; use RSA-SHA256".to_string(),
            ));
        }
    };

    let rng = SystemRandom::new();
    let mut sig = vec![0u8; key_pair.public_modulus_len()];

    key_pair
        .sign(padding, &rng, data, &mut sig)
        .map_err(|e| SignatureError::Signing(format!("RSA signing failed: {e}")))?;

    Ok(sig)
}

/// Verifies an RSA PKCS#1 v1.5 signature.
///
/// `public_key_der` may be either an X.509 `SubjectPublicKeyInfo` or a
/// PKCS#1 `RSAPublicKey`; the backend accepts both encodings.
///
/// A well-formed but cryptographically invalid signature yields `Ok(false)`.
///
/// # Errors
///
/// This function currently has no error paths beyond the returned boolean,
/// but keeps the `Result` shape so callers treat verification fallibly.
pub fn rsa_verify(
    public_key_der: &[u8],
    data: &[u8],
    sig: &[u8],
    algorithm: RsaAlgorithm,
) -> Result<bool, SignatureError> {
    let verification_alg: &dyn signature::VerificationAlgorithm = match algorithm {
        RsaAlgorithm::Sha1 => &signature::RSA_PKCS1_2048_8192_SHA1_FOR_LEGACY_USE_ONLY,
        RsaAlgorithm::Sha256 => &signature::RSA_PKCS1_2048_8192_SHA256,
        RsaAlgorithm::Sha384 => &signature::RSA_PKCS1_2048_8192_SHA384,
        RsaAlgorithm::Sha512 => &signature::RSA_PKCS1_2048_8192_SHA512,
    };

    let public_key = signature::UnparsedPublicKey::new(verification_alg, public_key_der);

    match public_key.verify(data, sig) {
        Ok(()) => Ok(true),
        Err(_) => Ok(false),
    }
}
