//! XML Signature support for SAML.
//!
//! This module provides XML Digital Signature (XML-DSig) support for
//! signing and validating SAML messages:
//!
//! - [`XmlSigner`] - signs a document with an enveloped signature
//! - [`XmlSignatureValidator`] - validates a document against a trusted
//!   public key supplied out-of-band
//! - [`c14n`] - exclusive canonicalization of document subtrees
//!
//! The signing path produces RSA-SHA256 signatures with SHA-256 digests by
//! default. SHA-1 digests remain available for legacy identity providers;
//! SHA-1 signature *methods* can be verified (behind an explicit opt-in)
//! but never created.

pub mod c14n;
mod signer;
mod validator;

pub use signer::*;
pub use validator::*;

use crate::types::{canonicalization_algorithms, digest_algorithms, signature_algorithms};

/// Signature algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureAlgorithm {
    /// RSA with SHA-256 (recommended).
    #[default]
    RsaSha256,
    /// RSA with SHA-384.
    RsaSha384,
    /// RSA with SHA-512.
    RsaSha512,
    /// Legacy RSA with SHA-1 (verification only).
    RsaSha1,
    /// Legacy DSA with SHA-1.
    DsaSha1,
    /// DSA with SHA-256.
    DsaSha256,
}

impl SignatureAlgorithm {
    /// Returns the URI for this signature algorithm.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::RsaSha256 => signature_algorithms::RSA_SHA256,
            Self::RsaSha384 => signature_algorithms::RSA_SHA384,
            Self::RsaSha512 => signature_algorithms::RSA_SHA512,
            Self::RsaSha1 => signature_algorithms::RSA_SHA1,
            Self::DsaSha1 => signature_algorithms::DSA_SHA1,
            Self::DsaSha256 => signature_algorithms::DSA_SHA256,
        }
    }

    /// Parses a signature algorithm from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            signature_algorithms::RSA_SHA256 => Some(Self::RsaSha256),
            signature_algorithms::RSA_SHA384 => Some(Self::RsaSha384),
            signature_algorithms::RSA_SHA512 => Some(Self::RsaSha512),
            signature_algorithms::RSA_SHA1 => Some(Self::RsaSha1),
            signature_algorithms::DSA_SHA1 => Some(Self::DsaSha1),
            signature_algorithms::DSA_SHA256 => Some(Self::DsaSha256),
            _ => None,
        }
    }

    /// Returns true if this algorithm uses RSA.
    #[must_use]
    pub const fn is_rsa(&self) -> bool {
        matches!(self, Self::RsaSha256 | Self::RsaSha384 | Self::RsaSha512 | Self::RsaSha1)
    }

    /// Returns true if this algorithm uses DSA.
    #[must_use]
    pub const fn is_dsa(&self) -> bool {
        matches!(self, Self::DsaSha1 | Self::DsaSha256)
    }

    /// Returns true if this algorithm uses a deprecated hash (SHA-1).
    #[must_use]
    pub const fn is_deprecated(&self) -> bool {
        matches!(self, Self::RsaSha1 | Self::DsaSha1)
    }

    /// Maps to the crypto backend's RSA algorithm, if this is one.
    #[must_use]
    pub const fn rsa_algorithm(&self) -> Option<wk_crypto::RsaAlgorithm> {
        match self {
            Self::RsaSha1 => Some(wk_crypto::RsaAlgorithm::Sha1),
            Self::RsaSha256 => Some(wk_crypto::RsaAlgorithm::Sha256),
            Self::RsaSha384 => Some(wk_crypto::RsaAlgorithm::Sha384),
            Self::RsaSha512 => Some(wk_crypto::RsaAlgorithm::Sha512),
            Self::DsaSha1 | Self::DsaSha256 => None,
        }
    }
}

/// Digest algorithm selection for the signed reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigestAlgorithm {
    /// SHA-256 (recommended).
    #[default]
    Sha256,
    /// Legacy SHA-1, kept for interoperability with older identity
    /// providers.
    Sha1,
}

impl DigestAlgorithm {
    /// Returns the URI for this digest algorithm.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::Sha256 => digest_algorithms::SHA256,
            Self::Sha1 => digest_algorithms::SHA1,
        }
    }

    /// Parses a digest algorithm from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            digest_algorithms::SHA256 => Some(Self::Sha256),
            digest_algorithms::SHA1 => Some(Self::Sha1),
            _ => None,
        }
    }

    /// Computes the digest of the given data.
    #[must_use]
    pub fn compute(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => wk_crypto::sha256(data),
            Self::Sha1 => wk_crypto::sha1(data),
        }
    }
}

/// Canonicalization algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CanonicalizationAlgorithm {
    /// Exclusive C14N without comments (recommended).
    #[default]
    ExclusiveC14N,
    /// Exclusive C14N with comments.
    ExclusiveC14NWithComments,
}

impl CanonicalizationAlgorithm {
    /// Returns the URI for this canonicalization algorithm.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::ExclusiveC14N => canonicalization_algorithms::EXCLUSIVE_C14N,
            Self::ExclusiveC14NWithComments => {
                canonicalization_algorithms::EXCLUSIVE_C14N_WITH_COMMENTS
            }
        }
    }

    /// Parses a canonicalization algorithm from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            canonicalization_algorithms::EXCLUSIVE_C14N => Some(Self::ExclusiveC14N),
            canonicalization_algorithms::EXCLUSIVE_C14N_WITH_COMMENTS => {
                Some(Self::ExclusiveC14NWithComments)
            }
            _ => None,
        }
    }

    /// Returns true if comments survive canonicalization.
    #[must_use]
    pub const fn with_comments(&self) -> bool {
        matches!(self, Self::ExclusiveC14NWithComments)
    }
}

/// A parsed `<ds:Signature>` block.
#[derive(Debug, Clone)]
pub struct XmlSignature {
    /// The signature algorithm used.
    pub algorithm: SignatureAlgorithm,
    /// The canonicalization algorithm used.
    pub canonicalization: CanonicalizationAlgorithm,
    /// The digest algorithm of the reference.
    pub digest_algorithm: DigestAlgorithm,
    /// The reference URI ("" for the whole document, or "#id").
    pub reference_uri: String,
    /// The digest value (base64 encoded).
    pub digest_value: String,
    /// The signature value (base64 encoded).
    pub signature_value: String,
    /// Optional X.509 certificate from KeyInfo (base64 DER). Carried for
    /// diagnostics only; never used for key selection.
    pub x509_certificate: Option<String>,
}

/// Configuration for signature creation.
#[derive(Debug, Clone)]
pub struct SignatureConfig {
    /// The signature algorithm to use.
    pub algorithm: SignatureAlgorithm,
    /// The digest algorithm for the signed reference.
    pub digest: DigestAlgorithm,
    /// The canonicalization algorithm to use.
    pub canonicalization: CanonicalizationAlgorithm,
    /// Whether to include the X.509 certificate in KeyInfo.
    pub include_certificate: bool,
    /// Whether to include the raw RSA public key in KeyInfo.
    pub include_key_value: bool,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            algorithm: SignatureAlgorithm::RsaSha256,
            digest: DigestAlgorithm::Sha256,
            canonicalization: CanonicalizationAlgorithm::ExclusiveC14N,
            include_certificate: true,
            include_key_value: true,
        }
    }
}

impl SignatureConfig {
    /// Creates a configuration with the legacy SHA-1 digest, for peers
    /// that cannot negotiate SHA-256.
    #[must_use]
    pub fn legacy_sha1_digest() -> Self {
        Self {
            digest: DigestAlgorithm::Sha1,
            ..Self::default()
        }
    }
}

#[cfg(test)]
pub(crate) mod testkeys {
    //! Shared test key material: a fresh RSA key pair and a matching
    //! self-signed certificate.

    use aws_lc_rs::encoding::AsDer;
    use aws_lc_rs::rsa::KeySize;
    use aws_lc_rs::signature::RsaKeyPair;
    use wk_crypto::SigningKey;

    pub fn rsa_key_and_cert(common_name: &str) -> (SigningKey, Vec<u8>) {
        let key_pair = RsaKeyPair::generate(KeySize::Rsa2048).unwrap();
        let pkcs8 = AsDer::<aws_lc_rs::encoding::Pkcs8V1Der>::as_der(&key_pair).unwrap();

        let rcgen_key = rcgen::KeyPair::try_from(pkcs8.as_ref()).unwrap();
        let cert = rcgen::CertificateParams::new(vec![common_name.to_string()])
            .unwrap()
            .self_signed(&rcgen_key)
            .unwrap();

        let key = SigningKey::from_pkcs8(pkcs8.as_ref()).unwrap();
        (key, cert.der().to_vec())
    }
}
