//! Trust material: X.509 certificates and their public keys.
//!
//! Counterparty certificates arrive as base64 DER strings, the body of a
//! PEM block with or without its delimiters and with arbitrary line
//! breaks. Parsing strips whitespace, decodes, and validates the DER
//! structure once; the resulting [`Certificate`] is immutable.

use base64::Engine;
use x509_parser::prelude::*;

use crate::error::{SamlError, SamlResult};

/// A parsed X.509 certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    der: Vec<u8>,
    public_key: PublicKey,
    subject: String,
    issuer: String,
}

/// A public key extracted from a certificate, as `SubjectPublicKeyInfo` DER.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    spki_der: Vec<u8>,
}

impl PublicKey {
    /// Returns the `SubjectPublicKeyInfo` DER bytes.
    #[must_use]
    pub fn spki_der(&self) -> &[u8] {
        &self.spki_der
    }
}

impl Certificate {
    /// Parses a certificate from a base64 DER string.
    ///
    /// Whitespace and newlines anywhere in the input are tolerated and
    /// stripped, so PEM body text can be passed through directly.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::CertificateParse`] for malformed base64 or DER.
    pub fn parse(b64: &str) -> SamlResult<Self> {
        let stripped: String = b64.chars().filter(|c| !c.is_whitespace()).collect();
        let der = base64::engine::general_purpose::STANDARD
            .decode(stripped.as_bytes())
            .map_err(|e| SamlError::CertificateParse(format!("invalid base64: {e}")))?;
        Self::from_der(der)
    }

    /// Parses a certificate from a PEM string with `BEGIN/END CERTIFICATE`
    /// delimiters.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::CertificateParse`] if the delimiters are
    /// missing or the body is malformed.
    pub fn from_pem(pem: &str) -> SamlResult<Self> {
        let body = pem_body(pem, "CERTIFICATE").ok_or_else(|| {
            SamlError::CertificateParse("missing CERTIFICATE PEM delimiters".to_string())
        })?;
        Self::parse(&body)
    }

    /// Parses a certificate from DER bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::CertificateParse`] for malformed DER.
    pub fn from_der(der: Vec<u8>) -> SamlResult<Self> {
        let (_, cert) = X509Certificate::from_der(&der)
            .map_err(|e| SamlError::CertificateParse(format!("invalid X.509 DER: {e}")))?;

        let public_key = PublicKey {
            spki_der: cert.public_key().raw.to_vec(),
        };
        let subject = cert.subject().to_string();
        let issuer = cert.issuer().to_string();

        drop(cert);
        Ok(Self {
            der,
            public_key,
            subject,
            issuer,
        })
    }

    /// Returns the certificate's public key.
    #[must_use]
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Returns the raw DER bytes of the certificate.
    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Returns the subject distinguished name.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Returns the issuer distinguished name.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }
}

/// Extracts the base64 body between PEM delimiters for the given label.
pub(crate) fn pem_body(pem: &str, label: &str) -> Option<String> {
    let begin = format!("-----BEGIN {label}-----");
    let end = format!("-----END {label}-----");

    let start = pem.find(&begin)? + begin.len();
    let end_pos = pem.find(&end)?;
    Some(pem[start..end_pos].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    fn test_cert_der() -> Vec<u8> {
        let key_pair = rcgen::KeyPair::generate().unwrap();
        let cert = rcgen::CertificateParams::new(vec!["idp.example.com".to_string()])
            .unwrap()
            .self_signed(&key_pair)
            .unwrap();
        cert.der().to_vec()
    }

    #[test]
    fn parse_base64_der() {
        let der = test_cert_der();
        let b64 = base64::engine::general_purpose::STANDARD.encode(&der);
        let cert = Certificate::parse(&b64).unwrap();
        assert_eq!(cert.der(), der.as_slice());
        assert!(!cert.public_key().spki_der().is_empty());
    }

    #[test]
    fn whitespace_is_insignificant() {
        let der = test_cert_der();
        let b64 = base64::engine::general_purpose::STANDARD.encode(&der);

        // Re-wrap at 64 columns with stray spaces, PEM-style.
        let wrapped: String = b64
            .as_bytes()
            .chunks(64)
            .map(|line| format!("  {}\n", std::str::from_utf8(line).unwrap()))
            .collect();

        let plain = Certificate::parse(&b64).unwrap();
        let spaced = Certificate::parse(&wrapped).unwrap();
        assert_eq!(plain, spaced);
    }

    #[test]
    fn pem_delimiters_accepted() {
        let der = test_cert_der();
        let b64 = base64::engine::general_purpose::STANDARD.encode(&der);
        let pem = format!("-----BEGIN CERTIFICATE-----\n{b64}\n-----END CERTIFICATE-----\n");

        let cert = Certificate::from_pem(&pem).unwrap();
        assert_eq!(cert.der(), der.as_slice());
    }

    #[test]
    fn malformed_input_fails() {
        assert!(matches!(
            Certificate::parse("!!! not base64 !!!"),
            Err(SamlError::CertificateParse(_))
        ));
        assert!(matches!(
            Certificate::parse("AAAA"),
            Err(SamlError::CertificateParse(_))
        ));
        assert!(matches!(
            Certificate::from_pem("no delimiters here"),
            Err(SamlError::CertificateParse(_))
        ));
    }

    #[test]
    fn subject_and_issuer_exposed() {
        let cert = Certificate::from_der(test_cert_der()).unwrap();
        // Self-signed: subject == issuer.
        assert_eq!(cert.subject(), cert.issuer());
    }
}
