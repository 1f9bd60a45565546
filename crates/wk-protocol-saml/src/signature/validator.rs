//! XML Signature validation.
//!
//! Validation is always driven by a single trusted public key supplied
//! out-of-band by the caller. Key material embedded in the document
//! (KeyInfo certificates or key values) is never consulted: honoring it
//! would let an attacker wrap the document with their own key and
//! signature.
//!
//! A structurally broken signature block is an error; a well-formed
//! signature that fails cryptographically is a normal `Ok(false)` outcome
//! the caller must check.

use base64::Engine;
use roxmltree::{Document, Node};

use crate::error::{SamlError, SamlResult};
use crate::trust::PublicKey;
use crate::types::XMLDSIG_NS;

use super::c14n;
use super::{
    CanonicalizationAlgorithm, DigestAlgorithm, SignatureAlgorithm, XmlSignature,
};

/// Policy for documents that carry no signature at all.
///
/// There is no default: integrators choose explicitly. Brokers verifying
/// counterparty messages should use [`SignaturePolicy::Required`];
/// [`SignaturePolicy::AcceptUnsigned`] exists for deployments where an
/// outer transport signature (e.g. the redirect binding's detached
/// signature) covers integrity instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignaturePolicy {
    /// A missing signature fails validation.
    Required,
    /// A missing signature is accepted; the document validates vacuously.
    AcceptUnsigned,
}

/// XML signature validator bound to one trusted public key.
pub struct XmlSignatureValidator {
    public_key: PublicKey,
    policy: SignaturePolicy,
    /// Whether SHA-1 based signature methods are accepted (legacy peers).
    allow_sha1: bool,
}

/// Finds the first `Signature` element in the XML-DSig namespace, in
/// document order, or none.
#[must_use]
pub fn locate_signature<'a, 'input>(doc: &'a Document<'input>) -> Option<Node<'a, 'input>> {
    doc.descendants().find(|n| {
        n.is_element()
            && n.tag_name().name() == "Signature"
            && n.tag_name().namespace() == Some(XMLDSIG_NS)
    })
}

impl XmlSignatureValidator {
    /// Creates a validator for the given trusted public key and unsigned-
    /// document policy.
    #[must_use]
    pub fn new(public_key: PublicKey, policy: SignaturePolicy) -> Self {
        Self {
            public_key,
            policy,
            allow_sha1: false,
        }
    }

    /// Allows SHA-1 based signature methods (not recommended).
    #[must_use]
    pub const fn allow_sha1(mut self, allow: bool) -> Self {
        self.allow_sha1 = allow;
        self
    }

    /// Validates the enveloped signature of an XML document.
    ///
    /// Returns `Ok(true)` for a valid signature, or for a signature-less
    /// document under [`SignaturePolicy::AcceptUnsigned`]. Returns
    /// `Ok(false)` for any cryptographic mismatch.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::XmlParse`] for unparseable input and
    /// [`SamlError::MalformedSignature`] for a structurally broken
    /// signature block.
    pub fn validate(&self, xml: &str) -> SamlResult<bool> {
        let doc = Document::parse(xml).map_err(|e| SamlError::XmlParse(e.to_string()))?;

        let Some(sig_node) = locate_signature(&doc) else {
            return match self.policy {
                SignaturePolicy::AcceptUnsigned => {
                    tracing::debug!("document carries no signature; accepted by policy");
                    Ok(true)
                }
                SignaturePolicy::Required => {
                    tracing::warn!("document carries no signature; rejected by policy");
                    Ok(false)
                }
            };
        };

        let signature = parse_signature(sig_node)?;

        if signature.algorithm.is_deprecated() && !self.allow_sha1 {
            tracing::warn!(
                algorithm = signature.algorithm.uri(),
                "SHA-1 signature method refused"
            );
            return Ok(false);
        }

        if !self.verify_digest(&doc, sig_node, &signature)? {
            tracing::debug!("reference digest mismatch");
            return Ok(false);
        }

        let valid = self.verify_signature_value(sig_node, &signature)?;
        if !valid {
            tracing::debug!("signature value mismatch");
        }
        Ok(valid)
    }

    /// Recomputes the reference digest over the canonicalized document
    /// minus the signature subtree and compares it to the embedded value.
    fn verify_digest(
        &self,
        doc: &Document<'_>,
        sig_node: Node<'_, '_>,
        signature: &XmlSignature,
    ) -> SamlResult<bool> {
        let target = match signature.reference_uri.as_str() {
            "" => doc.root_element(),
            uri => {
                let id = uri.strip_prefix('#').ok_or_else(|| {
                    SamlError::MalformedSignature(format!("unsupported reference URI: {uri}"))
                })?;
                find_by_id(doc, id).ok_or_else(|| {
                    SamlError::MalformedSignature(format!(
                        "referenced element '{id}' not found"
                    ))
                })?
            }
        };

        let canonical = c14n::canonicalize(target, Some(sig_node), signature.canonicalization);
        let computed = signature.digest_algorithm.compute(canonical.as_bytes());

        let expected = base64::engine::general_purpose::STANDARD
            .decode(&signature.digest_value)
            .map_err(|e| {
                SamlError::MalformedSignature(format!("invalid DigestValue encoding: {e}"))
            })?;

        Ok(computed == expected)
    }

    /// Canonicalizes the embedded SignedInfo and verifies the signature
    /// value against the trusted public key.
    fn verify_signature_value(
        &self,
        sig_node: Node<'_, '_>,
        signature: &XmlSignature,
    ) -> SamlResult<bool> {
        let signed_info = find_child(sig_node, "SignedInfo").ok_or_else(|| {
            SamlError::MalformedSignature("missing SignedInfo".to_string())
        })?;
        let canonical_signed_info =
            c14n::canonicalize(signed_info, None, signature.canonicalization);

        let sig_bytes = base64::engine::general_purpose::STANDARD
            .decode(&signature.signature_value)
            .map_err(|e| {
                SamlError::MalformedSignature(format!("invalid SignatureValue encoding: {e}"))
            })?;

        let Some(rsa_alg) = signature.algorithm.rsa_algorithm() else {
            tracing::warn!(
                algorithm = signature.algorithm.uri(),
                "no verification backend for signature method"
            );
            return Ok(false);
        };

        let valid = wk_crypto::rsa_verify(
            self.public_key.spki_der(),
            canonical_signed_info.as_bytes(),
            &sig_bytes,
            rsa_alg,
        )?;
        Ok(valid)
    }

    /// Validates a detached signature for the HTTP-Redirect binding.
    ///
    /// `signed_query` is the raw query-string octets covered by the
    /// signature (see `HttpRedirectBinding::extract_signed_query`).
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::MalformedSignature`] for an unknown algorithm
    /// URI or undecodable signature value.
    pub fn validate_redirect_binding(
        &self,
        signed_query: &str,
        signature_b64: &str,
        sig_alg: &str,
    ) -> SamlResult<bool> {
        let algorithm = SignatureAlgorithm::from_uri(sig_alg).ok_or_else(|| {
            SamlError::MalformedSignature(format!("unknown signature algorithm: {sig_alg}"))
        })?;

        if algorithm.is_deprecated() && !self.allow_sha1 {
            tracing::warn!(algorithm = sig_alg, "SHA-1 signature method refused");
            return Ok(false);
        }

        let sig_bytes = base64::engine::general_purpose::STANDARD
            .decode(signature_b64)
            .map_err(|e| {
                SamlError::MalformedSignature(format!("invalid signature encoding: {e}"))
            })?;

        let Some(rsa_alg) = algorithm.rsa_algorithm() else {
            tracing::warn!(
                algorithm = sig_alg,
                "no verification backend for signature method"
            );
            return Ok(false);
        };

        let valid = wk_crypto::rsa_verify(
            self.public_key.spki_der(),
            signed_query.as_bytes(),
            &sig_bytes,
            rsa_alg,
        )?;
        Ok(valid)
    }
}

/// Parses the structure of a `<ds:Signature>` element.
fn parse_signature(sig_node: Node<'_, '_>) -> SamlResult<XmlSignature> {
    let signed_info = find_child(sig_node, "SignedInfo")
        .ok_or_else(|| SamlError::MalformedSignature("missing SignedInfo".to_string()))?;

    let c14n_uri = find_child(signed_info, "CanonicalizationMethod")
        .and_then(|n| n.attribute("Algorithm"))
        .ok_or_else(|| {
            SamlError::MalformedSignature("missing CanonicalizationMethod".to_string())
        })?;
    let canonicalization = CanonicalizationAlgorithm::from_uri(c14n_uri).ok_or_else(|| {
        SamlError::MalformedSignature(format!(
            "unsupported canonicalization algorithm: {c14n_uri}"
        ))
    })?;

    let sig_uri = find_child(signed_info, "SignatureMethod")
        .and_then(|n| n.attribute("Algorithm"))
        .ok_or_else(|| SamlError::MalformedSignature("missing SignatureMethod".to_string()))?;
    let algorithm = SignatureAlgorithm::from_uri(sig_uri).ok_or_else(|| {
        SamlError::MalformedSignature(format!("unknown signature algorithm: {sig_uri}"))
    })?;

    let reference = find_child(signed_info, "Reference")
        .ok_or_else(|| SamlError::MalformedSignature("missing Reference".to_string()))?;
    let reference_uri = reference.attribute("URI").unwrap_or("").to_string();

    let digest_uri = find_child(reference, "DigestMethod")
        .and_then(|n| n.attribute("Algorithm"))
        .ok_or_else(|| SamlError::MalformedSignature("missing DigestMethod".to_string()))?;
    let digest_algorithm = DigestAlgorithm::from_uri(digest_uri).ok_or_else(|| {
        SamlError::MalformedSignature(format!("unsupported digest algorithm: {digest_uri}"))
    })?;

    let digest_value = element_text(
        find_child(reference, "DigestValue")
            .ok_or_else(|| SamlError::MalformedSignature("missing DigestValue".to_string()))?,
    );

    let signature_value = element_text(
        find_child(sig_node, "SignatureValue")
            .ok_or_else(|| SamlError::MalformedSignature("missing SignatureValue".to_string()))?,
    );

    let x509_certificate = sig_node
        .descendants()
        .find(|n| {
            n.is_element()
                && n.tag_name().name() == "X509Certificate"
                && n.tag_name().namespace() == Some(XMLDSIG_NS)
        })
        .map(element_text);

    Ok(XmlSignature {
        algorithm,
        canonicalization,
        digest_algorithm,
        reference_uri,
        digest_value,
        signature_value,
        x509_certificate,
    })
}

/// Finds a direct child element in the XML-DSig namespace.
fn find_child<'a, 'input>(node: Node<'a, 'input>, local_name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| {
        n.is_element()
            && n.tag_name().name() == local_name
            && n.tag_name().namespace() == Some(XMLDSIG_NS)
    })
}

/// Finds an element by its `ID`/`Id`/`id` attribute value.
fn find_by_id<'a, 'input>(doc: &'a Document<'input>, id: &str) -> Option<Node<'a, 'input>> {
    doc.descendants().find(|n| {
        n.is_element()
            && ["ID", "Id", "id"]
                .iter()
                .any(|attr| n.attribute(*attr) == Some(id))
    })
}

/// Returns an element's text content with all whitespace stripped, the
/// form base64 payloads take after PEM-style line wrapping.
fn element_text(node: Node<'_, '_>) -> String {
    node.text()
        .unwrap_or("")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::testkeys::rsa_key_and_cert;
    use super::super::{SignatureConfig, XmlSigner};
    use super::*;
    use crate::trust::Certificate;
    use crate::types::signature_algorithms;

    const MINIMAL_RESPONSE: &str =
        r#"<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol"/>"#;

    fn signed_doc_and_certs() -> (String, Certificate, Certificate) {
        let (key, cert_der) = rsa_key_and_cert("idp.example.com");
        let (_, other_cert_der) = rsa_key_and_cert("other.example.com");

        let signer = XmlSigner::new(key, Some(cert_der.clone()));
        let signed = signer.sign(MINIMAL_RESPONSE).unwrap();

        let cert = Certificate::from_der(cert_der).unwrap();
        let other = Certificate::from_der(other_cert_der).unwrap();
        (signed, cert, other)
    }

    #[test]
    fn sign_then_validate_with_matching_key() {
        let (signed, cert, _) = signed_doc_and_certs();
        let validator =
            XmlSignatureValidator::new(cert.public_key().clone(), SignaturePolicy::Required);
        assert!(validator.validate(&signed).unwrap());
    }

    #[test]
    fn validation_fails_with_unrelated_key() {
        let (signed, _, other) = signed_doc_and_certs();
        let validator =
            XmlSignatureValidator::new(other.public_key().clone(), SignaturePolicy::Required);
        assert!(!validator.validate(&signed).unwrap());
    }

    #[test]
    fn tampered_digest_fails_validation() {
        let (signed, cert, _) = signed_doc_and_certs();

        let start = signed.find("<ds:DigestValue>").unwrap() + "<ds:DigestValue>".len();
        let original = signed.as_bytes()[start] as char;
        let flipped = if original == 'A' { 'B' } else { 'A' };
        let mut tampered = signed.clone();
        tampered.replace_range(start..start + 1, &flipped.to_string());

        let validator =
            XmlSignatureValidator::new(cert.public_key().clone(), SignaturePolicy::Required);
        assert!(!validator.validate(&tampered).unwrap());
    }

    #[test]
    fn tampered_content_fails_validation() {
        let (key, cert_der) = rsa_key_and_cert("idp.example.com");
        let xml = r#"<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol"><child>x</child></samlp:Response>"#;
        let signed = XmlSigner::new(key, Some(cert_der.clone())).sign(xml).unwrap();
        let tampered = signed.replace("<child>x</child>", "<child>y</child>");

        let cert = Certificate::from_der(cert_der).unwrap();
        let validator =
            XmlSignatureValidator::new(cert.public_key().clone(), SignaturePolicy::Required);
        assert!(validator.validate(&signed).unwrap());
        assert!(!validator.validate(&tampered).unwrap());
    }

    #[test]
    fn unsigned_document_follows_policy() {
        let (_, cert, other) = signed_doc_and_certs();

        let accepting = XmlSignatureValidator::new(
            cert.public_key().clone(),
            SignaturePolicy::AcceptUnsigned,
        );
        assert!(accepting.validate(MINIMAL_RESPONSE).unwrap());

        // Vacuously valid for any key.
        let accepting_other = XmlSignatureValidator::new(
            other.public_key().clone(),
            SignaturePolicy::AcceptUnsigned,
        );
        assert!(accepting_other.validate(MINIMAL_RESPONSE).unwrap());

        let requiring =
            XmlSignatureValidator::new(cert.public_key().clone(), SignaturePolicy::Required);
        assert!(!requiring.validate(MINIMAL_RESPONSE).unwrap());
    }

    #[test]
    fn legacy_sha1_digest_roundtrip() {
        let (key, cert_der) = rsa_key_and_cert("idp.example.com");
        let signer = XmlSigner::new(key, Some(cert_der.clone()))
            .with_config(SignatureConfig::legacy_sha1_digest());
        let signed = signer.sign(MINIMAL_RESPONSE).unwrap();

        let cert = Certificate::from_der(cert_der).unwrap();
        let validator =
            XmlSignatureValidator::new(cert.public_key().clone(), SignaturePolicy::Required);
        assert!(validator.validate(&signed).unwrap());
    }

    #[test]
    fn garbage_input_is_a_parse_error() {
        let (_, cert, _) = signed_doc_and_certs();
        let validator =
            XmlSignatureValidator::new(cert.public_key().clone(), SignaturePolicy::Required);
        assert!(matches!(
            validator.validate("not xml at all <"),
            Err(SamlError::XmlParse(_))
        ));
    }

    #[test]
    fn structurally_broken_signature_is_an_error() {
        let (_, cert, _) = signed_doc_and_certs();
        let validator =
            XmlSignatureValidator::new(cert.public_key().clone(), SignaturePolicy::Required);

        let xml = format!(
            r#"<a xmlns:ds="{XMLDSIG_NS}"><ds:Signature></ds:Signature></a>"#
        );
        assert!(matches!(
            validator.validate(&xml),
            Err(SamlError::MalformedSignature(_))
        ));
    }

    #[test]
    fn locate_signature_finds_first_in_document_order() {
        let xml = format!(
            r#"<a xmlns:ds="{XMLDSIG_NS}"><b><ds:Signature id="one"/></b><ds:Signature id="two"/></a>"#
        );
        let doc = Document::parse(&xml).unwrap();
        let sig = locate_signature(&doc).unwrap();
        assert_eq!(sig.attribute("id"), Some("one"));
    }

    #[test]
    fn locate_signature_ignores_foreign_namespaces() {
        let xml = r#"<a xmlns:x="urn:not-dsig"><x:Signature/></a>"#;
        let doc = Document::parse(xml).unwrap();
        assert!(locate_signature(&doc).is_none());
    }

    #[test]
    fn detached_redirect_signature_roundtrip() {
        let (key, cert_der) = rsa_key_and_cert("idp.example.com");
        let signer = XmlSigner::new(key, Some(cert_der.clone()));

        let message = "fake-encoded-message";
        let relay = "relay-token";
        let signature = signer
            .sign_redirect_binding(message, Some(relay), true)
            .unwrap();

        let signed_query = format!(
            "SAMLRequest={}&RelayState={}&SigAlg={}",
            urlencoding::encode(message),
            urlencoding::encode(relay),
            urlencoding::encode(signature_algorithms::RSA_SHA256),
        );

        let cert = Certificate::from_der(cert_der).unwrap();
        let validator =
            XmlSignatureValidator::new(cert.public_key().clone(), SignaturePolicy::Required);

        assert!(validator
            .validate_redirect_binding(
                &signed_query,
                &signature,
                signature_algorithms::RSA_SHA256
            )
            .unwrap());

        let tampered = signed_query.replace("relay-token", "other-token");
        assert!(!validator
            .validate_redirect_binding(&tampered, &signature, signature_algorithms::RSA_SHA256)
            .unwrap());
    }

    #[test]
    fn sha1_signature_method_is_gated() {
        let (_, cert, _) = signed_doc_and_certs();

        let strict =
            XmlSignatureValidator::new(cert.public_key().clone(), SignaturePolicy::Required);
        // Refused before the signature value is even decoded.
        assert!(!strict
            .validate_redirect_binding("q=1", "!!not-base64!!", signature_algorithms::RSA_SHA1)
            .unwrap());

        let lenient =
            XmlSignatureValidator::new(cert.public_key().clone(), SignaturePolicy::Required)
                .allow_sha1(true);
        // With the gate open the malformed value is now inspected.
        assert!(matches!(
            lenient.validate_redirect_binding(
                "q=1",
                "!!not-base64!!",
                signature_algorithms::RSA_SHA1
            ),
            Err(SamlError::MalformedSignature(_))
        ));
    }

    #[test]
    fn unknown_redirect_algorithm_is_an_error() {
        let (_, cert, _) = signed_doc_and_certs();
        let validator =
            XmlSignatureValidator::new(cert.public_key().clone(), SignaturePolicy::Required);
        assert!(matches!(
            validator.validate_redirect_binding("q=1", "AAAA", "urn:example:unknown"),
            Err(SamlError::MalformedSignature(_))
        ));
    }
}
