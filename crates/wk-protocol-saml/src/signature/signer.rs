//! XML Signature creation.
//!
//! Signing is a pure transform from document text to signed document text.
//! The signature is enveloped: a `<ds:Signature>` element is appended as
//! the last child of the document root, covering the exclusive canonical
//! form of the whole document minus the signature itself.

use base64::Engine;
use roxmltree::Document;
use wk_crypto::SigningKey;

use crate::error::{SamlError, SamlResult};
use crate::trust::pem_body;
use crate::types::{transforms, XMLDSIG_NS};

use super::c14n;
use super::validator::locate_signature;
use super::SignatureConfig;

/// XML document signer.
///
/// Holds borrowed-in key material for its lifetime; callers that load keys
/// per request drop the signer with them.
pub struct XmlSigner {
    /// The private key, typed by algorithm family at load time.
    key: SigningKey,
    /// The X.509 certificate in DER format (optional).
    certificate_der: Option<Vec<u8>>,
    /// Signature configuration.
    config: SignatureConfig,
}

impl XmlSigner {
    /// Creates a new signer from a loaded key and an optional DER
    /// certificate for KeyInfo embedding.
    #[must_use]
    pub fn new(key: SigningKey, certificate_der: Option<Vec<u8>>) -> Self {
        Self {
            key,
            certificate_der,
            config: SignatureConfig::default(),
        }
    }

    /// Creates a signer from PEM-encoded key and certificate.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::SignatureCreation`] if the key PEM is
    /// unusable.
    pub fn from_pem(private_key_pem: &str, certificate_pem: Option<&str>) -> SamlResult<Self> {
        let key_der = pem_to_der(private_key_pem, "PRIVATE KEY")
            .or_else(|| pem_to_der(private_key_pem, "RSA PRIVATE KEY"))
            .ok_or_else(|| {
                SamlError::SignatureCreation("invalid private key PEM".to_string())
            })?;

        let key = SigningKey::from_pkcs8(&key_der)
            .or_else(|_| SigningKey::from_der(&key_der))
            .map_err(|e| SamlError::SignatureCreation(e.to_string()))?;

        let certificate_der = certificate_pem.and_then(|pem| pem_to_der(pem, "CERTIFICATE"));

        Ok(Self::new(key, certificate_der))
    }

    /// Sets the signature configuration.
    #[must_use]
    pub fn with_config(mut self, config: SignatureConfig) -> Self {
        self.config = config;
        self
    }

    /// Signs an XML document.
    ///
    /// Returns a new serialized document with the `<ds:Signature>` element
    /// appended as the last child of the root; the input is left
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::XmlParse`] for unparseable input and
    /// [`SamlError::SignatureCreation`] for unusable key material, an
    /// unsupported algorithm, or a document that already carries a
    /// signature.
    pub fn sign(&self, xml: &str) -> SamlResult<String> {
        let doc = Document::parse(xml).map_err(|e| SamlError::XmlParse(e.to_string()))?;

        if locate_signature(&doc).is_some() {
            return Err(SamlError::SignatureCreation(
                "document already carries a signature".to_string(),
            ));
        }

        let root = doc.root_element();

        // Enveloped transform + exc-C14N over the (unsigned) document.
        let canonical = c14n::canonicalize(root, None, self.config.canonicalization);
        let digest = self.config.digest.compute(canonical.as_bytes());
        let digest_b64 = base64::engine::general_purpose::STANDARD.encode(&digest);

        let signed_info = self.build_signed_info(&digest_b64);

        // What gets signed is the canonical form of SignedInfo, exactly as
        // a verifier will reproduce it from the embedded element.
        let si_doc = Document::parse(&signed_info)
            .map_err(|e| SamlError::SignatureCreation(format!("SignedInfo build error: {e}")))?;
        let canonical_signed_info =
            c14n::canonicalize(si_doc.root_element(), None, self.config.canonicalization);

        let signature_value = self.sign_data(canonical_signed_info.as_bytes())?;
        let signature_b64 = base64::engine::general_purpose::STANDARD.encode(&signature_value);

        let signature_element = self.build_signature_element(&signed_info, &signature_b64)?;

        append_to_root(xml, &doc, &signature_element)
    }

    /// Signs raw data with the configured algorithm and key.
    fn sign_data(&self, data: &[u8]) -> SamlResult<Vec<u8>> {
        let algorithm = self.config.algorithm;
        let rsa_alg = algorithm.rsa_algorithm().ok_or_else(|| {
            SamlError::SignatureCreation(format!(
                "cannot create signatures with {}; configure an RSA signature method",
                algorithm.uri()
            ))
        })?;

        self.key
            .sign(rsa_alg, data)
            .map_err(|e| SamlError::SignatureCreation(e.to_string()))
    }

    /// Builds the SignedInfo element covering the whole document.
    fn build_signed_info(&self, digest_b64: &str) -> String {
        format!(
            r#"<ds:SignedInfo xmlns:ds="{ns}">
<ds:CanonicalizationMethod Algorithm="{c14n}"/>
<ds:SignatureMethod Algorithm="{sig}"/>
<ds:Reference URI="">
<ds:Transforms>
<ds:Transform Algorithm="{enveloped}"/>
<ds:Transform Algorithm="{c14n}"/>
</ds:Transforms>
<ds:DigestMethod Algorithm="{digest}"/>
<ds:DigestValue>{value}</ds:DigestValue>
</ds:Reference>
</ds:SignedInfo>"#,
            ns = XMLDSIG_NS,
            c14n = self.config.canonicalization.uri(),
            sig = self.config.algorithm.uri(),
            enveloped = transforms::ENVELOPED_SIGNATURE,
            digest = self.config.digest.uri(),
            value = digest_b64,
        )
    }

    /// Builds the complete Signature element with KeyInfo.
    fn build_signature_element(
        &self,
        signed_info: &str,
        signature_b64: &str,
    ) -> SamlResult<String> {
        let mut signature = format!(
            r#"<ds:Signature xmlns:ds="{XMLDSIG_NS}">
{signed_info}
<ds:SignatureValue>{signature_b64}</ds:SignatureValue>"#
        );

        let mut key_info = String::new();

        if self.config.include_key_value && self.key.is_rsa() {
            let (modulus, exponent) = self
                .key
                .rsa_public_components()
                .map_err(|e| SamlError::SignatureCreation(e.to_string()))?;
            let engine = &base64::engine::general_purpose::STANDARD;
            key_info.push_str(&format!(
                "\n<ds:KeyValue><ds:RSAKeyValue><ds:Modulus>{}</ds:Modulus><ds:Exponent>{}</ds:Exponent></ds:RSAKeyValue></ds:KeyValue>",
                engine.encode(&modulus),
                engine.encode(&exponent),
            ));
        }

        if self.config.include_certificate {
            if let Some(cert) = &self.certificate_der {
                let cert_b64 = base64::engine::general_purpose::STANDARD.encode(cert);
                key_info.push_str(&format!(
                    "\n<ds:X509Data><ds:X509Certificate>{cert_b64}</ds:X509Certificate></ds:X509Data>"
                ));
            }
        }

        if !key_info.is_empty() {
            signature.push_str("\n<ds:KeyInfo>");
            signature.push_str(&key_info);
            signature.push_str("\n</ds:KeyInfo>");
        }

        signature.push_str("\n</ds:Signature>");
        Ok(signature)
    }

    /// Creates a detached signature for the HTTP-Redirect binding.
    ///
    /// The signature covers the query-string octets
    /// (`SAMLRequest=..&RelayState=..&SigAlg=..`) rather than the XML.
    /// Returns the base64 signature value for the `Signature` parameter.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::SignatureCreation`] for unusable key material
    /// or an unsupported algorithm.
    pub fn sign_redirect_binding(
        &self,
        saml_message: &str,
        relay_state: Option<&str>,
        is_request: bool,
    ) -> SamlResult<String> {
        let param_name = if is_request {
            "SAMLRequest"
        } else {
            "SAMLResponse"
        };

        let mut to_sign = format!("{}={}", param_name, urlencoding::encode(saml_message));

        if let Some(rs) = relay_state {
            to_sign.push_str(&format!("&RelayState={}", urlencoding::encode(rs)));
        }

        to_sign.push_str(&format!(
            "&SigAlg={}",
            urlencoding::encode(self.config.algorithm.uri())
        ));

        let signature = self.sign_data(to_sign.as_bytes())?;
        Ok(base64::engine::general_purpose::STANDARD.encode(&signature))
    }
}

/// Extracts DER data from a PEM string.
fn pem_to_der(pem: &str, label: &str) -> Option<Vec<u8>> {
    let body = pem_body(pem, label)?;
    let stripped: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(stripped.as_bytes())
        .ok()
}

/// Splices `fragment` in as the last child of the document root,
/// preserving every other byte of the input.
fn append_to_root(xml: &str, doc: &Document<'_>, fragment: &str) -> SamlResult<String> {
    let root = doc.root_element();
    let range = root.range();
    let root_text = &xml[range.clone()];

    if let Some(stripped) = root_text.strip_suffix("/>") {
        // A self-closing root has no closing tag to splice before; expand
        // it into an open/close pair.
        let qname = self_closing_qname(root_text)?;
        let mut out = String::with_capacity(xml.len() + fragment.len() + qname.len() + 4);
        out.push_str(&xml[..range.start]);
        out.push_str(stripped.trim_end());
        out.push('>');
        out.push_str(fragment);
        out.push_str("</");
        out.push_str(qname);
        out.push('>');
        out.push_str(&xml[range.end..]);
        Ok(out)
    } else {
        let close_idx = root_text
            .rfind("</")
            .ok_or_else(|| SamlError::XmlParse("missing root closing tag".to_string()))?;
        let insert_at = range.start + close_idx;
        Ok(format!(
            "{}{}{}",
            &xml[..insert_at],
            fragment,
            &xml[insert_at..]
        ))
    }
}

/// Reads the qualified name out of a self-closing tag like `<p:name .../>`.
fn self_closing_qname(tag: &str) -> SamlResult<&str> {
    let inner = tag
        .strip_prefix('<')
        .ok_or_else(|| SamlError::XmlParse("malformed root element".to_string()))?;
    let end = inner
        .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .unwrap_or(inner.len());
    Ok(&inner[..end])
}

#[cfg(test)]
mod tests {
    use super::super::testkeys::rsa_key_and_cert;
    use super::super::{DigestAlgorithm, SignatureAlgorithm, SignatureConfig};
    use super::*;

    const MINIMAL_RESPONSE: &str =
        r#"<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol"/>"#;

    fn test_signer() -> XmlSigner {
        let (key, cert) = rsa_key_and_cert("idp.example.com");
        XmlSigner::new(key, Some(cert))
    }

    #[test]
    fn signed_document_contains_signature_block() {
        let signed = test_signer().sign(MINIMAL_RESPONSE).unwrap();

        assert!(signed.contains("<ds:Signature"));
        assert!(signed.contains("<ds:SignatureValue>"));
        assert!(signed.contains("<ds:DigestValue>"));
        assert!(signed.contains("<ds:X509Certificate>"));
        assert!(signed.contains("<ds:Modulus>"));
        assert!(signed.ends_with("</samlp:Response>"));

        // Still well-formed XML.
        roxmltree::Document::parse(&signed).unwrap();
    }

    #[test]
    fn signature_lands_as_last_child_of_root() {
        let xml = r#"<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol"><child>x</child></samlp:Response>"#;
        let signed = test_signer().sign(xml).unwrap();

        let doc = roxmltree::Document::parse(&signed).unwrap();
        let last = doc
            .root_element()
            .children()
            .filter(|n| n.is_element())
            .last()
            .unwrap();
        assert_eq!(last.tag_name().name(), "Signature");
        assert_eq!(last.tag_name().namespace(), Some(XMLDSIG_NS));
    }

    #[test]
    fn input_document_is_not_mutated() {
        let xml = MINIMAL_RESPONSE.to_string();
        let _ = test_signer().sign(&xml).unwrap();
        assert_eq!(xml, MINIMAL_RESPONSE);
    }

    #[test]
    fn double_signing_is_rejected() {
        let signer = test_signer();
        let signed = signer.sign(MINIMAL_RESPONSE).unwrap();
        assert!(matches!(
            signer.sign(&signed),
            Err(SamlError::SignatureCreation(_))
        ));
    }

    #[test]
    fn key_info_honors_config_flags() {
        let (key, cert) = rsa_key_and_cert("idp.example.com");
        let signer = XmlSigner::new(key, Some(cert)).with_config(SignatureConfig {
            include_certificate: false,
            include_key_value: false,
            ..SignatureConfig::default()
        });

        let signed = signer.sign(MINIMAL_RESPONSE).unwrap();
        assert!(!signed.contains("X509Certificate"));
        assert!(!signed.contains("KeyInfo"));
    }

    #[test]
    fn dsa_signature_method_is_rejected() {
        let (key, cert) = rsa_key_and_cert("idp.example.com");
        let signer = XmlSigner::new(key, Some(cert)).with_config(SignatureConfig {
            algorithm: SignatureAlgorithm::DsaSha256,
            ..SignatureConfig::default()
        });

        assert!(matches!(
            signer.sign(MINIMAL_RESPONSE),
            Err(SamlError::SignatureCreation(_))
        ));
    }

    #[test]
    fn legacy_sha1_digest_is_available() {
        let (key, cert) = rsa_key_and_cert("idp.example.com");
        let signer = XmlSigner::new(key, Some(cert))
            .with_config(SignatureConfig::legacy_sha1_digest());

        let signed = signer.sign(MINIMAL_RESPONSE).unwrap();
        assert!(signed.contains(DigestAlgorithm::Sha1.uri()));
    }

    #[test]
    fn detached_redirect_signature_is_base64() {
        let signature = test_signer()
            .sign_redirect_binding("encoded-message", Some("relay"), true)
            .unwrap();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(&signature)
            .unwrap();
        assert_eq!(decoded.len(), 256);
    }

    #[test]
    fn pem_to_der_extraction() {
        let pem = "-----BEGIN CERTIFICATE-----\nTUIJ\n-----END CERTIFICATE-----";
        assert!(pem_to_der(pem, "CERTIFICATE").is_some());
        assert!(pem_to_der(pem, "PRIVATE KEY").is_none());
    }
}
