//! HTTP-Redirect Binding implementation.
//!
//! Implements the SAML 2.0 HTTP-Redirect binding: messages travel as
//! `percentEncode(base64(rawDeflate(utf8(xml))))` in URL query parameters.
//! The DEFLATE stream carries no zlib header or trailer on either end.
//!
//! The encoder treats its input as an already-fixed document. Callers must
//! not concatenate secrets with attacker-influenced text before encoding;
//! compressing such mixtures leaks length information (CRIME-style).

use base64::Engine;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::{Read, Write};

use crate::error::{SamlError, SamlResult};

use super::{DecodedMessage, SamlMessageType};

/// Upper bound on the decompressed size of an inbound message.
const MAX_INFLATED_LEN: u64 = 10 * 1024 * 1024;

/// HTTP-Redirect binding encoder/decoder.
pub struct HttpRedirectBinding;

impl HttpRedirectBinding {
    /// Encodes a SAML XML document into the redirect transport form:
    /// raw DEFLATE, then base64, then percent-encoding.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Deflate`] if compression fails.
    pub fn encode(xml: &str) -> SamlResult<String> {
        let compressed = deflate_compress(xml.as_bytes())?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(&compressed);
        Ok(urlencoding::encode(&encoded).into_owned())
    }

    /// Decodes a redirect transport string back into the XML document.
    ///
    /// The exact inverse of [`Self::encode`]: percent-decode, base64-decode,
    /// raw-inflate with a bounded buffer, UTF-8 validation.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Base64Decode`] or [`SamlError::Deflate`] for a
    /// corrupt transport string, [`SamlError::InvalidRequest`] for
    /// non-UTF-8 payloads.
    pub fn decode_message(transport: &str) -> SamlResult<String> {
        let url_decoded = urlencoding::decode(transport)
            .map_err(|e| SamlError::InvalidRequest(format!("URL decode error: {e}")))?;

        let b64_decoded = base64::engine::general_purpose::STANDARD
            .decode(url_decoded.as_ref())
            .map_err(|e| SamlError::Base64Decode(e.to_string()))?;

        let xml_bytes = deflate_decompress(&b64_decoded)?;

        String::from_utf8(xml_bytes)
            .map_err(|e| SamlError::InvalidRequest(format!("invalid UTF-8 in message: {e}")))
    }

    /// Encodes a SAML request for HTTP-Redirect binding.
    ///
    /// Returns a URL with the encoded message in query parameters.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Deflate`] if compression fails.
    pub fn encode_request(
        xml: &str,
        destination: &str,
        relay_state: Option<&str>,
    ) -> SamlResult<String> {
        Self::encode_url(xml, destination, relay_state, SamlMessageType::Request)
    }

    /// Encodes a SAML response for HTTP-Redirect binding.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Deflate`] if compression fails.
    pub fn encode_response(
        xml: &str,
        destination: &str,
        relay_state: Option<&str>,
    ) -> SamlResult<String> {
        Self::encode_url(xml, destination, relay_state, SamlMessageType::Response)
    }

    /// Builds the redirect URL for a message.
    fn encode_url(
        xml: &str,
        destination: &str,
        relay_state: Option<&str>,
        message_type: SamlMessageType,
    ) -> SamlResult<String> {
        let transport = Self::encode(xml)?;

        let param_name = message_type.form_param();
        let separator = if destination.contains('?') { '&' } else { '?' };

        let mut url = format!("{destination}{separator}{param_name}={transport}");

        if let Some(rs) = relay_state {
            url.push_str(&format!("&RelayState={}", urlencoding::encode(rs)));
        }

        Ok(url)
    }

    /// Decodes a SAML message from HTTP-Redirect query parameters.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::InvalidRequest`] if neither message parameter is
    /// present, or a codec error for a corrupt transport string.
    pub fn decode(
        saml_request: Option<&str>,
        saml_response: Option<&str>,
        relay_state: Option<&str>,
        signature: Option<&str>,
        sig_alg: Option<&str>,
    ) -> SamlResult<DecodedMessage> {
        let (encoded, message_type) = if let Some(req) = saml_request {
            (req, SamlMessageType::Request)
        } else if let Some(resp) = saml_response {
            (resp, SamlMessageType::Response)
        } else {
            return Err(SamlError::InvalidRequest(
                "no SAMLRequest or SAMLResponse parameter".to_string(),
            ));
        };

        let xml = Self::decode_message(encoded)?;

        Ok(DecodedMessage {
            xml,
            message_type,
            relay_state: relay_state.map(String::from),
            signature: signature.map(String::from),
            sig_alg: sig_alg.map(String::from),
        })
    }

    /// Decodes a message from a full redirect URL.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::InvalidRequest`] for an unparseable URL, plus
    /// the error cases of [`Self::decode`].
    pub fn decode_url(url: &str) -> SamlResult<DecodedMessage> {
        let parsed = url::Url::parse(url)
            .map_err(|e| SamlError::InvalidRequest(format!("invalid URL: {e}")))?;

        let mut saml_request = None;
        let mut saml_response = None;
        let mut relay_state = None;
        let mut signature = None;
        let mut sig_alg = None;

        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "SAMLRequest" => saml_request = Some(value.to_string()),
                "SAMLResponse" => saml_response = Some(value.to_string()),
                "RelayState" => relay_state = Some(value.to_string()),
                "Signature" => signature = Some(value.to_string()),
                "SigAlg" => sig_alg = Some(value.to_string()),
                _ => {}
            }
        }

        // query_pairs already percent-decoded the values.
        let (encoded, message_type) = if let Some(req) = saml_request {
            (req, SamlMessageType::Request)
        } else if let Some(resp) = saml_response {
            (resp, SamlMessageType::Response)
        } else {
            return Err(SamlError::InvalidRequest(
                "no SAMLRequest or SAMLResponse parameter".to_string(),
            ));
        };

        let b64_decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| SamlError::Base64Decode(e.to_string()))?;
        let xml_bytes = deflate_decompress(&b64_decoded)?;
        let xml = String::from_utf8(xml_bytes)
            .map_err(|e| SamlError::InvalidRequest(format!("invalid UTF-8 in message: {e}")))?;

        Ok(DecodedMessage {
            xml,
            message_type,
            relay_state,
            signature,
            sig_alg,
        })
    }

    /// Extracts the query-string octets covered by a detached redirect
    /// signature: SAMLRequest/SAMLResponse, RelayState, and SigAlg, in
    /// their original order, excluding the Signature parameter itself.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::InvalidRequest`] for an unparseable URL or a
    /// URL with no SAML parameters.
    pub fn extract_signed_query(url: &str) -> SamlResult<String> {
        let parsed = url::Url::parse(url)
            .map_err(|e| SamlError::InvalidRequest(format!("invalid URL: {e}")))?;

        let mut parts = Vec::new();

        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "SAMLRequest" | "SAMLResponse" | "RelayState" | "SigAlg" => {
                    parts.push(format!("{}={}", key, urlencoding::encode(&value)));
                }
                _ => {}
            }
        }

        if parts.is_empty() {
            return Err(SamlError::InvalidRequest(
                "no SAML parameters found".to_string(),
            ));
        }

        Ok(parts.join("&"))
    }
}

/// Compresses data using raw DEFLATE (no zlib header).
fn deflate_compress(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| SamlError::Deflate(format!("compression error: {e}")))?;
    encoder
        .finish()
        .map_err(|e| SamlError::Deflate(format!("compression finish error: {e}")))
}

/// Decompresses raw DEFLATE data with a bounded output buffer.
fn deflate_decompress(data: &[u8]) -> SamlResult<Vec<u8>> {
    let decoder = DeflateDecoder::new(data);
    let mut decompressed = Vec::new();
    let read = decoder
        .take(MAX_INFLATED_LEN + 1)
        .read_to_end(&mut decompressed)
        .map_err(|e| SamlError::Deflate(format!("decompression error: {e}")))?;
    if read as u64 > MAX_INFLATED_LEN {
        return Err(SamlError::Deflate(format!(
            "decompressed message exceeds {MAX_INFLATED_LEN} bytes"
        )));
    }
    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_roundtrip() {
        let xml = "<root><child>data</child></root>";
        let transport = HttpRedirectBinding::encode(xml).unwrap();
        assert_eq!(HttpRedirectBinding::decode_message(&transport).unwrap(), xml);
    }

    #[test]
    fn minimal_document_roundtrip() {
        let transport = HttpRedirectBinding::encode("<a/>").unwrap();
        assert_eq!(HttpRedirectBinding::decode_message(&transport).unwrap(), "<a/>");
    }

    #[test]
    fn truncated_transport_string_fails() {
        let transport = HttpRedirectBinding::encode("<root><child>data</child></root>").unwrap();
        let truncated = &transport[..transport.len() - 1];
        assert!(HttpRedirectBinding::decode_message(truncated).is_err());
    }

    #[test]
    fn encode_and_decode_request() {
        let xml = r#"<samlp:AuthnRequest>test content here</samlp:AuthnRequest>"#;
        let url =
            HttpRedirectBinding::encode_request(xml, "https://idp.example.com/sso", Some("state123"))
                .unwrap();

        assert!(url.starts_with("https://idp.example.com/sso?"));
        assert!(url.contains("SAMLRequest="));
        assert!(url.contains("RelayState=state123"));

        let decoded = HttpRedirectBinding::decode_url(&url).unwrap();
        assert_eq!(decoded.xml, xml);
        assert_eq!(decoded.message_type, SamlMessageType::Request);
        assert_eq!(decoded.relay_state.as_deref(), Some("state123"));
    }

    #[test]
    fn encode_and_decode_response() {
        let xml = r#"<samlp:Response>test response</samlp:Response>"#;
        let url =
            HttpRedirectBinding::encode_response(xml, "https://sp.example.com/acs", None).unwrap();

        assert!(url.contains("SAMLResponse="));

        let decoded = HttpRedirectBinding::decode_url(&url).unwrap();
        assert_eq!(decoded.xml, xml);
        assert_eq!(decoded.message_type, SamlMessageType::Response);
    }

    #[test]
    fn deflate_roundtrip() {
        let original = b"Test data for compression";
        let compressed = deflate_compress(original).unwrap();
        let decompressed = deflate_decompress(&compressed).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn corrupt_deflate_fails() {
        assert!(deflate_decompress(&[0xff, 0xff, 0xff, 0xff]).is_err());
    }

    #[test]
    fn extract_signed_query_skips_signature() {
        let url = "https://idp.example.com/sso?SAMLRequest=abc&RelayState=xyz&SigAlg=rsa-sha256&Signature=sig";
        let query = HttpRedirectBinding::extract_signed_query(url).unwrap();

        assert!(query.contains("SAMLRequest="));
        assert!(query.contains("RelayState="));
        assert!(query.contains("SigAlg="));
        assert!(!query.contains("Signature="));
    }

    #[test]
    fn url_with_existing_query() {
        let url = HttpRedirectBinding::encode_request(
            "<Test/>",
            "https://idp.example.com/sso?existing=param",
            None,
        )
        .unwrap();

        assert!(url.contains("?existing=param&SAMLRequest="));
    }

    #[test]
    fn missing_parameters_fail() {
        assert!(HttpRedirectBinding::decode(None, None, None, None, None).is_err());
    }
}
