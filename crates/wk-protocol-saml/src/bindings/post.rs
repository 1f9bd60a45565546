//! HTTP-POST Binding implementation.
//!
//! Implements the SAML 2.0 HTTP-POST binding: the message travels as a
//! plain base64 form field in an auto-submitting HTML form. Unlike the
//! redirect binding, no compression is applied, so the original document
//! bytes survive the transport exactly.

use base64::Engine;

use crate::error::{SamlError, SamlResult};

use super::{DecodedMessage, SamlMessageType};

/// HTTP-POST binding encoder/decoder.
pub struct HttpPostBinding;

impl HttpPostBinding {
    /// Encodes a SAML XML document as plain base64 (no compression).
    #[must_use]
    pub fn encode(xml: &str) -> String {
        base64::engine::general_purpose::STANDARD.encode(xml)
    }

    /// Encodes a SAML request for HTTP-POST binding.
    ///
    /// Returns an HTML form that will auto-submit to the destination.
    #[must_use]
    pub fn encode_request(xml: &str, destination: &str, relay_state: Option<&str>) -> String {
        Self::encode_form(xml, destination, relay_state, SamlMessageType::Request)
    }

    /// Encodes a SAML response for HTTP-POST binding.
    ///
    /// Returns an HTML form that will auto-submit to the destination.
    #[must_use]
    pub fn encode_response(xml: &str, destination: &str, relay_state: Option<&str>) -> String {
        Self::encode_form(xml, destination, relay_state, SamlMessageType::Response)
    }

    /// Builds the auto-submit HTML form carrying the encoded message.
    fn encode_form(
        xml: &str,
        destination: &str,
        relay_state: Option<&str>,
        message_type: SamlMessageType,
    ) -> String {
        let encoded = Self::encode(xml);
        let param_name = message_type.form_param();

        let relay_state_input = relay_state
            .map(|rs| {
                format!(
                    r#"<input type="hidden" name="RelayState" value="{}"/>"#,
                    html_escape(rs)
                )
            })
            .unwrap_or_default();

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>SAML POST Binding</title>
</head>
<body onload="document.forms[0].submit()">
    <noscript>
        <p>JavaScript is disabled. Click the button below to continue.</p>
    </noscript>
    <form method="post" action="{}">
        <input type="hidden" name="{}" value="{}"/>
        {}
        <noscript>
            <input type="submit" value="Continue"/>
        </noscript>
    </form>
</body>
</html>"#,
            html_escape(destination),
            param_name,
            encoded,
            relay_state_input
        )
    }

    /// Base64-encodes every value of a form-field mapping, then
    /// URL-form-encodes the result, for posting SAML responses via HTML
    /// auto-submit forms.
    ///
    /// Field order is preserved as given.
    #[must_use]
    pub fn encode_form_params(params: &[(&str, &str)]) -> String {
        params
            .iter()
            .map(|(name, value)| {
                let encoded = base64::engine::general_purpose::STANDARD.encode(value);
                format!(
                    "{}={}",
                    urlencoding::encode(name),
                    urlencoding::encode(&encoded)
                )
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Decodes a SAML message from HTTP-POST form data.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::InvalidRequest`] if neither message parameter is
    /// present, or [`SamlError::Base64Decode`] for a corrupt field.
    pub fn decode(
        saml_request: Option<&str>,
        saml_response: Option<&str>,
        relay_state: Option<&str>,
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

        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| SamlError::Base64Decode(e.to_string()))?;

        let xml = String::from_utf8(decoded)
            .map_err(|e| SamlError::InvalidRequest(format!("invalid UTF-8 in message: {e}")))?;

        Ok(DecodedMessage {
            xml,
            message_type,
            relay_state: relay_state.map(String::from),
            signature: None,
            sig_alg: None,
        })
    }
}

/// Escapes HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
