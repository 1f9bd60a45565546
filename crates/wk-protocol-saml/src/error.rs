//! SAML error types.
//!
//! Transport decode failures, certificate parse failures, and structural
//! signature defects are errors and abort the enclosing exchange. A
//! cryptographically invalid but well-formed signature is *not* an error:
//! validation returns `Ok(false)` and the caller must check it.

use thiserror::Error;

/// Result type for SAML operations.
pub type SamlResult<T> = Result<T, SamlError>;

/// SAML protocol errors.
#[derive(Debug, Error)]
pub enum SamlError {
    /// Invalid SAML message format or content.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// XML parsing error.
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    /// Base64 decoding error.
    #[error("base64 decode error: {0}")]
    Base64Decode(String),

    /// Deflate compression or decompression error.
    #[error("deflate error: {0}")]
    Deflate(String),

    /// X.509 certificate parsing error.
    #[error("certificate parse error: {0}")]
    CertificateParse(String),

    /// XML signature creation failed.
    #[error("signature creation failed: {0}")]
    SignatureCreation(String),

    /// The signature block is present but structurally broken.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// Cryptographic operation error.
    #[error("crypto error: {0}")]
    Crypto(String),
}

impl SamlError {
    /// Returns the SAML status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_)
            | Self::XmlParse(_)
            | Self::Base64Decode(_)
            | Self::Deflate(_)
            | Self::MalformedSignature(_) => crate::types::status_codes::REQUESTER,
            Self::CertificateParse(_) | Self::SignatureCreation(_) | Self::Crypto(_) => {
                crate::types::status_codes::RESPONDER
            }
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRequest(_)
            | Self::XmlParse(_)
            | Self::Base64Decode(_)
            | Self::Deflate(_)
            | Self::MalformedSignature(_) => 400,
            Self::CertificateParse(_) | Self::SignatureCreation(_) | Self::Crypto(_) => 500,
        }
    }
}

impl From<base64::DecodeError> for SamlError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Base64Decode(err.to_string())
    }
}

impl From<std::io::Error> for SamlError {
    fn from(err: std::io::Error) -> Self {
        Self::Deflate(err.to_string())
    }
}

impl From<wk_crypto::SignatureError> for SamlError {
    fn from(err: wk_crypto::SignatureError) -> Self {
        Self::Crypto(err.to_string())
    }
}
