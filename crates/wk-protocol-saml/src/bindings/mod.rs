//! SAML bindings implementation.
//!
//! Message transport for the two bindings wicket speaks:
//!
//! - **HTTP-Redirect** - messages are DEFLATE-compressed, base64-encoded,
//!   and URL-encoded into query parameters
//! - **HTTP-POST** - messages are base64-encoded and carried in HTML form
//!   fields

mod post;
mod redirect;

pub use post::*;
pub use redirect::*;

/// SAML message type for binding operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamlMessageType {
    /// AuthnRequest message.
    Request,
    /// Response message.
    Response,
}

impl SamlMessageType {
    /// Returns the form/query parameter name for this message type.
    #[must_use]
    pub const fn form_param(&self) -> &'static str {
        match self {
            Self::Request => "SAMLRequest",
            Self::Response => "SAMLResponse",
        }
    }
}

/// Decoded SAML binding message.
#[derive(Debug, Clone)]
pub struct DecodedMessage {
    /// The decoded XML message.
    pub xml: String,
    /// The message type (request or response).
    pub message_type: SamlMessageType,
    /// The RelayState if present.
    pub relay_state: Option<String>,
    /// The detached signature (redirect binding only).
    pub signature: Option<String>,
    /// The detached signature algorithm (redirect binding only).
    pub sig_alg: Option<String>,
}
