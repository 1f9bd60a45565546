//! SAML 2.0 transport and integrity layer for wicket.
//!
//! This crate implements the security-critical plumbing any SAML 2.0
//! Single-Sign-On exchange needs, independent of assertion semantics:
//!
//! - **Binding codecs** - HTTP-Redirect (DEFLATE + base64 + URL encoding)
//!   and HTTP-POST (base64 + HTML form) message transport
//! - **XML signatures** - signing outgoing documents and validating
//!   incoming ones with exclusive canonicalization (XML-DSig)
//! - **Trust material** - X.509 certificate parsing and public key
//!   extraction
//! - **Relay-state protection** - HMAC signing and freshness checking for
//!   the opaque correlation token carried alongside SAML messages
//!
//! # Architecture
//!
//! - [`bindings`] - Redirect and POST binding codecs
//! - [`signature`] - XML signature creation, validation, and C14N
//! - [`trust`] - certificate and public key handling
//! - [`relay_state`] - relay-state HMAC guard and replay window
//! - [`types`] - SAML constants and status types
//! - [`error`] - error types for SAML operations
//!
//! Key material and XML document bodies are handed in by the caller;
//! this crate performs no I/O and renders no SAML document bodies.
//!
//! # SAML Specifications
//!
//! - [SAML 2.0 Core](https://docs.oasis-open.org/security/saml/v2.0/saml-core-2.0-os.pdf)
//! - [SAML 2.0 Bindings](https://docs.oasis-open.org/security/saml/v2.0/saml-bindings-2.0-os.pdf)
//! - [XML Signature](https://www.w3.org/TR/xmldsig-core1/)
//! - [Exclusive XML Canonicalization](https://www.w3.org/TR/xml-exc-c14n/)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bindings;
pub mod error;
pub mod relay_state;
pub mod signature;
pub mod trust;
pub mod types;

pub use error::{SamlError, SamlResult};
pub use relay_state::{RelayStateGuard, SecretKey};
pub use trust::{Certificate, PublicKey};
