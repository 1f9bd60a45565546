//! Signing-key material.
//!
//! Private keys are classified once, when loaded, into a typed variant.
//! Everything downstream dispatches on the variant instead of re-inspecting
//! algorithm names at signing time.

use aws_lc_rs::signature::{KeyPair, RsaKeyPair};

use crate::signature::{rsa_sign, RsaAlgorithm, SignatureError};

/// DER encoding of the DSA OID 1.2.840.10040.4.1, as it appears inside a
/// PKCS#8 `AlgorithmIdentifier`.
const DSA_OID_DER: &[u8] = &[0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x38, 0x04, 0x01];

/// A private key for SAML message signing, typed by algorithm family.
pub enum SigningKey {
    /// An RSA private key. The fully supported signing path.
    Rsa(RsaKeyPair),
    /// A DSA private key, recognized at load but not usable for signing.
    /// The raw PKCS#8 bytes are retained for diagnostics.
    Dsa(Vec<u8>),
}

impl SigningKey {
    /// Loads a private key from PKCS#8 DER, classifying it by algorithm.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::InvalidKey`] for keys that are neither RSA
    /// nor DSA, or that fail to parse.
    pub fn from_pkcs8(der: &[u8]) -> Result<Self, SignatureError> {
        match RsaKeyPair::from_pkcs8(der) {
            Ok(key_pair) => Ok(Self::Rsa(key_pair)),
            Err(e) => {
                if contains_dsa_oid(der) {
                    Ok(Self::Dsa(der.to_vec()))
                } else {
                    Err(SignatureError::InvalidKey(format!(
                        "not an RSA or DSA private key: {e}"
                    )))
                }
            }
        }
    }

    /// Loads an RSA private key from traditional `RSAPrivateKey` DER.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::InvalidKey`] if the key fails to parse.
    pub fn from_der(der: &[u8]) -> Result<Self, SignatureError> {
        let key_pair = RsaKeyPair::from_der(der)
            .or_else(|_| RsaKeyPair::from_pkcs8(der))
            .map_err(|e| SignatureError::InvalidKey(format!("invalid RSA key: {e}")))?;
        Ok(Self::Rsa(key_pair))
    }

    /// Returns true for the RSA variant.
    #[must_use]
    pub const fn is_rsa(&self) -> bool {
        matches!(self, Self::Rsa(_))
    }

    /// Returns the algorithm family name.
    #[must_use]
    pub const fn algorithm_name(&self) -> &'static str {
        match self {
            Self::Rsa(_) => "RSA",
            Self::Dsa(_) => "DSA",
        }
    }

    /// Signs `data` with this key.
    ///
    /// # Errors
    ///
    /// DSA keys return [`SignatureError::UnsupportedAlgorithm`]; RSA errors
    /// propagate from the backend.
    pub fn sign(&self, algorithm: RsaAlgorithm, data: &[u8]) -> Result<Vec<u8>, SignatureError> {
        match self {
            Self::Rsa(key_pair) => rsa_sign(key_pair, data, algorithm),
            Self::Dsa(_) => Err(SignatureError::UnsupportedAlgorithm(
                "DSA signing is not supported; re-key the signing identity with RSA".to_string(),
            )),
        }
    }

    /// Returns the public key in DER form.
    ///
    /// # Errors
    ///
    /// DSA keys return [`SignatureError::UnsupportedAlgorithm`].
    pub fn public_key_der(&self) -> Result<Vec<u8>, SignatureError> {
        match self {
            Self::Rsa(key_pair) => Ok(key_pair.public_key().as_ref().to_vec()),
            Self::Dsa(_) => Err(SignatureError::UnsupportedAlgorithm(
                "DSA public key export is not supported".to_string(),
            )),
        }
    }

    /// Returns the RSA public key's `(modulus, exponent)` big-endian bytes,
    /// for embedding as an `RSAKeyValue` in XML key info.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::UnsupportedAlgorithm`] for non-RSA keys and
    /// [`SignatureError::InvalidKey`] if the public key DER cannot be
    /// walked.
    pub fn rsa_public_components(&self) -> Result<(Vec<u8>, Vec<u8>), SignatureError> {
        let der = self.public_key_der()?;
        rsa_components_from_der(&der)
    }
}

/// Looks for the DSA `AlgorithmIdentifier` OID inside PKCS#8 bytes.
fn contains_dsa_oid(der: &[u8]) -> bool {
    der.windows(DSA_OID_DER.len()).any(|w| w == DSA_OID_DER)
}

/// Extracts the RSA modulus (n) and public exponent (e) from key DER.
///
/// Accepts both an X.509 `SubjectPublicKeyInfo` and a bare PKCS#1
/// `RSAPublicKey`:
///
/// ```text
/// SubjectPublicKeyInfo ::= SEQUENCE {
///   SEQUENCE { OID, NULL }
///   BIT STRING { RSAPublicKey }
/// }
/// RSAPublicKey ::= SEQUENCE { modulus INTEGER, publicExponent INTEGER }
/// ```
pub fn rsa_components_from_der(der: &[u8]) -> Result<(Vec<u8>, Vec<u8>), SignatureError> {
    let mut pos = 0;

    if der.get(pos) != Some(&0x30) {
        return Err(SignatureError::InvalidKey(
            "invalid RSA public key: expected SEQUENCE".to_string(),
        ));
    }
    pos += 1;
    pos = skip_length(der, pos)?;

    // SPKI wraps the key in an algorithm SEQUENCE plus a BIT STRING; a bare
    // RSAPublicKey goes straight to the modulus INTEGER.
    if der.get(pos) == Some(&0x30) {
        pos += 1;
        let alg_len = read_length(der, pos)?;
        pos = skip_length(der, pos)?;
        pos += alg_len;

        if der.get(pos) != Some(&0x03) {
            return Err(SignatureError::InvalidKey(
                "invalid SPKI: expected BIT STRING".to_string(),
            ));
        }
        pos += 1;
        pos = skip_length(der, pos)?;
        // Unused-bits byte of the BIT STRING.
        pos += 1;

        if der.get(pos) != Some(&0x30) {
            return Err(SignatureError::InvalidKey(
                "invalid RSAPublicKey: expected SEQUENCE".to_string(),
            ));
        }
        pos += 1;
        pos = skip_length(der, pos)?;
    }

    let (n, next) = read_integer(der, pos)?;
    let (e, _) = read_integer(der, next)?;
    Ok((n, e))
}

/// Reads an ASN.1 INTEGER, stripping the sign-padding zero byte.
fn read_integer(der: &[u8], pos: usize) -> Result<(Vec<u8>, usize), SignatureError> {
    if der.get(pos) != Some(&0x02) {
        return Err(SignatureError::InvalidKey(
            "invalid RSAPublicKey: expected INTEGER".to_string(),
        ));
    }
    let len = read_length(der, pos + 1)?;
    let start = skip_length(der, pos + 1)?;
    let end = start + len;
    if end > der.len() {
        return Err(SignatureError::InvalidKey(
            "truncated INTEGER in RSA public key".to_string(),
        ));
    }
    let mut value = der[start..end].to_vec();
    if !value.is_empty() && value[0] == 0 {
        value.remove(0);
    }
    Ok((value, end))
}

/// Reads an ASN.1 length field and returns the length value.
fn read_length(data: &[u8], pos: usize) -> Result<usize, SignatureError> {
    let first = *data
        .get(pos)
        .ok_or_else(|| SignatureError::InvalidKey("unexpected end of DER".to_string()))?;

    if first < 0x80 {
        Ok(first as usize)
    } else {
        let num_bytes = (first & 0x7f) as usize;
        if num_bytes > 4 {
            return Err(SignatureError::InvalidKey("DER length too large".to_string()));
        }
        let mut len = 0usize;
        for i in 0..num_bytes {
            let byte = *data.get(pos + 1 + i).ok_or_else(|| {
                SignatureError::InvalidKey("unexpected end of DER length".to_string())
            })?;
            len = (len << 8) | (byte as usize);
        }
        Ok(len)
    }
}

/// Skips an ASN.1 length field and returns the new position.
fn skip_length(data: &[u8], pos: usize) -> Result<usize, SignatureError> {
    let first = *data
        .get(pos)
        .ok_or_else(|| SignatureError::InvalidKey("unexpected end of DER".to_string()))?;

    if first < 0x80 {
        Ok(pos + 1)
    } else {
        Ok(pos + 1 + (first & 0x7f) as usize)
    }
}
