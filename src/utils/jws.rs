// src/utils/jws.rs
//! Compact JWS encoding of signed tokens.
//!
//! A token is `b64(header).b64(claims).b64(signature)`, with the signature
//! computed over the first two segments as they appear on the wire.

use crate::error::{Error, Result};
use crate::models::jwk::{Algorithm, Jwk};
use crate::utils::crypto;
use crate::utils::serialization::{base64url_decode, base64url_encode, decode_segment, encode_segment};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Protected header of a signed token.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub alg: Algorithm,

    #[serde(default = "default_typ")]
    pub typ: String,

    /// Identifier of the verification method that signed the token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

fn default_typ() -> String {
    "JWT".to_string()
}

impl Header {
    pub fn new(alg: Algorithm, kid: impl Into<String>) -> Self {
        Self {
            alg,
            typ: default_typ(),
            kid: Some(kid.into()),
        }
    }
}

/// A decoded, not yet verified, token.
#[derive(Debug, Clone)]
pub struct Jwt<T> {
    pub header: Header,
    pub claims: T,
    signing_input: String,
    signature: String,
}

impl<T> Jwt<T> {
    /// Checks the token signature against a public key.
    ///
    /// # Errors
    /// `SignatureInvalid` when the signature does not verify, `InvalidKey` when
    /// the key is malformed.
    pub fn verify(&self, jwk: &Jwk) -> Result<()> {
        crypto::verify(self.header.alg, jwk, self.signing_input.as_bytes(), &self.signature)
    }
}

/// Serializes and signs `claims` under `header`.
///
/// # Errors
/// Any `InvalidKey` raised by the signing primitive.
pub fn encode<T: Serialize>(header: &Header, claims: &T, jwk: &Jwk) -> Result<String> {
    let signing_input = format!("{}.{}", encode_segment(header)?, encode_segment(claims)?);
    let signature = crypto::sign(jwk, signing_input.as_bytes())?;
    Ok(format!("{signing_input}.{}", base64url_encode(signature)))
}

/// Splits and decodes a compact token without checking its signature.
///
/// # Errors
/// `UnableToDecode` unless the token has exactly three base64url segments
/// and the first two hold a header and claims of type `T`.
pub fn decode<T: DeserializeOwned>(token: &str) -> Result<Jwt<T>> {
    let parts: Vec<&str> = token.split('.').collect();
    let [header, claims, signature] = parts.as_slice() else {
        return Err(Error::UnableToDecode(format!(
            "expected 3 token segments, found {}",
            parts.len()
        )));
    };
    if signature.is_empty() {
        return Err(Error::UnableToDecode("token is unsigned".into()));
    }
    base64url_decode(signature)?;

    Ok(Jwt {
        header: decode_segment(header)?,
        claims: decode_segment(claims)?,
        signing_input: format!("{header}.{claims}"),
        signature: signature.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::key_management::{generate_key_pair, KeyAlgorithm};
    use serde_json::{json, Value};

    #[test]
    fn test_encode_then_decode_verifies() {
        let pair = generate_key_pair(KeyAlgorithm::Secp256k1).unwrap();
        let header = Header::new(Algorithm::Es256K, "did:example:1#k1");
        let token = encode(&header, &json!({"iss": "did:example:1"}), &pair.private_jwk).unwrap();

        let jwt: Jwt<Value> = decode(&token).unwrap();
        assert_eq!(jwt.header, header);
        assert_eq!(jwt.claims["iss"], "did:example:1");
        jwt.verify(&pair.public_jwk).unwrap();
    }

    #[test]
    fn test_header_wire_shape() {
        let header = Header::new(Algorithm::Es256K, "did:example:1#k1");
        assert_eq!(
            serde_json::to_value(&header).unwrap(),
            json!({"alg": "ES256K", "typ": "JWT", "kid": "did:example:1#k1"})
        );
    }

    #[test]
    fn test_decode_rejects_wrong_segment_count() {
        for token in ["", "abc", "a.b", "a.b.c.d"] {
            assert!(matches!(decode::<Value>(token), Err(Error::UnableToDecode(_))), "{token}");
        }
    }

    #[test]
    fn test_decode_rejects_unknown_algorithm() {
        let header = base64url_encode(r#"{"alg":"none","typ":"JWT"}"#);
        let claims = base64url_encode("{}");
        let token = format!("{header}.{claims}.AAAA");
        assert!(matches!(decode::<Value>(&token), Err(Error::UnableToDecode(_))));
    }
}
