// src/wallet/key_management.rs
//! Key pair generation for wallet holders and issuers.
//!
//! Produces fresh key material as JSON Web Keys:
//! - secp256k1 (via `k256`), the only algorithm allowed to sign credentials
//! - 2048-bit RSA (via `rsa`)
//!
//! Keys are returned to the caller and never stored.

use crate::error::{Error, Result};
use crate::models::jwk::Jwk;
use crate::utils::serialization::base64url_encode;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::SecretKey;
use log::debug;
use rand::rngs::OsRng;
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::RsaPrivateKey;
use serde::Serialize;
use std::str::FromStr;

const RSA_BITS: usize = 2048;

/// Algorithm labels accepted by the key generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    Secp256k1,
    Rsa,
}

impl FromStr for KeyAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "secp256k1" => Ok(Self::Secp256k1),
            "rsa" => Ok(Self::Rsa),
            other => Err(Error::UnsupportedKeyType(other.to_string())),
        }
    }
}

/// A freshly generated key pair.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPair {
    pub private_jwk: Jwk,
    pub public_jwk: Jwk,
}

/// Generates a key pair for `algorithm`.
///
/// # Returns
/// The private JWK (public members plus `d`) and its public counterpart.
///
/// # Errors
/// `InvalidKey` if the underlying generator fails.
pub fn generate_key_pair(algorithm: KeyAlgorithm) -> Result<KeyPair> {
    let private_jwk = match algorithm {
        KeyAlgorithm::Secp256k1 => secp256k1_jwk()?,
        KeyAlgorithm::Rsa => rsa_jwk()?,
    };
    let public_jwk = private_jwk.to_public()?;
    debug!("generated {algorithm:?} key pair");

    Ok(KeyPair { private_jwk, public_jwk })
}

fn secp256k1_jwk() -> Result<Jwk> {
    let secret = SecretKey::random(&mut OsRng);
    let point = secret.public_key().to_encoded_point(false);
    let (x, y) = match (point.x(), point.y()) {
        (Some(x), Some(y)) => (x, y),
        _ => return Err(Error::InvalidKey("generated point has no affine coordinates".into())),
    };

    Ok(Jwk {
        kty: Some("EC".into()),
        crv: Some("secp256k1".into()),
        x: Some(base64url_encode(x)),
        y: Some(base64url_encode(y)),
        d: Some(base64url_encode(secret.to_bytes())),
        ..Jwk::default()
    })
}

fn rsa_jwk() -> Result<Jwk> {
    let key = RsaPrivateKey::new(&mut OsRng, RSA_BITS)
        .map_err(|e| Error::InvalidKey(format!("RSA key generation failed: {e}")))?;

    Ok(Jwk {
        kty: Some("RSA".into()),
        n: Some(base64url_encode(key.n().to_bytes_be())),
        e: Some(base64url_encode(key.e().to_bytes_be())),
        d: Some(base64url_encode(key.d().to_bytes_be())),
        ..Jwk::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::jwk::Algorithm;
    use crate::utils::crypto::resolve_algorithm;
    use crate::utils::serialization::base64url_decode;

    #[test]
    fn test_secp256k1_pair() {
        let pair = generate_key_pair(KeyAlgorithm::Secp256k1).unwrap();

        assert!(pair.private_jwk.is_private());
        assert!(!pair.public_jwk.is_private());
        assert_eq!(resolve_algorithm(&pair.public_jwk).unwrap(), Algorithm::Es256K);
        assert_eq!(base64url_decode(pair.public_jwk.x.as_deref().unwrap()).unwrap().len(), 32);
        assert_eq!(pair.public_jwk.y, pair.private_jwk.y);
    }

    #[test]
    fn test_rsa_pair() {
        let pair = generate_key_pair(KeyAlgorithm::Rsa).unwrap();

        assert_eq!(resolve_algorithm(&pair.private_jwk).unwrap(), Algorithm::Rs256);
        assert_eq!(pair.public_jwk.e.as_deref(), Some("AQAB"));
        assert!(pair.public_jwk.d.is_none());
    }

    #[test]
    fn test_unknown_label() {
        assert!(matches!("ed25519".parse::<KeyAlgorithm>(), Err(Error::UnsupportedKeyType(l)) if l == "ed25519"));
        assert_eq!("rsa".parse::<KeyAlgorithm>().unwrap(), KeyAlgorithm::Rsa);
    }
}
