// src/models/jwk.rs
//! JSON Web Key data model.
//!
//! [`Jwk`] mirrors the wire members of RFC 7517/7518 and keeps every member
//! optional, so that a missing `kty` or coordinate can be reported as
//! `InvalidKey` instead of failing deserialization. The closed enums
//! [`KeyType`], [`Curve`] and [`Algorithm`] are what the rest of the crate
//! matches on.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A JSON Web Key as supplied by callers or produced by the key generator.
///
/// A key is private iff it carries its private component (`d` for EC and
/// RSA keys, `k` for symmetric keys).
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Jwk {
    /// Key type: `EC`, `RSA` or `oct`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kty: Option<String>,

    /// Elliptic curve name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,

    /// EC x coordinate (base64url).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,

    /// EC y coordinate (base64url).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,

    /// EC private scalar or RSA private exponent (base64url).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,

    /// RSA modulus (base64url).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    /// Symmetric shared secret (base64url).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k: Option<String>,

    /// Optional key id. Carried, never interpreted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Optional intended algorithm. Carried, never interpreted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
}

impl Jwk {
    /// Returns true when the key carries its private component.
    pub fn is_private(&self) -> bool {
        self.d.is_some() || self.k.is_some()
    }

    /// Parses the `kty` member.
    ///
    /// # Errors
    /// `InvalidKey` when `kty` is absent, `UnsupportedKeyType` when unknown.
    pub fn key_type(&self) -> Result<KeyType> {
        self.kty
            .as_deref()
            .ok_or_else(|| Error::InvalidKey("missing 'kty' member".into()))?
            .parse()
    }

    /// Returns the public part of this key, keeping only the members that
    /// identify it (EC: `crv kty x y`, RSA: `e kty n`).
    ///
    /// # Errors
    /// `InvalidKey` when a required public member is missing or the key is
    /// symmetric (symmetric keys have no public form).
    pub fn to_public(&self) -> Result<Jwk> {
        let missing = |member: &str| Error::InvalidKey(format!("missing '{member}' member"));
        match self.key_type()? {
            KeyType::Ec => Ok(Jwk {
                kty: self.kty.clone(),
                crv: Some(self.crv.clone().ok_or_else(|| missing("crv"))?),
                x: Some(self.x.clone().ok_or_else(|| missing("x"))?),
                y: Some(self.y.clone().ok_or_else(|| missing("y"))?),
                ..Jwk::default()
            }),
            KeyType::Rsa => Ok(Jwk {
                kty: self.kty.clone(),
                n: Some(self.n.clone().ok_or_else(|| missing("n"))?),
                e: Some(self.e.clone().ok_or_else(|| missing("e"))?),
                ..Jwk::default()
            }),
            KeyType::Oct => Err(Error::InvalidKey("symmetric keys have no public form".into())),
        }
    }

    /// JSON Canonicalization Scheme (RFC 8785) rendering of the key's members.
    ///
    /// All JWK members are strings, so sorting the members lexicographically
    /// and emitting them without whitespace is the full canonical form.
    pub fn canonical_json(&self) -> Result<String> {
        let members: BTreeMap<&str, &String> = [
            ("alg", &self.alg),
            ("crv", &self.crv),
            ("d", &self.d),
            ("e", &self.e),
            ("k", &self.k),
            ("kid", &self.kid),
            ("kty", &self.kty),
            ("n", &self.n),
            ("x", &self.x),
            ("y", &self.y),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_ref().map(|v| (name, v)))
        .collect();

        serde_json::to_string(&members).map_err(|e| Error::InvalidKey(e.to_string()))
    }
}

/// Key families understood by the algorithm resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Ec,
    Rsa,
    Oct,
}

impl FromStr for KeyType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "EC" => Ok(Self::Ec),
            "RSA" => Ok(Self::Rsa),
            "oct" => Ok(Self::Oct),
            other => Err(Error::UnsupportedKeyType(other.to_string())),
        }
    }
}

/// Supported elliptic curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curve {
    Secp256k1,
    P256,
    P384,
    P521,
}

impl Curve {
    /// The signature algorithm fixed for this curve.
    pub const fn algorithm(self) -> Algorithm {
        match self {
            Self::Secp256k1 => Algorithm::Es256K,
            Self::P256 => Algorithm::Es256,
            Self::P384 => Algorithm::Es384,
            Self::P521 => Algorithm::Es512,
        }
    }
}

impl FromStr for Curve {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "secp256k1" => Ok(Self::Secp256k1),
            "P-256" => Ok(Self::P256),
            "P-384" => Ok(Self::P384),
            "P-521" => Ok(Self::P521),
            other => Err(Error::UnsupportedCurve(other.to_string())),
        }
    }
}

/// JWS signature algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    /// ECDSA using secp256k1 and SHA-256.
    #[serde(rename = "ES256K")]
    Es256K,
    /// ECDSA using P-256 and SHA-256.
    #[serde(rename = "ES256")]
    Es256,
    /// ECDSA using P-384 and SHA-384.
    #[serde(rename = "ES384")]
    Es384,
    /// ECDSA using P-521 and SHA-512.
    #[serde(rename = "ES512")]
    Es512,
    /// RSASSA-PKCS1-v1_5 using SHA-256.
    #[serde(rename = "RS256")]
    Rs256,
    /// HMAC using SHA-256.
    #[serde(rename = "HS256")]
    Hs256,
}

impl Algorithm {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Es256K => "ES256K",
            Self::Es256 => "ES256",
            Self::Es384 => "ES384",
            Self::Es512 => "ES512",
            Self::Rs256 => "RS256",
            Self::Hs256 => "HS256",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ec_key() -> Jwk {
        Jwk {
            kty: Some("EC".into()),
            crv: Some("secp256k1".into()),
            x: Some("Yr5dSC8vVBhz_a_EiIjH63shj1uqPeg8UjtoUXtsVZU".into()),
            y: Some("NicHUkZrnM1GgWn1GO4Dl27Q5rD-kG-ODF_jhZYSyQw".into()),
            d: Some("c2VjcmV0".into()),
            ..Jwk::default()
        }
    }

    #[test]
    fn test_public_part_drops_private_scalar() {
        let public = ec_key().to_public().unwrap();
        assert!(!public.is_private());
        assert_eq!(public.x, ec_key().x);
    }

    #[test]
    fn test_canonical_json_orders_members() {
        let public = ec_key().to_public().unwrap();
        assert_eq!(
            public.canonical_json().unwrap(),
            r#"{"crv":"secp256k1","kty":"EC","x":"Yr5dSC8vVBhz_a_EiIjH63shj1uqPeg8UjtoUXtsVZU","y":"NicHUkZrnM1GgWn1GO4Dl27Q5rD-kG-ODF_jhZYSyQw"}"#
        );
    }

    #[test]
    fn test_symmetric_key_has_no_public_form() {
        let key = Jwk { kty: Some("oct".into()), k: Some("c2VjcmV0".into()), ..Jwk::default() };
        assert!(key.is_private());
        assert!(matches!(key.to_public(), Err(Error::InvalidKey(_))));
    }

    #[test]
    fn test_algorithm_wire_names() {
        assert_eq!(serde_json::to_value(Algorithm::Es256K).unwrap(), "ES256K");
        let alg: Algorithm = serde_json::from_value("RS256".into()).unwrap();
        assert_eq!(alg, Algorithm::Rs256);
    }
}
