// src/models/request.rs
//! Request shapes accepted by the issuance and presentation operations.
//!
//! Each field is an [`Input`], which keeps apart "absent", "present and well
//! formed" and "present but malformed". Precondition checks are then a fixed
//! sequence of [`Input::require`] calls: the first failing field wins.

use crate::error::{Error, Result};
use crate::models::jwk::Jwk;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::fmt;

/// Named request fields, used in `MissingField`/`MalformedField` errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    IssuerDid,
    SubjectDid,
    SignerDid,
    HolderDid,
    AudienceDid,
    SigningKey,
    KeyId,
    Claims,
    Credentials,
    Token,
    Did,
    Method,
    Algorithm,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::IssuerDid => "issuer DID",
            Self::SubjectDid => "subject DID",
            Self::SignerDid => "signer DID",
            Self::HolderDid => "holder DID",
            Self::AudienceDid => "audience DID",
            Self::SigningKey => "signing key",
            Self::KeyId => "key id",
            Self::Claims => "claims",
            Self::Credentials => "credentials",
            Self::Token => "token",
            Self::Did => "DID",
            Self::Method => "method",
            Self::Algorithm => "algorithm",
        })
    }
}

/// A request value that may be absent or malformed.
#[derive(Debug, Clone, PartialEq)]
pub enum Input<T> {
    /// Missing, `null`, or an empty string.
    Absent,
    /// Present and of the expected shape.
    Present(T),
    /// Present but not of the expected shape.
    Malformed(String),
}

impl<T> Default for Input<T> {
    fn default() -> Self {
        Self::Absent
    }
}

impl<T> From<Option<T>> for Input<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Self::Present)
    }
}

impl<T: DeserializeOwned> Input<T> {
    /// Classifies a raw JSON value.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Null => Self::Absent,
            Value::String(s) if s.is_empty() => Self::Absent,
            value => match serde_json::from_value(value) {
                Ok(parsed) => Self::Present(parsed),
                Err(e) => Self::Malformed(e.to_string()),
            },
        }
    }
}

impl<T> Input<T> {
    /// Returns the value or the error naming `field`.
    ///
    /// # Errors
    /// `MissingField` when absent, `MalformedField` when malformed.
    pub fn require(self, field: Field) -> Result<T> {
        match self {
            Self::Present(value) => Ok(value),
            Self::Absent => Err(Error::MissingField(field)),
            Self::Malformed(reason) => Err(Error::MalformedField { field, reason }),
        }
    }

    /// Like [`Input::require`], but absence is not an error.
    ///
    /// # Errors
    /// `MalformedField` when malformed.
    pub fn optional(self, field: Field) -> Result<Option<T>> {
        match self {
            Self::Present(value) => Ok(Some(value)),
            Self::Absent => Ok(None),
            Self::Malformed(reason) => Err(Error::MalformedField { field, reason }),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Input<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from_value)
    }
}

/// Body of a credential issuance request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IssueCredentialRequest {
    /// Private key of the issuer.
    pub jwk: Input<Jwk>,
    /// Key id of the signing key within the issuer's DID document.
    pub kid: Input<String>,
    pub issuer_did: Input<String>,
    pub subject_did: Input<String>,
    /// Extra claims merged into `credentialSubject`.
    pub claims: Input<Map<String, Value>>,
}

impl IssueCredentialRequest {
    /// Builds a request with every mandatory field present.
    pub fn new(
        jwk: Jwk,
        kid: impl Into<String>,
        issuer_did: impl Into<String>,
        subject_did: impl Into<String>,
    ) -> Self {
        Self {
            jwk: Input::Present(jwk),
            kid: Input::Present(kid.into()),
            issuer_did: Input::Present(issuer_did.into()),
            subject_did: Input::Present(subject_did.into()),
            claims: Input::Absent,
        }
    }

    /// Sets the extra subject claims.
    #[must_use]
    pub fn with_claims(mut self, claims: Map<String, Value>) -> Self {
        self.claims = Input::Present(claims);
        self
    }
}

/// Body of a presentation creation request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreatePresentationRequest {
    pub jwk: Input<Jwk>,
    pub kid: Input<String>,
    pub signer_did: Input<String>,
    pub holder_did: Input<String>,
    pub audience_did: Input<String>,
    /// Already-signed credential tokens, embedded in order.
    pub credentials: Input<Vec<String>>,
}

impl CreatePresentationRequest {
    /// Builds a request with every mandatory field present.
    pub fn new(
        jwk: Jwk,
        kid: impl Into<String>,
        signer_did: impl Into<String>,
        holder_did: impl Into<String>,
        audience_did: impl Into<String>,
        credentials: Vec<String>,
    ) -> Self {
        Self {
            jwk: Input::Present(jwk),
            kid: Input::Present(kid.into()),
            signer_did: Input::Present(signer_did.into()),
            holder_did: Input::Present(holder_did.into()),
            audience_did: Input::Present(audience_did.into()),
            credentials: Input::Present(credentials),
        }
    }
}
