// src/models/credential.rs
//! Verifiable Credential data model implementation.
//!
//! Defines the claim payload of a W3C Verifiable Credential (VC) and the JWT
//! claims set that envelopes it, following the
//! [W3C Verifiable Credentials Data Model](https://www.w3.org/TR/vc-data-model/)
//! JWT encoding.

use chrono::serde::ts_seconds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Base context of every credential and presentation.
pub const CREDENTIALS_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";

/// Type tags of every issued credential.
pub const CREDENTIAL_TYPES: [&str; 2] = ["VerifiableCredential", "VerifiableAttestation"];

/// The claim payload of a Verifiable Credential.
///
/// Embedded as the `vc` claim of a signed token and never modified after
/// signing. All timestamps derive from one instant taken at issuance.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerifiableCredential {
    #[serde(rename = "@context")]
    pub context: Vec<String>,

    /// Unique URI identifier for the credential
    /// Example: "urn:uuid:123e4567-e89b-12d3-a456-426614174000"
    pub id: String,

    #[serde(rename = "type")]
    pub type_: Vec<String>,

    /// DID of the credential issuer
    pub issuer: String,

    #[serde(with = "rfc3339_millis")]
    pub issuance_date: DateTime<Utc>,
    #[serde(with = "rfc3339_millis")]
    pub issued: DateTime<Utc>,
    #[serde(with = "rfc3339_millis")]
    pub valid_from: DateTime<Utc>,
    #[serde(with = "rfc3339_millis")]
    pub valid_until: DateTime<Utc>,
    #[serde(with = "rfc3339_millis")]
    pub expiration_date: DateTime<Utc>,

    pub credential_subject: CredentialSubject,
    pub credential_schema: CredentialSchema,
}

/// The subject of a credential: its DID plus arbitrary claims.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CredentialSubject {
    /// DID of the credential subject
    pub id: String,

    /// Caller-supplied claims, flattened next to `id`.
    #[serde(flatten)]
    pub claims: Map<String, Value>,
}

impl CredentialSubject {
    /// Builds a subject, discarding any `id` entry of `claims` so that the
    /// subject DID cannot be overridden.
    pub fn new(id: impl Into<String>, mut claims: Map<String, Value>) -> Self {
        claims.remove("id");
        Self { id: id.into(), claims }
    }
}

/// Reference to the schema the credential conforms to.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CredentialSchema {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
}

/// JWT claims set of a credential token.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VcClaims {
    /// Issuer DID.
    pub iss: String,
    /// Subject DID.
    pub sub: String,
    /// Credential id.
    pub jti: String,
    #[serde(with = "ts_seconds")]
    pub iat: DateTime<Utc>,
    /// `validFrom` of the credential.
    #[serde(with = "ts_seconds")]
    pub nbf: DateTime<Utc>,
    /// `expirationDate` of the credential.
    #[serde(with = "ts_seconds")]
    pub exp: DateTime<Utc>,
    pub vc: VerifiableCredential,
}

impl From<VerifiableCredential> for VcClaims {
    fn from(vc: VerifiableCredential) -> Self {
        Self {
            iss: vc.issuer.clone(),
            sub: vc.credential_subject.id.clone(),
            jti: vc.id.clone(),
            iat: vc.issuance_date,
            nbf: vc.valid_from,
            exp: vc.expiration_date,
            vc,
        }
    }
}

/// RFC 3339 timestamps with exactly three fractional digits and a `Z` suffix.
mod rfc3339_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(de::Error::custom)
    }
}
