// src/models/presentation.rs
//! Verifiable Presentation data model.

use crate::models::credential::CREDENTIALS_CONTEXT;
use chrono::serde::ts_seconds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A holder's bundle of already-signed credential tokens.
///
/// The embedded tokens are opaque here: they keep their input order and are
/// never parsed when the presentation is built.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerifiablePresentation {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    pub id: String,
    #[serde(rename = "type")]
    pub type_: Vec<String>,
    /// DID of the holder.
    pub holder: String,
    pub verifiable_credential: Vec<String>,
}

impl VerifiablePresentation {
    /// Creates a presentation with a fresh `urn:uuid` id.
    pub fn new(holder: impl Into<String>, verifiable_credential: Vec<String>) -> Self {
        Self {
            context: vec![CREDENTIALS_CONTEXT.to_string()],
            id: format!("urn:uuid:{}", uuid::Uuid::new_v4()),
            type_: vec!["VerifiablePresentation".to_string()],
            holder: holder.into(),
            verifiable_credential,
        }
    }
}

/// JWT claims set of a presentation token.
///
/// Audience binding lives at this level (`aud`), outside the `vp` object.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VpClaims {
    /// Signer DID.
    pub iss: String,
    /// Signer DID.
    pub sub: String,
    /// Audience (verifier) DID.
    pub aud: String,
    /// Presentation id.
    pub jti: String,
    #[serde(with = "ts_seconds")]
    pub iat: DateTime<Utc>,
    #[serde(with = "ts_seconds")]
    pub nbf: DateTime<Utc>,
    #[serde(with = "ts_seconds")]
    pub exp: DateTime<Utc>,
    pub vp: VerifiablePresentation,
}
