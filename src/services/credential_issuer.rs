// src/services/credential_issuer.rs
//! Credential Issuer Service
//!
//! Builds Verifiable Credentials and signs them as compact JWS tokens.
//! Issuance is purely local: no registry lookups, no persistence.
//!
//! Only secp256k1 keys (`ES256K`) may issue credentials.

use crate::config::IssuerConfig;
use crate::error::{Error, Result};
use crate::models::credential::{
    CredentialSchema, CredentialSubject, VcClaims, VerifiableCredential, CREDENTIALS_CONTEXT,
    CREDENTIAL_TYPES,
};
use crate::models::jwk::{Algorithm, Jwk};
use crate::models::request::{Field, IssueCredentialRequest};
use crate::utils::crypto::resolve_algorithm;
use crate::utils::jws::{self, Header};
use chrono::{DateTime, Months, SubsecRound, Utc};
use log::{debug, info};

/// Years a credential stays inside its `validUntil` bound.
const VALIDITY_YEARS: u32 = 10;

/// Years until a credential's `expirationDate`.
const EXPIRATION_YEARS: u32 = 5;

/// Service issuing signed credentials.
#[derive(Debug, Clone, Default)]
pub struct CredentialIssuer {
    config: IssuerConfig,
}

impl CredentialIssuer {
    pub fn new(config: IssuerConfig) -> Self {
        Self { config }
    }

    /// Issues a credential signed with the request's key.
    ///
    /// # Arguments
    /// * `request` - Signing key, key id, issuer and subject DIDs, extra claims
    ///
    /// # Returns
    /// The signed credential token.
    ///
    /// # Errors
    /// - `MissingField`/`MalformedField` for the first unusable field, checked
    ///   in the order issuer DID, signing key, key id, subject DID, claims
    /// - `IssuerAlgorithmNotAllowed` for keys other than secp256k1
    /// - `InvalidKey` for malformed or public-only keys
    pub fn issue_credential(&self, request: IssueCredentialRequest) -> Result<String> {
        self.issue_at(request, Utc::now())
    }

    /// Issues a credential as of `now`.
    ///
    /// # Errors
    /// As [`CredentialIssuer::issue_credential`].
    pub fn issue_at(&self, request: IssueCredentialRequest, now: DateTime<Utc>) -> Result<String> {
        let issuer_did = request.issuer_did.require(Field::IssuerDid)?;
        let jwk = request.jwk.require(Field::SigningKey)?;
        let kid = request.kid.require(Field::KeyId)?;
        let subject_did = request.subject_did.require(Field::SubjectDid)?;
        let claims = request.claims.optional(Field::Claims)?.unwrap_or_default();

        let alg = signing_algorithm(&jwk, Error::IssuerAlgorithmNotAllowed)?;

        // single instant for every derived timestamp
        let now = now.trunc_subsecs(3);
        let vc = VerifiableCredential {
            context: vec![CREDENTIALS_CONTEXT.to_string()],
            id: format!("urn:uuid:{}", uuid::Uuid::new_v4()),
            type_: CREDENTIAL_TYPES.iter().map(ToString::to_string).collect(),
            issuer: issuer_did.clone(),
            issuance_date: now,
            issued: now,
            valid_from: now,
            valid_until: add_years(now, VALIDITY_YEARS)?,
            expiration_date: add_years(now, EXPIRATION_YEARS)?,
            credential_subject: CredentialSubject::new(subject_did, claims),
            credential_schema: CredentialSchema {
                id: self.config.schema_id.clone(),
                type_: self.config.schema_type.clone(),
            },
        };
        let credential_id = vc.id.clone();

        let header = Header::new(alg, self.config.kid_scope.apply(&issuer_did, &kid));
        debug!("signing credential {credential_id} with kid {:?}", header.kid);
        let token = jws::encode(&header, &VcClaims::from(vc), &jwk)?;

        info!("issued credential {credential_id} from {issuer_did}");
        Ok(token)
    }
}

/// Checks a signing key against the ES256K-only policy.
///
/// The policy is checked before the private component, so a public RSA key
/// reports the policy violation.
pub(crate) fn signing_algorithm(jwk: &Jwk, not_allowed: fn(Algorithm) -> Error) -> Result<Algorithm> {
    let alg = resolve_algorithm(jwk)?;
    if alg != Algorithm::Es256K {
        return Err(not_allowed(alg));
    }
    if !jwk.is_private() {
        return Err(Error::InvalidKey("signing key has no private component".into()));
    }
    Ok(alg)
}

/// Adds calendar years; 29 February clamps to 28 February.
fn add_years(at: DateTime<Utc>, years: u32) -> Result<DateTime<Utc>> {
    at.checked_add_months(Months::new(years * 12))
        .ok_or_else(|| Error::TemporalValidity(format!("{at} + {years} years is out of range")))
}
