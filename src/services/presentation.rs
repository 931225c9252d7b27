// src/services/presentation.rs
//! Verifiable Presentation service.
//!
//! A presentation bundles already-signed credential tokens for one audience.
//! Creation never looks inside the bundled tokens. Verification checks the
//! holder's signature and the audience binding; [`PresentationEngine::verify_presentation_deep`]
//! additionally verifies every bundled credential.

use crate::config::PresentationConfig;
use crate::error::{Error, Result};
use crate::models::credential::VerifiableCredential;
use crate::models::did::VerificationRelationship;
use crate::models::presentation::{VerifiablePresentation, VpClaims};
use crate::models::request::{CreatePresentationRequest, Field};
use crate::registry::{EbsiRegistryClient, Registry};
use crate::services::credential_issuer::signing_algorithm;
use crate::services::did_resolver::DidResolver;
use crate::services::verifier::{check_window, verify_signature, CredentialVerifier, Verification};
use crate::utils::jws::{self, Header};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use log::{debug, info};
use std::sync::Arc;

/// A verified presentation together with its verified credentials.
#[derive(Debug, Clone)]
pub struct VerifiedBundle {
    pub presentation: VerifiablePresentation,
    /// Decoded credentials, in the order they appear in the presentation.
    pub credentials: Vec<VerifiableCredential>,
}

/// Creates and verifies presentation tokens.
pub struct PresentationEngine<R = EbsiRegistryClient> {
    config: PresentationConfig,
    resolver: Arc<DidResolver<R>>,
    credentials: CredentialVerifier<R>,
}

impl<R> Clone for PresentationEngine<R> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            resolver: Arc::clone(&self.resolver),
            credentials: self.credentials.clone(),
        }
    }
}

impl<R: Registry> PresentationEngine<R> {
    pub fn new(config: PresentationConfig, resolver: Arc<DidResolver<R>>) -> Self {
        let credentials = CredentialVerifier::new(Arc::clone(&resolver));
        Self {
            config,
            resolver,
            credentials,
        }
    }

    /// Signs a presentation of `request.credentials` for `request.audience_did`.
    ///
    /// # Errors
    /// - `MissingField`/`MalformedField` for the first unusable field, checked
    ///   in the order signer DID, holder DID, audience DID, credentials,
    ///   signing key, key id; an empty credential list counts as missing
    /// - `SignerAlgorithmNotAllowed` for keys other than secp256k1, checked
    ///   right after the signing key
    /// - `InvalidKey` for malformed or public-only keys
    pub fn create_presentation(&self, request: CreatePresentationRequest) -> Result<String> {
        self.create_at(request, Utc::now())
    }

    /// Signs a presentation as of `now`.
    ///
    /// # Errors
    /// As [`PresentationEngine::create_presentation`].
    pub fn create_at(&self, request: CreatePresentationRequest, now: DateTime<Utc>) -> Result<String> {
        let signer_did = request.signer_did.require(Field::SignerDid)?;
        let holder_did = request.holder_did.require(Field::HolderDid)?;
        let audience_did = request.audience_did.require(Field::AudienceDid)?;
        let credentials = request.credentials.require(Field::Credentials)?;
        if credentials.is_empty() {
            return Err(Error::MissingField(Field::Credentials));
        }
        let jwk = request.jwk.require(Field::SigningKey)?;
        let alg = signing_algorithm(&jwk, Error::SignerAlgorithmNotAllowed)?;
        let kid = request.kid.require(Field::KeyId)?;

        let now = now.trunc_subsecs(0);
        let exp = Duration::try_seconds(self.config.lifetime_secs)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                Error::TemporalValidity(format!(
                    "presentation lifetime of {}s is out of range",
                    self.config.lifetime_secs
                ))
            })?;

        let vp = VerifiablePresentation::new(holder_did, credentials);
        let presentation_id = vp.id.clone();
        let claims = VpClaims {
            iss: signer_did.clone(),
            sub: signer_did.clone(),
            aud: audience_did,
            jti: vp.id.clone(),
            iat: now,
            nbf: now,
            exp,
            vp,
        };

        let header = Header::new(alg, self.config.kid_scope.apply(&signer_did, &kid));
        let token = jws::encode(&header, &claims, &jwk)?;

        info!("created presentation {presentation_id} for {}", claims.aud);
        Ok(token)
    }

    /// Verifies a presentation token for `audience_did` as of now.
    ///
    /// Embedded credentials are returned undecoded and unverified.
    pub async fn verify_presentation(
        &self,
        token: &str,
        audience_did: &str,
    ) -> Verification<VerifiablePresentation> {
        self.verify_at(token, audience_did, Utc::now()).await
    }

    /// Verifies a presentation token for `audience_did` as of `now`.
    pub async fn verify_at(
        &self,
        token: &str,
        audience_did: &str,
        now: DateTime<Utc>,
    ) -> Verification<VerifiablePresentation> {
        let outcome = self.check(token, audience_did, now).await;
        match &outcome {
            Ok(vp) => info!("verified presentation {} of {}", vp.id, vp.holder),
            Err(e) => debug!("presentation rejected: {e}"),
        }
        outcome.into()
    }

    /// Verifies a presentation and then each embedded credential in order.
    ///
    /// The first failing credential decides the outcome.
    pub async fn verify_presentation_deep(
        &self,
        token: &str,
        audience_did: &str,
    ) -> Verification<VerifiedBundle> {
        let now = Utc::now();
        let presentation = match self.verify_at(token, audience_did, now).await {
            Verification::Valid(vp) => vp,
            Verification::Invalid(e) => return Verification::Invalid(e),
        };

        let mut credentials = Vec::with_capacity(presentation.verifiable_credential.len());
        for (index, credential) in presentation.verifiable_credential.iter().enumerate() {
            match self.credentials.verify_at(credential, now).await {
                Verification::Valid(vc) => credentials.push(vc),
                Verification::Invalid(e) => {
                    debug!("credential {index} of presentation {} rejected", presentation.id);
                    return Verification::Invalid(e);
                }
            }
        }

        Verification::Valid(VerifiedBundle {
            presentation,
            credentials,
        })
    }

    async fn check(&self, token: &str, audience_did: &str, now: DateTime<Utc>) -> Result<VerifiablePresentation> {
        let jwt = jws::decode::<VpClaims>(token)?;
        let claims = &jwt.claims;

        verify_signature(&self.resolver, &jwt, &claims.iss, VerificationRelationship::Authentication)
            .await?;
        check_window(claims.nbf, claims.exp, now)?;
        if claims.aud != audience_did {
            return Err(Error::AudienceMismatch {
                expected: audience_did.to_string(),
                found: claims.aud.clone(),
            });
        }

        Ok(jwt.claims.vp)
    }
}
