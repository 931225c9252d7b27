// src/services/verifier.rs
//! Credential verification service.
//!
//! Verification runs in a fixed order and stops at the first failure:
//! 1. decode the compact token and its claims
//! 2. resolve the signer's DID and select its verification key
//! 3. check the signature
//! 4. check the validity window
//!
//! Failures are reported as [`Verification::Invalid`], never as a panic or
//! an error escaping the caller.

use crate::error::{Error, Result};
use crate::models::credential::{VcClaims, VerifiableCredential};
use crate::models::did::{split_fragment, VerificationRelationship};
use crate::models::jwk::Jwk;
use crate::registry::{EbsiRegistryClient, Registry};
use crate::services::did_resolver::DidResolver;
use crate::utils::crypto::resolve_algorithm;
use crate::utils::jws::{self, Jwt};
use chrono::{DateTime, Utc};
use log::{debug, info};
use std::sync::Arc;

/// Outcome of verifying a signed token.
#[derive(Debug)]
pub enum Verification<T> {
    /// The token verified; carries the decoded document.
    Valid(T),
    /// The token failed verification and why.
    Invalid(Error),
}

impl<T> Verification<T> {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    pub fn document(&self) -> Option<&T> {
        match self {
            Self::Valid(document) => Some(document),
            Self::Invalid(_) => None,
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            Self::Valid(_) => None,
            Self::Invalid(error) => Some(error),
        }
    }

    /// Converts the outcome into a `Result`.
    ///
    /// # Errors
    /// The verification failure, if any.
    pub fn into_result(self) -> Result<T> {
        match self {
            Self::Valid(document) => Ok(document),
            Self::Invalid(error) => Err(error),
        }
    }
}

impl<T> From<Result<T>> for Verification<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(document) => Self::Valid(document),
            Err(error) => Self::Invalid(error),
        }
    }
}

/// Verifies credential tokens against their issuers' DID documents.
pub struct CredentialVerifier<R = EbsiRegistryClient> {
    resolver: Arc<DidResolver<R>>,
}

impl<R> Clone for CredentialVerifier<R> {
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
        }
    }
}

impl<R: Registry> CredentialVerifier<R> {
    pub fn new(resolver: Arc<DidResolver<R>>) -> Self {
        Self { resolver }
    }

    /// Verifies a credential token as of now.
    ///
    /// # Returns
    /// [`Verification::Valid`] with the embedded credential, or
    /// [`Verification::Invalid`] with one of `UnableToDecode`,
    /// `SignatureInvalid`, `TemporalValidity` or a resolution error.
    pub async fn verify_credential(&self, token: &str) -> Verification<VerifiableCredential> {
        self.verify_at(token, Utc::now()).await
    }

    /// Verifies a credential token as of `now`.
    pub async fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Verification<VerifiableCredential> {
        let outcome = self.check(token, now).await;
        match &outcome {
            Ok(vc) => info!("verified credential {} from {}", vc.id, vc.issuer),
            Err(e) => debug!("credential rejected: {e}"),
        }
        outcome.into()
    }

    async fn check(&self, token: &str, now: DateTime<Utc>) -> Result<VerifiableCredential> {
        let jwt = jws::decode::<VcClaims>(token)?;
        let claims = &jwt.claims;
        if claims.iss != claims.vc.issuer || claims.sub != claims.vc.credential_subject.id {
            return Err(Error::UnableToDecode(
                "token claims disagree with the embedded credential".into(),
            ));
        }

        verify_signature(&self.resolver, &jwt, &claims.iss, VerificationRelationship::AssertionMethod)
            .await?;
        check_window(claims.nbf, claims.exp, now)?;
        if now < claims.vc.valid_from || now > claims.vc.valid_until {
            return Err(Error::TemporalValidity(format!(
                "credential is valid from {} until {}",
                claims.vc.valid_from, claims.vc.valid_until
            )));
        }

        Ok(jwt.claims.vc)
    }
}

/// Checks the signature of `jwt` against a key of `signer`'s DID document.
///
/// A `kid` that is a DID URL must belong to `signer`. The verification method
/// it names is used when `relationship` references it; otherwise every key of
/// `relationship` matching the header algorithm is tried until one verifies.
pub(crate) async fn verify_signature<R: Registry, T>(
    resolver: &DidResolver<R>,
    jwt: &Jwt<T>,
    signer: &str,
    relationship: VerificationRelationship,
) -> Result<()> {
    let kid = jwt.header.kid.as_deref().unwrap_or_default();
    let method_id = if kid.starts_with("did:") {
        let (kid_did, _) = split_fragment(kid);
        if kid_did != signer {
            return Err(Error::SignatureInvalid(format!("kid {kid} does not belong to {signer}")));
        }
        kid.to_string()
    } else {
        format!("{signer}#{kid}")
    };

    let document = resolver.resolve(signer).await?;
    let methods = document.methods_for(relationship);

    if let Some(method) = methods.iter().find(|method| method.id == method_id) {
        debug!("verifying with {method_id}");
        let jwk = method.public_key_jwk.as_ref().ok_or_else(|| {
            Error::SignatureInvalid(format!("{method_id} has no public key"))
        })?;
        return jwt.verify(jwk);
    }

    let alg = jwt.header.alg;
    let candidates: Vec<&Jwk> = methods
        .into_iter()
        .filter_map(|method| method.public_key_jwk.as_ref())
        .filter(|jwk| resolve_algorithm(jwk).map_or(false, |key_alg| key_alg == alg))
        .collect();
    debug!("{} has {} candidate {alg} keys", signer, candidates.len());

    let mut failure = Error::SignatureInvalid(format!("{signer} has no {alg} key for {relationship:?}"));
    for jwk in candidates {
        match jwt.verify(jwk) {
            Ok(()) => return Ok(()),
            Err(e) => failure = e,
        }
    }
    Err(failure)
}

/// Checks `nbf <= now <= exp` at second precision.
pub(crate) fn check_window(nbf: DateTime<Utc>, exp: DateTime<Utc>, now: DateTime<Utc>) -> Result<()> {
    if now.timestamp() < nbf.timestamp() {
        return Err(Error::TemporalValidity(format!("not valid before {nbf}")));
    }
    if now.timestamp() > exp.timestamp() {
        return Err(Error::TemporalValidity(format!("expired at {exp}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IssuerConfig, KidScope};
    use crate::error::ErrorKind;
    use crate::models::did::{DidDocument, DidMethod, VerificationMethod};
    use crate::models::request::IssueCredentialRequest;
    use crate::registry::testing::StaticRegistry;
    use crate::services::credential_issuer::CredentialIssuer;
    use crate::services::did_resolver::create_did;
    use crate::utils::jws::Header;
    use crate::wallet::key_management::{generate_key_pair, KeyAlgorithm, KeyPair};
    use chrono::Duration;
    use serde_json::json;

    const SUBJECT: &str = "did:example:123";
    const EBSI_DID: &str = "did:ebsi:ziDnioxYYLW1a3qUbqTFz4W";

    fn verifier(registry: StaticRegistry) -> CredentialVerifier<StaticRegistry> {
        CredentialVerifier::new(Arc::new(DidResolver::new(registry)))
    }

    fn did_key_issuer() -> (KeyPair, String) {
        let pair = generate_key_pair(KeyAlgorithm::Secp256k1).unwrap();
        let did = create_did(DidMethod::Key, &pair.public_jwk).unwrap();
        (pair, did)
    }

    fn issue(pair: &KeyPair, kid: &str, issuer: &str) -> String {
        let request = IssueCredentialRequest::new(pair.private_jwk.clone(), kid, issuer, SUBJECT)
            .with_claims(json!({"role": "tester"}).as_object().unwrap().clone());
        CredentialIssuer::default().issue_credential(request).unwrap()
    }

    fn kind<T>(outcome: &Verification<T>) -> ErrorKind {
        outcome.error().map(Error::kind).expect("verification should fail")
    }

    #[tokio::test]
    async fn test_issue_then_verify() {
        let (pair, did) = did_key_issuer();
        let token = issue(&pair, "keys-1", &did);

        let outcome = verifier(StaticRegistry::default()).verify_credential(&token).await;
        let vc = outcome.document().expect("credential should verify");
        assert_eq!(vc.issuer, did);
        assert_eq!(vc.credential_subject.id, SUBJECT);
        assert_eq!(vc.credential_subject.claims["role"], "tester");
    }

    #[tokio::test]
    async fn test_registry_issuer_with_scoped_kid() {
        let pair = generate_key_pair(KeyAlgorithm::Secp256k1).unwrap();
        let other = generate_key_pair(KeyAlgorithm::Secp256k1).unwrap();
        let method = |fragment: &str, jwk: &Jwk| VerificationMethod {
            id: format!("{EBSI_DID}#{fragment}"),
            type_: "JsonWebKey2020".into(),
            controller: EBSI_DID.into(),
            public_key_jwk: Some(jwk.clone()),
        };
        let document = DidDocument {
            id: EBSI_DID.into(),
            verification_method: vec![method("keys-0", &other.public_jwk), method("keys-1", &pair.public_jwk)],
            assertion_method: vec![format!("{EBSI_DID}#keys-0"), format!("{EBSI_DID}#keys-1")],
            ..DidDocument::default()
        };
        let verifier = verifier(StaticRegistry::default().with(document));

        let token = issue(&pair, "keys-1", EBSI_DID);
        assert!(verifier.verify_credential(&token).await.is_valid());

        // unknown kid falls back to assertion keys
        let token = issue(&pair, "keys-9", EBSI_DID);
        assert!(verifier.verify_credential(&token).await.is_valid());

        let token = issue(&other, "keys-1", EBSI_DID);
        assert_eq!(kind(&verifier.verify_credential(&token).await), ErrorKind::SignatureInvalid);
    }

    #[tokio::test]
    async fn test_key_outside_assertion_method_is_rejected() {
        let ledger = generate_key_pair(KeyAlgorithm::Secp256k1).unwrap();
        let assertion = generate_key_pair(KeyAlgorithm::Secp256k1).unwrap();
        let method = |fragment: &str, jwk: &Jwk| VerificationMethod {
            id: format!("{EBSI_DID}#{fragment}"),
            type_: "JsonWebKey2020".into(),
            controller: EBSI_DID.into(),
            public_key_jwk: Some(jwk.clone()),
        };
        let document = DidDocument {
            id: EBSI_DID.into(),
            verification_method: vec![method("ledger", &ledger.public_jwk), method("assert", &assertion.public_jwk)],
            assertion_method: vec![format!("{EBSI_DID}#assert")],
            capability_invocation: vec![format!("{EBSI_DID}#ledger")],
            ..DidDocument::default()
        };
        let verifier = verifier(StaticRegistry::default().with(document));

        let token = issue(&ledger, "ledger", EBSI_DID);
        assert_eq!(kind(&verifier.verify_credential(&token).await), ErrorKind::SignatureInvalid);

        let token = issue(&assertion, "assert", EBSI_DID);
        assert!(verifier.verify_credential(&token).await.is_valid());
    }

    #[tokio::test]
    async fn test_tampered_tokens_are_rejected() {
        let (pair, did) = did_key_issuer();
        let token = issue(&pair, "keys-1", &did);
        let verifier = verifier(StaticRegistry::default());

        let appended = format!("{token}A");
        let kind_appended = kind(&verifier.verify_credential(&appended).await);
        assert!(matches!(kind_appended, ErrorKind::UnableToDecode | ErrorKind::SignatureInvalid));

        let signature_start = token.rfind('.').unwrap() + 1;
        let mut bytes = token.into_bytes();
        let target = signature_start + 20;
        bytes[target] = if bytes[target] == b'A' { b'B' } else { b'A' };
        let flipped = String::from_utf8(bytes).unwrap();
        assert_eq!(kind(&verifier.verify_credential(&flipped).await), ErrorKind::SignatureInvalid);

        assert_eq!(kind(&verifier.verify_credential("not.a-token").await), ErrorKind::UnableToDecode);
    }

    #[tokio::test]
    async fn test_validity_window() {
        let (pair, did) = did_key_issuer();
        let token = issue(&pair, "keys-1", &did);
        let verifier = verifier(StaticRegistry::default());
        let now = Utc::now();

        let early = verifier.verify_at(&token, now - Duration::days(1)).await;
        assert_eq!(kind(&early), ErrorKind::TemporalValidityError);

        let late = verifier.verify_at(&token, now + Duration::days(6 * 366)).await;
        assert_eq!(kind(&late), ErrorKind::TemporalValidityError);

        assert!(verifier.verify_at(&token, now + Duration::days(365)).await.is_valid());
    }

    #[tokio::test]
    async fn test_signer_must_control_the_key() {
        let (pair, _) = did_key_issuer();
        let (_, someone_else) = did_key_issuer();
        let verifier = verifier(StaticRegistry::default());

        let token = issue(&pair, "keys-1", &someone_else);
        assert_eq!(kind(&verifier.verify_credential(&token).await), ErrorKind::SignatureInvalid);

        let bare = CredentialIssuer::new(IssuerConfig { kid_scope: KidScope::Bare, ..IssuerConfig::default() });
        let (pair, did) = did_key_issuer();
        let request = IssueCredentialRequest::new(pair.private_jwk, format!("{someone_else}#key"), did, SUBJECT);
        let token = bare.issue_credential(request).unwrap();
        assert_eq!(kind(&verifier.verify_credential(&token).await), ErrorKind::SignatureInvalid);
    }

    #[tokio::test]
    async fn test_unresolvable_issuer() {
        let pair = generate_key_pair(KeyAlgorithm::Secp256k1).unwrap();
        let token = issue(&pair, "keys-1", "did:ebsi:zvHWX359A3CvfJnCYaAiAde");

        let outcome = verifier(StaticRegistry::default()).verify_credential(&token).await;
        assert_eq!(kind(&outcome), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_envelope_must_match_credential() {
        let (pair, did) = did_key_issuer();
        let token = issue(&pair, "keys-1", &did);
        let mut claims = jws::decode::<VcClaims>(&token).unwrap().claims;
        claims.sub = "did:example:someone-else".into();

        let forged = jws::encode(&Header::new(crate::models::jwk::Algorithm::Es256K, "keys-1"), &claims, &pair.private_jwk).unwrap();
        let outcome = verifier(StaticRegistry::default()).verify_credential(&forged).await;
        assert_eq!(kind(&outcome), ErrorKind::UnableToDecode);
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let nbf = Utc::now();
        let exp = nbf + Duration::seconds(10);
        check_window(nbf, exp, nbf).unwrap();
        check_window(nbf, exp, exp).unwrap();
        assert!(check_window(nbf, exp, exp + Duration::seconds(1)).is_err());
    }
}
