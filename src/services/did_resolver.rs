// src/services/did_resolver.rs
//! DID construction and resolution.
//!
//! Two methods are supported:
//! - `did:key`: the identifier is the multibase (base58btc) encoding of the
//!   `jwk_jcs-pub` multicodec prefix followed by the JCS-canonical public JWK,
//!   so resolution is a local decode
//! - `did:ebsi`: the identifier is `z` + base58btc(`0x01` || 16 random bytes)
//!   and resolution is a lookup against the [`Registry`]
//!
//! Syntax and method-specific checks always run before any registry call.

use crate::config::ResolverConfig;
use crate::error::{Error, Result};
use crate::models::did::{
    Did, DidDocument, DidMethod, ResolutionResult, VerificationMethod, DID_CONTEXT,
};
use crate::models::jwk::Jwk;
use crate::registry::{EbsiRegistryClient, Registry};
use crate::utils::crypto::resolve_algorithm;
use log::{debug, warn};
use multibase::Base;
use rand::RngCore;

/// Multicodec `jwk_jcs-pub` (0xeb51) as an unsigned varint.
const JWK_JCS_PUB: [u8; 3] = [0xd1, 0xd6, 0x03];

/// Version byte of EBSI legal-entity identifiers.
const EBSI_VERSION: u8 = 0x01;

/// Entropy of an EBSI subject identifier.
const EBSI_SUBJECT_BYTES: usize = 16;

/// Creates a DID of `method` for `public_jwk`.
///
/// For `did:key` the DID encodes the public part of the key; for `did:ebsi`
/// it carries a fresh random subject identifier and the key is only checked
/// for being usable.
///
/// # Errors
/// `InvalidKey`, `UnsupportedKeyType` or `UnsupportedCurve` if the key cannot
/// be used for signing.
pub fn create_did(method: DidMethod, public_jwk: &Jwk) -> Result<String> {
    resolve_algorithm(public_jwk)?;

    let did = match method {
        DidMethod::Key => {
            let canonical = public_jwk.to_public()?.canonical_json()?;
            let mut bytes = JWK_JCS_PUB.to_vec();
            bytes.extend_from_slice(canonical.as_bytes());
            format!("did:key:{}", multibase::encode(Base::Base58Btc, bytes))
        }
        DidMethod::Ebsi => {
            let mut bytes = [0u8; EBSI_SUBJECT_BYTES + 1];
            bytes[0] = EBSI_VERSION;
            rand::thread_rng().fill_bytes(&mut bytes[1..]);
            format!("did:ebsi:{}", multibase::encode(Base::Base58Btc, bytes))
        }
    };
    debug!("created {did}");

    Ok(did)
}

/// Resolves DIDs to their documents.
#[derive(Debug)]
pub struct DidResolver<R = EbsiRegistryClient> {
    registry: R,
}

impl DidResolver<EbsiRegistryClient> {
    /// Creates a resolver backed by the EBSI registry.
    ///
    /// # Errors
    /// `ResolverError` if the HTTP client cannot be built.
    pub fn from_config(config: &ResolverConfig) -> Result<Self> {
        Ok(Self::new(EbsiRegistryClient::new(config)?))
    }
}

impl<R: Registry> DidResolver<R> {
    pub fn new(registry: R) -> Self {
        Self { registry }
    }

    /// Resolves `did` to its DID document.
    ///
    /// # Errors
    /// - `InvalidDid` for malformed syntax or a malformed method-specific id
    /// - `UnsupportedMethod` for DID methods other than `key` and `ebsi`
    /// - `NotFound` or `ResolverError` from the registry
    pub async fn resolve(&self, did: &str) -> Result<DidDocument> {
        let parsed = Did::parse(did)?;
        debug!("resolving {did}");

        match parsed.method {
            DidMethod::Key => key_document(did, &parsed.method_specific_id),
            DidMethod::Ebsi => {
                validate_ebsi_id(did, &parsed.method_specific_id)?;
                let document = self.registry.fetch(did).await?;
                if document.id != did {
                    warn!("registry answered {} for {did}", document.id);
                    return Err(Error::ResolverError(format!(
                        "registry returned the document of {}",
                        document.id
                    )));
                }
                Ok(document)
            }
        }
    }

    /// Resolves `did` and wraps the document with resolution metadata.
    ///
    /// # Errors
    /// As [`DidResolver::resolve`].
    pub async fn resolve_result(&self, did: &str) -> Result<ResolutionResult> {
        self.resolve(did).await.map(ResolutionResult::from)
    }
}

fn key_document(did: &str, msid: &str) -> Result<DidDocument> {
    let invalid = || Error::InvalidDid(did.to_string());

    let (base, bytes) = multibase::decode(msid).map_err(|_| invalid())?;
    if base != Base::Base58Btc {
        return Err(invalid());
    }
    let json = bytes.strip_prefix(JWK_JCS_PUB.as_slice()).ok_or_else(invalid)?;
    let jwk: Jwk = serde_json::from_slice(json).map_err(|_| invalid())?;
    if jwk.is_private() {
        return Err(invalid());
    }

    let vm_id = format!("{did}#{msid}");
    Ok(DidDocument {
        context: DID_CONTEXT.iter().map(ToString::to_string).collect(),
        id: did.to_string(),
        verification_method: vec![VerificationMethod {
            id: vm_id.clone(),
            type_: "JsonWebKey2020".to_string(),
            controller: did.to_string(),
            public_key_jwk: Some(jwk),
        }],
        authentication: vec![vm_id.clone()],
        assertion_method: vec![vm_id.clone()],
        capability_invocation: vec![vm_id.clone()],
        capability_delegation: vec![vm_id],
        ..DidDocument::default()
    })
}

fn validate_ebsi_id(did: &str, msid: &str) -> Result<()> {
    match multibase::decode(msid) {
        Ok((Base::Base58Btc, bytes))
            if bytes.len() == EBSI_SUBJECT_BYTES + 1 && bytes[0] == EBSI_VERSION =>
        {
            Ok(())
        }
        _ => Err(Error::InvalidDid(did.to_string())),
    }
}
