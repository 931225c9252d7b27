// src/models/did.rs
//! Decentralized Identifier (DID) data model implementation.
//!
//! Defines DID parsing and the DID Document structures following the
//! [DID Core Specification](https://www.w3.org/TR/did-core/).
//!
//! # DID Format
//! ```text
//! did:<method>:<method-specific-id>
//! ```

use crate::error::{Error, Result};
use crate::models::jwk::Jwk;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Media type of a resolved DID document.
pub const DID_LD_JSON: &str = "application/did+ld+json";

/// Contexts placed on locally constructed DID documents.
pub const DID_CONTEXT: [&str; 2] = [
    "https://www.w3.org/ns/did/v1",
    "https://w3id.org/security/suites/jws-2020/v1",
];

/// `did:<method>:<idchar segments>`; see DID Core §3.1.
static DID_SYNTAX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^did:([a-z0-9]+):((?:(?:[A-Za-z0-9._-]|%[0-9A-Fa-f]{2})*:)*(?:[A-Za-z0-9._-]|%[0-9A-Fa-f]{2})+)$")
        .expect("DID syntax pattern compiles")
});

/// DID methods supported by this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DidMethod {
    /// Self-certifying `did:key`, resolved offline.
    Key,
    /// Registry-backed `did:ebsi`, resolved against the EBSI DID registry.
    Ebsi,
}

impl FromStr for DidMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "key" => Ok(Self::Key),
            "ebsi" => Ok(Self::Ebsi),
            other => Err(Error::UnsupportedMethod(other.to_string())),
        }
    }
}

impl fmt::Display for DidMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key => write!(f, "key"),
            Self::Ebsi => write!(f, "ebsi"),
        }
    }
}

/// A syntactically valid DID of a supported method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Did {
    pub method: DidMethod,
    pub method_specific_id: String,
}

impl Did {
    /// Parses a DID string.
    ///
    /// # Errors
    /// - `InvalidDid` if the string does not follow DID syntax
    /// - `UnsupportedMethod` if the syntax is valid but the method is unknown
    pub fn parse(did: &str) -> Result<Self> {
        let captures = DID_SYNTAX
            .captures(did)
            .ok_or_else(|| Error::InvalidDid(did.to_string()))?;
        let method = captures[1].parse()?;
        Ok(Self {
            method,
            method_specific_id: captures[2].to_string(),
        })
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "did:{}:{}", self.method, self.method_specific_id)
    }
}

/// Splits a DID URL into its DID and optional fragment.
pub fn split_fragment(did_url: &str) -> (&str, Option<&str>) {
    match did_url.split_once('#') {
        Some((did, fragment)) => (did, Some(fragment)),
        None => (did_url, None),
    }
}

/// A public key entry of a DID document.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    /// DID URL identifying this method, e.g. `did:ebsi:z...#keys-1`.
    pub id: String,

    /// Verification method type, e.g. `JsonWebKey2020`.
    #[serde(rename = "type")]
    pub type_: String,

    /// DID of the controller of the key.
    pub controller: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_jwk: Option<Jwk>,
}

/// Roles under which a DID document references its verification methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationRelationship {
    Authentication,
    AssertionMethod,
    CapabilityInvocation,
    CapabilityDelegation,
}

/// A resolved DID document.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    #[serde(rename = "@context", default)]
    pub context: Vec<String>,

    pub id: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub controller: Vec<String>,

    #[serde(default)]
    pub verification_method: Vec<VerificationMethod>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authentication: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertion_method: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capability_invocation: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capability_delegation: Vec<String>,
}

impl DidDocument {
    /// Retrieves a verification method by its id.
    pub fn verification_method(&self, id: &str) -> Option<&VerificationMethod> {
        self.verification_method.iter().find(|vm| vm.id == id)
    }

    /// Verification methods referenced by `relationship`, in document order.
    ///
    /// When the document declares no references for the relationship, every
    /// verification method is returned.
    pub fn methods_for(&self, relationship: VerificationRelationship) -> Vec<&VerificationMethod> {
        let refs = match relationship {
            VerificationRelationship::Authentication => &self.authentication,
            VerificationRelationship::AssertionMethod => &self.assertion_method,
            VerificationRelationship::CapabilityInvocation => &self.capability_invocation,
            VerificationRelationship::CapabilityDelegation => &self.capability_delegation,
        };
        if refs.is_empty() {
            return self.verification_method.iter().collect();
        }
        refs.iter().filter_map(|id| self.verification_method(id)).collect()
    }
}

/// Metadata about the resolution process itself.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionMetadata {
    pub content_type: String,
}

impl Default for ResolutionMetadata {
    fn default() -> Self {
        Self { content_type: DID_LD_JSON.to_string() }
    }
}

/// Output of DID resolution.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    pub did_document: DidDocument,
    pub did_document_metadata: Map<String, Value>,
    pub did_resolution_metadata: ResolutionMetadata,
}

impl From<DidDocument> for ResolutionResult {
    fn from(did_document: DidDocument) -> Self {
        Self {
            did_document,
            did_document_metadata: Map::new(),
            did_resolution_metadata: ResolutionMetadata::default(),
        }
    }
}
