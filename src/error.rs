// src/error.rs
//! Error taxonomy for the credential lifecycle engine.
//!
//! Every failure the core can produce is a variant of [`Error`]. Callers that
//! need to branch on the failure use [`Error::kind`], which is stable and
//! serialisable; the `Display` text is meant for humans.

use crate::models::jwk::Algorithm;
use crate::models::request::Field;
use serde::Serialize;
use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Recoverable, typed failures returned by the lifecycle engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Key material is malformed or lacks a required member.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// The `kty` member names a key type this service does not handle.
    #[error("Unsupported key type: {0}")]
    UnsupportedKeyType(String),

    /// The `crv` member names an unknown elliptic curve.
    #[error("Unsupported curve: {0}")]
    UnsupportedCurve(String),

    /// The DID method is not one of the supported methods.
    #[error("Unsupported method: {0}")]
    UnsupportedMethod(String),

    /// The DID is syntactically malformed.
    #[error("Invalid DID: {0}")]
    InvalidDid(String),

    /// The DID is well formed but no document exists for it.
    #[error("DID not found: {0}")]
    NotFound(String),

    /// The registry could not be reached or answered unexpectedly.
    #[error("Resolver error: {0}")]
    ResolverError(String),

    /// A required request field was absent.
    #[error("Missing {0}")]
    MissingField(Field),

    /// A request field was present but not of the expected shape.
    #[error("Malformed {field}: {reason}")]
    MalformedField {
        /// The offending field.
        field: Field,
        /// Why the value was rejected.
        reason: String,
    },

    /// The issuer's key resolves to an algorithm that may not issue credentials.
    #[error("Issuer key algorithm {0} is not allowed")]
    IssuerAlgorithmNotAllowed(Algorithm),

    /// The signer's key resolves to an algorithm that may not sign presentations.
    #[error("Signer key algorithm {0} is not allowed")]
    SignerAlgorithmNotAllowed(Algorithm),

    /// The token is not a well-formed signed claims structure.
    #[error("Unable to decode token: {0}")]
    UnableToDecode(String),

    /// The signature does not verify against the resolved key.
    #[error("Invalid signature: {0}")]
    SignatureInvalid(String),

    /// The token is used outside of its validity window.
    #[error("Token is outside its validity window: {0}")]
    TemporalValidity(String),

    /// The presentation was bound to a different audience.
    #[error("Audience mismatch: expected {expected}, found {found}")]
    AudienceMismatch {
        /// Audience supplied by the verifying party.
        expected: String,
        /// Audience embedded in the token.
        found: String,
    },
}

/// Machine-distinguishable kind of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    InvalidKey,
    UnsupportedKeyType,
    UnsupportedCurve,
    UnsupportedMethod,
    InvalidDid,
    NotFound,
    ResolverError,
    MissingField,
    MalformedField,
    IssuerAlgorithmNotAllowed,
    SignerAlgorithmNotAllowed,
    UnableToDecode,
    SignatureInvalid,
    TemporalValidityError,
    AudienceMismatch,
}

impl Error {
    /// Returns the kind of this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidKey(_) => ErrorKind::InvalidKey,
            Self::UnsupportedKeyType(_) => ErrorKind::UnsupportedKeyType,
            Self::UnsupportedCurve(_) => ErrorKind::UnsupportedCurve,
            Self::UnsupportedMethod(_) => ErrorKind::UnsupportedMethod,
            Self::InvalidDid(_) => ErrorKind::InvalidDid,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::ResolverError(_) => ErrorKind::ResolverError,
            Self::MissingField(_) => ErrorKind::MissingField,
            Self::MalformedField { .. } => ErrorKind::MalformedField,
            Self::IssuerAlgorithmNotAllowed(_) => ErrorKind::IssuerAlgorithmNotAllowed,
            Self::SignerAlgorithmNotAllowed(_) => ErrorKind::SignerAlgorithmNotAllowed,
            Self::UnableToDecode(_) => ErrorKind::UnableToDecode,
            Self::SignatureInvalid(_) => ErrorKind::SignatureInvalid,
            Self::TemporalValidity(_) => ErrorKind::TemporalValidityError,
            Self::AudienceMismatch { .. } => ErrorKind::AudienceMismatch,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::ResolverError(format!("registry request timed out: {err}"))
        } else {
            Self::ResolverError(err.to_string())
        }
    }
}
