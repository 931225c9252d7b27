// src/lib.rs

//! # Verifiable Credential Lifecycle
//!
//! Issues, presents and verifies W3C Verifiable Credentials signed as compact
//! JWS tokens, for issuers and holders identified by `did:key` or `did:ebsi`
//! DIDs.
//!
//! ## Architecture Overview
//! 1. **Models**: JWKs, DIDs and DID documents, credentials, presentations
//! 2. **Utilities**: algorithm resolution, signatures, JWS encoding
//! 3. **Registry**: EBSI DID registry client behind the [`registry::Registry`] trait
//! 4. **Services**: DID resolver, credential issuer and verifier, presentation
//!    engine, and the HTTP API server
//! 5. **Wallet**: key pair generation

pub mod config;
pub mod error;
pub mod models;
pub mod registry;
pub mod services;
pub mod utils;
pub mod wallet;

pub use config::ServiceConfig;
pub use error::{Error, ErrorKind, Result};
pub use services::api_server::ApiServer;
pub use services::credential_issuer::CredentialIssuer;
pub use services::did_resolver::{create_did, DidResolver};
pub use services::presentation::{PresentationEngine, VerifiedBundle};
pub use services::verifier::{CredentialVerifier, Verification};
